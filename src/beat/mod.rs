// Beat engine - tempo tracking, subdivision grid, quantization

pub mod grid;
pub mod quantize;
pub mod tempo;

pub use grid::{build_grid, nearest_grid_point};
pub use quantize::{
    snap_to_grid, BeatQuantizer, OnsetEvent, QuantizeConfig, QuantizeError, TranscriptionResult,
};
pub use tempo::{track_beats, TempoConfig, TempoEstimate};
