// Drumscribe - drum transcription backend
// Module declarations

pub mod audio;
pub mod beat;
pub mod dataset;
pub mod service;

pub use audio::{decode_wav, AudioData};
pub use beat::{BeatQuantizer, QuantizeConfig, TranscriptionResult};
