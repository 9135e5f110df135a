// Audio processing module
// WAV ingestion and onset detection

pub mod ingest;
pub mod onset;

pub use ingest::{decode_wav, AudioData, AudioError};
pub use onset::{detect_onsets, Onset, OnsetConfig, OnsetError};
