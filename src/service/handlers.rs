// Request handlers
// Framework-agnostic upload/transcribe operations over an ObjectStore

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::audio::{decode_wav, AudioError};
use crate::beat::{BeatQuantizer, QuantizeError, TranscriptionResult};
use crate::service::store::{ObjectStore, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Quantize(#[from] QuantizeError),

    #[error("worker task failed: {0}")]
    Worker(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(key) => ServiceError::NotFound(key),
            other => ServiceError::Store(other),
        }
    }
}

/// The error shape the hosting shell returns to clients. Internals are
/// flattened into a single message; the typed error stays server-side.
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub error: String,
}

impl<E: std::fmt::Display> From<E> for ErrorPayload {
    fn from(error: E) -> Self {
        ErrorPayload {
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub uploaded_at: String,
}

/// Store an uploaded WAV under `filename`.
///
/// The payload is decoded first so malformed uploads are rejected before
/// they reach the store.
pub async fn upload_wav(
    store: &dyn ObjectStore,
    filename: &str,
    data: Vec<u8>,
) -> Result<UploadResponse, ServiceError> {
    let audio = decode_wav(&data)?;

    log::info!(
        "upload {}: {} Hz, {} ch, {} bit, {:.2}s",
        filename,
        audio.sample_rate,
        audio.channels,
        audio.bit_depth,
        audio.duration_secs()
    );

    let object = store.put(filename, &data)?;

    Ok(UploadResponse {
        filename: object.key,
        url: object.url,
        sha256: object.sha256,
        size_bytes: object.size_bytes,
        uploaded_at: Utc::now().to_rfc3339(),
    })
}

/// Fetch a stored WAV and transcribe it.
///
/// Decoding and quantization are CPU-bound, so they run on a blocking
/// worker task; the quantizer is shared and stateless.
pub async fn transcribe(
    store: &dyn ObjectStore,
    quantizer: Arc<BeatQuantizer>,
    filename: &str,
) -> Result<TranscriptionResult, ServiceError> {
    let data = store.get(filename)?;

    let result = tokio::task::spawn_blocking(move || -> Result<TranscriptionResult, ServiceError> {
        let audio = decode_wav(&data)?;
        Ok(quantizer.quantize(&audio)?)
    })
    .await
    .map_err(|e| ServiceError::Worker(e.to_string()))??;

    log::info!(
        "transcribed {}: tempo {:.2}, {} beats, {} notes",
        filename,
        result.tempo,
        result.beat_count,
        result.notes.len()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::store::FsObjectStore;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn silence_wav(secs: f64) -> Vec<u8> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..(secs * 44100.0) as usize {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn temp_store() -> (TempDir, FsObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::with_root(dir.path(), "test-bucket", None).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn upload_stores_valid_wav() {
        let (_dir, store) = temp_store();
        let data = silence_wav(0.1);

        let response = upload_wav(&store, "take.wav", data.clone()).await.unwrap();

        assert_eq!(response.filename, "take.wav");
        assert_eq!(response.size_bytes, data.len() as u64);
        assert_eq!(store.get("take.wav").unwrap(), data);
    }

    #[tokio::test]
    async fn upload_rejects_non_wav_payload() {
        let (_dir, store) = temp_store();

        let result = upload_wav(&store, "junk.wav", b"not audio".to_vec()).await;
        assert!(matches!(result, Err(ServiceError::Audio(_))));

        // Rejected uploads never reach the store
        assert!(store.get("junk.wav").is_err());
    }

    #[tokio::test]
    async fn transcribe_missing_object_is_not_found() {
        let (_dir, store) = temp_store();
        let quantizer = Arc::new(BeatQuantizer::default());

        let result = transcribe(&store, quantizer, "missing.wav").await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn transcribe_silence_returns_empty_notes() {
        let (_dir, store) = temp_store();
        let quantizer = Arc::new(BeatQuantizer::default());

        upload_wav(&store, "quiet.wav", silence_wav(1.0)).await.unwrap();
        let result = transcribe(&store, quantizer, "quiet.wav").await.unwrap();

        assert_eq!(result.beat_count, 0);
        assert!(result.notes.is_empty());
    }

    #[test]
    fn error_payload_flattens_message() {
        let payload = ErrorPayload::from(ServiceError::NotFound("x.wav".to_string()));
        assert_eq!(payload.error, "object not found: x.wav");
    }
}
