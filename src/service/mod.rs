// Service layer
// Configuration, object storage, and request handlers

pub mod config;
pub mod handlers;
pub mod store;

pub use config::ServiceConfig;
pub use handlers::{transcribe, upload_wav, ErrorPayload, ServiceError, UploadResponse};
pub use store::{FsObjectStore, ObjectStore, StoreError, StoredObject};
