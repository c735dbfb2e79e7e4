//! Third-party image hosting

pub mod cloudinary;

use async_trait::async_trait;
use thiserror::Error;

pub use cloudinary::CloudinaryHost;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image uploads are not configured")]
    NotConfigured,
    #[error(transparent)]
    Upload(#[from] anyhow::Error),
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image under `public_id` and return its public HTTPS URL
    async fn upload(&self, image: Vec<u8>, public_id: &str) -> Result<String, MediaError>;
}

/// Host used when no image provider is configured
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload(&self, _image: Vec<u8>, _public_id: &str) -> Result<String, MediaError> {
        Err(MediaError::NotConfigured)
    }
}
