use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{ImageHost, MediaError};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Signed uploads to the Cloudinary image API
pub struct CloudinaryHost {
    client: Client,
    config: CloudinaryConfig,
    upload_url: String,
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("vista-image-upload/0.1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client for image uploads")?;

        let upload_url = format!("{API_BASE}/{}/image/upload", config.cloud_name);

        Ok(Self {
            client,
            config,
            upload_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Cloudinary request signature: the signed params sorted by name, joined as
/// `k=v&k=v`, followed by the API secret, SHA-256 hex encoded.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by_key(|(name, _)| *name);
    let joined = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, image: Vec<u8>, public_id: &str) -> Result<String, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let form = Form::new()
            .part("file", Part::bytes(image).file_name(public_id.to_string()))
            .text("api_key", self.config.api_key.clone())
            .text("public_id", public_id.to_string())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response: UploadResponse = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .context("failed to reach image host")?
            .error_for_status()
            .context("image host rejected the upload")?
            .json()
            .await
            .context("failed to parse image host response")?;

        debug!(public_id, url = %response.secure_url, "image uploaded");
        Ok(response.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_params_and_appends_secret() {
        let expected = hex::encode(Sha256::digest(
            b"public_id=sample_image&timestamp=1315060510abcd",
        ));
        assert_eq!(
            sign(
                &[("timestamp", "1315060510"), ("public_id", "sample_image")],
                "abcd"
            ),
            expected
        );
    }

    #[test]
    fn test_upload_url_uses_cloud_name() {
        let host = CloudinaryHost::new(CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        })
        .unwrap();
        assert_eq!(
            host.upload_url,
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }
}
