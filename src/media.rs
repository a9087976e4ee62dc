//! Client for the remote media host (Cloudinary's upload + delivery APIs).
//!
//! Uploads are signed multipart POSTs. Delivery URLs are built locally from a
//! public id and a chain of transformations; building one never touches the
//! network, so a bad id only shows up when the URL is fetched.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error};

use crate::config::{MediaHostConfig, Secret};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceType {
    Video,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Video => "video",
        }
    }
}

/// What the host hands back for a stored asset.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UploadedAsset {
    pub secure_url: String,
    pub public_id: String,
}

/// One step of a delivery transformation chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transformation {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub crop: Option<String>,
    pub start_offset: Option<String>,
}

impl Transformation {
    pub fn fill(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            crop: Some("fill".to_string()),
            ..Default::default()
        }
    }

    pub fn start_offset(offset: impl ToString) -> Self {
        Self {
            start_offset: Some(offset.to_string()),
            ..Default::default()
        }
    }

    /// URL path component, parameters sorted by key: `c_fill,h_225,w_400`.
    pub fn component(&self) -> String {
        let mut params = Vec::with_capacity(4);
        if let Some(crop) = &self.crop {
            params.push(format!("c_{}", crop));
        }
        if let Some(height) = self.height {
            params.push(format!("h_{}", height));
        }
        if let Some(offset) = &self.start_offset {
            params.push(format!("so_{}", offset));
        }
        if let Some(width) = self.width {
            params.push(format!("w_{}", width));
        }
        params.join(",")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("media host request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("media host rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unreadable media host response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(
        &self,
        file_name: &str,
        data: Bytes,
        resource_type: ResourceType,
    ) -> Result<UploadedAsset, UploadError>;

    fn derive_url(
        &self,
        public_id: &str,
        resource_type: ResourceType,
        format: &str,
        transformations: &[Transformation],
    ) -> String;
}

pub struct CloudinaryClient {
    client: reqwest::Client,
    cloud_name: String,
    api_key: Secret,
    api_secret: Secret,
    api_base_url: String,
    delivery_base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Sign upload parameters: sorted `k=v` pairs joined by `&`, secret appended, SHA-256 hex.
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Folder-scoped ids need an explicit version segment, else the host
/// reads the first folder as a version. Ids already versioned are left alone.
fn needs_default_version(public_id: &str) -> bool {
    if !public_id.contains('/') || public_id.starts_with("http://") || public_id.starts_with("https://") {
        return false;
    }
    let versioned = public_id
        .strip_prefix('v')
        .map(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(false);
    !versioned
}

impl CloudinaryClient {
    pub fn new(config: &MediaHostConfig) -> Result<Self, UploadError> {
        let mut builder = reqwest::Client::builder();
        if config.upload_timeout > 0 {
            builder = builder.timeout(Duration::from_secs(config.upload_timeout));
        }

        Ok(Self {
            client: builder.build()?,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            delivery_base_url: config.delivery_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn upload_url(&self, resource_type: ResourceType) -> String {
        format!(
            "{}/{}/{}/upload",
            self.api_base_url,
            self.cloud_name,
            resource_type.as_str()
        )
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(
        &self,
        file_name: &str,
        data: Bytes,
        resource_type: ResourceType,
    ) -> Result<UploadedAsset, UploadError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string();

        let mut params = BTreeMap::new();
        params.insert("timestamp", timestamp.clone());
        let signature = sign_params(&params, self.api_secret.expose());

        let size = data.len();
        let form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.expose().to_string())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature)
            .part(
                "file",
                reqwest::multipart::Part::bytes(data.to_vec()).file_name(file_name.to_string()),
            );

        let url = self.upload_url(resource_type);
        debug!("[media] uploading {} ({} bytes) to {}", file_name, size, url);

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            error!("[media] upload of {} rejected: {} {}", file_name, status, message);
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<UploadedAsset>()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }

    fn derive_url(
        &self,
        public_id: &str,
        resource_type: ResourceType,
        format: &str,
        transformations: &[Transformation],
    ) -> String {
        let mut url = format!(
            "{}/{}/{}/upload",
            self.delivery_base_url,
            self.cloud_name,
            resource_type.as_str()
        );
        for transformation in transformations {
            let component = transformation.component();
            if !component.is_empty() {
                url.push('/');
                url.push_str(&component);
            }
        }
        if needs_default_version(public_id) {
            url.push_str("/v1");
        }
        url.push('/');
        url.push_str(public_id);
        if !format.is_empty() {
            url.push('.');
            url.push_str(format);
        }
        url
    }
}
