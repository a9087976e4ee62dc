//! Shared fixtures for unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::auth::{AccessGate, Credentials, LoginMode};
use crate::config::Secret;
use crate::media::{MediaHost, ResourceType, Transformation, UploadError, UploadedAsset};

pub const ADMIN_KEY: &str = "test-admin-key";
pub const ADMIN_USER: &str = "root";
pub const ADMIN_PASS: &str = "hunter2";
pub const APP_USER: &str = "viewer";
pub const APP_PASS: &str = "letmein";

pub fn test_credentials(login_mode: LoginMode) -> Credentials {
    Credentials {
        admin_key: Secret::new(ADMIN_KEY),
        admin_login: Some((Secret::new(ADMIN_USER), Secret::new(ADMIN_PASS))),
        app_login: (Secret::new(APP_USER), Secret::new(APP_PASS)),
        login_mode,
    }
}

pub fn test_gate() -> AccessGate {
    AccessGate::new(test_credentials(LoginMode::AdminAware))
}

/// In-memory media host: numbered assets, deterministic URLs.
#[derive(Default)]
pub struct FakeMediaHost {
    uploads: AtomicUsize,
    fail: bool,
}

impl FakeMediaHost {
    pub fn failing() -> Self {
        Self {
            uploads: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaHost for FakeMediaHost {
    async fn upload(
        &self,
        _file_name: &str,
        _data: Bytes,
        resource_type: ResourceType,
    ) -> Result<UploadedAsset, UploadError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(UploadError::Rejected {
                status: 500,
                message: "simulated outage".to_string(),
            });
        }
        Ok(UploadedAsset {
            secure_url: format!("https://media.test/{}/asset-{}.mp4", resource_type.as_str(), n),
            public_id: format!("asset-{}", n),
        })
    }

    fn derive_url(
        &self,
        public_id: &str,
        resource_type: ResourceType,
        format: &str,
        transformations: &[Transformation],
    ) -> String {
        let chain = transformations
            .iter()
            .map(Transformation::component)
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "https://media.test/{}/{}/{}.{}",
            resource_type.as_str(),
            chain,
            public_id,
            format
        )
    }
}
