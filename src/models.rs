use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::AccessGate;
use crate::config::Config;
use crate::store::FlatFileStore;
use crate::upload::UploadOrchestrator;

/// One entry in the `videos` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Original filename as sent by the client.
    pub title: String,
    pub url: String,
    pub thumbnails: Vec<String>,
}

/// Entries in the `ads` collection are bare secure URLs.
pub type AdRecord = String;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: Arc<AccessGate>,
    pub store: Arc<FlatFileStore>,
    pub orchestrator: UploadOrchestrator,
}

/// A file pulled out of a multipart request.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: bytes::Bytes,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStatus {
    Success,
    Fail,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Premium,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    pub status: LoginStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
}

impl LoginResponse {
    pub fn success(role: Option<Role>, plan: Option<Plan>) -> Self {
        Self {
            status: LoginStatus::Success,
            role,
            plan,
        }
    }

    pub fn fail() -> Self {
        Self {
            status: LoginStatus::Fail,
            role: None,
            plan: None,
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
