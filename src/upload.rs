use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AccessGate;
use crate::error::AppError;
use crate::media::{MediaHost, ResourceType, Transformation};
use crate::models::{AdRecord, UploadedFile, VideoRecord};
use crate::store::{Collection, FlatFileStore};

pub const THUMBNAIL_WIDTH: u32 = 400;
pub const THUMBNAIL_HEIGHT: u32 = 225;
pub const THUMBNAIL_FORMAT: &str = "jpg";
/// Frame offsets, in the host's time units (seconds).
pub const THUMBNAIL_OFFSETS: [u32; 3] = [1, 3, 5];

/// Key check → remote upload → record append.
#[derive(Clone)]
pub struct UploadOrchestrator {
    gate: Arc<AccessGate>,
    host: Arc<dyn MediaHost>,
    store: Arc<FlatFileStore>,
}

impl UploadOrchestrator {
    pub fn new(gate: Arc<AccessGate>, host: Arc<dyn MediaHost>, store: Arc<FlatFileStore>) -> Self {
        Self { gate, host, store }
    }

    pub async fn upload_video(
        &self,
        admin_key: Option<&str>,
        file: UploadedFile,
    ) -> Result<VideoRecord, AppError> {
        self.authorize(admin_key, "video")?;

        let asset = self
            .host
            .upload(&file.file_name, file.data, ResourceType::Video)
            .await?;

        let record = VideoRecord {
            title: file.file_name,
            url: asset.secure_url,
            thumbnails: self.thumbnails(&asset.public_id),
        };
        self.store.append(Collection::Videos, &record).await?;

        info!(
            "[upload] stored video {:?} ({})",
            record.title, asset.public_id
        );
        Ok(record)
    }

    pub async fn upload_ad(
        &self,
        admin_key: Option<&str>,
        file: UploadedFile,
    ) -> Result<AdRecord, AppError> {
        self.authorize(admin_key, "ad")?;

        let asset = self
            .host
            .upload(&file.file_name, file.data, ResourceType::Video)
            .await?;

        let record: AdRecord = asset.secure_url;
        self.store.append(Collection::Ads, &record).await?;

        info!("[upload] stored ad {:?} ({})", file.file_name, asset.public_id);
        Ok(record)
    }

    /// Fill-cropped JPEG frames, one per entry in `THUMBNAIL_OFFSETS`.
    pub fn thumbnails(&self, public_id: &str) -> Vec<String> {
        THUMBNAIL_OFFSETS
            .iter()
            .map(|offset| {
                self.host.derive_url(
                    public_id,
                    ResourceType::Video,
                    THUMBNAIL_FORMAT,
                    &[
                        Transformation::fill(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT),
                        Transformation::start_offset(offset),
                    ],
                )
            })
            .collect()
    }

    fn authorize(&self, admin_key: Option<&str>, kind: &str) -> Result<(), AppError> {
        if self.gate.check_admin_key(admin_key) {
            return Ok(());
        }
        warn!(
            "[upload] rejected {} upload: {} admin key",
            kind,
            if admin_key.is_some() { "wrong" } else { "missing" }
        );
        Err(AppError::Unauthorized)
    }
}
