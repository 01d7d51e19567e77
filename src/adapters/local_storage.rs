use crate::domain::model::Photo;
use crate::domain::ports::ObjectStorage;
use crate::utils::error::{HubError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 以本機目錄模擬圖片物件儲存
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    base_path: String,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(base_path: String, public_base_url: String) -> Self {
        Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, public_id: &str) -> Result<PathBuf> {
        // public_id 只能是單一檔名
        if public_id.is_empty()
            || public_id.contains(['/', '\\'])
            || public_id.starts_with('.')
        {
            return Err(HubError::validation(format!(
                "Invalid object id: {}",
                public_id
            )));
        }
        Ok(Path::new(&self.base_path).join(public_id))
    }
}

impl ObjectStorage for LocalObjectStorage {
    async fn upload(&self, file_name: &str, data: &[u8]) -> Result<Photo> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        let public_id = format!("{}{}", uuid::Uuid::new_v4(), extension);
        let full_path = self.object_path(&public_id)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, data)?;

        tracing::debug!(public_id, bytes = data.len(), "stored object");
        Ok(Photo {
            url: format!("{}/{}", self.public_base_url, public_id),
            public_id,
        })
    }

    async fn remove(&self, public_id: &str) -> Result<()> {
        let full_path = self.object_path(public_id)?;
        match fs::remove_file(&full_path) {
            Ok(()) => Ok(()),
            // 已經不存在視為成功
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
