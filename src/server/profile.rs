use crate::domain::model::{ImageUpload, Photo, ProfileUpdate, Workshop};
use crate::domain::ports::{ObjectStorage, WorkshopStore};
use crate::utils::error::{HubError, Result};
use crate::utils::validation::validate_length;
use std::sync::Arc;

/// 上傳圖片大小上限
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

const WORKSHOP_NOT_FOUND: &str = "Workshop not found";

/// 驗證個人資料更新內容，錯誤一律回傳 400
pub fn validate_profile_update(update: &ProfileUpdate) -> Result<()> {
    if let Some(name) = &update.workshop_name {
        validate_length("workshopName", name, 2, 100)?;
    }
    if let Some(description) = &update.description {
        validate_length("description", description, 0, 500)?;
    }
    if let Some(phone) = &update.phone {
        let phone = phone.trim();
        let digits = phone.trim_start_matches('+');
        if digits.len() < 6 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(HubError::validation("phone must contain 6 to 15 digits"));
        }
    }
    if let Some(branches) = &update.branches {
        if branches.is_empty() {
            return Err(HubError::validation("at least one branch is required"));
        }
        if branches
            .iter()
            .any(|b| b.province.trim().is_empty() || b.city.trim().is_empty())
        {
            return Err(HubError::validation("branch province and city are required"));
        }
    }
    for (field, values) in [("services", &update.services), ("cars", &update.cars)] {
        if let Some(values) = values {
            if values.iter().any(|v| v.trim().is_empty()) {
                return Err(HubError::validation(format!(
                    "{} cannot contain empty values",
                    field
                )));
            }
        }
    }
    Ok(())
}

fn validate_image(image: &ImageUpload) -> Result<()> {
    if image.data.is_empty() {
        return Err(HubError::validation("Please attach an image"));
    }
    if !image.content_type.starts_with("image/") {
        return Err(HubError::validation(format!(
            "Unsupported file type: {}",
            image.content_type
        )));
    }
    if image.data.len() > MAX_PHOTO_BYTES {
        return Err(HubError::validation("Image is larger than 5 MB"));
    }
    Ok(())
}

pub struct WorkshopProfileService<O: ObjectStorage> {
    store: Arc<dyn WorkshopStore>,
    objects: O,
}

impl<O: ObjectStorage> WorkshopProfileService<O> {
    pub fn new(store: Arc<dyn WorkshopStore>, objects: O) -> Self {
        Self { store, objects }
    }

    pub async fn get_workshop(&self, id: &str) -> Result<Workshop> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| HubError::not_found(WORKSHOP_NOT_FOUND))
    }

    pub async fn count_workshops(&self) -> Result<u64> {
        self.store.count().await
    }

    pub async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Workshop> {
        validate_profile_update(update)?;
        let updated = self
            .store
            .update_profile(id, update)
            .await?
            .ok_or_else(|| HubError::not_found(WORKSHOP_NOT_FOUND))?;
        tracing::info!(workshop_id = id, "workshop profile updated");
        Ok(updated)
    }

    /// 先上傳，確認成功後才寫入資料；寫入失敗時刪除剛上傳的檔案。
    /// 要移除的舊照片以 store 替換時回傳的為準，同時上傳也不會漏刪
    pub async fn upload_photo(&self, id: &str, image: Option<ImageUpload>) -> Result<Photo> {
        let image = image.ok_or_else(|| HubError::validation("Please attach an image"))?;
        validate_image(&image)?;

        self.get_workshop(id).await?;
        let uploaded = self.objects.upload(&image.file_name, &image.data).await?;
        tracing::debug!(workshop_id = id, public_id = %uploaded.public_id, "photo uploaded");

        let swap = match self.store.set_photo(id, Some(uploaded.clone())).await {
            Ok(Some(swap)) => swap,
            Ok(None) => {
                self.discard_upload(&uploaded).await;
                return Err(HubError::not_found(WORKSHOP_NOT_FOUND));
            }
            Err(e) => {
                tracing::error!(workshop_id = id, error = %e, "failed to store photo metadata");
                self.discard_upload(&uploaded).await;
                return Err(e);
            }
        };

        if let Some(previous) = swap.previous {
            if previous.public_id != uploaded.public_id {
                if let Err(e) = self.objects.remove(&previous.public_id).await {
                    tracing::warn!(
                        public_id = %previous.public_id,
                        error = %e,
                        "failed to remove previous photo"
                    );
                }
            }
        }

        tracing::info!(workshop_id = %swap.workshop.id, "workshop photo replaced");
        Ok(uploaded)
    }

    pub async fn delete_workshop(&self, id: &str) -> Result<()> {
        let existing = self.get_workshop(id).await?;
        if !self.store.delete(id).await? {
            return Err(HubError::not_found(WORKSHOP_NOT_FOUND));
        }
        if let Some(photo) = existing.photo {
            if let Err(e) = self.objects.remove(&photo.public_id).await {
                tracing::warn!(public_id = %photo.public_id, error = %e, "orphaned workshop photo");
            }
        }
        tracing::info!(workshop_id = id, "workshop deleted");
        Ok(())
    }

    async fn discard_upload(&self, uploaded: &Photo) {
        if let Err(e) = self.objects.remove(&uploaded.public_id).await {
            tracing::error!(
                public_id = %uploaded.public_id,
                error = %e,
                "failed to roll back photo upload"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Branch;

    #[test]
    fn test_profile_update_validation() {
        assert!(validate_profile_update(&ProfileUpdate::default()).is_ok());

        let short_name = ProfileUpdate {
            workshop_name: Some("a".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            validate_profile_update(&short_name),
            Err(HubError::ValidationError { .. })
        ));

        let bad_phone = ProfileUpdate {
            phone: Some("call me".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(validate_profile_update(&bad_phone).is_err());

        let good = ProfileUpdate {
            workshop_name: Some("Fast Fix".to_string()),
            phone: Some("+963944000000".to_string()),
            branches: Some(vec![Branch {
                province: "damascus".to_string(),
                city: "mezzeh".to_string(),
            }]),
            services: Some(vec!["oil".to_string()]),
            ..ProfileUpdate::default()
        };
        assert!(validate_profile_update(&good).is_ok());

        let empty_branch = ProfileUpdate {
            branches: Some(vec![Branch {
                province: " ".to_string(),
                city: "x".to_string(),
            }]),
            ..ProfileUpdate::default()
        };
        assert!(validate_profile_update(&empty_branch).is_err());
    }

    #[test]
    fn test_image_validation() {
        let image = |content_type: &str, size: usize| ImageUpload {
            file_name: "a.png".to_string(),
            content_type: content_type.to_string(),
            data: vec![0; size],
        };
        assert!(validate_image(&image("image/png", 10)).is_ok());
        assert!(validate_image(&image("image/png", 0)).is_err());
        assert!(validate_image(&image("text/plain", 10)).is_err());
        assert!(validate_image(&image("image/jpeg", MAX_PHOTO_BYTES + 1)).is_err());
    }
}
