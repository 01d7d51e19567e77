use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Mechanic,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub role: Role,
    pub access_token: String,
    /// 伺服器是否告知過憑證到期時間
    pub expiry_known: bool,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// 搜尋條件；`page` 永遠 >= 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub province: Option<String>,
    pub car_type: Option<String>,
    pub service_type: Option<String>,
    page: u32,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            province: None,
            car_type: None,
            service_type: None,
            page: 1,
        }
    }
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_province(mut self, province: impl Into<String>) -> Self {
        self.province = non_blank(province.into());
        self
    }

    pub fn with_car_type(mut self, car_type: impl Into<String>) -> Self {
        self.car_type = non_blank(car_type.into());
        self
    }

    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = non_blank(service_type.into());
        self
    }

    /// 小於 1 的頁碼一律視為第 1 頁
    pub fn with_page(mut self, page: i64) -> Self {
        self.page = clamp_page(page);
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// 組成 `/search/workshop` 的查詢參數（未設定的欄位不送出）
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let fields = [
            ("province", &self.province),
            ("car", &self.car_type),
            ("service", &self.service_type),
        ];
        for (key, value) in fields {
            if let Some(value) = value.as_deref().and_then(|v| non_blank(v.to_string())) {
                pairs.push((key.to_string(), value));
            }
        }
        pairs.push(("page".to_string(), self.page.to_string()));
        pairs
    }
}

pub fn clamp_page(page: i64) -> u32 {
    page.clamp(1, u32::MAX as i64) as u32
}

pub(crate) fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 分頁結果；`total_count` 是整個條件的筆數而非單頁筆數
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub items: Vec<Workshop>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl SearchResult {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.page_size as u64)
    }
}

/// 搜尋端點回應 `{ workshops, count }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub workshops: Vec<WorkshopView>,
    pub count: u64,
}

// ---------------------------------------------------------------------------
// Workshops
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub province: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub url: String,
    pub public_id: String,
}

/// 儲存層中的維修廠紀錄；省份、城市、服務與車種都以代碼保存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    pub id: String,
    pub workshop_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub cars: Vec<String>,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub rating_total: u32,
    #[serde(default)]
    pub photo: Option<Photo>,
    pub created_at: DateTime<Utc>,
}

impl Workshop {
    pub fn rating_average(&self) -> Option<f64> {
        if self.rating_count == 0 {
            None
        } else {
            Some(self.rating_total as f64 / self.rating_count as f64)
        }
    }

    /// 套用個人資料更新（只覆寫有提供的欄位）
    pub fn apply_update(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.workshop_name {
            self.workshop_name = name.trim().to_string();
        }
        if let Some(description) = &update.description {
            self.description = Some(description.trim().to_string());
        }
        if let Some(phone) = &update.phone {
            self.phone = Some(phone.trim().to_string());
        }
        if let Some(branches) = &update.branches {
            self.branches = branches.clone();
        }
        if let Some(services) = &update.services {
            self.services = services.clone();
        }
        if let Some(cars) = &update.cars {
            self.cars = cars.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    Province,
    City,
    Service,
    Car,
}

/// 查表後的顯示資料 `{ id, label, value }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub id: String,
    pub label: String,
    pub value: String,
}

impl LookupEntry {
    pub fn raw(code: &str) -> Self {
        Self {
            id: code.to_string(),
            label: code.to_string(),
            value: code.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchView {
    pub province: LookupEntry,
    pub city: LookupEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopView {
    pub id: String,
    pub workshop_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub branches: Vec<BranchView>,
    pub services: Vec<LookupEntry>,
    pub cars: Vec<LookupEntry>,
    pub rating_count: u32,
    #[serde(default)]
    pub rating_average: Option<f64>,
    #[serde(default)]
    pub photo: Option<Photo>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workshop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<Branch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cars: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Workshop owner profile (client view)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopOwner {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub workshop_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "workshopPhoto")]
    pub photo: Option<Photo>,
    #[serde(default)]
    pub workshop_ratings: Vec<Rating>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdated {
    pub data: WorkshopOwner,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploaded {
    pub message: String,
    pub workshop_photo: Photo,
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatingAuthor {
    Profile {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default)]
        username: Option<String>,
    },
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    #[serde(alias = "_id")]
    pub id: String,
    pub rating: u8,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: Option<RatingAuthor>,
    #[serde(default)]
    pub workshop_owner: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRating {
    pub rating: u8,
    pub workshop_owner: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedRating {
    pub rating_id: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    pub sender_id: String,
    pub receiver_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// 對話另一方是一般使用者還是維修廠
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    User,
    Mechanic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub workshop_name: Option<String>,
    #[serde(default, alias = "profilePhoto", alias = "workshopPhoto")]
    pub photo: Option<Photo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_clamps_page_and_drops_blank_values() {
        let filter = SearchFilter::new()
            .with_province("  ")
            .with_car_type(" toyota ")
            .with_page(-4);

        assert_eq!(filter.province, None);
        assert_eq!(filter.car_type.as_deref(), Some("toyota"));
        assert_eq!(filter.page(), 1);
        assert_eq!(SearchFilter::default().page(), 1);
    }

    #[test]
    fn test_filter_query_pairs_skip_unset_fields() {
        let filter = SearchFilter::new().with_service_type("oil").with_page(2);
        assert_eq!(
            filter.to_query_pairs(),
            vec![
                ("service".to_string(), "oil".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let result = SearchResult {
            items: vec![],
            total_count: 23,
            page: 3,
            page_size: 10,
        };
        assert_eq!(result.total_pages(), 3);
    }

    #[test]
    fn test_rating_accepts_populated_or_plain_user() {
        let populated: Rating = serde_json::from_value(serde_json::json!({
            "_id": "r1",
            "rating": 4,
            "text": "good",
            "user": {"_id": "u1", "username": "sami"}
        }))
        .unwrap();
        assert_eq!(
            populated.user,
            Some(RatingAuthor::Profile {
                id: "u1".to_string(),
                username: Some("sami".to_string())
            })
        );

        let plain: Rating = serde_json::from_value(serde_json::json!({
            "id": "r2",
            "rating": 5,
            "user": "u2"
        }))
        .unwrap();
        assert_eq!(plain.user, Some(RatingAuthor::Id("u2".to_string())));
    }
}
