use crate::adapters::lookup_csv::LookupTable;
use crate::domain::model::LookupKind;
use crate::utils::error::{HubError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, validate_range,
    validate_route, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh-token";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_database_path() -> String {
    "./data/workshops.db".to_string()
}

fn default_photo_dir() -> String {
    "./data/photos".to_string()
}

fn default_photo_base_url() -> String {
    format!("{}/photos", DEFAULT_BASE_URL)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub refresh_path: Option<String>,
    /// 原樣轉送的 session cookie（例如 refresh token 與語系）
    pub cookie: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
            refresh_path: None,
            cookie: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn refresh_path(&self) -> &str {
        self.refresh_path.as_deref().unwrap_or(DEFAULT_REFRESH_PATH)
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        validate_url("client.base_url", &self.base_url)?;
        if let Some(timeout) = self.timeout_seconds {
            validate_range("client.timeout_seconds", timeout, 1, 300)?;
        }
        validate_route("client.refresh_path", self.refresh_path())?;
        if let Some(cookie) = &self.cookie {
            validate_non_empty_string("client.cookie", cookie)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupFiles {
    pub provinces: Option<String>,
    pub cities: Option<String>,
    pub services: Option<String>,
    pub cars: Option<String>,
}

impl LookupFiles {
    pub fn entries(&self) -> Vec<(LookupKind, &String)> {
        [
            (LookupKind::Province, &self.provinces),
            (LookupKind::City, &self.cities),
            (LookupKind::Service, &self.services),
            (LookupKind::Car, &self.cars),
        ]
        .into_iter()
        .filter_map(|(kind, path)| path.as_ref().map(|path| (kind, path)))
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_photo_dir")]
    pub photo_dir: String,
    #[serde(default = "default_photo_base_url")]
    pub photo_base_url: String,
    #[serde(default)]
    pub lookups: LookupFiles,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            photo_dir: default_photo_dir(),
            photo_base_url: default_photo_base_url(),
            lookups: LookupFiles::default(),
        }
    }
}

impl ServerConfig {
    /// 載入所有設定的對照表 CSV
    pub fn load_lookups(&self) -> Result<LookupTable> {
        let mut table = LookupTable::new();
        for (kind, path) in self.lookups.entries() {
            table.load_file(kind, path)?;
        }
        Ok(table)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_path("server.database_path", &self.database_path)?;
        validate_path("server.photo_dir", &self.photo_dir)?;
        validate_url("server.photo_base_url", &self.photo_base_url)?;

        let files: Vec<String> = self
            .lookups
            .entries()
            .into_iter()
            .map(|(_, path)| path.clone())
            .collect();
        validate_file_extensions("server.lookups", &files, &["csv"])?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub json: bool,
}

impl HubConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HubError::MissingConfigError {
                field: path.as_ref().display().to_string(),
            },
            _ => HubError::IoError(e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HubError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HUB_BASE_URL})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HubError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for HubConfig {
    fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.server.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[client]
base_url = "https://api.workshops.example"
timeout_seconds = 20
refresh_path = "/api/auth/refresh"
cookie = "refreshToken=abc; i18next=ar"

[server]
database_path = "./db/workshops.db"
photo_dir = "./photos"
photo_base_url = "https://cdn.example/photos"

[server.lookups]
provinces = "data/provinces.csv"
services = "data/services.csv"

[logging]
verbose = true
"#;

        let config = HubConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.client.base_url, "https://api.workshops.example");
        assert_eq!(config.client.timeout(), Duration::from_secs(20));
        assert_eq!(config.client.refresh_path(), "/api/auth/refresh");
        assert_eq!(config.server.lookups.entries().len(), 2);
        assert!(config.logging.verbose);
        assert!(!config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = HubConfig::from_toml_str("").unwrap();
        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.refresh_path(), DEFAULT_REFRESH_PATH);
        assert_eq!(
            config.client.timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HUB_TEST_BASE_URL", "https://test.api.com");

        let config = HubConfig::from_toml_str(
            r#"
[client]
base_url = "${HUB_TEST_BASE_URL}"
"#,
        )
        .unwrap();
        assert_eq!(config.client.base_url, "https://test.api.com");

        std::env::remove_var("HUB_TEST_BASE_URL");
    }

    #[test]
    fn test_config_validation() {
        let bad_url = HubConfig::from_toml_str(
            r#"
[client]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(bad_url.validate().is_err());

        let bad_timeout = HubConfig::from_toml_str(
            r#"
[client]
timeout_seconds = 0
"#,
        )
        .unwrap();
        assert!(bad_timeout.validate().is_err());

        let blank_cookie = HubConfig::from_toml_str(
            r#"
[client]
cookie = "  "
"#,
        )
        .unwrap();
        assert!(blank_cookie.validate().is_err());

        let bad_lookup = HubConfig::from_toml_str(
            r#"
[server.lookups]
cars = "cars.json"
"#,
        )
        .unwrap();
        assert!(bad_lookup.validate().is_err());
    }

    #[test]
    fn test_config_from_file_and_lookup_loading() {
        let mut lookup_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        lookup_file
            .write_all(b"id,label,value\n1,Damascus,damascus\n")
            .unwrap();

        let mut temp_file = NamedTempFile::new().unwrap();
        let toml_content = format!(
            "[server.lookups]\nprovinces = \"{}\"\n",
            lookup_file.path().display().to_string().replace('\\', "/")
        );
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = HubConfig::from_file(temp_file.path()).unwrap();
        let table = config.server.load_lookups().unwrap();
        assert!(!table.is_empty());
    }

    #[test]
    fn test_missing_config_file() {
        let result = HubConfig::from_file("/nonexistent/workshop-hub.toml");
        assert!(matches!(result, Err(HubError::MissingConfigError { .. })));
    }
}
