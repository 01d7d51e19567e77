pub mod toml_config;

pub use toml_config::{ClientConfig, HubConfig, LoggingConfig, LookupFiles, ServerConfig};

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "workshop-hub")]
#[command(about = "Search repair workshops and drive the marketplace API")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Path to a TOML config file")]
    pub config: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    #[arg(long)]
    pub province: Option<String>,

    #[arg(long)]
    pub car: Option<String>,

    #[arg(long)]
    pub service: Option<String>,

    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    pub page: i64,
}

#[cfg(feature = "cli")]
impl FilterArgs {
    pub fn to_filter(&self) -> crate::domain::model::SearchFilter {
        let mut filter = crate::domain::model::SearchFilter::new().with_page(self.page);
        if let Some(province) = &self.province {
            filter = filter.with_province(province.as_str());
        }
        if let Some(car) = &self.car {
            filter = filter.with_car_type(car.as_str());
        }
        if let Some(service) = &self.service {
            filter = filter.with_service_type(service.as_str());
        }
        filter
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Search the local workshop database
    Search(FilterArgs),

    /// Import workshops from a JSON array into the local database
    Import {
        #[arg(long)]
        file: String,
    },

    /// Count workshops in the local database
    Count,

    /// Search through the remote API
    RemoteSearch {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, help = "Override client.base_url")]
        base_url: Option<String>,
    },
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 讀取設定檔（未指定時使用預設值），命令列旗標優先
    pub fn load_hub_config(&self) -> crate::utils::error::Result<HubConfig> {
        let mut config = match &self.config {
            Some(path) => HubConfig::from_file(path)?,
            None => HubConfig::default(),
        };
        config.logging.verbose |= self.verbose;
        config.logging.json |= self.json_logs;
        if let Command::RemoteSearch {
            base_url: Some(base_url),
            ..
        } = &self.command
        {
            config.client.base_url = base_url.clone();
        }
        Ok(config)
    }
}
