use clap::Parser;
use std::sync::Arc;
use workshop_hub::adapters::{LocalObjectStorage, SqliteWorkshopStore};
use workshop_hub::config::{Command, HubConfig};
use workshop_hub::domain::model::Workshop;
use workshop_hub::domain::ports::WorkshopStore;
use workshop_hub::utils::error::{ErrorSeverity, HubError};
use workshop_hub::utils::{logger, validation::Validate};
use workshop_hub::{
    ActionCoordinator, ClientState, CliConfig, SearchService, SessionStore,
    WorkshopProfileService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match cli.load_hub_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.logging.json {
        logger::init_json_logger(config.logging.verbose);
    } else {
        logger::init_cli_logger(config.logging.verbose);
    }

    tracing::info!("Starting workshop-hub CLI");
    tracing::debug!("Hub config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!("❌ Command failed: {} (Severity: {:?})", e, e.severity());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,      // 查無資料或參數錯誤
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run(command: Command, config: &HubConfig) -> Result<(), HubError> {
    match command {
        Command::Search(filter) => {
            let store: Arc<dyn WorkshopStore> =
                Arc::new(SqliteWorkshopStore::new(&config.server.database_path)?);
            let catalog = Arc::new(config.server.load_lookups()?);
            let service = SearchService::new(store, catalog);

            let response = service.search_filter(&filter.to_filter()).await?;
            tracing::info!(
                "✅ Found {} workshops ({} on this page)",
                response.count,
                response.workshops.len()
            );
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Import { file } => {
            let content = std::fs::read_to_string(&file)?;
            let workshops: Vec<Workshop> = serde_json::from_str(&content)?;
            let store = SqliteWorkshopStore::new(&config.server.database_path)?;

            let total = workshops.len();
            for workshop in workshops {
                store.insert(workshop).await?;
            }
            tracing::info!("✅ Imported {} workshops from {}", total, file);
            println!("✅ Imported {} workshops", total);
        }
        Command::Count => {
            let store: Arc<dyn WorkshopStore> =
                Arc::new(SqliteWorkshopStore::new(&config.server.database_path)?);
            let objects = LocalObjectStorage::new(
                config.server.photo_dir.clone(),
                config.server.photo_base_url.clone(),
            );
            let service = WorkshopProfileService::new(store, objects);
            println!("{}", service.count_workshops().await?);
        }
        Command::RemoteSearch { filter, .. } => {
            let session = Arc::new(match &config.client.cookie {
                Some(cookie) => SessionStore::with_cookie(cookie.clone()),
                None => SessionStore::new(),
            });
            let coordinator =
                ActionCoordinator::new(&config.client, session, Arc::new(ClientState::new()))?;

            tracing::info!("📡 Searching {}", config.client.base_url);
            let response = coordinator.search_workshops(&filter.to_filter()).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}
