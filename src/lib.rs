pub mod adapters;
pub mod client;
pub mod config;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use client::{ActionCoordinator, ActionScope, ClientState, SessionStore, TokenRefresher};
pub use config::HubConfig;
pub use server::{PaginationEngine, SearchQueryBuilder, SearchService, WorkshopProfileService};
pub use utils::error::{HubError, Result};
