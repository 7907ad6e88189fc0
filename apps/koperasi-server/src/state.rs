//! Shared application state.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AppState (cloned into every handler)                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────────┐       │
//! │  │  Database    │  │  ServerConfig    │  │  SessionManager      │       │
//! │  │  (SQLite     │  │  (read-only      │  │  (signing keys)      │       │
//! │  │   pool)      │  │   after start)   │  │                      │       │
//! │  └──────────────┘  └──────────────────┘  └──────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use koperasi_core::period::{DateRange, PeriodFilter};
use koperasi_db::Database;

use crate::config::ServerConfig;
use crate::error::ApiResult;
use crate::session::SessionManager;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let sessions = SessionManager::from_config(&config);
        AppState {
            db,
            config: Arc::new(config),
            sessions: Arc::new(sessions),
        }
    }

    /// Resolves a period against the store's local clock.
    pub fn resolve(&self, filter: PeriodFilter) -> ApiResult<DateRange> {
        Ok(filter.resolve(Utc::now(), self.config.utc_offset)?)
    }
}
