//! # Koperasi Server
//!
//! JSON API for the cooperative store admin UI.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Koperasi Server                                │
//! │                                                                         │
//! │  request ──► TraceLayer ──► /api router                                 │
//! │                               │                                         │
//! │              login, health ◄──┤ public                                  │
//! │                               ▼                                         │
//! │                         require_auth      cookie/Bearer → CurrentUser   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                         require_module    Role::modules() gate          │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                           handler ──► koperasi-db ──► SQLite            │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                     Json<T> or ApiError { code, message, details }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`]: environment configuration
//! - [`session`]: signed session token and cookie
//! - [`auth`]: session and role middleware, [`auth::CurrentUser`]
//! - [`routes`]: one router per domain
//! - [`error`]: error body and status mapping

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;
