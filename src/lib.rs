//! # Northstar
//!
//! A goal tracking server, usable both as a standalone binary and as a
//! library. Goals live in projects, projects roll up into teams, and
//! actors are activities that unify registered users with invited ghosts.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! northstar = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use northstar::server::{AppState, create_router};
//! use northstar::store::SqliteStore;
//! use northstar::types::DeletePolicy;
//!
//! let store = SqliteStore::new("./data/northstar.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     delete_policy: DeletePolicy::Block,
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the server binary. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
