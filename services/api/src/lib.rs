//! Tree Lives API service
//!
//! HTTP surface for identities and environmental alerts. The binary in
//! `main.rs` wires configuration into [`AppState`] and serves
//! [`create_router`]; integration tests build the same router over the
//! in-memory backends.

pub mod config;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod revocation;
pub mod routes;
pub mod state;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;
