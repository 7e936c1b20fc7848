//! FitLedger - activity reward ledger
//!
//! Converts raw activity measurements (step counts, workout minutes) into
//! capped FitCoin grants, with a race-free daily cap per user and activity
//! type, atomic persistence of observation plus grant, and read-side
//! aggregates served from the same ledger.

pub mod auth;
pub mod config;
pub mod db;
pub mod ledger;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{LedgerError, Result};
