//! HTTP server for FitLedger

pub mod http;

pub use http::{run, AppState};
