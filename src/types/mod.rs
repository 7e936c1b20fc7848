//! Shared types for FitLedger

pub mod error;

pub use error::{LedgerError, Result};
