//! Configuration for FitLedger
//!
//! CLI arguments and environment variable handling using clap.

use chrono::FixedOffset;
use clap::Parser;
use std::net::SocketAddr;

use crate::ledger::{DailyCaps, DayPolicy, RewardRates};

/// FitLedger - activity reward ledger service
#[derive(Parser, Debug, Clone)]
#[command(name = "fitledger")]
#[command(about = "Converts activity measurements into capped FitCoin grants")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory storage fallback, relaxed auth)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "fitledger")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT access token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// FitCoins granted per 1000 steps
    #[arg(long, env = "REWARD_PER_1000_STEPS", default_value = "10")]
    pub reward_per_1000_steps: u64,

    /// FitCoins granted per workout minute
    #[arg(long, env = "REWARD_PER_WORKOUT_MINUTE", default_value = "5")]
    pub reward_per_workout_minute: u64,

    /// Maximum FitCoins earnable from steps per calendar day
    #[arg(long, env = "MAX_DAILY_STEP_REWARDS", default_value = "100")]
    pub max_daily_step_rewards: u64,

    /// Maximum FitCoins earnable from workouts per calendar day
    #[arg(long, env = "MAX_DAILY_WORKOUT_REWARDS", default_value = "100")]
    pub max_daily_workout_rewards: u64,

    /// UTC offset in minutes defining the local calendar day
    #[arg(long, env = "UTC_OFFSET_MINUTES", default_value = "0")]
    pub utc_offset_minutes: i32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err("UTC_OFFSET_MINUTES must be within +/- 24 hours".to_string());
        }

        Ok(())
    }

    /// Per-unit reward rates from configuration
    pub fn reward_rates(&self) -> RewardRates {
        RewardRates {
            per_1000_steps: self.reward_per_1000_steps,
            per_workout_minute: self.reward_per_workout_minute,
        }
    }

    /// Per-type daily caps from configuration
    pub fn daily_caps(&self) -> DailyCaps {
        DailyCaps {
            steps: self.max_daily_step_rewards,
            workout: self.max_daily_workout_rewards,
        }
    }

    /// Day window policy from the configured offset
    pub fn day_policy(&self) -> DayPolicy {
        // Offset is validated to be within one day, so this cannot fail
        let offset = FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        DayPolicy::new(offset)
    }
}
