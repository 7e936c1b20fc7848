//! Reward grant document schema
//!
//! The ledger entries backing every earned-total query. The activity type
//! is an explicit field; the reason text is descriptive only and is never
//! parsed to recover the type.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::ledger::{ActivityType, RewardGrant};

/// Collection name for reward grants
pub const ASSET_COLLECTION: &str = "assets";

/// Immutable reward grant, append-only
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AssetDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub user_id: String,

    pub activity_type: ActivityType,

    pub amount: i64,

    /// Human-readable description, e.g. "Walked 5000 steps"
    pub reason: String,

    pub granted_at: bson::DateTime,
}

impl From<&RewardGrant> for AssetDoc {
    fn from(grant: &RewardGrant) -> Self {
        Self {
            id: grant.id.clone(),
            user_id: grant.user_id.clone(),
            activity_type: grant.activity_type,
            amount: grant.amount as i64,
            reason: grant.reason.clone(),
            granted_at: bson::DateTime::from_chrono(grant.granted_at),
        }
    }
}

impl AssetDoc {
    pub fn into_domain(self) -> RewardGrant {
        RewardGrant {
            id: self.id,
            user_id: self.user_id,
            activity_type: self.activity_type,
            amount: self.amount.max(0) as u64,
            reason: self.reason,
            granted_at: self.granted_at.to_chrono(),
        }
    }
}

impl IntoIndexes for AssetDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // History queries: newest first per user
            (
                doc! { "user_id": 1, "granted_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_granted".to_string())
                        .build(),
                ),
            ),
            // Daily cap reads: per user, per type, within a day range
            (
                doc! { "user_id": 1, "activity_type": 1, "granted_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_type_granted".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
