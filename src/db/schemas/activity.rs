//! Activity observation document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::ledger::{ActivityRecord, ActivityType};

/// Collection name for activity observations
pub const ACTIVITY_COLLECTION: &str = "activities";

/// Raw activity observation, append-only
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActivityDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub user_id: String,

    pub activity_type: ActivityType,

    /// Raw magnitude: step count or workout minutes
    pub value: i64,

    pub recorded_at: bson::DateTime,
}

impl From<&ActivityRecord> for ActivityDoc {
    fn from(record: &ActivityRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            activity_type: record.activity_type,
            value: record.value as i64,
            recorded_at: bson::DateTime::from_chrono(record.recorded_at),
        }
    }
}

impl ActivityDoc {
    pub fn into_domain(self) -> ActivityRecord {
        ActivityRecord {
            id: self.id,
            user_id: self.user_id,
            activity_type: self.activity_type,
            value: self.value.max(0) as u64,
            recorded_at: self.recorded_at.to_chrono(),
        }
    }
}

impl IntoIndexes for ActivityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "activity_type": 1, "recorded_at": -1 },
            Some(
                IndexOptions::builder()
                    .name("user_type_recorded".to_string())
                    .build(),
            ),
        )]
    }
}
