//! MongoDB-backed ledger store
//!
//! Sums run as aggregation pipelines over the indexed collections; the
//! dual append runs inside a client-session transaction so the observation
//! and the grant commit together or not at all.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures_util::StreamExt;
use mongodb::options::FindOptions;
use mongodb::ClientSession;
use tracing::error;

use super::{ActivityRecord, ActivityType, DayWindow, LedgerStore, RewardGrant, RewardPage};
use crate::db::schemas::{ActivityDoc, AssetDoc, ACTIVITY_COLLECTION, ASSET_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{LedgerError, Result};

/// Ledger store persisting to the `activities` and `assets` collections
pub struct MongoLedgerStore {
    client: MongoClient,
    activities: MongoCollection<ActivityDoc>,
    assets: MongoCollection<AssetDoc>,
}

impl MongoLedgerStore {
    /// Create the store and ensure collection indexes exist
    pub async fn new(client: MongoClient) -> Result<Self> {
        let activities = client.collection::<ActivityDoc>(ACTIVITY_COLLECTION).await?;
        let assets = client.collection::<AssetDoc>(ASSET_COLLECTION).await?;

        Ok(Self {
            client,
            activities,
            assets,
        })
    }

    /// Sum a numeric field over documents matching the filter
    async fn sum_field(
        &self,
        collection_name: &str,
        filter: Document,
        field: &str,
    ) -> Result<u64> {
        let collection = self
            .client
            .inner()
            .database(self.client.db_name())
            .collection::<Document>(collection_name);

        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$group": { "_id": null, "total": { "$sum": format!("${}", field) } } },
        ];

        let mut cursor = collection
            .aggregate(pipeline)
            .await
            .map_err(|e| LedgerError::Storage(format!("Aggregation failed: {}", e)))?;

        match cursor.next().await {
            Some(Ok(result)) => Ok(bson_total(result.get("total"))),
            Some(Err(e)) => Err(LedgerError::Storage(format!("Aggregation read failed: {}", e))),
            // No matching documents: the group stage emits nothing
            None => Ok(0),
        }
    }

    async fn append_in_session(
        &self,
        session: &mut ClientSession,
        activity: &ActivityRecord,
        grant: Option<&RewardGrant>,
    ) -> Result<()> {
        self.activities
            .inner()
            .insert_one(ActivityDoc::from(activity))
            .session(&mut *session)
            .await
            .map_err(|e| LedgerError::Storage(format!("Activity insert failed: {}", e)))?;

        if let Some(grant) = grant {
            self.assets
                .inner()
                .insert_one(AssetDoc::from(grant))
                .session(session)
                .await
                .map_err(|e| LedgerError::Storage(format!("Grant insert failed: {}", e)))?;
        }

        Ok(())
    }
}

/// Build a filter over a user, an optional activity type, and a timestamp
/// window on the given field
fn window_filter(
    user_id: &str,
    activity: Option<ActivityType>,
    field: &str,
    window: &DayWindow,
) -> Document {
    let mut filter = doc! { "user_id": user_id };
    if let Some(activity) = activity {
        filter.insert("activity_type", activity.as_str());
    }
    filter.insert(
        field,
        doc! {
            "$gte": bson::DateTime::from_chrono(window.start),
            "$lt": bson::DateTime::from_chrono(window.end),
        },
    );
    filter
}

/// Extract the `$sum` result, tolerating the integer width Mongo picked
fn bson_total(value: Option<&Bson>) -> u64 {
    match value {
        Some(Bson::Int64(v)) => (*v).max(0) as u64,
        Some(Bson::Int32(v)) => (*v).max(0) as u64,
        Some(Bson::Double(v)) => v.max(0.0) as u64,
        _ => 0,
    }
}

#[async_trait]
impl LedgerStore for MongoLedgerStore {
    async fn sum_rewards_in_window(
        &self,
        user_id: &str,
        activity: Option<ActivityType>,
        window: &DayWindow,
    ) -> Result<u64> {
        let filter = window_filter(user_id, activity, "granted_at", window);
        self.sum_field(ASSET_COLLECTION, filter, "amount").await
    }

    async fn sum_activity_in_window(
        &self,
        user_id: &str,
        activity: ActivityType,
        window: &DayWindow,
    ) -> Result<u64> {
        let filter = window_filter(user_id, Some(activity), "recorded_at", window);
        self.sum_field(ACTIVITY_COLLECTION, filter, "value").await
    }

    async fn total_rewards(&self, user_id: &str) -> Result<u64> {
        self.sum_field(ASSET_COLLECTION, doc! { "user_id": user_id }, "amount")
            .await
    }

    async fn append(&self, activity: ActivityRecord, grant: Option<RewardGrant>) -> Result<()> {
        let mut session = self
            .client
            .inner()
            .start_session()
            .await
            .map_err(|e| LedgerError::Storage(format!("Failed to start session: {}", e)))?;

        session
            .start_transaction()
            .await
            .map_err(|e| LedgerError::Storage(format!("Failed to start transaction: {}", e)))?;

        match self
            .append_in_session(&mut session, &activity, grant.as_ref())
            .await
        {
            Ok(()) => session
                .commit_transaction()
                .await
                .map_err(|e| LedgerError::Storage(format!("Commit failed: {}", e))),
            Err(e) => {
                // Roll back so neither record becomes visible
                if let Err(abort_err) = session.abort_transaction().await {
                    error!("Transaction abort failed: {}", abort_err);
                }
                Err(e)
            }
        }
    }

    async fn reward_history(&self, user_id: &str, skip: u64, limit: u64) -> Result<RewardPage> {
        let filter = doc! { "user_id": user_id };

        let total = self
            .assets
            .inner()
            .count_documents(filter.clone())
            .await
            .map_err(|e| LedgerError::Storage(format!("Count failed: {}", e)))?;

        let options = FindOptions::builder()
            .sort(doc! { "granted_at": -1 })
            .skip(skip)
            .limit(limit.min(i64::MAX as u64) as i64)
            .build();

        let cursor = self
            .assets
            .inner()
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| LedgerError::Storage(format!("History query failed: {}", e)))?;

        let items: Vec<RewardGrant> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d.into_domain()),
                    Err(e) => {
                        error!("Error reading grant document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(RewardPage { items, total })
    }
}
