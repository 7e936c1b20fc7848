//! User document schema
//!
//! Stores credentials for the local auth boundary. The ledger core only
//! ever sees the opaque user id carried in JWT claims.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// Opaque user id (uuid string), also the JWT subject
    #[serde(rename = "_id")]
    pub id: String,

    /// Display name, unique per user
    pub nickname: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Whether the user account is active
    #[serde(default = "default_true")]
    pub is_active: bool,

    pub created_at: DateTime,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new user document
    pub fn new(nickname: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            nickname,
            password_hash,
            is_active: true,
            created_at: DateTime::now(),
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "nickname": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("nickname_unique".to_string())
                    .build(),
            ),
        )]
    }
}
