//! MongoDB-backed document store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    options::{ClientOptions, WriteConcern},
    Client, Collection, Database,
};
use serde::Deserialize;

use crate::config::DatabaseConfig;
use crate::store::models::{Earning, Role, User, Video, VideoQuery};
use crate::store::{DocumentStore, StoreResult};

const USERS: &str = "users";
const SESSIONS: &str = "sessions";
const VIDEOS: &str = "videos";
const EARNINGS: &str = "earnings";

#[derive(Debug, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    role: Role,
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            email: doc.email,
            name: doc.name,
            role: doc.role,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDocument {
    user_id: ObjectId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    url: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    reward_cents: i64,
    #[serde(default)]
    duration_secs: u32,
}

impl From<VideoDocument> for Video {
    fn from(doc: VideoDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            title: doc.title,
            url: doc.url,
            category: doc.category,
            reward_cents: doc.reward_cents,
            duration_secs: doc.duration_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EarningDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    user_id: ObjectId,
    video_id: ObjectId,
    amount_cents: i64,
    created_at: BsonDateTime,
}

impl From<EarningDocument> for Earning {
    fn from(doc: EarningDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            user_id: doc.user_id.to_hex(),
            video_id: doc.video_id.to_hex(),
            amount_cents: doc.amount_cents,
            created_at: DateTime::<Utc>::from_timestamp_millis(doc.created_at.timestamp_millis())
                .unwrap_or_default(),
        }
    }
}

/// Process-wide MongoDB handle.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Build the client and verify connectivity with a ping.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.server_selection_timeout =
            Some(Duration::from_millis(config.server_selection_timeout_ms));
        options.connect_timeout = Some(Duration::from_millis(config.socket_timeout_ms));
        options.retry_writes = Some(true);
        options.write_concern = Some(WriteConcern::majority());
        options.direct_connection = Some(false);

        let client = Client::with_options(options)?;
        let store = Self {
            db: client.database(&config.name),
        };
        store.ping().await?;

        tracing::info!(database = %config.name, "DB connection successful");
        Ok(store)
    }

    fn users(&self) -> Collection<UserDocument> {
        self.db.collection(USERS)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> StoreResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn find_user_by_session(&self, token_hash: &str) -> StoreResult<Option<User>> {
        let session = self
            .db
            .collection::<SessionDocument>(SESSIONS)
            .find_one(doc! {
                "tokenHash": token_hash,
                "expiresAt": { "$gt": BsonDateTime::now() },
            })
            .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        let user = self
            .users()
            .find_one(doc! { "_id": session.user_id, "active": { "$ne": false } })
            .await?;
        Ok(user.map(User::from))
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        let Ok(id) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        let user = self.users().find_one(doc! { "_id": id }).await?;
        Ok(user.map(User::from))
    }

    async fn list_videos(&self, query: &VideoQuery) -> StoreResult<Vec<Video>> {
        let mut filter = Document::new();
        if let Some(category) = &query.category {
            filter.insert("category", category.as_str());
        }

        let videos: Vec<VideoDocument> = self
            .db
            .collection::<VideoDocument>(VIDEOS)
            .find(filter)
            .sort(doc! { "_id": -1 })
            .limit(i64::from(query.effective_limit()))
            .await?
            .try_collect()
            .await?;

        Ok(videos.into_iter().map(Video::from).collect())
    }

    async fn find_video(&self, id: &str) -> StoreResult<Option<Video>> {
        let Ok(id) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        let video = self
            .db
            .collection::<VideoDocument>(VIDEOS)
            .find_one(doc! { "_id": id })
            .await?;
        Ok(video.map(Video::from))
    }

    async fn list_earnings(&self, user_id: &str) -> StoreResult<Vec<Earning>> {
        let Ok(user_id) = ObjectId::parse_str(user_id) else {
            return Ok(Vec::new());
        };

        let earnings: Vec<EarningDocument> = self
            .db
            .collection::<EarningDocument>(EARNINGS)
            .find(doc! { "userId": user_id })
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?;

        Ok(earnings.into_iter().map(Earning::from).collect())
    }
}
