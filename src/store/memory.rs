//! In-process document store.
//!
//! Backs the integration tests and local runs without a database. Ordering
//! and filtering mirror the MongoDB implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::auth::token::{generate_token, hash_token};
use crate::store::models::{Earning, User, Video, VideoQuery};
use crate::store::{DocumentStore, StoreError, StoreResult};

struct Session {
    user_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    sessions: DashMap<String, Session>,
    videos: DashMap<String, (u64, Video)>,
    earnings: DashMap<String, Earning>,
    sequence: AtomicU64,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Issue a session token valid for `ttl`. Only the digest is kept.
    pub fn create_session(&self, user_id: &str, ttl: Duration) -> String {
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            Session {
                user_id: user_id.to_string(),
                expires_at: Utc::now() + ttl,
            },
        );
        token
    }

    pub fn insert_video(&self, video: Video) {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.videos.insert(video.id.clone(), (seq, video));
    }

    pub fn insert_earning(&self, earning: Earning) {
        self.earnings.insert(earning.id.clone(), earning);
    }

    /// Make every call fail, as if the database were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }

    async fn find_user_by_session(&self, token_hash: &str) -> StoreResult<Option<User>> {
        self.check_online()?;
        let user_id = match self.sessions.get(token_hash) {
            Some(session) if session.expires_at > Utc::now() => session.user_id.clone(),
            _ => return Ok(None),
        };
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.check_online()?;
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn list_videos(&self, query: &VideoQuery) -> StoreResult<Vec<Video>> {
        self.check_online()?;
        let mut videos: Vec<(u64, Video)> = self
            .videos
            .iter()
            .filter(|entry| match &query.category {
                Some(category) => &entry.value().1.category == category,
                None => true,
            })
            .map(|entry| entry.value().clone())
            .collect();

        // newest first
        videos.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(videos
            .into_iter()
            .take(query.effective_limit() as usize)
            .map(|(_, video)| video)
            .collect())
    }

    async fn find_video(&self, id: &str) -> StoreResult<Option<Video>> {
        self.check_online()?;
        Ok(self.videos.get(id).map(|v| v.1.clone()))
    }

    async fn list_earnings(&self, user_id: &str) -> StoreResult<Vec<Earning>> {
        self.check_online()?;
        let mut earnings: Vec<Earning> = self
            .earnings
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        earnings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(earnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::Role;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: id.to_string(),
            role: Role::User,
        }
    }

    fn video(id: &str, category: &str) -> Video {
        Video {
            id: id.to_string(),
            title: id.to_uppercase(),
            url: format!("https://videos.example/{id}"),
            category: category.to_string(),
            reward_cents: 5,
            duration_secs: 30,
        }
    }

    #[tokio::test]
    async fn test_session_lookup() {
        let store = MemoryStore::new();
        store.insert_user(user("u1"));
        let token = store.create_session("u1", Duration::hours(1));

        let found = store.find_user_by_session(&hash_token(&token)).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some("u1".to_string()));

        // the raw token is never a key
        assert!(store.find_user_by_session(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_ignored() {
        let store = MemoryStore::new();
        store.insert_user(user("u1"));
        let token = store.create_session("u1", Duration::seconds(-1));
        assert!(store
            .find_user_by_session(&hash_token(&token))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_videos_filtered_newest_first() {
        let store = MemoryStore::new();
        store.insert_video(video("a", "music"));
        store.insert_video(video("b", "news"));
        store.insert_video(video("c", "music"));

        let query = VideoQuery {
            category: Some("music".to_string()),
            limit: None,
        };
        let ids: Vec<String> = store
            .list_videos(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_offline_store_errors() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
    }
}
