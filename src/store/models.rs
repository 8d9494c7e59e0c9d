//! Domain records returned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// The authenticated identity attached to protected requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub url: String,
    pub category: String,
    pub reward_cents: i64,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Earning {
    pub id: String,
    pub user_id: String,
    pub video_id: String,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_VIDEO_LIMIT: u32 = 20;
pub const MAX_VIDEO_LIMIT: u32 = 100;

/// Filters accepted by `GET /videos`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VideoQuery {
    pub category: Option<String>,
    pub limit: Option<u32>,
}

impl VideoQuery {
    /// Requested limit clamped to `1..=MAX_VIDEO_LIMIT`.
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_VIDEO_LIMIT)
            .clamp(1, MAX_VIDEO_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamped() {
        assert_eq!(VideoQuery::default().effective_limit(), 20);
        let q = VideoQuery { category: None, limit: Some(0) };
        assert_eq!(q.effective_limit(), 1);
        let q = VideoQuery { category: None, limit: Some(5000) };
        assert_eq!(q.effective_limit(), 100);
    }
}
