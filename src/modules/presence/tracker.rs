//! Read side of the presence state kept in Redis. Heartbeats and the
//! online/offline writes belong to the platform's connection layer;
//! this module only consumes the keys it maintains:
//!
//! - `presence:{user_id}` -> "1" while the user is online (TTL-expired
//!   otherwise)
//! - `last_seen:{user_id}` -> RFC 3339 timestamp of the last time the
//!   user went offline

use chrono::{DateTime, Utc};
use deadpool_redis::redis;
use uuid::Uuid;

use crate::api::error;

const PRESENCE_PREFIX: &str = "presence:";
const LAST_SEEN_PREFIX: &str = "last_seen:";

#[derive(Clone)]
pub struct PresenceTracker {
    pool: deadpool_redis::Pool,
}

impl PresenceTracker {
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }

    pub async fn get_presence(
        &self,
        user_id: Uuid,
    ) -> Result<PresenceInfo, error::SystemError> {
        let mut conn = self.pool.get().await?;

        let (is_online, last_seen): (bool, Option<String>) = redis::pipe()
            .exists(format!("{PRESENCE_PREFIX}{user_id}"))
            .get(format!("{LAST_SEEN_PREFIX}{user_id}"))
            .query_async(&mut *conn)
            .await?;

        Ok(PresenceInfo::assemble(user_id, is_online, last_seen))
    }

    /// Batch lookup over a friend list. Two pipelines: EXISTS for every
    /// id, then GET last_seen only for the offline ones.
    pub async fn get_presence_batch(
        &self,
        user_ids: &[Uuid],
    ) -> Result<Vec<PresenceInfo>, error::SystemError> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.pool.get().await?;

        let mut pipe = redis::pipe();
        for user_id in user_ids {
            pipe.exists(format!("{PRESENCE_PREFIX}{user_id}"));
        }
        let online_flags: Vec<bool> = pipe.query_async(&mut *conn).await?;

        let offline_indices: Vec<usize> = online_flags
            .iter()
            .enumerate()
            .filter(|(_, &is_online)| !is_online)
            .map(|(i, _)| i)
            .collect();

        let last_seens: Vec<Option<String>> = if !offline_indices.is_empty() {
            let mut ls_pipe = redis::pipe();
            for &idx in &offline_indices {
                ls_pipe.get(format!("{LAST_SEEN_PREFIX}{}", user_ids[idx]));
            }
            ls_pipe.query_async(&mut *conn).await?
        } else {
            vec![]
        };

        let mut results = Vec::with_capacity(user_ids.len());
        let mut ls_idx = 0;

        for (i, user_id) in user_ids.iter().enumerate() {
            let is_online = online_flags[i];
            let last_seen = if !is_online && ls_idx < last_seens.len() {
                let ls = last_seens[ls_idx].clone();
                ls_idx += 1;
                ls
            } else {
                None
            };

            results.push(PresenceInfo::assemble(*user_id, is_online, last_seen));
        }

        Ok(results)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceInfo {
    pub user_id: Uuid,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    /// Human label for the offline case ("just now", "5m ago", ...).
    pub last_seen_label: Option<String>,
}

impl PresenceInfo {
    fn assemble(user_id: Uuid, is_online: bool, last_seen: Option<String>) -> Self {
        let last_seen = if is_online {
            None
        } else {
            last_seen
                .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
                .map(|ts| ts.with_timezone(&Utc))
        };

        let last_seen_label =
            last_seen.map(|ts| format_last_seen(ts, Utc::now()));

        PresenceInfo { user_id, is_online, last_seen, last_seen_label }
    }
}

/// Relative label for an offline user's last activity.
pub fn format_last_seen(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(last_seen);

    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        last_seen.format("%Y-%m-%d").to_string()
    }
}
