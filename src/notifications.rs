use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::store::{persist_json, Applied, BlobStore, NOTIFICATIONS_KEY, PROFILE_KEY};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub uid: String,
    pub name: String,
    pub avatar_url: String,
}

/// Broadcast announcement. Never mutated after creation; per-user read state
/// lives on the profile, not here, so deleting one cascades nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author: Author,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub display_name: String,
    pub branch: String,
    pub read_notification_ids: BTreeSet<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            display_name: "Öğretmen".to_string(),
            branch: String::new(),
            read_notification_ids: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("notification not found")]
    NotFound,
}

pub struct NotificationLoadOutcome {
    pub store: NotificationStore,
    pub warnings: Vec<String>,
}

pub struct NotificationStore {
    notifications: Vec<Notification>,
    profile: Profile,
}

impl NotificationStore {
    pub fn load(blob: &dyn BlobStore) -> NotificationLoadOutcome {
        let mut warnings = Vec::new();

        let notifications = match blob.read(NOTIFICATIONS_KEY) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warnings.push(format!("notifications corrupt, starting empty: {}", e));
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warnings.push(format!("notifications unreadable, starting empty: {}", e));
                Vec::new()
            }
        };

        let profile = match blob.read(PROFILE_KEY) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warnings.push(format!("profile corrupt, using defaults: {}", e));
                    Profile::default()
                }
            },
            Ok(None) => Profile::default(),
            Err(e) => {
                warnings.push(format!("profile unreadable, using defaults: {}", e));
                Profile::default()
            }
        };

        NotificationLoadOutcome {
            store: Self {
                notifications,
                profile,
            },
            warnings,
        }
    }

    fn persist_notifications(&self, blob: &dyn BlobStore) -> Option<String> {
        persist_json(blob, NOTIFICATIONS_KEY, &self.notifications, "notifications")
    }

    fn persist_profile(&self, blob: &dyn BlobStore) -> Option<String> {
        persist_json(blob, PROFILE_KEY, &self.profile, "profile")
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn update_profile(
        &mut self,
        blob: &dyn BlobStore,
        display_name: Option<&str>,
        branch: Option<&str>,
    ) -> Applied<Profile> {
        if let Some(name) = display_name {
            self.profile.display_name = name.trim().to_string();
        }
        if let Some(branch) = branch {
            self.profile.branch = branch.trim().to_string();
        }
        Applied {
            value: self.profile.clone(),
            persist_warning: self.persist_profile(blob),
        }
    }

    /// Read state is a join computed here, never stored on the notification.
    pub fn is_read(&self, notification_id: &str) -> bool {
        self.profile.read_notification_ids.contains(notification_id)
    }

    /// Notifications newest first, each with its per-user read flag.
    /// RFC 3339 timestamps sort lexicographically, so string order is time
    /// order.
    pub fn list(&self) -> Vec<(&Notification, bool)> {
        let mut rows: Vec<&Notification> = self.notifications.iter().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.into_iter().map(|n| (n, self.is_read(&n.id))).collect()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| !self.is_read(&n.id))
            .count()
    }

    pub fn create(
        &mut self,
        blob: &dyn BlobStore,
        title: &str,
        body: &str,
    ) -> Result<Applied<Notification>, NotificationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(NotificationError::EmptyTitle);
        }
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            body: body.trim().to_string(),
            author: Author {
                uid: "local".to_string(),
                name: self.profile.display_name.clone(),
                avatar_url: String::new(),
            },
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.notifications.push(notification.clone());
        Ok(Applied {
            value: notification,
            persist_warning: self.persist_notifications(blob),
        })
    }

    pub fn delete(
        &mut self,
        blob: &dyn BlobStore,
        id: &str,
    ) -> Result<Applied<Notification>, NotificationError> {
        let pos = self
            .notifications
            .iter()
            .position(|n| n.id == id)
            .ok_or(NotificationError::NotFound)?;
        let removed = self.notifications.remove(pos);
        Ok(Applied {
            value: removed,
            persist_warning: self.persist_notifications(blob),
        })
    }

    /// Union the ids into the read set. Idempotent: overlapping or repeated
    /// calls are absorbed, and a call that adds nothing skips the write.
    pub fn mark_read(&mut self, blob: &dyn BlobStore, ids: &[String]) -> Applied<usize> {
        let mut newly_read = 0usize;
        for id in ids {
            if self.profile.read_notification_ids.insert(id.clone()) {
                newly_read += 1;
            }
        }
        if newly_read == 0 {
            return Applied {
                value: 0,
                persist_warning: None,
            };
        }
        Applied {
            value: newly_read,
            persist_warning: self.persist_profile(blob),
        }
    }
}
