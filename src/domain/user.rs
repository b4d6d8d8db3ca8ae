use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Activity type labels written to the activity log.
pub mod activity_types {
    pub const REGISTRATION: &str = "registration";
    pub const LOGIN: &str = "login";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
    pub const SUSPENDED: &str = "suspended";
    pub const REACTIVATED: &str = "reactivated";
    pub const ROLE_CHANGED: &str = "role_changed";
    pub const USER_DELETED: &str = "user_deleted";
    pub const MANUALLY_CREATED: &str = "manually_created";
    pub const LESSON_COMPLETED: &str = "lesson_completed";
    pub const RESOURCE_DOWNLOADED: &str = "resource_downloaded";
}

/// Authorization role of a profile. Independent of [`AccountStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Moderator,
    #[default]
    User,
    Viewer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Convert from database string representation
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "super_admin" => Some(Self::SuperAdmin),
            "admin" => Some(Self::Admin),
            "moderator" => Some(Self::Moderator),
            "user" => Some(Self::User),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::User => "user",
            Self::Viewer => "viewer",
        }
    }
}

/// Account lifecycle status.
///
/// ```text
/// pending --approve--> active --suspend--> suspended
///    |                   ^                     |
///    +--reject--> inactive +----reactivate-----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Pending,
    Active,
    Suspended,
    Inactive,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AccountStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Active, Self::Suspended, Self::Inactive];

    /// Convert from database string representation
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Inactive => "inactive",
        }
    }

    /// Resolve what `action` does to an account in this status.
    ///
    /// Returns `None` when the action is not a legal transition from here.
    pub fn apply(self, action: StatusAction) -> Option<StatusChange> {
        if self == action.target() {
            Some(StatusChange::Unchanged)
        } else if self == action.source() {
            Some(StatusChange::To(action.target()))
        } else {
            None
        }
    }
}

/// Admin-triggered status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Approve,
    Reject,
    Suspend,
    Reactivate,
}

impl StatusAction {
    pub const fn source(self) -> AccountStatus {
        match self {
            Self::Approve | Self::Reject => AccountStatus::Pending,
            Self::Suspend => AccountStatus::Active,
            Self::Reactivate => AccountStatus::Suspended,
        }
    }

    pub const fn target(self) -> AccountStatus {
        match self {
            Self::Approve | Self::Reactivate => AccountStatus::Active,
            Self::Reject => AccountStatus::Inactive,
            Self::Suspend => AccountStatus::Suspended,
        }
    }

    pub const fn verb(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Suspend => "suspend",
            Self::Reactivate => "reactivate",
        }
    }

    pub const fn activity_type(self) -> &'static str {
        match self {
            Self::Approve => activity_types::APPROVED,
            Self::Reject => activity_types::REJECTED,
            Self::Suspend => activity_types::SUSPENDED,
            Self::Reactivate => activity_types::REACTIVATED,
        }
    }
}

/// Outcome of resolving a [`StatusAction`] against the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    To(AccountStatus),
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub email_verified: bool,
    pub profile_complete: bool,
    pub login_count: u32,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub suspension_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Display name: full name when present, otherwise the local part of the email.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or(&self.email))
    }
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub suspension_reason: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: i32,
    pub user_id: Uuid,
    pub activity_type: String,
    pub description: String,
    pub resource_id: Option<i32>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// An activity log entry about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub activity_type: String,
    pub description: String,
    pub resource_id: Option<i32>,
    pub details: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(user_id: Uuid, activity_type: &str, description: impl Into<String>) -> Self {
        Self {
            user_id,
            activity_type: activity_type.to_string(),
            description: description.into(),
            resource_id: None,
            details: None,
        }
    }

    #[must_use]
    pub const fn with_resource(mut self, resource_id: i32) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Activity log read, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub user_id: Option<Uuid>,
    pub activity_type: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    pub total: u64,
    pub active: u64,
    pub pending: u64,
    pub suspended: u64,
    pub inactive: u64,
    pub total_logins: u64,
    pub users_today: u64,
}

impl UserStatistics {
    /// Reduce a full profile set locally. `users_today` counts profiles created on `today` (UTC).
    pub fn from_profiles(profiles: &[UserProfile], today: NaiveDate) -> Self {
        profiles.iter().fold(Self::default(), |mut stats, profile| {
            stats.total += 1;
            match profile.status {
                AccountStatus::Pending => stats.pending += 1,
                AccountStatus::Active => stats.active += 1,
                AccountStatus::Suspended => stats.suspended += 1,
                AccountStatus::Inactive => stats.inactive += 1,
            }
            stats.total_logins += u64::from(profile.login_count);
            if profile.created_at.date_naive() == today {
                stats.users_today += 1;
            }
            stats
        })
    }
}

/// A learner's progress, derived from the activity log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub completed_lessons: Vec<i32>,
    pub downloaded_resources: Vec<i32>,
    pub total_activities: usize,
}

impl UserProgress {
    /// Derive progress from a user's activity log. Repeated events count once.
    pub fn from_activities(entries: &[ActivityLogEntry]) -> Self {
        let mut completed = BTreeSet::new();
        let mut downloaded = BTreeSet::new();
        for entry in entries {
            let Some(resource_id) = entry.resource_id else {
                continue;
            };
            match entry.activity_type.as_str() {
                activity_types::LESSON_COMPLETED => {
                    completed.insert(resource_id);
                }
                activity_types::RESOURCE_DOWNLOADED => {
                    downloaded.insert(resource_id);
                }
                _ => {}
            }
        }
        Self {
            completed_lessons: completed.into_iter().collect(),
            downloaded_resources: downloaded.into_iter().collect(),
            total_activities: entries.len(),
        }
    }
}
