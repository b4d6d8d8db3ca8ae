use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::password;
use crate::config::{Config, DEFAULT_SUPER_ADMIN_EMAIL};
use crate::domain::{
    AccountStatus, ActivityLogEntry, ActivityQuery, NewActivity, ProfileUpdate, Role,
    StatusAction, StatusChange, UserProfile, UserStatistics, activity_types,
};
use crate::error::ServiceError;
use crate::provider::{AuthUser, Provider, ProviderError, SignUpMetadata};
use crate::sessions::{Session, SessionStore, SessionUser};

/// Activity reads return at most this many entries unless asked for fewer.
pub const DEFAULT_ACTIVITY_LIMIT: u64 = 100;
pub const MAX_ACTIVITY_LIMIT: u64 = 1000;

/// How new accounts are classified at sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPolicy {
    /// The one address that becomes the super-admin. Stored lowercase.
    pub super_admin_email: String,
    pub auto_approve: bool,
    pub default_role: Role,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            super_admin_email: DEFAULT_SUPER_ADMIN_EMAIL.to_string(),
            auto_approve: false,
            default_role: Role::User,
        }
    }
}

impl RegistrationPolicy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            super_admin_email: config.super_admin_email.to_lowercase(),
            auto_approve: config.auto_approve_users,
            default_role: config.default_user_role,
        }
    }

    #[must_use]
    pub fn is_super_admin_email(&self, email: &str) -> bool {
        email.trim().eq_ignore_ascii_case(&self.super_admin_email)
    }

    fn metadata_for(&self, email: &str, full_name: Option<&str>) -> SignUpMetadata {
        let full_name = full_name.map(ToString::to_string);
        if self.is_super_admin_email(email) {
            return SignUpMetadata {
                role: Role::SuperAdmin,
                status: AccountStatus::Active,
                full_name,
                is_super_admin: true,
            };
        }
        SignUpMetadata {
            role: self.default_role,
            status: if self.auto_approve {
                AccountStatus::Active
            } else {
                AccountStatus::Pending
            },
            full_name,
            is_super_admin: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub profile: UserProfile,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SignInOutcome {
    pub session: Arc<Session>,
    pub user: AuthUser,
    pub profile: UserProfile,
    pub is_super_admin: bool,
    pub message: String,
}

/// Result of an admin mutation. `changed` is false for idempotent no-ops.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub profile: UserProfile,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user: AuthUser,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserExport {
    pub exported_at: DateTime<Utc>,
    pub total: usize,
    pub users: Vec<UserProfile>,
}

/// Input for an account created by the super-admin.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

/// Every valid user state transition, plus sign-in/out and admin reporting.
pub struct LifecycleService {
    provider: Arc<dyn Provider>,
    sessions: SessionStore,
    policy: RegistrationPolicy,
}

impl LifecycleService {
    #[must_use]
    pub fn new(
        provider: Arc<dyn Provider>,
        sessions: SessionStore,
        policy: RegistrationPolicy,
    ) -> Self {
        Self {
            provider,
            sessions,
            policy,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &RegistrationPolicy {
        &self.policy
    }

    // ── Authentication ──────────────────────────────────────────────────────

    /// Register a new identity. Ordinary accounts start `pending` unless auto-approval is on.
    ///
    /// # Errors
    ///
    /// `Auth` with the provider's message when the credentials are refused.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, ServiceError> {
        let email = password::normalize_email(email);
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());
        let metadata = self.policy.metadata_for(&email, full_name);

        let user = self
            .provider
            .sign_up(&email, password, &metadata)
            .await
            .map_err(auth_failure)?;
        let profile = self.require_profile(user.id).await?;

        self.log(
            NewActivity::new(user.id, activity_types::REGISTRATION, "Account registered")
                .with_details(json!({ "role": profile.role, "status": profile.status })),
        )
        .await;
        tracing::info!(user_id = %user.id, status = %profile.status, "user registered");

        let message = if metadata.is_super_admin {
            "Super admin account created successfully!".to_string()
        } else if metadata.approved() {
            "Account created successfully! You can now sign in.".to_string()
        } else {
            "Account created successfully! Please wait for admin approval before signing in."
                .to_string()
        };

        Ok(SignUpOutcome {
            user,
            profile,
            message,
        })
    }

    /// Verify credentials and open a session. Only active accounts (or the super-admin) get in.
    ///
    /// # Errors
    ///
    /// `Auth` for bad credentials or an inactive account, `ProfileNotFound` when the
    /// identity has no profile row.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInOutcome, ServiceError> {
        let email = password::normalize_email(email);
        let user = self
            .provider
            .sign_in(&email, password)
            .await
            .map_err(auth_failure)?;

        let profile = match self.provider.find_profile(user.id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::error!(user_id = %user.id, "authenticated identity has no profile");
                self.provider_sign_out(user.id).await;
                return Err(ServiceError::ProfileNotFound);
            }
            Err(e) => {
                self.provider_sign_out(user.id).await;
                return Err(e.into());
            }
        };

        let is_super_admin =
            profile.role == Role::SuperAdmin || self.policy.is_super_admin_email(&profile.email);

        if profile.status != AccountStatus::Active && !is_super_admin {
            self.provider_sign_out(user.id).await;
            tracing::info!(user_id = %user.id, status = %profile.status, "sign-in refused");
            return Err(ServiceError::Auth(inactive_message(profile.status)));
        }

        let profile = match self.provider.record_login(user.id).await {
            Ok(profile) => profile,
            Err(e) => {
                self.provider_sign_out(user.id).await;
                return Err(e.into());
            }
        };

        self.log(NewActivity::new(user.id, activity_types::LOGIN, "Signed in")).await;

        let session = self.sessions.create(SessionUser {
            user_id: user.id,
            email: profile.email.clone(),
            role: profile.role,
            is_super_admin,
        });
        tracing::info!(user_id = %user.id, login_count = profile.login_count, "user signed in");

        Ok(SignInOutcome {
            session,
            user,
            profile,
            is_super_admin,
            message: "Login successful!".to_string(),
        })
    }

    /// Close a session. Always succeeds; provider failures are only logged.
    pub async fn sign_out(&self, token: Uuid) -> bool {
        if let Some(session) = self.sessions.remove(token) {
            self.provider_sign_out(session.user_id).await;
            tracing::info!(user_id = %session.user_id, "user signed out");
        }
        true
    }

    /// The identity behind a session with its current profile.
    ///
    /// # Errors
    ///
    /// `Auth` when the identity is gone, `ProfileNotFound` when its profile is.
    pub async fn current_user(&self, user_id: Uuid) -> Result<CurrentUser, ServiceError> {
        let user = self
            .provider
            .current_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::Auth("User no longer exists".to_string()))?;
        let profile = self.require_profile(user_id).await?;
        Ok(CurrentUser { user, profile })
    }

    // ── Status transitions ──────────────────────────────────────────────────

    /// `pending -> active`.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn approve(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.transition(actor_id, user_id, StatusAction::Approve, None).await
    }

    /// `pending -> inactive`.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn reject(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.transition(actor_id, user_id, StatusAction::Reject, None).await
    }

    /// `active -> suspended`, keeping the reason on the profile.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn suspend(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        reason: Option<&str>,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.transition(actor_id, user_id, StatusAction::Suspend, reason)
            .await
    }

    /// `suspended -> active`. Clears the suspension reason.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn reactivate(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.transition(actor_id, user_id, StatusAction::Reactivate, None)
            .await
    }

    /// Apply `action` to `user_id`. Repeating an already-applied action is a no-op success.
    ///
    /// # Errors
    ///
    /// - `ProfileNotFound` for an unknown user
    /// - `Permission` when suspending or rejecting the super-admin
    /// - `InvalidTransition` when the current status does not allow `action`
    /// - `Provider` when the update fails; nothing is logged in that case
    pub async fn transition(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        action: StatusAction,
        reason: Option<&str>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let profile = self.require_profile(user_id).await?;

        if self.is_protected(&profile)
            && matches!(action, StatusAction::Suspend | StatusAction::Reject)
        {
            return Err(ServiceError::Permission(format!(
                "The super admin account cannot be {}",
                past_tense(action)
            )));
        }

        let next = match profile.status.apply(action) {
            Some(StatusChange::To(next)) => next,
            Some(StatusChange::Unchanged) => {
                tracing::debug!(%user_id, action = action.verb(), "transition already applied");
                return Ok(TransitionOutcome {
                    profile,
                    changed: false,
                });
            }
            None => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Cannot {} a user whose status is {}",
                    action.verb(),
                    profile.status
                )));
            }
        };

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let suspension_reason = match action {
            StatusAction::Suspend => Some(reason.map(ToString::to_string)),
            StatusAction::Reactivate => Some(None),
            StatusAction::Approve | StatusAction::Reject => None,
        };
        let update = ProfileUpdate {
            status: Some(next),
            suspension_reason,
            ..ProfileUpdate::default()
        };
        let updated = self.provider.update_profile(user_id, &update).await?;

        if next != AccountStatus::Active {
            self.sessions.revoke_user(user_id);
        }

        let mut details = json!({
            "target_user_id": user_id,
            "target_email": updated.email,
            "from": profile.status,
            "to": next,
        });
        if let Some(reason) = reason {
            details["reason"] = json!(reason);
        }
        self.log(
            NewActivity::new(
                actor_id,
                action.activity_type(),
                format!("User {} {}", updated.display_name(), past_tense(action)),
            )
            .with_details(details),
        )
        .await;
        tracing::info!(%actor_id, %user_id, from = %profile.status, to = %next, "status changed");

        Ok(TransitionOutcome {
            profile: updated,
            changed: true,
        })
    }

    /// Change a user's role. Status is never touched.
    ///
    /// # Errors
    ///
    /// `Permission` when targeting the super-admin or assigning `super_admin`,
    /// `ProfileNotFound` for an unknown user.
    pub async fn update_role(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<TransitionOutcome, ServiceError> {
        if role == Role::SuperAdmin {
            return Err(ServiceError::Permission(
                "The super_admin role cannot be assigned".to_string(),
            ));
        }
        let profile = self.require_profile(user_id).await?;
        if self.is_protected(&profile) {
            return Err(ServiceError::Permission(
                "The super admin's role cannot be changed".to_string(),
            ));
        }
        if profile.role == role {
            return Ok(TransitionOutcome {
                profile,
                changed: false,
            });
        }

        let update = ProfileUpdate {
            role: Some(role),
            ..ProfileUpdate::default()
        };
        let updated = self.provider.update_profile(user_id, &update).await?;

        self.log(
            NewActivity::new(
                actor_id,
                activity_types::ROLE_CHANGED,
                format!("Role of {} changed to {role}", updated.display_name()),
            )
            .with_details(json!({
                "target_user_id": user_id,
                "from": profile.role,
                "to": role,
            })),
        )
        .await;
        tracing::info!(%actor_id, %user_id, from = %profile.role, to = %role, "role changed");

        Ok(TransitionOutcome {
            profile: updated,
            changed: true,
        })
    }

    /// Remove a user. The provider cascades the identity and activity log.
    ///
    /// # Errors
    ///
    /// `Permission` for the super-admin, `ProfileNotFound` for an unknown user.
    pub async fn delete(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
    ) -> Result<UserProfile, ServiceError> {
        let profile = self.require_profile(user_id).await?;
        if self.is_protected(&profile) {
            return Err(ServiceError::Permission(
                "The super admin account cannot be deleted".to_string(),
            ));
        }

        if self.provider.delete_profile(user_id).await? == 0 {
            return Err(ServiceError::ProfileNotFound);
        }
        self.sessions.revoke_user(user_id);

        self.log(
            NewActivity::new(
                actor_id,
                activity_types::USER_DELETED,
                format!("User {} deleted", profile.display_name()),
            )
            .with_details(json!({
                "target_user_id": user_id,
                "target_email": profile.email,
            })),
        )
        .await;
        tracing::info!(%actor_id, %user_id, "user deleted");

        Ok(profile)
    }

    /// Create an already-active account on the super-admin's behalf.
    ///
    /// # Errors
    ///
    /// `Permission` when the request would create a second super-admin, `Auth` when the
    /// provider refuses the credentials.
    pub async fn create_user(
        &self,
        actor_id: Uuid,
        new_user: NewUser,
    ) -> Result<UserProfile, ServiceError> {
        let email = password::normalize_email(&new_user.email);
        let role = new_user.role.unwrap_or(self.policy.default_role);
        if role == Role::SuperAdmin || self.policy.is_super_admin_email(&email) {
            return Err(ServiceError::Permission(
                "Only one super admin account may exist".to_string(),
            ));
        }

        let metadata = SignUpMetadata {
            role,
            status: AccountStatus::Active,
            full_name: new_user
                .full_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(ToString::to_string),
            is_super_admin: false,
        };
        let user = self
            .provider
            .sign_up(&email, &new_user.password, &metadata)
            .await
            .map_err(auth_failure)?;
        let profile = self.require_profile(user.id).await?;

        self.log(
            NewActivity::new(
                actor_id,
                activity_types::MANUALLY_CREATED,
                format!("User {} created by admin", profile.display_name()),
            )
            .with_details(json!({ "target_user_id": user.id, "role": role })),
        )
        .await;
        tracing::info!(%actor_id, user_id = %user.id, "user created manually");

        Ok(profile)
    }

    // ── Reporting ───────────────────────────────────────────────────────────

    /// Aggregate counts, computed provider-side when possible, else reduced locally.
    ///
    /// # Errors
    ///
    /// Only when both the aggregate and the fallback listing fail.
    pub async fn statistics(&self) -> Result<UserStatistics, ServiceError> {
        match self.provider.user_statistics().await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                tracing::warn!(error = %e, "aggregate statistics failed, reducing locally");
                let profiles = self.provider.list_profiles().await?;
                Ok(UserStatistics::from_profiles(
                    &profiles,
                    Utc::now().date_naive(),
                ))
            }
        }
    }

    /// Newest-first activity, optionally for one user, capped at `limit` (default 100).
    ///
    /// # Errors
    ///
    /// `Validation` for a zero limit, or the provider's failure.
    pub async fn list_activity(
        &self,
        user_id: Option<Uuid>,
        limit: Option<u64>,
    ) -> Result<Vec<ActivityLogEntry>, ServiceError> {
        let limit = limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
        if limit == 0 {
            return Err(ServiceError::Validation("limit must be at least 1".to_string()));
        }
        let query = ActivityQuery {
            user_id,
            activity_type: None,
            limit: Some(limit.min(MAX_ACTIVITY_LIMIT)),
        };
        Ok(self.provider.select_activities(&query).await?)
    }

    /// # Errors
    ///
    /// The provider's failure.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ServiceError> {
        Ok(self.provider.list_profiles().await?)
    }

    /// # Errors
    ///
    /// The provider's failure.
    pub async fn export_users(&self) -> Result<UserExport, ServiceError> {
        let users = self.provider.list_profiles().await?;
        Ok(UserExport {
            exported_at: Utc::now(),
            total: users.len(),
            users,
        })
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn is_protected(&self, profile: &UserProfile) -> bool {
        profile.role == Role::SuperAdmin || self.policy.is_super_admin_email(&profile.email)
    }

    async fn require_profile(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        self.provider
            .find_profile(user_id)
            .await?
            .ok_or(ServiceError::ProfileNotFound)
    }

    async fn provider_sign_out(&self, user_id: Uuid) {
        if let Err(e) = self.provider.sign_out(user_id).await {
            tracing::warn!(%user_id, error = %e, "provider sign-out failed");
        }
    }

    async fn log(&self, entry: NewActivity) {
        if let Err(e) = self.provider.log_activity(&entry).await {
            tracing::warn!(
                user_id = %entry.user_id,
                activity_type = %entry.activity_type,
                error = %e,
                "activity not recorded"
            );
        }
    }
}

/// Credential refusals become `Auth`; anything else stays a provider failure.
fn auth_failure(err: ProviderError) -> ServiceError {
    match err {
        e @ (ProviderError::InvalidCredentials | ProviderError::Rejected(_)) => {
            ServiceError::Auth(e.to_string())
        }
        other => ServiceError::Provider(other),
    }
}

fn inactive_message(status: AccountStatus) -> String {
    match status {
        AccountStatus::Pending => {
            "Your account is pending approval (status=pending). Please wait for an administrator."
                .to_string()
        }
        other => format!(
            "Your account is not active (status={other}). Please contact an administrator."
        ),
    }
}

const fn past_tense(action: StatusAction) -> &'static str {
    match action {
        StatusAction::Approve => "approved",
        StatusAction::Reject => "rejected",
        StatusAction::Suspend => "suspended",
        StatusAction::Reactivate => "reactivated",
    }
}
