#![allow(clippy::panic)]

mod common;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use knowledge_hub::auth::password;
use knowledge_hub::domain::{AccountStatus, Role, UserStatistics, activity_types};
use knowledge_hub::entities::{identity, user_profile};
use knowledge_hub::error::ServiceError;
use knowledge_hub::services::RegistrationPolicy;
use knowledge_hub::services::lifecycle_service::NewUser;

use common::{PASSWORD, SUPER_ADMIN, hub, hub_with};

// ──────────────────────────────────────────────────────────────────────────────
// Sign-up
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn short_password_is_rejected_then_valid_sign_up_is_pending() {
    let hub = hub().await;

    let rejected = hub.lifecycle.sign_up("new@x.com", "abcde", None).await;
    assert!(matches!(
        rejected,
        Err(ServiceError::Auth(ref msg)) if msg == "Password should be at least 6 characters."
    ));
    assert!(hub.lifecycle.list_users().await.unwrap_or_default().is_empty());

    let outcome = hub
        .lifecycle
        .sign_up("new@x.com", "abcdef", None)
        .await
        .unwrap_or_else(|e| panic!("sign-up: {e}"));
    assert_eq!(outcome.profile.status, AccountStatus::Pending);
    assert_eq!(outcome.profile.role, Role::User);
    assert!(outcome.message.contains("approval"));

    let log = hub.activities_of(outcome.user.id).await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].activity_type, activity_types::REGISTRATION);
}

#[tokio::test]
async fn super_admin_email_is_auto_activated() {
    let hub = hub().await;
    let outcome = hub
        .lifecycle
        .sign_up(&SUPER_ADMIN.to_uppercase(), PASSWORD, Some("Owner"))
        .await
        .unwrap_or_else(|e| panic!("sign-up: {e}"));

    assert_eq!(outcome.profile.role, Role::SuperAdmin);
    assert_eq!(outcome.profile.status, AccountStatus::Active);
    assert_eq!(outcome.profile.email, SUPER_ADMIN);
    assert!(outcome.user.metadata.is_super_admin);
}

#[tokio::test]
async fn duplicate_email_is_rejected_verbatim() {
    let hub = hub().await;
    hub.pending_user("dup@example.com").await;

    let again = hub.lifecycle.sign_up("Dup@Example.com", PASSWORD, None).await;
    assert!(matches!(
        again,
        Err(ServiceError::Auth(ref msg)) if msg == "User already registered"
    ));
}

#[tokio::test]
async fn auto_approve_policy_activates_with_default_role() {
    let hub = hub_with(RegistrationPolicy {
        auto_approve: true,
        default_role: Role::Viewer,
        ..RegistrationPolicy::default()
    })
    .await;

    let outcome = hub
        .lifecycle
        .sign_up("viewer@example.com", PASSWORD, None)
        .await
        .unwrap_or_else(|e| panic!("sign-up: {e}"));
    assert_eq!(outcome.profile.status, AccountStatus::Active);
    assert_eq!(outcome.profile.role, Role::Viewer);
    assert!(hub.lifecycle.sign_in("viewer@example.com", PASSWORD).await.is_ok());
}

// ──────────────────────────────────────────────────────────────────────────────
// Sign-in / sign-out
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pending_user_cannot_sign_in() {
    let hub = hub().await;
    let id = hub.pending_user("waiting@example.com").await;

    let result = hub.lifecycle.sign_in("waiting@example.com", PASSWORD).await;
    assert!(matches!(
        result,
        Err(ServiceError::Auth(ref msg)) if msg.contains("pending approval")
    ));
    assert!(hub.sessions.is_empty());
    assert_eq!(hub.profile(id).await.map(|p| p.login_count), Some(0));
}

#[tokio::test]
async fn active_sign_in_increments_login_count_by_one() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let id = hub.active_user(admin, "member@example.com").await;

    let first = hub
        .lifecycle
        .sign_in("member@example.com", PASSWORD)
        .await
        .unwrap_or_else(|e| panic!("sign-in: {e}"));
    assert_eq!(first.profile.login_count, 1);
    assert!(first.profile.last_login.is_some());
    assert!(!first.is_super_admin);
    assert_eq!(first.message, "Login successful!");
    assert!(hub.sessions.get(first.session.token).is_some());

    let second = hub
        .lifecycle
        .sign_in("member@example.com", PASSWORD)
        .await
        .unwrap_or_else(|e| panic!("sign-in: {e}"));
    assert_eq!(second.profile.login_count, 2);

    let logins = hub
        .activities_of(id)
        .await
        .into_iter()
        .filter(|a| a.activity_type == activity_types::LOGIN)
        .count();
    assert_eq!(logins, 2);
}

#[tokio::test]
async fn wrong_password_is_an_auth_error() {
    let hub = hub().await;
    hub.super_admin().await;

    let result = hub.lifecycle.sign_in(SUPER_ADMIN, "wrong-password").await;
    assert!(matches!(
        result,
        Err(ServiceError::Auth(ref msg)) if msg == "Invalid login credentials"
    ));
    let unknown = hub.lifecycle.sign_in("ghost@example.com", PASSWORD).await;
    assert!(matches!(unknown, Err(ServiceError::Auth(_))));
}

#[tokio::test]
async fn identity_without_profile_is_profile_not_found() {
    let hub = hub().await;
    let hash = password::hash_password(PASSWORD).unwrap_or_default();
    identity::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set("orphan@example.com".to_string()),
        password_hash: Set(hash),
        metadata: Set(
            r#"{"role":"user","status":"active","fullName":null,"isSuperAdmin":false}"#
                .to_string(),
        ),
        created_at: Set(Utc::now().fixed_offset()),
        last_sign_in_at: Set(None),
    }
    .insert(&hub.db)
    .await
    .unwrap_or_else(|e| panic!("insert identity: {e}"));

    let result = hub.lifecycle.sign_in("orphan@example.com", PASSWORD).await;
    assert!(matches!(result, Err(ServiceError::ProfileNotFound)));
    assert!(hub.sessions.is_empty());
}

#[tokio::test]
async fn sign_out_always_succeeds() {
    let hub = hub().await;
    hub.super_admin().await;
    let outcome = hub
        .lifecycle
        .sign_in(SUPER_ADMIN, PASSWORD)
        .await
        .unwrap_or_else(|e| panic!("sign-in: {e}"));

    hub.provider.fail_sign_out(true);
    assert!(hub.lifecycle.sign_out(outcome.session.token).await);
    assert!(hub.sessions.get(outcome.session.token).is_none());
    assert!(hub.lifecycle.sign_out(Uuid::new_v4()).await);
}

// ──────────────────────────────────────────────────────────────────────────────
// Status transitions
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn approve_is_idempotent() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let user = hub.pending_user("u@example.com").await;

    let first = hub.lifecycle.approve(admin, user).await;
    assert!(first.as_ref().is_ok_and(|o| o.changed));
    assert_eq!(
        first.map(|o| o.profile.status).ok(),
        Some(AccountStatus::Active)
    );

    let second = hub.lifecycle.approve(admin, user).await;
    assert!(second.as_ref().is_ok_and(|o| !o.changed));

    let approvals = hub
        .activities_of(admin)
        .await
        .into_iter()
        .filter(|a| a.activity_type == activity_types::APPROVED)
        .count();
    assert_eq!(approvals, 1);
}

#[tokio::test]
async fn illegal_transitions_are_refused() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let pending = hub.pending_user("p@example.com").await;

    assert!(matches!(
        hub.lifecycle.suspend(admin, pending, None).await,
        Err(ServiceError::InvalidTransition(_))
    ));
    assert!(matches!(
        hub.lifecycle.reactivate(admin, pending).await,
        Err(ServiceError::InvalidTransition(_))
    ));

    hub.lifecycle.reject(admin, pending).await.ok();
    assert!(matches!(
        hub.lifecycle.approve(admin, pending).await,
        Err(ServiceError::InvalidTransition(_))
    ));
    assert_eq!(
        hub.profile(pending).await.map(|p| p.status),
        Some(AccountStatus::Inactive)
    );
}

#[tokio::test]
async fn suspend_stores_reason_and_revokes_sessions() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let user = hub.active_user(admin, "spam@example.com").await;
    let session = hub
        .lifecycle
        .sign_in("spam@example.com", PASSWORD)
        .await
        .map(|o| o.session)
        .unwrap_or_else(|e| panic!("sign-in: {e}"));

    let suspended = hub
        .lifecycle
        .suspend(admin, user, Some("  posting spam "))
        .await
        .unwrap_or_else(|e| panic!("suspend: {e}"));
    assert_eq!(suspended.profile.status, AccountStatus::Suspended);
    assert_eq!(suspended.profile.suspension_reason.as_deref(), Some("posting spam"));
    assert_eq!(suspended.profile.role, Role::User);
    assert!(hub.sessions.get(session.token).is_none());

    let log = hub.activities_of(admin).await;
    let entry = log
        .iter()
        .find(|a| a.activity_type == activity_types::SUSPENDED)
        .unwrap_or_else(|| panic!("no suspension entry"));
    assert_eq!(
        entry.details.as_ref().and_then(|d| d["reason"].as_str()),
        Some("posting spam")
    );

    let reactivated = hub
        .lifecycle
        .reactivate(admin, user)
        .await
        .unwrap_or_else(|e| panic!("reactivate: {e}"));
    assert_eq!(reactivated.profile.status, AccountStatus::Active);
    assert!(reactivated.profile.suspension_reason.is_none());
    assert_eq!(reactivated.profile.role, Role::User);
}

#[tokio::test]
async fn failed_writes_leave_profile_log_and_sessions_untouched() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let user = hub.active_user(admin, "steady@example.com").await;
    let session = hub
        .lifecycle
        .sign_in("steady@example.com", PASSWORD)
        .await
        .map(|o| o.session)
        .unwrap_or_else(|e| panic!("sign-in: {e}"));

    let before = hub.profile(user).await;
    let log_before = hub
        .lifecycle
        .list_activity(None, None)
        .await
        .unwrap_or_else(|e| panic!("activity: {e}"));

    hub.provider.fail_update_profile(true);

    assert!(matches!(
        hub.lifecycle.suspend(admin, user, Some("flaky")).await,
        Err(ServiceError::Provider(_))
    ));
    assert!(matches!(
        hub.lifecycle.update_role(admin, user, Role::Moderator).await,
        Err(ServiceError::Provider(_))
    ));

    let after = hub.profile(user).await;
    assert_eq!(after, before);
    assert_eq!(after.map(|p| (p.status, p.role)), Some((AccountStatus::Active, Role::User)));

    let log_after = hub
        .lifecycle
        .list_activity(None, None)
        .await
        .unwrap_or_else(|e| panic!("activity: {e}"));
    assert_eq!(log_after, log_before);

    assert!(hub.sessions.get(session.token).is_some());
}

#[tokio::test]
async fn super_admin_can_never_be_suspended_or_rejected() {
    let hub = hub().await;
    let admin = hub.super_admin().await;

    assert!(matches!(
        hub.lifecycle.suspend(admin, admin, Some("oops")).await,
        Err(ServiceError::Permission(_))
    ));
    assert!(matches!(
        hub.lifecycle.reject(admin, admin).await,
        Err(ServiceError::Permission(_))
    ));
    assert!(
        hub.lifecycle
            .approve(admin, admin)
            .await
            .is_ok_and(|o| !o.changed)
    );
    assert_eq!(
        hub.profile(admin).await.map(|p| p.status),
        Some(AccountStatus::Active)
    );
}

// ──────────────────────────────────────────────────────────────────────────────
// Roles
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn role_change_preserves_status() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let user = hub.pending_user("mod@example.com").await;

    let outcome = hub
        .lifecycle
        .update_role(admin, user, Role::Moderator)
        .await
        .unwrap_or_else(|e| panic!("role change: {e}"));
    assert!(outcome.changed);
    assert_eq!(outcome.profile.role, Role::Moderator);
    assert_eq!(outcome.profile.status, AccountStatus::Pending);

    let repeat = hub.lifecycle.update_role(admin, user, Role::Moderator).await;
    assert!(repeat.is_ok_and(|o| !o.changed));
}

#[tokio::test]
async fn no_second_super_admin() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let user = hub.active_user(admin, "ambitious@example.com").await;

    assert!(matches!(
        hub.lifecycle.update_role(admin, user, Role::SuperAdmin).await,
        Err(ServiceError::Permission(_))
    ));
    assert!(matches!(
        hub.lifecycle.update_role(admin, admin, Role::User).await,
        Err(ServiceError::Permission(_))
    ));
    assert_eq!(hub.profile(user).await.map(|p| p.role), Some(Role::User));
    assert_eq!(hub.profile(admin).await.map(|p| p.role), Some(Role::SuperAdmin));

    let manual = hub
        .lifecycle
        .create_user(
            admin,
            NewUser {
                email: "boss@example.com".to_string(),
                password: PASSWORD.to_string(),
                full_name: None,
                role: Some(Role::SuperAdmin),
            },
        )
        .await;
    assert!(matches!(manual, Err(ServiceError::Permission(_))));
}

// ──────────────────────────────────────────────────────────────────────────────
// Deletion
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_super_admin_fails_and_keeps_logs() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let before = hub.activities_of(admin).await.len();
    assert!(before > 0);

    let result = hub.lifecycle.delete(admin, admin).await;
    assert!(matches!(result, Err(ServiceError::Permission(_))));
    assert!(hub.profile(admin).await.is_some());
    assert_eq!(hub.activities_of(admin).await.len(), before);
}

#[tokio::test]
async fn delete_cascades_and_is_attributed_to_actor() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let user = hub.active_user(admin, "leaving@example.com").await;
    hub.lifecycle
        .sign_in("leaving@example.com", PASSWORD)
        .await
        .unwrap_or_else(|e| panic!("sign-in: {e}"));
    assert!(!hub.activities_of(user).await.is_empty());

    let removed = hub
        .lifecycle
        .delete(admin, user)
        .await
        .unwrap_or_else(|e| panic!("delete: {e}"));
    assert_eq!(removed.email, "leaving@example.com");
    assert!(hub.profile(user).await.is_none());
    assert!(hub.activities_of(user).await.is_empty());
    assert!(hub.sessions.is_empty());
    assert!(
        hub.activities_of(admin)
            .await
            .iter()
            .any(|a| a.activity_type == activity_types::USER_DELETED)
    );

    assert!(matches!(
        hub.lifecycle.delete(admin, user).await,
        Err(ServiceError::ProfileNotFound)
    ));
    // The identity is gone too
    assert!(hub.lifecycle.sign_in("leaving@example.com", PASSWORD).await.is_err());
}

// ──────────────────────────────────────────────────────────────────────────────
// Reporting
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn statistics_fall_back_to_local_reduction() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let active = hub.active_user(admin, "a@example.com").await;
    hub.pending_user("b@example.com").await;
    let suspended = hub.active_user(admin, "c@example.com").await;
    hub.lifecycle.suspend(admin, suspended, None).await.ok();
    hub.lifecycle
        .sign_in("a@example.com", PASSWORD)
        .await
        .unwrap_or_else(|e| panic!("sign-in: {e}"));
    assert!(hub.profile(active).await.is_some());

    let remote = hub
        .lifecycle
        .statistics()
        .await
        .unwrap_or_else(|e| panic!("stats: {e}"));
    assert_eq!(remote.total, 4);
    assert_eq!(remote.active, 2);
    assert_eq!(remote.pending, 1);
    assert_eq!(remote.suspended, 1);
    assert_eq!(remote.inactive, 0);
    assert_eq!(remote.total_logins, 1);
    assert_eq!(remote.users_today, 4);

    hub.provider.fail_statistics(true);
    let local = hub
        .lifecycle
        .statistics()
        .await
        .unwrap_or_else(|e| panic!("stats: {e}"));
    assert_eq!(local, remote);
}

#[tokio::test]
async fn statistics_over_no_users_are_zero() {
    let hub = hub().await;

    let stats = hub
        .lifecycle
        .statistics()
        .await
        .unwrap_or_else(|e| panic!("stats: {e}"));
    assert_eq!(stats, UserStatistics::default());
}

#[tokio::test]
async fn address_claimed_by_another_profile_is_already_registered() {
    let hub = hub().await;
    let owner = hub.pending_user("owner@example.com").await;
    // The profile row now holds an address its identity does not
    user_profile::Entity::update_many()
        .col_expr(
            user_profile::Column::Email,
            Expr::value("claimed@example.com"),
        )
        .filter(user_profile::Column::Id.eq(owner))
        .exec(&hub.db)
        .await
        .unwrap_or_else(|e| panic!("rewrite email: {e}"));

    let result = hub
        .lifecycle
        .sign_up("claimed@example.com", PASSWORD, None)
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Auth(ref msg)) if msg == "User already registered"
    ));

    // The identity insert was rolled back with the profile
    let identities = identity::Entity::find()
        .filter(identity::Column::Email.eq("claimed@example.com"))
        .all(&hub.db)
        .await
        .unwrap_or_default();
    assert!(identities.is_empty());
}

#[tokio::test]
async fn activity_is_newest_first_scoped_and_capped() {
    let hub = hub().await;
    let admin = hub.super_admin().await;
    let user = hub.active_user(admin, "busy@example.com").await;
    for _ in 0..3 {
        hub.lifecycle
            .sign_in("busy@example.com", PASSWORD)
            .await
            .unwrap_or_else(|e| panic!("sign-in: {e}"));
    }

    let scoped = hub
        .lifecycle
        .list_activity(Some(user), None)
        .await
        .unwrap_or_default();
    assert_eq!(scoped.len(), 4);
    assert!(scoped.iter().all(|a| a.user_id == user));
    assert_eq!(scoped[0].activity_type, activity_types::LOGIN);
    assert_eq!(
        scoped.last().map(|a| a.activity_type.as_str()),
        Some(activity_types::REGISTRATION)
    );

    let capped = hub
        .lifecycle
        .list_activity(None, Some(2))
        .await
        .unwrap_or_default();
    assert_eq!(capped.len(), 2);

    assert!(matches!(
        hub.lifecycle.list_activity(None, Some(0)).await,
        Err(ServiceError::Validation(_))
    ));
}

#[tokio::test]
async fn manual_creation_is_active_and_logged() {
    let hub = hub().await;
    let admin = hub.super_admin().await;

    let profile = hub
        .lifecycle
        .create_user(
            admin,
            NewUser {
                email: "Invited@Example.com".to_string(),
                password: PASSWORD.to_string(),
                full_name: Some("Invited Person".to_string()),
                role: Some(Role::Admin),
            },
        )
        .await
        .unwrap_or_else(|e| panic!("create: {e}"));
    assert_eq!(profile.status, AccountStatus::Active);
    assert_eq!(profile.role, Role::Admin);
    assert_eq!(profile.email, "invited@example.com");
    assert!(
        hub.activities_of(admin)
            .await
            .iter()
            .any(|a| a.activity_type == activity_types::MANUALLY_CREATED)
    );
    assert!(hub.lifecycle.sign_in("invited@example.com", PASSWORD).await.is_ok());

    let export = hub
        .lifecycle
        .export_users()
        .await
        .unwrap_or_else(|e| panic!("export: {e}"));
    assert_eq!(export.total, 2);
}
