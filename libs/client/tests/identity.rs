//! Sign-in, session resumption and role elevation through the client

mod support;

use std::sync::Arc;

use client::session::PersistedSession;
use client::{Capability, Client, ClientError, GuardDecision, MemoryStorage, SessionStorage};
use common::Role;
use support::{
    ADMIN_PIN, PASSWORD, TestServer, config_for, dead_url, signed_in_admin, signed_in_user,
};

#[tokio::test]
async fn test_register_and_login() {
    let server = TestServer::start().await;
    let client = server.client();
    assert_eq!(
        client.guard.check(Capability::Authenticated),
        GuardDecision::Pending
    );

    let registered = client
        .identity
        .register("Ada Lovelace", "ada@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(registered.role, Role::User);
    assert_eq!(client.session.identity(), Some(registered.clone()));
    assert_eq!(
        client.guard.check(Capability::Authenticated),
        GuardDecision::Allow
    );
    assert_eq!(
        client.guard.check(Capability::Admin),
        GuardDecision::RedirectToHome
    );

    let duplicate = server
        .client()
        .identity
        .register("Ada Again", "ada@example.com", PASSWORD)
        .await;
    assert!(matches!(duplicate, Err(ClientError::Validation(_))));

    let other = server.client();
    let bad = other.identity.login("ada@example.com", "not-the-password").await;
    assert!(matches!(bad, Err(ClientError::Auth(_))));
    assert!(other.session.identity().is_none());

    let logged_in = other
        .identity
        .login("ada@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(logged_in.id, registered.id);
    assert!(logged_in.last_login.is_some());
}

#[tokio::test]
async fn test_wrong_pin_changes_nothing() {
    let server = TestServer::start().await;
    let (client, identity) = signed_in_user(&server, "ada@example.com").await;
    let credential = client.session.credential().unwrap();

    let err = client.identity.upgrade_role("0000").await.unwrap_err();
    assert_eq!(err, ClientError::Auth("Invalid PIN code".to_string()));

    assert_eq!(client.session.identity(), Some(identity.clone()));
    assert_eq!(client.session.credential(), Some(credential.clone()));

    // The old credential still resolves to the unelevated identity
    let resumed = client.identity.resume_session(credential).await.unwrap();
    assert_eq!(resumed.role, Role::User);
    assert!(matches!(
        client.alerts.list_all().await,
        Err(ClientError::Auth(_))
    ));
}

#[tokio::test]
async fn test_upgrade_replaces_credential() {
    let server = TestServer::start().await;
    let (client, identity) = signed_in_user(&server, "ada@example.com").await;
    let old_credential = client.session.credential().unwrap();

    let upgraded = client.identity.upgrade_role(ADMIN_PIN).await.unwrap();
    assert_eq!(upgraded.id, identity.id);
    assert_eq!(upgraded.role, Role::Admin);

    let new_credential = client.session.credential().unwrap();
    assert_ne!(new_credential, old_credential);
    assert_eq!(client.guard.check(Capability::Admin), GuardDecision::Allow);
    assert!(client.alerts.list_all().await.is_ok());

    // The replaced credential is dead
    let stale = server.client();
    assert!(matches!(
        stale.identity.resume_session(old_credential).await,
        Err(ClientError::Auth(_))
    ));
}

#[tokio::test]
async fn test_upgrade_requires_session() {
    let server = TestServer::start().await;
    let client = server.client();
    assert!(matches!(
        client.identity.upgrade_role(ADMIN_PIN).await,
        Err(ClientError::Auth(_))
    ));
}

#[tokio::test]
async fn test_bootstrap_resumes_durable_credential() {
    let server = TestServer::start().await;
    let storage = Arc::new(MemoryStorage::new());

    let first = server.client_with(storage.clone());
    let identity = first
        .identity
        .register("Ada Lovelace", "ada@example.com", PASSWORD)
        .await
        .unwrap();

    // Same durable storage, fresh process state
    let second = server.client_with(storage.clone());
    assert!(second.session.identity().is_none());
    assert_eq!(
        second.guard.check(Capability::Authenticated),
        GuardDecision::Pending
    );

    let resumed = second.identity.bootstrap().await;
    assert_eq!(resumed.map(|i| i.id), Some(identity.id));
    assert_eq!(
        second.guard.resolve(Capability::Authenticated).await,
        GuardDecision::Allow
    );
}

#[tokio::test]
async fn test_bootstrap_clears_rejected_credential() {
    let server = TestServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    storage
        .save(&PersistedSession {
            access_token: "not-a-token".to_string(),
            identity: None,
        })
        .unwrap();

    let client = server.client_with(storage.clone());
    assert!(client.identity.bootstrap().await.is_none());
    assert!(client.session.credential().is_none());
    assert!(storage.load().unwrap().is_none());
    assert_eq!(
        client.guard.check(Capability::Authenticated),
        GuardDecision::RedirectToLogin
    );
}

#[tokio::test]
async fn test_bootstrap_keeps_credential_when_offline() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .save(&PersistedSession {
            access_token: "kept-for-later".to_string(),
            identity: None,
        })
        .unwrap();

    let client = Client::with_storage(config_for(dead_url().await), storage.clone());
    assert!(client.identity.bootstrap().await.is_none());

    let session = client.session.snapshot();
    assert!(!session.loading);
    assert!(session.identity.is_none());
    assert_eq!(client.session.credential().as_deref(), Some("kept-for-later"));
    assert!(storage.load().unwrap().is_some());
}

#[tokio::test]
async fn test_logout_revokes_and_clears() {
    let server = TestServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let client = server.client_with(storage.clone());
    client
        .identity
        .register("Ada Lovelace", "ada@example.com", PASSWORD)
        .await
        .unwrap();
    let credential = client.session.credential().unwrap();

    client.identity.logout().await.unwrap();
    assert!(client.session.identity().is_none());
    assert!(storage.load().unwrap().is_none());

    let other = server.client();
    assert!(matches!(
        other.identity.resume_session(credential).await,
        Err(ClientError::Auth(_))
    ));
}

#[tokio::test]
async fn test_list_identities_is_admin_only() {
    let server = TestServer::start().await;
    let (user, _) = signed_in_user(&server, "ada@example.com").await;
    let (admin, _) = signed_in_admin(&server, "root@example.com").await;

    assert!(matches!(
        user.identity.list_identities().await,
        Err(ClientError::Auth(_))
    ));

    let identities = admin.identity.list_identities().await.unwrap();
    assert_eq!(identities.len(), 2);
    assert!(identities.iter().any(|i| i.role == Role::Admin));
}
