//! Access Guard: routing decisions from session state

use tracing::debug;

use crate::session::{Session, SessionStore};

/// What a route or action needs from the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// The session is still being resolved; render nothing yet
    Pending,
    RedirectToLogin,
    /// Signed in without the admin role. Admin-only resources are reported
    /// as not found rather than forbidden.
    RedirectToHome,
}

/// Decide `capability` against one session snapshot
pub fn decide(session: &Session, capability: Capability) -> GuardDecision {
    if session.loading {
        return GuardDecision::Pending;
    }

    let Some(identity) = &session.identity else {
        return GuardDecision::RedirectToLogin;
    };

    match capability {
        Capability::Authenticated => GuardDecision::Allow,
        Capability::Admin if identity.is_admin() => GuardDecision::Allow,
        Capability::Admin => GuardDecision::RedirectToHome,
    }
}

#[derive(Clone)]
pub struct AccessGuard {
    session: SessionStore,
}

impl AccessGuard {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// Decision for the current state; [`GuardDecision::Pending`] while loading
    pub fn check(&self, capability: Capability) -> GuardDecision {
        decide(&self.session.snapshot(), capability)
    }

    /// Wait for the session to resolve, then decide
    pub async fn resolve(&self, capability: Capability) -> GuardDecision {
        let mut rx = self.session.subscribe();
        let decision = match rx.wait_for(|session| !session.loading).await {
            Ok(session) => decide(&session, capability),
            Err(_) => self.check(capability),
        };
        debug!(?capability, ?decision, "Access decision");
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStorage;
    use chrono::Utc;
    use common::{Identity, Role};
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn session(identity: Option<Role>, loading: bool) -> Session {
        Session {
            credential: identity.map(|_| "token".to_string()),
            identity: identity.map(|role| Identity {
                id: Uuid::new_v4(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                role,
                created_at: Utc::now(),
                last_login: None,
            }),
            loading,
        }
    }

    #[test]
    fn test_loading_suspends() {
        let loading = session(None, true);
        assert_eq!(decide(&loading, Capability::Authenticated), GuardDecision::Pending);
        assert_eq!(decide(&loading, Capability::Admin), GuardDecision::Pending);
    }

    #[test]
    fn test_anonymous_goes_to_login() {
        let anonymous = session(None, false);
        assert_eq!(
            decide(&anonymous, Capability::Authenticated),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(
            decide(&anonymous, Capability::Admin),
            GuardDecision::RedirectToLogin
        );
    }

    #[test]
    fn test_roles() {
        let user = session(Some(Role::User), false);
        assert_eq!(decide(&user, Capability::Authenticated), GuardDecision::Allow);
        assert_eq!(decide(&user, Capability::Admin), GuardDecision::RedirectToHome);

        let admin = session(Some(Role::Admin), false);
        assert_eq!(decide(&admin, Capability::Authenticated), GuardDecision::Allow);
        assert_eq!(decide(&admin, Capability::Admin), GuardDecision::Allow);
    }

    #[tokio::test]
    async fn test_resolve_waits_for_loading() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let guard = AccessGuard::new(store.clone());
        assert_eq!(guard.check(Capability::Authenticated), GuardDecision::Pending);

        let waiter = tokio::spawn({
            let guard = guard.clone();
            async move { guard.resolve(Capability::Authenticated).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        store.finish_loading();
        let decision = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decision, GuardDecision::RedirectToLogin);
    }
}
