//! Client side of the Tree Lives alert lifecycle
//!
//! The pieces share one explicitly owned [`SessionStore`]:
//!
//! - [`IdentityService`] signs in, resumes and upgrades the session
//! - [`AccessGuard`] turns session state into routing decisions
//! - [`AlertRepository`] talks to the alert endpoints with the session's
//!   credential
//! - [`PollSynchronizer`] keeps each mounted view's collection fresh
//!
//! [`Client`] wires them together from a [`ClientConfig`].

pub mod alerts;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod identity;
pub mod poll;
pub mod session;

use std::sync::Arc;

pub use alerts::{AlertDraft, AlertRepository};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use guard::{AccessGuard, Capability, GuardDecision};
pub use http::ApiClient;
pub use identity::IdentityService;
pub use poll::{PollHandle, PollSynchronizer, RefreshPolicy, View, ViewState};
pub use session::{FileStorage, MemoryStorage, SessionStorage, SessionStore};

/// Every client component over one session
#[derive(Clone)]
pub struct Client {
    pub config: ClientConfig,
    pub session: SessionStore,
    pub identity: IdentityService,
    pub guard: AccessGuard,
    pub alerts: AlertRepository,
    pub poller: PollSynchronizer,
}

impl Client {
    /// Client persisting its session under the configured storage directory
    pub fn new(config: ClientConfig) -> Self {
        let storage = FileStorage::new(&config.storage_dir, &config.namespace);
        Self::with_storage(config, Arc::new(storage))
    }

    pub fn with_storage(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Self {
        let api = ApiClient::new(config.base_url.clone());
        let session = SessionStore::new(storage);

        let alerts = AlertRepository::new(api.clone(), session.clone());
        Self {
            identity: IdentityService::new(api, session.clone()),
            guard: AccessGuard::new(session.clone()),
            poller: PollSynchronizer::new(alerts.clone()),
            alerts,
            session,
            config,
        }
    }

    /// Mount `view` with its configured refresh policy
    pub fn mount(&self, view: View) -> PollHandle {
        self.poller.mount(view, self.config.policy(view))
    }
}
