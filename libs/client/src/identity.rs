//! Identity Service: registration, login, session resumption and the
//! PIN-based role upgrade.
//!
//! Every identity written to the [`SessionStore`] comes from a server
//! response to the credential stored with it. The client never changes a
//! role locally.

use common::{Identity, Role};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};
use crate::http::{ApiClient, Endpoint};
use crate::session::SessionStore;

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    role: Role,
}

#[derive(Deserialize)]
struct AuthPayload {
    access_token: String,
    user: Identity,
}

#[derive(Deserialize)]
struct ProfilePayload {
    user: Identity,
}

#[derive(Deserialize)]
struct UpgradePayload {
    access_token: String,
}

#[derive(Deserialize)]
struct UsersPayload {
    users: Vec<Identity>,
}

#[derive(Clone)]
pub struct IdentityService {
    api: ApiClient,
    session: SessionStore,
}

impl IdentityService {
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Create an account with the `user` role and sign in as it
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ClientResult<Identity> {
        let request = self
            .api
            .request(Method::POST, "/api/auth/register", None)
            .json(&RegisterBody {
                name,
                email,
                password,
                role: Role::User,
            });
        let payload: AuthPayload = self.api.send(request, Endpoint::General).await?;

        self.session
            .set_identity(payload.user.clone(), payload.access_token)?;
        info!("Registered as {}", payload.user.id);
        Ok(payload.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Identity> {
        let request = self
            .api
            .request(Method::POST, "/api/auth/login", None)
            .json(&json!({ "email": email, "password": password }));
        let payload: AuthPayload = self.api.send(request, Endpoint::General).await?;

        self.session
            .set_identity(payload.user.clone(), payload.access_token)?;
        info!("Signed in as {}", payload.user.id);
        Ok(payload.user)
    }

    /// Confirm `credential` with the server and adopt the identity it
    /// belongs to. On [`ClientError::Auth`] the caller must clear the session.
    pub async fn resume_session(&self, credential: String) -> ClientResult<Identity> {
        let identity = self.fetch_profile(&credential).await?;
        self.session.set_identity(identity.clone(), credential)?;
        Ok(identity)
    }

    /// Startup resolution of the durable credential.
    ///
    /// A rejected credential clears the session. A network failure keeps the
    /// credential for a later attempt and ends loading without an identity.
    pub async fn bootstrap(&self) -> Option<Identity> {
        if let Some(identity) = self.session.identity() {
            self.session.finish_loading();
            return Some(identity);
        }

        let Some(credential) = self.session.credential() else {
            self.session.finish_loading();
            return None;
        };

        match self.resume_session(credential).await {
            Ok(identity) => Some(identity),
            Err(ClientError::Auth(message)) => {
                info!("Stored credential rejected: {}", message);
                if let Err(e) = self.session.clear() {
                    warn!("{}", e);
                    self.session.finish_loading();
                }
                None
            }
            Err(e) => {
                warn!("Could not resume session: {}", e);
                self.session.finish_loading();
                None
            }
        }
    }

    /// Exchange the admin PIN for a credential carrying the admin role.
    ///
    /// A rejected PIN leaves the session untouched. On success the server
    /// has revoked the old credential; the new one replaces it together
    /// with the identity the server reports for it.
    pub async fn upgrade_role(&self, pin: &str) -> ClientResult<Identity> {
        let credential = self
            .session
            .credential()
            .ok_or_else(ClientError::not_signed_in)?;

        let request = self
            .api
            .request(Method::POST, "/api/auth/upgrade-to-admin", Some(&credential))
            .json(&json!({ "pin": pin }));
        let payload: UpgradePayload = self.api.send(request, Endpoint::General).await?;

        match self.fetch_profile(&payload.access_token).await {
            Ok(identity) => {
                self.session
                    .set_identity(identity.clone(), payload.access_token)?;
                info!("Role is now {}", identity.role);
                Ok(identity)
            }
            Err(e) => {
                warn!("Upgraded credential could not be confirmed: {}", e);
                self.session.clear()?;
                Err(e)
            }
        }
    }

    /// Revoke the credential server-side when possible, then forget it
    pub async fn logout(&self) -> ClientResult<()> {
        if let Some(credential) = self.session.credential() {
            let request = self
                .api
                .request(Method::POST, "/api/auth/logout", Some(&credential));
            if let Err(e) = self
                .api
                .send::<serde_json::Value>(request, Endpoint::General)
                .await
            {
                warn!("Server-side logout failed: {}", e);
            }
        }
        self.session.clear()
    }

    /// Every registered identity; admin only
    pub async fn list_identities(&self) -> ClientResult<Vec<Identity>> {
        let credential = self
            .session
            .credential()
            .ok_or_else(ClientError::not_signed_in)?;
        let request = self
            .api
            .request(Method::GET, "/api/admin/users", Some(&credential));
        let payload: UsersPayload = self.api.send(request, Endpoint::General).await?;
        Ok(payload.users)
    }

    async fn fetch_profile(&self, credential: &str) -> ClientResult<Identity> {
        let request = self
            .api
            .request(Method::GET, "/api/auth/profile", Some(credential));
        let payload: ProfilePayload = self.api.send(request, Endpoint::Profile).await?;
        Ok(payload.user)
    }
}
