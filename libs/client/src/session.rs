//! Session Store: the current bearer credential and the identity the server
//! confirmed for it.
//!
//! The store is an explicitly owned handle; clones share one session. State
//! is published on a [`watch`] channel so the access guard and views can
//! wait for the initial resolution to finish.

use common::Identity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

/// In-memory session state
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub credential: Option<String>,
    /// Set only from a server response, never from durable storage
    pub identity: Option<Identity>,
    /// True until the startup resolution has finished
    pub loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            credential: None,
            identity: None,
            loading: true,
        }
    }
}

/// What survives a client restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub access_token: String,
    /// Last identity seen; a display hint only
    #[serde(default)]
    pub identity: Option<Identity>,
}

/// Durable storage for the session.
///
/// Implementations replace the stored value as a whole; a reader never
/// observes a partially written session.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> ClientResult<Option<PersistedSession>>;
    fn save(&self, session: &PersistedSession) -> ClientResult<()>;
    fn remove(&self) -> ClientResult<()>;
}

/// `<dir>/<namespace>/session.json`
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            path: dir.as_ref().join(namespace).join("session.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_error(action: &str, path: &Path, err: impl std::fmt::Display) -> ClientError {
    ClientError::Storage(format!("Failed to {} {}: {}", action, path.display(), err))
}

impl SessionStorage for FileStorage {
    fn load(&self) -> ClientResult<Option<PersistedSession>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error("read", &self.path, e)),
        };

        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, session: &PersistedSession) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| storage_error("create", parent, e))?;
        }

        let json = serde_json::to_vec(session)
            .map_err(|e| ClientError::Storage(format!("Failed to encode session: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| storage_error("write", &tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error("replace", &self.path, e))
    }

    fn remove(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &self.path, e)),
        }
    }
}

/// Process-local storage; clones share the value
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<PersistedSession>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slot<T>(&self, f: impl FnOnce(&mut Option<PersistedSession>) -> T) -> ClientResult<T> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| ClientError::Storage("Session storage lock poisoned".to_string()))?;
        Ok(f(&mut slot))
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> ClientResult<Option<PersistedSession>> {
        self.with_slot(|slot| slot.clone())
    }

    fn save(&self, session: &PersistedSession) -> ClientResult<()> {
        self.with_slot(|slot| *slot = Some(session.clone()))
    }

    fn remove(&self) -> ClientResult<()> {
        self.with_slot(|slot| *slot = None)
    }
}

/// Shared handle over the session
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<Session>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// A store that starts unresolved (`loading`) until an identity is set,
    /// the session is cleared, or [`SessionStore::finish_loading`] is called.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            state: Arc::new(state),
            storage,
        }
    }

    /// Held credential, falling back to durable storage
    pub fn credential(&self) -> Option<String> {
        if let Some(credential) = self.state.borrow().credential.clone() {
            return Some(credential);
        }

        let stored = match self.storage.load() {
            Ok(stored) => stored?,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };

        debug!("Loaded credential from durable storage");
        self.state.send_modify(|session| {
            session.credential.get_or_insert(stored.access_token.clone());
        });
        Some(stored.access_token)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Last identity written to durable storage. Not a confirmed identity.
    pub fn last_known_identity(&self) -> Option<Identity> {
        self.storage.load().ok().flatten()?.identity
    }

    /// Replace identity and credential together and persist them.
    ///
    /// Nothing changes in memory if the durable write fails.
    pub fn set_identity(&self, identity: Identity, credential: String) -> ClientResult<()> {
        self.storage.save(&PersistedSession {
            access_token: credential.clone(),
            identity: Some(identity.clone()),
        })?;

        self.state.send_replace(Session {
            credential: Some(credential),
            identity: Some(identity),
            loading: false,
        });
        Ok(())
    }

    /// Forget the session in durable storage, then in memory.
    ///
    /// Nothing changes in memory if the durable removal fails.
    pub fn clear(&self) -> ClientResult<()> {
        self.storage.remove()?;

        self.state.send_replace(Session {
            credential: None,
            identity: None,
            loading: false,
        });
        Ok(())
    }

    /// End the startup resolution without an identity
    pub fn finish_loading(&self) {
        self.state.send_if_modified(|session| {
            let was_loading = session.loading;
            session.loading = false;
            was_loading
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::Role;
    use uuid::Uuid;

    fn identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_set_identity_persists_credential() {
        let storage = MemoryStorage::new();
        let store = SessionStore::new(Arc::new(storage.clone()));
        assert!(store.snapshot().loading);
        assert!(store.credential().is_none());

        let ada = identity(Role::User);
        store.set_identity(ada.clone(), "token-1".to_string()).unwrap();

        let session = store.snapshot();
        assert_eq!(session.identity, Some(ada.clone()));
        assert_eq!(session.credential.as_deref(), Some("token-1"));
        assert!(!session.loading);

        let persisted = storage.load().unwrap().unwrap();
        assert_eq!(persisted.access_token, "token-1");
        assert_eq!(persisted.identity, Some(ada));
    }

    #[test]
    fn test_credential_falls_back_to_storage_without_identity() {
        let storage = MemoryStorage::new();
        storage
            .save(&PersistedSession {
                access_token: "stored".to_string(),
                identity: Some(identity(Role::Admin)),
            })
            .unwrap();

        let store = SessionStore::new(Arc::new(storage));
        assert_eq!(store.credential().as_deref(), Some("stored"));
        // The persisted identity is never promoted to a confirmed one
        assert!(store.identity().is_none());
        assert_eq!(store.last_known_identity().map(|i| i.role), Some(Role::Admin));
    }

    #[test]
    fn test_clear_removes_everything() {
        let storage = MemoryStorage::new();
        let store = SessionStore::new(Arc::new(storage.clone()));
        store
            .set_identity(identity(Role::User), "token".to_string())
            .unwrap();

        store.clear().unwrap();
        assert!(store.identity().is_none());
        assert!(store.credential().is_none());
        assert!(storage.load().unwrap().is_none());
    }

    /// Storage that keeps its value and refuses to remove it
    struct StickyStorage(MemoryStorage);

    impl SessionStorage for StickyStorage {
        fn load(&self) -> ClientResult<Option<PersistedSession>> {
            self.0.load()
        }

        fn save(&self, session: &PersistedSession) -> ClientResult<()> {
            self.0.save(session)
        }

        fn remove(&self) -> ClientResult<()> {
            Err(ClientError::Storage("read-only".to_string()))
        }
    }

    #[test]
    fn test_failed_clear_leaves_session_whole() {
        let store = SessionStore::new(Arc::new(StickyStorage(MemoryStorage::new())));
        let ada = identity(Role::User);
        store.set_identity(ada.clone(), "token".to_string()).unwrap();

        assert!(matches!(store.clear(), Err(ClientError::Storage(_))));
        let session = store.snapshot();
        assert_eq!(session.identity, Some(ada));
        assert_eq!(session.credential.as_deref(), Some("token"));
        assert_eq!(store.credential().as_deref(), Some("token"));
    }

    #[test]
    fn test_finish_loading_notifies_once() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let mut rx = store.subscribe();
        let _ = rx.borrow_and_update();

        store.finish_loading();
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        store.finish_loading();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), "treelives");
        assert!(storage.load().unwrap().is_none());

        let session = PersistedSession {
            access_token: "abc".to_string(),
            identity: Some(identity(Role::User)),
        };
        storage.save(&session).unwrap();
        assert!(storage.path().ends_with("treelives/session.json"));
        assert!(!storage.path().with_extension("json.tmp").exists());
        assert_eq!(storage.load().unwrap(), Some(session));

        storage.remove().unwrap();
        assert!(storage.load().unwrap().is_none());
        storage.remove().unwrap();
    }

    #[test]
    fn test_file_storage_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), "treelives");
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        fs::write(storage.path(), b"{not json").unwrap();

        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let first = SessionStore::new(Arc::new(FileStorage::new(dir.path(), "app")));
        first
            .set_identity(identity(Role::User), "durable".to_string())
            .unwrap();

        let second = SessionStore::new(Arc::new(FileStorage::new(dir.path(), "app")));
        assert_eq!(second.credential().as_deref(), Some("durable"));
        assert!(second.identity().is_none());
    }
}
