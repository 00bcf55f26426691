//! Customer session: the authenticated identity and its persistence.
//!
//! At most one identity is held at a time. It is written to a
//! [`KeyValueStore`] under three keys (`email`, `token`, `role`) so a new
//! process can pick the session back up.

mod store;

pub use store::{Change, FileStore, KeyValueStore, MemoryStore};

use secrecy::{ExposeSecret, SecretString};
use solsplit_core::{Email, Role};
use thiserror::Error;
use tracing::{debug, warn};

/// Storage key for the customer email.
pub const EMAIL_KEY: &str = "email";
/// Storage key for the session token.
pub const TOKEN_KEY: &str = "token";
/// Storage key for the role tag.
pub const ROLE_KEY: &str = "role";

const CLEARED: [Change<'static>; 3] = [(EMAIL_KEY, None), (TOKEN_KEY, None), (ROLE_KEY, None)];

/// Errors from the persisted session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The store could not be read or written.
    #[error("session storage error: {0}")]
    Io(#[from] std::io::Error),

    /// The store holds malformed data.
    #[error("session storage is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

/// An authenticated customer.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Identity {
    pub email: Email,
    pub token: SecretString,
    pub role: Option<Role>,
}

impl Identity {
    #[must_use]
    pub fn new(email: Email, token: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            email,
            token: SecretString::from(token.into()),
            role,
        }
    }

    /// Whether this identity carries the admin role tag.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_admin)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Holds the current identity and mirrors it to persistent storage.
pub struct SessionHolder<S> {
    store: S,
    identity: Option<Identity>,
}

impl<S: KeyValueStore> SessionHolder<S> {
    /// Create an empty holder. Call [`Self::restore`] to pick up a saved session.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            identity: None,
        }
    }

    /// Rebuild the identity from storage.
    ///
    /// Both email and token must be present; a role on its own is ignored.
    /// A stored email that no longer parses is treated as absent, and so is
    /// a store holding malformed data, which is then cleared.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    pub fn restore(&mut self) -> Result<Option<&Identity>, SessionError> {
        self.identity = match self.read_identity() {
            Ok(identity) => identity,
            Err(SessionError::Format(e)) => {
                warn!(error = %e, "Discarding corrupt stored session");
                if let Err(e) = self.store.apply(&CLEARED) {
                    warn!(error = %e, "Could not clear corrupt stored session");
                }
                None
            }
            Err(e) => return Err(e),
        };

        Ok(self.identity.as_ref())
    }

    fn read_identity(&self) -> Result<Option<Identity>, SessionError> {
        let email = self.store.get(EMAIL_KEY)?;
        let token = self.store.get(TOKEN_KEY)?;

        Ok(match (email, token) {
            (Some(email), Some(token)) if !token.is_empty() => match Email::parse(&email) {
                Ok(email) => {
                    let role = self.store.get(ROLE_KEY)?.map(Role::new);
                    debug!(email = %email, "Restored session");
                    Some(Identity::new(email, token, role))
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring stored session with invalid email");
                    None
                }
            },
            _ => None,
        })
    }

    /// Replace the held identity and persist it.
    ///
    /// All three keys are written as one batch; a login without a role
    /// removes any previously stored role.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written. The in-memory identity
    /// is replaced regardless, so the session lasts for this process.
    pub fn login(&mut self, identity: Identity) -> Result<&Identity, SessionError> {
        let persisted = self.store.apply(&[
            (EMAIL_KEY, Some(identity.email.as_str())),
            (TOKEN_KEY, Some(identity.token.expose_secret())),
            (ROLE_KEY, identity.role.as_ref().map(Role::as_str)),
        ]);
        let identity = self.identity.insert(identity);
        persisted.map(|()| &*identity)
    }

    /// Forget the identity in memory and in storage.
    ///
    /// Every key is removed even if an earlier removal fails.
    ///
    /// # Errors
    ///
    /// Returns the first error from the store. The in-memory identity is
    /// cleared regardless.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.identity = None;
        self.store.apply(&CLEARED)
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_admin)
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    /// Memory store whose writes to one key always fail.
    struct BrokenKey {
        inner: MemoryStore,
        key: &'static str,
    }

    impl BrokenKey {
        fn check(&self, key: &str) -> Result<(), SessionError> {
            if key == self.key {
                return Err(std::io::Error::other("disk full").into());
            }
            Ok(())
        }
    }

    impl KeyValueStore for BrokenKey {
        fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
            self.check(key)?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), SessionError> {
            self.check(key)?;
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_restore_without_role() {
        let store = Arc::new(MemoryStore::new());

        let mut first = SessionHolder::new(Arc::clone(&store));
        first
            .login(Identity::new(email("a@b.com"), "t1", None))
            .unwrap();

        let mut second = SessionHolder::new(Arc::clone(&store));
        let identity = second.restore().unwrap().unwrap();
        assert_eq!(identity.email.as_str(), "a@b.com");
        assert_eq!(identity.token.expose_secret(), "t1");
        assert!(identity.role.is_none());
        assert!(!second.is_admin());
    }

    #[test]
    fn test_role_alone_does_not_restore() {
        let store = MemoryStore::new();
        store.set(ROLE_KEY, Role::ADMIN_TAG).unwrap();

        let mut holder = SessionHolder::new(store);
        assert!(holder.restore().unwrap().is_none());
        assert!(!holder.is_authenticated());
        assert!(!holder.is_admin());
    }

    #[test]
    fn test_restore_requires_token() {
        let store = MemoryStore::new();
        store.set(EMAIL_KEY, "a@b.com").unwrap();

        let mut holder = SessionHolder::new(store);
        assert!(holder.restore().unwrap().is_none());
    }

    #[test]
    fn test_restore_ignores_invalid_email() {
        let store = MemoryStore::new();
        store.set(EMAIL_KEY, "not an email").unwrap();
        store.set(TOKEN_KEY, "t1").unwrap();

        let mut holder = SessionHolder::new(store);
        assert!(holder.restore().unwrap().is_none());
    }

    #[test]
    fn test_admin_role() {
        let mut holder = SessionHolder::new(MemoryStore::new());
        holder
            .login(Identity::new(email("root@solsplit.io"), "t2", Some(Role::admin())))
            .unwrap();
        assert!(holder.is_admin());

        holder
            .login(Identity::new(email("root@solsplit.io"), "t3", Some(Role::new("ROLE_USER"))))
            .unwrap();
        assert!(!holder.is_admin());
    }

    #[test]
    fn test_login_replaces_and_drops_stale_role() {
        let store = Arc::new(MemoryStore::new());
        let mut holder = SessionHolder::new(Arc::clone(&store));
        holder
            .login(Identity::new(email("admin@b.com"), "t1", Some(Role::admin())))
            .unwrap();
        holder
            .login(Identity::new(email("user@b.com"), "t2", None))
            .unwrap();

        assert_eq!(holder.identity().unwrap().email.as_str(), "user@b.com");
        assert_eq!(store.get(ROLE_KEY).unwrap(), None);
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("t2"));
    }

    #[test]
    fn test_logout_clears_everything() {
        let store = Arc::new(MemoryStore::new());
        let mut holder = SessionHolder::new(Arc::clone(&store));
        holder
            .login(Identity::new(email("a@b.com"), "t1", Some(Role::admin())))
            .unwrap();
        holder.logout().unwrap();

        assert!(!holder.is_authenticated());
        assert_eq!(store.get(EMAIL_KEY).unwrap(), None);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(ROLE_KEY).unwrap(), None);

        // Logging out twice is harmless.
        holder.logout().unwrap();
    }

    #[test]
    fn test_logout_removes_remaining_keys_after_failure() {
        let store = BrokenKey {
            inner: MemoryStore::new(),
            key: EMAIL_KEY,
        };
        store.inner.set(EMAIL_KEY, "a@b.com").unwrap();
        store.inner.set(TOKEN_KEY, "t1").unwrap();
        store.inner.set(ROLE_KEY, Role::ADMIN_TAG).unwrap();

        let mut holder = SessionHolder::new(store);
        holder.restore().unwrap();
        assert!(matches!(holder.logout(), Err(SessionError::Io(_))));

        assert!(!holder.is_authenticated());
        assert_eq!(holder.store().get(TOKEN_KEY).unwrap(), None);
        assert_eq!(holder.store().get(ROLE_KEY).unwrap(), None);
    }

    #[test]
    fn test_login_keeps_identity_when_save_fails() {
        let store = BrokenKey {
            inner: MemoryStore::new(),
            key: TOKEN_KEY,
        };
        let mut holder = SessionHolder::new(store);

        let result = holder.login(Identity::new(email("a@b.com"), "t1", None));
        assert!(matches!(result, Err(SessionError::Io(_))));
        assert_eq!(holder.identity().unwrap().email.as_str(), "a@b.com");
    }

    #[test]
    fn test_corrupt_file_restores_as_logged_out() {
        let path = std::env::temp_dir()
            .join(format!("solsplit-session-{}", std::process::id()))
            .join("corrupt.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        let mut holder = SessionHolder::new(FileStore::new(&path));
        assert!(holder.restore().unwrap().is_none());
        assert_eq!(holder.store().get(EMAIL_KEY).unwrap(), None);
        holder.logout().unwrap();

        holder
            .login(Identity::new(email("a@b.com"), "t1", None))
            .unwrap();
        let mut reopened = SessionHolder::new(FileStore::new(&path));
        assert_eq!(
            reopened.restore().unwrap().unwrap().email.as_str(),
            "a@b.com"
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_identity_debug_redacts_token() {
        let identity = Identity::new(email("a@b.com"), "super-secret-token", None);
        assert!(!format!("{identity:?}").contains("super-secret-token"));
    }
}
