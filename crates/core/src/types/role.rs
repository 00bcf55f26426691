//! Role tag attached to an authenticated identity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Role tag issued by the backend at login (e.g. `ROLE_ADMIN`, `ROLE_USER`).
///
/// The tag is kept verbatim. The only thing derived from it is whether the
/// identity may use the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Tag the backend assigns to store administrators.
    pub const ADMIN_TAG: &'static str = "ROLE_ADMIN";

    /// Create a role from a raw tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The administrator role.
    #[must_use]
    pub fn admin() -> Self {
        Self(Self::ADMIN_TAG.to_owned())
    }

    /// Raw tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the administrator tag (exact match).
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN_TAG
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}
