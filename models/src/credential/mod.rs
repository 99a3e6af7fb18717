pub mod builder;

use serde::Serialize;

/// A login stored in the peer's vault.
///
/// `credential_id` is `None` for a credential that has not been saved yet.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub user_id: String,
    pub credential_id: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: String,
}

impl Credential {
    pub fn is_stored(&self) -> bool {
        self.credential_id.is_some()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("credential_id", &self.credential_id)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("url", &self.url)
            .finish()
    }
}
