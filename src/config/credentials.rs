//! Rackspace API credentials

use crate::BootstrapError;
use std::fmt;

/// Environment variable holding the account user name
pub const USERNAME_ENV: &str = "RACKSPACE_USERNAME";

/// Environment variable holding the account API key
pub const APIKEY_ENV: &str = "RACKSPACE_APIKEY";

/// Account user name and API key
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }

    /// Read `RACKSPACE_USERNAME` and `RACKSPACE_APIKEY`
    pub fn from_env() -> Result<Self, BootstrapError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; both values must be present
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BootstrapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match (lookup(USERNAME_ENV), lookup(APIKEY_ENV)) {
            (Some(username), Some(api_key)) => Ok(Self::new(username, api_key)),
            _ => Err(BootstrapError::MissingCredentials),
        }
    }
}

// Never print the API key.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_both_present() {
        let creds =
            Credentials::from_lookup(lookup_from(&[(USERNAME_ENV, "ops"), (APIKEY_ENV, "k3y")]))
                .unwrap();
        assert_eq!(creds, Credentials::new("ops", "k3y"));
    }

    #[test]
    fn test_missing_either_is_fatal() {
        let only_user = Credentials::from_lookup(lookup_from(&[(USERNAME_ENV, "ops")]));
        assert!(matches!(only_user, Err(BootstrapError::MissingCredentials)));

        let only_key = Credentials::from_lookup(lookup_from(&[(APIKEY_ENV, "k3y")]));
        assert!(matches!(only_key, Err(BootstrapError::MissingCredentials)));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let creds = Credentials::new("ops", "super-secret");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("ops"));
        assert!(!rendered.contains("super-secret"));
    }
}
