//! Read-only access to the bearer credential of the current session.

/// Environment variable consulted by default for the bearer token.
pub const DEFAULT_TOKEN_ENV: &str = "FUNDUS_AUTH_TOKEN";

/// Source of the bearer token sent with every inference request.
///
/// Reads are synchronous. Refreshing or storing tokens is someone else's job.
pub trait SessionStore: Send + Sync {
    fn auth_token(&self) -> Option<String>;
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvSessionStore {
    variable: String,
}

impl EnvSessionStore {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }
}

impl Default for EnvSessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ENV)
    }
}

impl SessionStore for EnvSessionStore {
    fn auth_token(&self) -> Option<String> {
        std::env::var(&self.variable)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

/// A fixed token, e.g. one passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticSessionStore(Option<String>);

impl StaticSessionStore {
    pub fn new(token: Option<String>) -> Self {
        Self(token)
    }
}

impl SessionStore for StaticSessionStore {
    fn auth_token(&self) -> Option<String> {
        self.0.clone()
    }
}
