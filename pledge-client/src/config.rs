use crate::api::AuthToken;

pub const DEFAULT_HOST: &str = "http://localhost:3001";

/// Top-level comments fetched per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Replies are fetched in a single larger page when a thread is expanded
pub const DEFAULT_REPLY_PAGE_SIZE: u32 = 50;

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ClientConfig {
    pub host: String,
    pub token: Option<AuthToken>,
    pub page_size: u32,
    pub reply_page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            host: String::from(DEFAULT_HOST),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            reply_page_size: DEFAULT_REPLY_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Defaults, overridden by `PLEDGE_HOST` and `PLEDGE_TOKEN` when set
    pub fn from_env() -> ClientConfig {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> ClientConfig {
        let mut res = ClientConfig::default();
        if let Some(host) = get("PLEDGE_HOST").filter(|h| !h.is_empty()) {
            res.host = host;
        }
        if let Some(token) = get("PLEDGE_TOKEN").filter(|t| !t.is_empty()) {
            res.token = Some(AuthToken(token));
        }
        res
    }

    pub fn with_host(mut self, host: impl Into<String>) -> ClientConfig {
        self.host = host.into();
        self
    }

    pub fn with_token(mut self, token: AuthToken) -> ClientConfig {
        self.token = Some(token);
        self
    }

    /// Host without trailing slash, ready for `format!("{}/api/...")`
    pub(crate) fn base_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }
}
