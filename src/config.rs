//! Engine configuration.
//!
//! The engine needs very little: the base URL it pretends to live at (used
//! for record `url` fields and continuation tokens), the username of the
//! bootstrap current user, and the default page size.

use std::env;

use url::Url;

use crate::error::{MockError, Result};
use crate::pagination::DEFAULT_PAGE_SIZE;

const DEFAULT_API_URL: &str = "https://mock.zendesk.com/api/v2";
const DEFAULT_USERNAME: &str = "agent@example.com";

/// Configuration for a [`MockEngine`](crate::MockEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    base_url: String,
    username: String,
    page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: format!("{DEFAULT_API_URL}/"),
            username: DEFAULT_USERNAME.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Create a configuration from environment variables.
    ///
    /// - `DESKMOCK_URL` (optional) - base URL, defaults to `https://mock.zendesk.com/api/v2`
    /// - `DESKMOCK_USERNAME` (optional) - email of the bootstrap current user
    /// - `DESKMOCK_PAGE_SIZE` (optional) - default page size, defaults to 100
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("DESKMOCK_URL") {
            config = config.with_base_url(&url)?;
        }

        if let Ok(username) = env::var("DESKMOCK_USERNAME") {
            config = config.with_username(&username);
        }

        if let Ok(size) = env::var("DESKMOCK_PAGE_SIZE") {
            let size: usize = size.parse().map_err(|_| {
                MockError::ConfigInvalid(format!("DESKMOCK_PAGE_SIZE must be a number, got '{size}'"))
            })?;
            config = config.with_page_size(size)?;
        }

        Ok(config)
    }

    /// Set the base URL. A trailing `/` is added if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    /// Set the bootstrap current user's email.
    #[must_use]
    pub fn with_username(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }

    /// Set the default page size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero.
    pub fn with_page_size(mut self, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(MockError::ConfigInvalid("page size must be positive".to_string()));
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Base URL, always ending with `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The base URL parsed for joining and origin checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored URL does not parse.
    pub fn api_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// Email of the bootstrap current user.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Default page size for list operations.
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

fn parse_base_url(base_url: &str) -> Result<String> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    Ok(Url::parse(&normalized)?.into())
}
