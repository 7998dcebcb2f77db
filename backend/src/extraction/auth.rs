//! Bearer tokens for the Document AI client.
//!
//! A token is requested before every call. [`DefaultCredentials`] resolves
//! Google application default credentials (`GOOGLE_APPLICATION_CREDENTIALS`,
//! the gcloud user config or the metadata server) through `gcp_auth`, which
//! caches the token and refreshes it before it expires. [`StaticToken`] is the
//! override for a token minted elsewhere.

use super::ExtractionError;
use gcp_auth::TokenProvider;
use std::sync::{Arc, Mutex};

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

pub trait AccessTokenSource: Send + Sync {
    fn bearer_token(&self) -> Result<String, ExtractionError>;
}

pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl AccessTokenSource for StaticToken {
    fn bearer_token(&self) -> Result<String, ExtractionError> {
        Ok(self.0.clone())
    }
}

/// Application default credentials, resolved on first use.
///
/// `gcp_auth` is async; its calls are driven by a private runtime so the
/// blocking extraction workers can use it. Must be dropped outside an async
/// context.
pub struct DefaultCredentials {
    runtime: tokio::runtime::Runtime,
    provider: Mutex<Option<Arc<dyn TokenProvider>>>,
}

impl DefaultCredentials {
    pub fn new() -> Result<Self, ExtractionError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("gcp-auth")
            .enable_all()
            .build()
            .map_err(|e| ExtractionError::Auth(format!("cannot start token runtime: {}", e)))?;
        Ok(Self {
            runtime,
            provider: Mutex::new(None),
        })
    }

    fn provider(&self) -> Result<Arc<dyn TokenProvider>, ExtractionError> {
        let mut slot = self.provider.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(provider) = slot.as_ref() {
            return Ok(provider.clone());
        }
        let provider = self
            .runtime
            .block_on(gcp_auth::provider())
            .map_err(|e| ExtractionError::Auth(e.to_string()))?;
        *slot = Some(provider.clone());
        Ok(provider)
    }
}

impl AccessTokenSource for DefaultCredentials {
    fn bearer_token(&self) -> Result<String, ExtractionError> {
        let provider = self.provider()?;
        let token = self
            .runtime
            .block_on(provider.token(&[CLOUD_PLATFORM_SCOPE]))
            .map_err(|e| ExtractionError::Auth(e.to_string()))?;
        Ok(token.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_token_is_returned_as_is() {
        let source = StaticToken::new("ya29.local");
        assert_eq!(source.bearer_token().unwrap(), "ya29.local");
        assert_eq!(source.bearer_token().unwrap(), "ya29.local");
    }
}
