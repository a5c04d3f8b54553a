//! Replicate provider: static token authentication.
//!
//! Replicate accepts `Authorization: Token <api token>`. Client headers are
//! never forwarded, so this is the only credential an upstream call carries.

use crate::{ErrorClassification, Provider, ProviderError};
use common::Secret;
use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

/// Token-authenticated Replicate API.
pub struct ReplicateProvider {
    token: Secret,
    api_url: Url,
}

impl ReplicateProvider {
    pub fn new(token: Secret, api_url: Url) -> Self {
        Self { token, api_url }
    }
}

impl Provider for ReplicateProvider {
    fn id(&self) -> &str {
        "replicate"
    }

    fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn prepare_request(&self, headers: &mut HeaderMap) -> crate::Result<()> {
        let mut value = HeaderValue::from_str(&format!("Token {}", self.token.expose()))
            .map_err(|_| ProviderError::InvalidCredential)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    fn classify_error(&self, status: u16) -> ErrorClassification {
        crate::classify_status(status)
    }

    fn scrub(&self, text: &str) -> String {
        self.token.scrub(text)
    }
}
