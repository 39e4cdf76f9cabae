//! Identity provider client
//!
//! Exchanges a user's access token for signed authorization tickets and
//! verifies each ticket against the provider's published signing keys.

use crate::keys::{PublicKeySet, SigningKeyCache};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, Validation};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use vre_core::{HubConfig, VreError, VreResult};

/// Grant type of the ticket exchange
pub const UMA_TICKET_GRANT: &str = "urn:ietf:params:oauth:grant-type:uma-ticket";
/// Format of the optional claim token
pub const CLAIM_TOKEN_FORMAT: &str = "urn:ietf:params:oauth:token-type:jwt";

/// A verified ticket: the raw token plus its decoded claims
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTicket {
    /// Compact JWT as returned by the provider
    pub raw: String,
    /// Key id the ticket was signed under
    pub key_id: String,
    /// Verified claims
    pub claims: Value,
}

/// Obtains verified tickets for an audience
#[async_trait]
pub trait TicketExchange: Send + Sync {
    /// Exchange `access_token` for a ticket scoped to `audience`, optionally
    /// attaching a base64 claim token.
    async fn exchange_for_ticket(
        &self,
        audience: &str,
        access_token: &str,
        claim_token: Option<&str>,
    ) -> VreResult<SignedTicket>;
}

#[derive(Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

#[derive(Deserialize)]
struct KeySetDocument {
    #[serde(default)]
    keys: Vec<Value>,
}

#[derive(Deserialize)]
struct TicketResponse {
    access_token: String,
}

/// HTTP client for the identity provider
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    token_endpoint: String,
    discovery_endpoint: String,
    keys: Arc<SigningKeyCache>,
}

impl TokenClient {
    /// Client for the endpoints in `config`, sharing `keys` with other clients
    pub fn new(config: &HubConfig, keys: Arc<SigningKeyCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_endpoint: config.token_endpoint(),
            discovery_endpoint: config.discovery_endpoint(),
            keys,
        }
    }

    /// Replace the underlying HTTP client
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Key cache used by this client
    pub fn key_cache(&self) -> &Arc<SigningKeyCache> {
        &self.keys
    }

    /// Current signing keys, fetching them through the discovery document
    /// when none are cached. Failed fetches are not cached.
    pub async fn discover_signing_keys(&self) -> VreResult<Arc<PublicKeySet>> {
        if let Some(keys) = self.keys.get() {
            return Ok(keys);
        }

        tracing::debug!(endpoint = %self.discovery_endpoint, "fetching discovery document");
        let discovery: DiscoveryDocument = self.get_json(&self.discovery_endpoint).await?;
        let key_set: KeySetDocument = self.get_json(&discovery.jwks_uri).await?;

        let keys = PublicKeySet::from_jwks(&key_set.keys);
        if keys.is_empty() {
            return Err(VreError::discovery(format!(
                "key set at {} contains no usable signing keys",
                discovery.jwks_uri
            )));
        }

        tracing::info!(count = keys.len(), "signing keys discovered");
        Ok(self.keys.publish(keys))
    }

    /// Verify a compact ticket: RS256 signature by a published key, an
    /// audience containing `audience`, and an unexpired `exp`.
    pub async fn verify(&self, raw: &str, audience: &str) -> VreResult<SignedTicket> {
        let header = jsonwebtoken::decode_header(raw).map_err(|e| {
            VreError::ticket_verification(format!("malformed ticket header: {e}"))
        })?;
        let key_id = header
            .kid
            .ok_or_else(|| VreError::ticket_verification("ticket header carries no key id"))?;

        let keys = self.discover_signing_keys().await?;
        let key = keys.get(&key_id).ok_or_else(|| {
            VreError::ticket_verification(format!("no signing key published under {key_id}"))
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        let data = jsonwebtoken::decode::<Value>(raw, key, &validation).map_err(|e| {
            VreError::ticket_verification(format!("ticket for {audience} rejected: {e}"))
        })?;

        Ok(SignedTicket {
            raw: raw.to_string(),
            key_id,
            claims: data.claims,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> VreResult<T> {
        let response = self.http.get(url).send().await.map_err(|e| {
            VreError::discovery(format!("failed to reach {url}: {e}"))
        })?;

        if !response.status().is_success() {
            return Err(VreError::discovery(format!(
                "{url} answered {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| VreError::discovery(format!("unreadable document at {url}: {e}")))
    }
}

#[async_trait]
impl TicketExchange for TokenClient {
    async fn exchange_for_ticket(
        &self,
        audience: &str,
        access_token: &str,
        claim_token: Option<&str>,
    ) -> VreResult<SignedTicket> {
        let mut form = vec![
            ("grant_type", UMA_TICKET_GRANT),
            ("claim_token_format", CLAIM_TOKEN_FORMAT),
            ("audience", audience),
        ];
        if let Some(claim_token) = claim_token {
            form.push(("claim_token", claim_token));
        }

        let response = self
            .http
            .post(&self.token_endpoint)
            .bearer_auth(access_token)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                VreError::ticket_exchange(format!("failed to reach token endpoint: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(VreError::ticket_exchange(format!(
                "ticket for {audience} refused: {}",
                response.status()
            )));
        }

        let ticket: TicketResponse = response.json().await.map_err(|e| {
            VreError::ticket_exchange(format!("unreadable ticket response: {e}"))
        })?;
        tracing::debug!(audience, "ticket received");

        self.verify(&ticket.access_token, audience).await
    }
}
