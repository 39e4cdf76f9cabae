//! Login-to-launch pipeline
//!
//! [`HubFlow::authenticate`] runs everything that talks to the network and
//! yields an [`AuthState`]; [`HubFlow::launch`] renders the launch
//! configuration from it without further I/O. [`HubFlow::login`] chains both
//! and is the one place a failure turns into an [`AccessDenial`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vre_auth::{PermissionResolver, SigningKeyCache, TokenClient};
use vre_catalog::ResourceCatalogClient;
use vre_core::{AccessDenial, AuthState, HubConfig, IdentityContext, VreResult};
use vre_spawn::{LaunchConfiguration, SessionEnvironmentBuilder};

/// What the upstream identity flow and the login form hand over
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Access token from the upstream identity flow
    pub access_token: String,
    /// Context requested on the login form
    pub context: Option<String>,
    /// Namespace requested on the login form
    pub namespace: Option<String>,
    /// Label requested on the login form
    pub label: Option<String>,
}

impl LoginRequest {
    fn identity(&self) -> IdentityContext {
        IdentityContext::from_login_params(
            self.context.as_deref(),
            self.namespace.as_deref(),
            self.label.as_deref(),
        )
    }
}

/// Wires the hub components for one configuration
#[derive(Debug, Clone)]
pub struct HubFlow {
    config: Arc<HubConfig>,
    resolver: PermissionResolver<TokenClient>,
    catalog: ResourceCatalogClient,
}

impl HubFlow {
    /// Components for `config`, verifying tickets against `keys`
    pub fn new(config: Arc<HubConfig>, keys: Arc<SigningKeyCache>) -> Self {
        let tokens = TokenClient::new(&config, keys);
        let catalog = ResourceCatalogClient::new(&config);
        Self {
            resolver: PermissionResolver::new(tokens),
            catalog,
            config,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Resolve permissions, fetch the catalog and look up the compute
    /// endpoint for a login request
    pub async fn authenticate(&self, request: &LoginRequest) -> VreResult<AuthState> {
        let identity = request.identity();
        let resolved = self
            .resolver
            .resolve(&identity, &self.config.client_id, &request.access_token)
            .await?;

        let catalog = self
            .catalog
            .fetch_catalog(&self.config.catalog_endpoint(), &resolved.context_token)
            .await?;
        let compute_endpoint = self
            .catalog
            .discover_compute_endpoint(&self.config.compute_endpoint(), &resolved.context_token)
            .await;

        tracing::info!(
            context = %identity.context,
            server_options = catalog.server_options().count(),
            skipped = catalog.skipped.len(),
            "login authenticated"
        );
        Ok(AuthState {
            identity,
            resolved,
            catalog,
            compute_endpoint,
        })
    }

    /// Launch configuration for a named server (the unnamed one when `None`)
    pub fn launch(&self, state: &AuthState, server_name: Option<&str>) -> LaunchConfiguration {
        SessionEnvironmentBuilder::new(&self.config).build(state, server_name)
    }

    /// Authenticate and render, denying access on any fatal error
    pub async fn login(
        &self,
        request: &LoginRequest,
        server_name: Option<&str>,
    ) -> Result<LaunchConfiguration, AccessDenial> {
        match self.authenticate(request).await {
            Ok(state) => Ok(self.launch(&state, server_name)),
            Err(err) => Err(AccessDenial::from_error(&err)),
        }
    }
}
