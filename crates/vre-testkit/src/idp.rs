//! Fake identity provider and directory service
//!
//! A single [`httptest::Server`] plays both upstream systems; tests register
//! the calls they expect and the server verifies them when dropped.

use crate::keys::{jwks, SigningFixture};
use httptest::matchers::{contains, request, url_decoded};
use httptest::responders::{json_encoded, status_code};
use httptest::{all_of, Expectation, Server};
use serde_json::json;
use vre_core::HubConfig;

/// Realm path of the fake identity provider
pub const REALM_PATH: &str = "/auth/realms/test/";
/// Ticket endpoint path
pub const TOKEN_PATH: &str = "/auth/realms/test/protocol/openid-connect/token";
/// Key set path
pub const JWKS_PATH: &str = "/auth/realms/test/protocol/openid-connect/certs";
/// Discovery document path
pub const DISCOVERY_PATH: &str = "/auth/realms/test/.well-known/openid-configuration";
/// Resource catalog path
pub const CATALOG_PATH: &str = "/registry/GenericResource/JupyterHub";
/// Compute endpoint lookup path
pub const COMPUTE_PATH: &str = "/registry/ServiceEndpoint/DataAnalysis/DataMiner";

/// Client id used by [`FakeUpstream::config`]
pub const CLIENT_ID: &str = "hub-client";

/// HTTP fake standing in for the identity provider and directory service
pub struct FakeUpstream {
    server: Server,
}

impl FakeUpstream {
    /// Start the fake on an ephemeral port
    pub fn start() -> Self {
        Self {
            server: Server::run(),
        }
    }

    /// Underlying server, for ad-hoc expectations
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Absolute URL of a path on the fake
    pub fn url(&self, path: &str) -> String {
        self.server.url_str(path)
    }

    /// Hub configuration pointing every endpoint at this fake
    pub fn config(&self) -> HubConfig {
        HubConfig {
            oidc_url: self.url(REALM_PATH),
            client_id: CLIENT_ID.to_string(),
            registry_base_url: self.url("/registry"),
            ..HubConfig::default()
        }
    }

    /// Serve discovery and key set, allowing repeated fetches
    pub fn expect_discovery(&self, keys: &[&SigningFixture]) {
        self.server.expect(
            Expectation::matching(request::method_path("GET", DISCOVERY_PATH))
                .times(1..)
                .respond_with(json_encoded(json!({
                    "issuer": self.url(REALM_PATH),
                    "jwks_uri": self.url(JWKS_PATH),
                    "token_endpoint": self.url(TOKEN_PATH),
                }))),
        );
        self.server.expect(
            Expectation::matching(request::method_path("GET", JWKS_PATH))
                .times(1..)
                .respond_with(json_encoded(jwks(keys))),
        );
    }

    /// Answer one ticket request for `audience` with a signed ticket
    pub fn expect_ticket(&self, audience: &str, access_token: &str, ticket: String) {
        self.server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", TOKEN_PATH),
                request::headers(contains((
                    "authorization",
                    format!("Bearer {access_token}")
                ))),
                request::body(url_decoded(contains(("audience", audience.to_string())))),
                request::body(url_decoded(contains((
                    "grant_type",
                    "urn:ietf:params:oauth:grant-type:uma-ticket"
                )))),
            ])
            .respond_with(json_encoded(json!({
                "access_token": ticket,
                "token_type": "Bearer",
            }))),
        );
    }

    /// Refuse every ticket request with `status`
    pub fn refuse_tickets(&self, status: u16) {
        self.server.expect(
            Expectation::matching(request::method_path("POST", TOKEN_PATH))
                .times(1..)
                .respond_with(status_code(status)),
        );
    }

    /// Serve the catalog document to a bearer of `token`
    pub fn expect_catalog(&self, token: &str, xml: String) {
        self.server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", CATALOG_PATH),
                request::headers(contains(("authorization", format!("Bearer {token}")))),
            ])
            .respond_with(
                status_code(200)
                    .append_header("Content-Type", "application/xml")
                    .body(xml),
            ),
        );
    }

    /// Serve the compute endpoint document
    pub fn expect_compute_endpoints(&self, xml: String) {
        self.server.expect(
            Expectation::matching(request::method_path("GET", COMPUTE_PATH)).respond_with(
                status_code(200)
                    .append_header("Content-Type", "application/xml")
                    .body(xml),
            ),
        );
    }
}
