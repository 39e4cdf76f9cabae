//! State carried from login to session launch

use super::catalog::CatalogParse;
use super::identity::{IdentityContext, PermissionSet, RoleSet};
use serde::{Deserialize, Serialize};

/// Output of permission resolution for one context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPermissions {
    /// Access token scoped to the context audience
    pub context_token: String,
    /// Resources the client application's policy grants
    pub permissions: PermissionSet,
    /// Roles the user holds inside the context
    pub roles: RoleSet,
}

/// Everything the launch step needs from a successful login.
///
/// Created once per login and discarded once the launch configuration is
/// rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    /// Login parameters
    pub identity: IdentityContext,
    /// Tokens, permissions and roles
    pub resolved: ResolvedPermissions,
    /// Parsed resource catalog of the context
    pub catalog: CatalogParse,
    /// Compute endpoint discovered for the context, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_endpoint: Option<String>,
}

impl AuthState {
    /// Context-scoped token
    pub fn context_token(&self) -> &str {
        &self.resolved.context_token
    }

    /// Roles held in the context
    pub fn roles(&self) -> &RoleSet {
        &self.resolved.roles
    }

    /// Granted permission claims
    pub fn permissions(&self) -> &PermissionSet {
        &self.resolved.permissions
    }
}
