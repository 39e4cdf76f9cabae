//! Permission resolution for a login context
//!
//! Two tickets are obtained concurrently for the same access token:
//!
//! - one for the hub's own client audience, carrying a claim token that names
//!   the encoded context; its `authorization.permissions` lists the resource
//!   names the user may launch
//! - one for the encoded context itself; its raw form becomes the context
//!   token handed to sessions and its `resource_access` yields the user's
//!   roles in that context

use crate::token_client::TicketExchange;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use vre_core::{
    IdentityContext, PermissionClaim, PermissionSet, ResolvedPermissions, RoleSet, VreError,
    VreResult,
};

/// Claim token naming the encoded context: base64 of `{"context":[ctx]}`
pub fn context_claim_token(encoded_context: &str) -> String {
    STANDARD.encode(json!({ "context": [encoded_context] }).to_string())
}

/// Resource names granted by a client-audience ticket.
///
/// A ticket without `authorization.permissions` is rejected; entries lacking
/// `rsname` are ignored.
pub fn extract_permissions(claims: &Value) -> VreResult<PermissionSet> {
    let entries = claims
        .get("authorization")
        .and_then(|a| a.get("permissions"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            VreError::ticket_verification("ticket carries no authorization.permissions claim")
        })?;

    Ok(entries
        .iter()
        .filter_map(|entry| match entry.get("rsname").and_then(Value::as_str) {
            Some(name) => Some(PermissionClaim::new(name)),
            None => {
                tracing::warn!("ignoring permission entry without rsname");
                None
            }
        })
        .collect())
}

/// Roles held under `resource_access[encoded_context]`; empty when absent
pub fn extract_roles(claims: &Value, encoded_context: &str) -> RoleSet {
    claims
        .get("resource_access")
        .and_then(|access| access.get(encoded_context))
        .and_then(|resource| resource.get("roles"))
        .and_then(Value::as_array)
        .map(|roles| roles.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Resolves permissions and roles through a [`TicketExchange`]
#[derive(Debug, Clone)]
pub struct PermissionResolver<T> {
    tickets: T,
}

impl<T: TicketExchange> PermissionResolver<T> {
    /// Resolver obtaining tickets through `tickets`
    pub fn new(tickets: T) -> Self {
        Self { tickets }
    }

    /// Resolve what the holder of `access_token` may do in `identity`'s
    /// context, using `client_audience` for the permissions ticket.
    pub async fn resolve(
        &self,
        identity: &IdentityContext,
        client_audience: &str,
        access_token: &str,
    ) -> VreResult<ResolvedPermissions> {
        if !identity.has_context() {
            return Err(VreError::missing_context(
                "login request does not name a context",
            ));
        }

        let encoded = identity.encoded_context();
        let claim_token = context_claim_token(&encoded);

        let (client_ticket, context_ticket) = tokio::try_join!(
            self.tickets
                .exchange_for_ticket(client_audience, access_token, Some(&claim_token)),
            self.tickets.exchange_for_ticket(&encoded, access_token, None),
        )?;

        let permissions = extract_permissions(&client_ticket.claims)?;
        let roles = extract_roles(&context_ticket.claims, &encoded);
        tracing::info!(
            context = %identity.context,
            permissions = permissions.len(),
            roles = roles.len(),
            "permissions resolved"
        );

        Ok(ResolvedPermissions {
            context_token: context_ticket.raw,
            permissions,
            roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_client::SignedTicket;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use vre_testkit::TicketClaims;

    const CONTEXT: &str = "/gcube/devsec/dev VRE";
    const ENCODED: &str = "%2Fgcube%2Fdevsec%2Fdev+VRE";

    #[derive(Default)]
    struct ScriptedExchange {
        client: Option<Value>,
        context: Option<Value>,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl TicketExchange for ScriptedExchange {
        async fn exchange_for_ticket(
            &self,
            audience: &str,
            _access_token: &str,
            claim_token: Option<&str>,
        ) -> VreResult<SignedTicket> {
            self.calls
                .lock()
                .unwrap()
                .push((audience.to_string(), claim_token.map(str::to_string)));
            let claims = if audience == ENCODED {
                self.context.clone()
            } else {
                self.client.clone()
            };
            claims
                .map(|claims| SignedTicket {
                    raw: format!("raw-{audience}"),
                    key_id: "kid".to_string(),
                    claims,
                })
                .ok_or_else(|| VreError::ticket_exchange(format!("refused {audience}")))
        }
    }

    fn identity() -> IdentityContext {
        IdentityContext::from_login_params(Some(CONTEXT), None, None)
    }

    #[test]
    fn test_claim_token_names_encoded_context() {
        let decoded = STANDARD.decode(context_claim_token(ENCODED)).unwrap();
        let value: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value, json!({ "context": [ENCODED] }));
    }

    #[test]
    fn test_roles_missing_is_empty() {
        let claims = TicketClaims::for_audience(ENCODED).build();
        assert!(extract_roles(&claims, ENCODED).is_empty());

        let claims = TicketClaims::for_audience(ENCODED)
            .roles("other-resource", ["Data-Manager"])
            .build();
        assert!(extract_roles(&claims, ENCODED).is_empty());
    }

    #[test]
    fn test_permissions_require_authorization_claim() {
        let claims = TicketClaims::for_audience("hub").without_authorization().build();
        assert_matches!(
            extract_permissions(&claims),
            Err(VreError::TicketVerification { .. })
        );

        let claims = json!({"authorization": {"permissions": [{"rsid": "x"}, {"rsname": "Jupyter"}]}});
        let permissions = extract_permissions(&claims).unwrap();
        assert_eq!(permissions.len(), 1);
        assert!(permissions.grants("Jupyter"));
    }

    #[tokio::test]
    async fn test_resolve_combines_both_tickets() {
        let exchange = ScriptedExchange {
            client: Some(
                TicketClaims::for_audience("hub")
                    .permission("JupyterLab")
                    .permission("RStudio")
                    .build(),
            ),
            context: Some(
                TicketClaims::for_audience(ENCODED)
                    .roles(ENCODED, ["Data-Manager", "Member"])
                    .build(),
            ),
            ..Default::default()
        };
        let resolver = PermissionResolver::new(exchange);

        let resolved = resolver.resolve(&identity(), "hub", "access").await.unwrap();
        assert_eq!(resolved.context_token, format!("raw-{ENCODED}"));
        assert!(resolved.permissions.grants("RStudio"));
        assert!(resolved.roles.contains("Data-Manager"));

        let mut calls = resolver.tickets.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                (ENCODED.to_string(), None),
                ("hub".to_string(), Some(context_claim_token(ENCODED))),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_context_skips_exchange() {
        let resolver = PermissionResolver::new(ScriptedExchange::default());
        let identity = IdentityContext::from_login_params(Some(""), Some("ns"), None);

        let err = resolver.resolve(&identity, "hub", "access").await.unwrap_err();
        assert_matches!(err, VreError::MissingContext { .. });
        assert!(resolver.tickets.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refused_context_ticket_fails_resolution() {
        let exchange = ScriptedExchange {
            client: Some(TicketClaims::for_audience("hub").permission("JupyterLab").build()),
            ..Default::default()
        };
        let resolver = PermissionResolver::new(exchange);

        let err = resolver.resolve(&identity(), "hub", "access").await.unwrap_err();
        assert_matches!(err, VreError::TicketExchange { .. });
    }
}
