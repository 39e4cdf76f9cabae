//! Ticket claim builders shaped like the identity provider's responses

use serde_json::{json, Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Builder for the claims of a signed authorization ticket
#[derive(Debug, Clone)]
pub struct TicketClaims {
    audience: String,
    permissions: Vec<String>,
    roles: Vec<(String, Vec<String>)>,
    expires_in: i64,
    omit_authorization: bool,
}

impl TicketClaims {
    /// Ticket for an audience, valid for five minutes
    pub fn for_audience(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            permissions: Vec::new(),
            roles: Vec::new(),
            expires_in: 300,
            omit_authorization: false,
        }
    }

    /// Grant a resource name
    pub fn permission(mut self, resource_name: impl Into<String>) -> Self {
        self.permissions.push(resource_name.into());
        self
    }

    /// Grant roles under a resource-access key
    pub fn roles<I, S>(mut self, resource: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .push((resource.into(), roles.into_iter().map(Into::into).collect()));
        self
    }

    /// Expire the ticket relative to now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_in = seconds;
        self
    }

    /// Leave out the `authorization` claim entirely
    pub fn without_authorization(mut self) -> Self {
        self.omit_authorization = true;
        self
    }

    /// Render the claims object
    pub fn build(&self) -> Value {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        let mut claims = Map::new();
        claims.insert("aud".into(), json!(self.audience));
        claims.insert("iat".into(), json!(now));
        claims.insert("exp".into(), json!(now + self.expires_in));
        claims.insert("sub".into(), json!("7d5a3b2c-user"));

        if !self.omit_authorization {
            let permissions: Vec<Value> = self
                .permissions
                .iter()
                .map(|name| json!({"rsid": format!("id-{name}"), "rsname": name}))
                .collect();
            claims.insert("authorization".into(), json!({ "permissions": permissions }));
        }

        if !self.roles.is_empty() {
            let access: Map<String, Value> = self
                .roles
                .iter()
                .map(|(resource, roles)| (resource.clone(), json!({ "roles": roles })))
                .collect();
            claims.insert("resource_access".into(), Value::Object(access));
        }

        Value::Object(claims)
    }
}
