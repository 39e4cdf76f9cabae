//! Identity context, permission claims and role sets

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::form_urlencoded;

/// Login parameters attached to one authentication attempt.
///
/// Values are stored as the user supplied them. The identity provider keys
/// audiences and resource-access claims by the form-encoded context, which is
/// what [`IdentityContext::encoded_context`] returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    /// Opaque organisation/VRE path, e.g. `/gcube/devsec/devVRE`
    pub context: String,
    /// Optional namespace to launch the session in
    pub namespace: Option<String>,
    /// Optional label value attached to the session
    pub label: Option<String>,
}

impl IdentityContext {
    /// Capture the login request parameters. Empty strings count as absent.
    pub fn from_login_params(
        context: Option<&str>,
        namespace: Option<&str>,
        label: Option<&str>,
    ) -> Self {
        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_owned);
        Self {
            context: non_empty(context).unwrap_or_default(),
            namespace: non_empty(namespace),
            label: non_empty(label),
        }
    }

    /// Whether the login flow supplied a context at all
    pub fn has_context(&self) -> bool {
        !self.context.trim().is_empty()
    }

    /// Context as sent to the identity provider
    pub fn encoded_context(&self) -> String {
        form_encode(&self.context)
    }

    /// Namespace in the encoding used for the host platform
    pub fn encoded_namespace(&self) -> Option<String> {
        self.namespace.as_deref().map(form_encode)
    }

    /// Label in the encoding used for the host platform
    pub fn encoded_label(&self) -> Option<String> {
        self.label.as_deref().map(form_encode)
    }

    /// Last path segment of the context, i.e. the VRE name
    pub fn vre_name(&self) -> Option<&str> {
        if !self.has_context() {
            return None;
        }
        self.context.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

/// `application/x-www-form-urlencoded` encoding of a single value
pub fn form_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// A named resource the user is authorized for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionClaim {
    /// Resource name; matches a server option's `AuthId`
    #[serde(rename = "rsname")]
    pub resource_name: String,
}

impl PermissionClaim {
    /// Create a claim for a resource name
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
        }
    }
}

/// Granted permission claims, deduplicated by resource name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<PermissionClaim>);

impl PermissionSet {
    /// Empty permission set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a resource name has been granted
    pub fn grants(&self, resource_name: &str) -> bool {
        self.0.contains(&PermissionClaim::new(resource_name))
    }

    /// Number of distinct granted resources
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has been granted
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate granted resource names in order
    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|claim| claim.resource_name.as_str())
    }
}

impl FromIterator<PermissionClaim> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionClaim>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Role names active in one identity context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Empty role set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the role is held
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// Number of roles
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no role is held
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate role names in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_context_is_form_encoded() {
        let ctx = IdentityContext::from_login_params(Some("/gcube/devsec/dev VRE"), None, None);
        assert_eq!(ctx.encoded_context(), "%2Fgcube%2Fdevsec%2Fdev+VRE");
        assert_eq!(ctx.vre_name(), Some("dev VRE"));
    }

    #[test]
    fn test_empty_params_are_absent() {
        let ctx = IdentityContext::from_login_params(Some(""), Some(""), None);
        assert!(!ctx.has_context());
        assert_eq!(ctx.namespace, None);
        assert_eq!(ctx.vre_name(), None);
    }

    #[test]
    fn test_permissions_deduplicate() {
        let set: PermissionSet = ["a", "b", "a"].into_iter().map(PermissionClaim::new).collect();
        assert_eq!(set.len(), 2);
        assert!(set.grants("a"));
        assert!(!set.grants("c"));
    }

    proptest! {
        #[test]
        fn encoded_context_decodes_back(context in "\\PC{1,40}") {
            let ctx = IdentityContext::from_login_params(Some(&context), None, None);
            let encoded = ctx.encoded_context();
            prop_assert!(!encoded.contains(['/', '&', '=', ' ']));

            let decoded: Vec<_> = form_urlencoded::parse(encoded.as_bytes()).collect();
            prop_assert_eq!(decoded.len(), 1);
            prop_assert_eq!(decoded[0].0.as_ref(), context.as_str());
        }

        #[test]
        fn permission_set_grants_exactly_its_names(
            names in prop::collection::vec("[a-z]{1,6}", 0..12),
            candidate in "[a-z]{1,6}",
        ) {
            let set: PermissionSet = names.iter().map(PermissionClaim::new).collect();
            prop_assert_eq!(set.grants(&candidate), names.contains(&candidate));
            prop_assert!(set.resource_names().all(|name| set.grants(name)));
            prop_assert!(set.len() <= names.len());
        }
    }

    #[test]
    fn test_permission_claim_wire_name() {
        let claim: PermissionClaim =
            serde_json::from_str(r#"{"rsid": "1234", "rsname": "witoil-authid"}"#).unwrap();
        assert_eq!(claim.resource_name, "witoil-authid");
    }
}
