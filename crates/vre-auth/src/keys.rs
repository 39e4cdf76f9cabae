//! Signing keys of the identity provider
//!
//! [`PublicKeySet`] is immutable once built. [`SigningKeyCache`] publishes one
//! set atomically and hands out shared references to it; concurrent first-time
//! fetches may race, and the first set published wins. The cache never
//! expires on its own; callers that learn of a key rotation call
//! [`SigningKeyCache::invalidate`].

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Verification keys indexed by key id
#[derive(Clone, Default)]
pub struct PublicKeySet {
    keys: HashMap<String, DecodingKey>,
}

impl PublicKeySet {
    /// Build from the `keys` array of a JSON web key set.
    ///
    /// Entries without a key id or that do not describe a usable verification
    /// key are skipped.
    pub fn from_jwks(keys: &[Value]) -> Self {
        let mut set = HashMap::new();
        for raw in keys {
            let Some(kid) = raw.get("kid").and_then(Value::as_str) else {
                tracing::warn!("ignoring published key without kid");
                continue;
            };
            let decoded = serde_json::from_value::<Jwk>(raw.clone())
                .map_err(|e| e.to_string())
                .and_then(|jwk| DecodingKey::from_jwk(&jwk).map_err(|e| e.to_string()));
            match decoded {
                Ok(key) => {
                    set.insert(kid.to_string(), key);
                }
                Err(reason) => {
                    tracing::warn!(kid, %reason, "ignoring unusable published key");
                }
            }
        }
        Self { keys: set }
    }

    /// Key published under `kid`
    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    /// Number of usable keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no usable key was published
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key ids in the set
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

impl fmt::Debug for PublicKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kids: Vec<&str> = self.key_ids().collect();
        kids.sort_unstable();
        f.debug_struct("PublicKeySet").field("key_ids", &kids).finish()
    }
}

/// Shared, explicitly invalidatable holder of the current key set
#[derive(Debug, Default)]
pub struct SigningKeyCache {
    current: RwLock<Option<Arc<PublicKeySet>>>,
}

impl SigningKeyCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently published key set, if any
    pub fn get(&self) -> Option<Arc<PublicKeySet>> {
        self.current.read().clone()
    }

    /// Publish a freshly fetched set unless another fetch already did.
    /// Returns whichever set is now current.
    pub fn publish(&self, keys: PublicKeySet) -> Arc<PublicKeySet> {
        let mut current = self.current.write();
        match current.as_ref() {
            Some(existing) => Arc::clone(existing),
            None => {
                let published = Arc::new(keys);
                *current = Some(Arc::clone(&published));
                published
            }
        }
    }

    /// Drop the current set; the next verification fetches it again
    pub fn invalidate(&self) {
        if self.current.write().take().is_some() {
            tracing::info!("signing key cache invalidated");
        }
    }
}
