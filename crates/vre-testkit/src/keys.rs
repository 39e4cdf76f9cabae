//! RSA signing fixtures
//!
//! Two fixed 2048-bit keys: the identity provider's real signing key and a
//! rogue key used to forge tickets that must fail verification.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

const IDP_PRIVATE_KEY: &str = include_str!("../fixtures/idp_signing_key.pem");
const IDP_MODULUS: &str = "vF3OnG2UWWmKcytCPPSQV3g10N-NhLAO-IpAeC35qeAggItnguvdmWk1lovn3dsMc2pvTRm_ElIOwVyGxlgK0dGKl06eCoyKhP5ejoZa20hopiwdG8BginTjv7ULj_Vq1iRARgpEbnG1T9SAKObt5WIcP1ToW3wVbqrSHETYiZgtpYrz8-zzcCoSbhuhNa211X1eFCcPEo5xdUNEhSXtqhZADDVNgnXTeN8jdbGat3em4x-LoxhKh9kcLPkd0t5Rafr9YXKvpadHXqdtrxvnM4_hCYHWpGzKCtbO3AX___zveNUhKuHZGkpUACPuDThHXvLcHuMDDFdFdYKV4T2zyQ";

const ROGUE_PRIVATE_KEY: &str = include_str!("../fixtures/rogue_signing_key.pem");
const ROGUE_MODULUS: &str = "2mxhEBLyyMN46OWLfm6xPUqUCqcPkW6lXdlYGoMwXtMOnIjlggdfHW5ZBeqybX75puFh6qo4PYjhlQas7JZ1W_ogQ-TaATrrBWCNU19lEW4qG92OH2VfH6eKq7WaAzJVJSyk39_EHv_DqjrNpzZ95du6M7VmR_Z9D71XMjEzLO_o1Er7l1__2hHv8pCFdHKiqdCJRKQFPYr7_s806PmSTQ76FhDbNsJEo_hO5ySGFPEeOP-zRMz5cUq8WWxNL67JaGZUIrf9aRQA748Tv7SWRxXw4njhq2Xhx9qq5GAnSxw5N5BPu-RztkYTcMNmSyd1-PxKMFvBE0I3w4CkEOOosQ";

const EXPONENT: &str = "AQAB";

/// Key id the identity provider advertises for its signing key
pub const IDP_KEY_ID: &str = "idp-rs256-1";

/// A signing key plus the key id it is published under
#[derive(Debug, Clone)]
pub struct SigningFixture {
    key_id: String,
    private_pem: &'static str,
    modulus: &'static str,
}

impl SigningFixture {
    /// The identity provider's signing key
    pub fn identity_provider() -> Self {
        Self {
            key_id: IDP_KEY_ID.to_string(),
            private_pem: IDP_PRIVATE_KEY,
            modulus: IDP_MODULUS,
        }
    }

    /// A key the identity provider never published
    pub fn rogue() -> Self {
        Self {
            key_id: "rogue-rs256".to_string(),
            private_pem: ROGUE_PRIVATE_KEY,
            modulus: ROGUE_MODULUS,
        }
    }

    /// Same key material, advertised under another key id
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = key_id.into();
        self
    }

    /// Key id placed in token headers
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Public half as a JSON web key
    pub fn jwk(&self) -> Value {
        json!({
            "kid": self.key_id,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": self.modulus,
            "e": EXPONENT,
        })
    }

    /// Sign claims as an RS256 JWT
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());
        let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes())
            .expect("fixture key is valid PEM");
        jsonwebtoken::encode(&header, claims, &key).expect("fixture signing succeeds")
    }
}

/// Key set document publishing the given keys
pub fn jwks(keys: &[&SigningFixture]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() })
}
