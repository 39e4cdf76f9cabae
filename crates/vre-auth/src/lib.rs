//! VRE hub authentication
//!
//! Turns a user's access token and login context into verified permissions:
//!
//! - [`SigningKeyCache`] / [`PublicKeySet`]: provider signing keys, fetched
//!   once through the discovery document and shared
//! - [`TokenClient`]: ticket exchange and ticket verification
//! - [`PermissionResolver`]: the two concurrent ticket exchanges that yield
//!   permissions, roles and the context token

pub mod keys;
pub mod resolver;
pub mod token_client;

pub use keys::{PublicKeySet, SigningKeyCache};
pub use resolver::{context_claim_token, extract_permissions, extract_roles, PermissionResolver};
pub use token_client::{SignedTicket, TicketExchange, TokenClient, CLAIM_TOKEN_FORMAT, UMA_TICKET_GRANT};
