//! VRE hub pipeline
//!
//! Library half of the `vrehub` binary: the end-to-end flow from a login
//! request to a launch configuration.

pub mod flow;

pub use flow::{HubFlow, LoginRequest};
