//! Property test strategies for hub types

use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use crate::cpus;
use vre_core::{RoleSet, ServerOption};

/// Role names drawn from a small alphabet so collisions actually happen
pub fn arb_role() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Data-Manager".to_string()),
        Just("VRE-Manager".to_string()),
        Just("foo-role".to_string()),
        "[a-z]{1,6}-role",
    ]
}

/// Role sets, including the empty set
pub fn arb_role_set() -> impl Strategy<Value = RoleSet> {
    prop::collection::vec(arb_role(), 0..4).prop_map(|roles| roles.into_iter().collect())
}

/// Server options of a recognized option-type with an optional role
pub fn arb_server_option() -> impl Strategy<Value = ServerOption> {
    (
        "[a-z]{3,8}-authid",
        "[A-Z][a-z]{2,8}",
        prop::option::of(arb_role()),
        prop::option::of(1u32..16),
        any::<bool>(),
    )
        .prop_map(|(auth_id, display_name, role, cores, is_default)| ServerOption {
            auth_id,
            display_name,
            description: String::new(),
            catalog_name: "ServerOption".to_string(),
            role,
            image: None,
            cpu_cores: cores.map(|c| cpus(&c.to_string())),
            memory: None,
            gpu_requested: false,
            is_default,
        })
}
