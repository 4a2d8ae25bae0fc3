//! Integration flows across the garden crates.

pub mod local_plugins;
pub mod removal_flows;
pub mod system_lifecycle;
