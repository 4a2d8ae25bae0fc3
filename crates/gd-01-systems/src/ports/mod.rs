//! # Ports Layer
//!
//! Hexagonal architecture ports (interfaces) for the Systems subsystem.
//!
//! - **Driving Ports (Inbound)**: the API the router dispatches to
//! - **Driven Ports (Outbound)**: storage, message bus and plugin collaborators

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
