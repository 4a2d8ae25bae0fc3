//! # gd-02-local-plugins
//!
//! Supervision of plugin processes launched on this host.
//!
//! ## Overview
//!
//! - [`PluginRunner`]: owns one child process, from spawn to exit
//! - [`LocalPluginManager`]: keeps launch specs and the runners started from them
//!
//! ## Process Model
//!
//! ```text
//! LocalPluginManager ──launch──→ tokio task ──→ PluginRunner::start ──→ child (own process group)
//!         │                                             │
//!         └──stop──→ PluginRunner::kill ──notify──→─────┘ start_kill, wait
//! ```
//!
//! Spawn and runtime failures are logged by the runner and never returned.
//! Whether a plugin is alive is observable through [`PluginRunner::is_running`]
//! and [`PluginRunner::exit_status`].

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod error;
pub mod manager;
pub mod runner;

pub use error::LocalPluginError;
pub use manager::{LocalPluginManager, PluginLaunchSpec, DEFAULT_STOP_TIMEOUT};
pub use runner::{PluginRunner, RunnerState};
