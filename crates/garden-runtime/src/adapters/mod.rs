//! # Adapters
//!
//! Implementations of the systems core's outbound ports.
//!
//! | Port | Adapter |
//! |------|---------|
//! | `SystemStore` | [`InMemorySystemStore`] |
//! | `MessageQueue` | [`InMemoryQueue`] |
//! | `PluginManager`, `PluginRegistry` | [`LocalPluginAdapter`] |

pub mod plugins;
pub mod queue;
pub mod store;

pub use plugins::LocalPluginAdapter;
pub use queue::{InMemoryQueue, PublishedMessage};
pub use store::InMemorySystemStore;
