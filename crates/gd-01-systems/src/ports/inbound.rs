//! Driving Ports (API - Inbound)

use async_trait::async_trait;
use shared_types::{PatchOperation, SearchParams, System, SystemId};

use crate::error::SystemResult;

/// Primary Systems API
///
/// This is the driving port for the Systems subsystem. The router is its
/// only caller; each method maps onto one route.
#[async_trait]
pub trait SystemApi: Send + Sync {
    /// Fetch one system. Fails `NotFound` for an unknown id.
    async fn get_one(&self, id: &SystemId) -> SystemResult<System>;

    /// Search systems. Criteria are passed to storage unmodified.
    async fn search(&self, params: SearchParams) -> SystemResult<Vec<System>>;

    /// Register a new system and emit `SYSTEM_CREATED`.
    async fn create(&self, system: System) -> SystemResult<System>;

    /// Apply patch operations in order and emit `SYSTEM_UPDATED`.
    ///
    /// Each operation is committed on its own. When operation *k* fails,
    /// operations before it stay persisted.
    async fn patch(&self, id: &SystemId, operations: Vec<PatchOperation>) -> SystemResult<System>;

    /// Re-read a system's command definitions from its live process.
    async fn reload(&self, id: &SystemId) -> SystemResult<System>;

    /// Rescan the plugin directory. Only `rescan` operations are accepted.
    async fn rescan(&self, operations: Vec<PatchOperation>) -> SystemResult<()>;

    /// Stop, clean up and delete a system, emitting `SYSTEM_REMOVED`.
    ///
    /// # Returns
    ///
    /// The last snapshot of the system before deletion.
    async fn remove(&self, id: &SystemId) -> SystemResult<System>;
}
