//! # In-Memory System Store
//!
//! Process-local implementation of the `SystemStore` port.
//!
//! Each call holds the lock for its whole duration, so every call is
//! atomic per record and nothing spans calls, matching what the core
//! expects from a document store.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use gd_01_systems::SystemStore;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use shared_types::{Command, InstanceStatus, SearchParams, StoreError, System, SystemId};
use tracing::debug;

/// Systems kept in memory, keyed by id.
#[derive(Default)]
pub struct InMemorySystemStore {
    systems: RwLock<BTreeMap<SystemId, System>>,
}

impl InMemorySystemStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.read().is_empty()
    }

    /// Record an instance status, as a remote plugin's status report would.
    pub fn set_instance_status(
        &self,
        id: &SystemId,
        instance_name: &str,
        status: InstanceStatus,
    ) -> Result<(), StoreError> {
        let mut systems = self.systems.write();
        let system = systems
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let instance = system
            .instances
            .iter_mut()
            .find(|instance| instance.name == instance_name)
            .ok_or_else(|| StoreError::Backend(format!("no instance {instance_name}")))?;
        instance.status = status;
        Ok(())
    }

    fn require_id(system: &System) -> Result<SystemId, StoreError> {
        system
            .id
            .clone()
            .ok_or_else(|| StoreError::Backend("system has no id".to_string()))
    }

    fn check_unique(
        systems: &BTreeMap<SystemId, System>,
        system: &System,
    ) -> Result<(), StoreError> {
        let clash = systems.values().any(|other| {
            other.id != system.id && other.name == system.name && other.version == system.version
        });
        if clash {
            return Err(StoreError::Duplicate {
                name: system.name.clone(),
                version: system.version.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SystemStore for InMemorySystemStore {
    async fn query_unique(&self, id: &SystemId) -> Result<System, StoreError> {
        self.systems
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn query(&self, params: &SearchParams) -> Result<Vec<System>, StoreError> {
        let systems = self.systems.read();
        let mut found = Vec::new();
        for system in systems.values() {
            let document = to_document(system)?;
            if matches_filter(&document, params.filter_params.as_ref()) {
                found.push((document, system.clone()));
            }
        }

        match params.order_by.as_deref() {
            Some(order_by) => {
                let (field, descending) = match order_by.strip_prefix('-') {
                    Some(field) => (field, true),
                    None => (order_by, false),
                };
                found.sort_by(|(a, _), (b, _)| {
                    let ordering = compare_values(a.get(field), b.get(field));
                    if descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
            }
            None => found.sort_by(|(_, a), (_, b)| {
                a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version))
            }),
        }

        debug!(matched = found.len(), "System query");
        Ok(found.into_iter().map(|(_, system)| system).collect())
    }

    async fn create(&self, mut system: System) -> Result<System, StoreError> {
        let mut systems = self.systems.write();
        Self::check_unique(&systems, &system)?;

        let id = system.id.clone().unwrap_or_else(SystemId::generate);
        system.id = Some(id.clone());
        systems.insert(id, system.clone());
        Ok(system)
    }

    async fn update(&self, system: System) -> Result<System, StoreError> {
        let id = Self::require_id(&system)?;
        let mut systems = self.systems.write();
        if !systems.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Self::check_unique(&systems, &system)?;
        systems.insert(id, system.clone());
        Ok(system)
    }

    async fn delete(&self, system: &System) -> Result<(), StoreError> {
        let id = Self::require_id(system)?;
        self.systems
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn reload(&self, system: &System) -> Result<System, StoreError> {
        let id = Self::require_id(system)?;
        self.query_unique(&id).await
    }

    async fn replace_commands(
        &self,
        mut system: System,
        commands: Vec<Command>,
    ) -> Result<System, StoreError> {
        system.commands = commands;
        self.update(system).await
    }
}

fn to_document(system: &System) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(system) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Backend("system is not a document".to_string())),
        Err(e) => Err(StoreError::Backend(e.to_string())),
    }
}

fn matches_filter(document: &Map<String, Value>, filter: Option<&Map<String, Value>>) -> bool {
    filter.map_or(true, |filter| {
        filter
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
        (None, None) => Ordering::Equal,
    }
}
