//! Process-wide agent registry: name → agent handle, insertion-ordered.
//!
//! Written during the startup phase, read by every turn afterwards. Iteration
//! order is insertion order so the supervisor prompt built from registered
//! capabilities is byte-identical across builds (and so routing is stable).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::agent::Agent;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("agent already registered: {0}")]
    DuplicateAgent(String),
}

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    agents: HashMap<String, Arc<Agent>>,
}

/// Registry of specialist agents.
///
/// A single write lock protects mutations; reads take the shared lock. Writes
/// after the startup phase are permitted but expected to be rare.
#[derive(Default)]
pub struct AgentRegistry {
    inner: RwLock<Inner>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent. Fails with [`RegistryError::DuplicateAgent`] when
    /// the name is taken, unless `overwrite` is set (which keeps the original
    /// insertion position).
    pub fn register(&self, agent: Agent, overwrite: bool) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let name = agent.name.clone();
        if inner.agents.contains_key(&name) {
            if !overwrite {
                return Err(RegistryError::DuplicateAgent(name));
            }
        } else {
            inner.order.push(name.clone());
        }
        inner.agents.insert(name, Arc::new(agent));
        Ok(())
    }

    /// Removes an agent by name; returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let removed = inner.agents.remove(name).is_some();
        if removed {
            inner.order.retain(|n| n != name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<Agent>> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .agents
            .get(name)
            .cloned()
    }

    /// All agents in insertion order.
    pub fn get_all(&self) -> Vec<Arc<Agent>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner
            .order
            .iter()
            .filter_map(|n| inner.agents.get(n).cloned())
            .collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .agents
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
