//! Named environments and the active-environment invariant

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AxiomError, Result};
use super::Variable;

/// Name of the environment created at startup
pub const DEFAULT_ENVIRONMENT_NAME: &str = "Global";

/// A named, switchable set of variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            variables: Vec::new(),
        }
    }

    /// Set a variable, replacing the value of an existing key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.variables.iter_mut().find(|v| v.key == key) {
            Some(existing) => existing.value = value,
            None => self.variables.push(Variable { key, value }),
        }
    }

    /// Remove a variable by key, returning its value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.variables.iter().position(|v| v.key == key)?;
        Some(self.variables.remove(pos).value)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables
            .iter()
            .rev()
            .find(|v| !v.key.is_empty() && v.key == key)
            .map(|v| v.value.as_str())
    }
}

/// All environments plus the id of the active one.
///
/// There is always at least one environment and `active_id` always names one
/// of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStore {
    environments: Vec<Environment>,
    active_id: String,
}

impl Default for EnvironmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentStore {
    /// Create a store holding the default environment
    pub fn new() -> Self {
        let env = Environment::new(DEFAULT_ENVIRONMENT_NAME);
        let active_id = env.id.clone();
        Self {
            environments: vec![env],
            active_id,
        }
    }

    /// Rebuild a store from persisted parts, repairing a dangling active id
    pub fn from_parts(environments: Vec<Environment>, active_id: Option<String>) -> Self {
        if environments.is_empty() {
            return Self::new();
        }
        let mut store = Self {
            active_id: active_id.unwrap_or_default(),
            environments,
        };
        store.repair();
        store
    }

    /// Point the active id at the first environment if it no longer resolves
    pub fn repair(&mut self) {
        if self.environments.is_empty() {
            *self = Self::new();
            return;
        }
        if !self.environments.iter().any(|e| e.id == self.active_id) {
            tracing::warn!(active_id = %self.active_id, "Active environment missing, falling back to first");
            self.active_id = self.environments[0].id.clone();
        }
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn active(&self) -> &Environment {
        self.environments
            .iter()
            .find(|e| e.id == self.active_id)
            .unwrap_or(&self.environments[0])
    }

    pub fn active_mut(&mut self) -> &mut Environment {
        let idx = self
            .environments
            .iter()
            .position(|e| e.id == self.active_id)
            .unwrap_or(0);
        &mut self.environments[idx]
    }

    /// Variables of the active environment
    pub fn active_variables(&self) -> &[Variable] {
        &self.active().variables
    }

    pub fn get(&self, id: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Environment> {
        self.environments.iter_mut().find(|e| e.id == id)
    }

    /// Find an environment by its display name
    pub fn find_by_name(&self, name: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.name == name)
    }

    /// Create a new environment and return its id. The active id is unchanged.
    pub fn create(&mut self, name: impl Into<String>) -> String {
        let env = Environment::new(name);
        let id = env.id.clone();
        tracing::debug!(id = %id, name = %env.name, "Environment created");
        self.environments.push(env);
        id
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<()> {
        let env = self
            .get_mut(id)
            .ok_or_else(|| AxiomError::Environment(format!("No environment with id {}", id)))?;
        env.name = name.into();
        Ok(())
    }

    /// Delete an environment. The last remaining environment cannot be deleted.
    pub fn delete(&mut self, id: &str) -> Result<Environment> {
        if self.environments.len() <= 1 {
            return Err(AxiomError::Environment(
                "Cannot delete the last remaining environment".to_string(),
            ));
        }
        let pos = self
            .environments
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AxiomError::Environment(format!("No environment with id {}", id)))?;
        let removed = self.environments.remove(pos);
        if removed.id == self.active_id {
            self.active_id = self.environments[0].id.clone();
        }
        Ok(removed)
    }

    pub fn activate(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(AxiomError::Environment(format!("No environment with id {}", id)));
        }
        self.active_id = id.to_string();
        Ok(())
    }

    /// Set a variable on the active environment
    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.active_mut().set(key, value);
    }
}
