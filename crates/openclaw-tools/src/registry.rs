//! Registry of the tool surface, for lookup and LLM definition export.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::history::SessionsHistoryTool;
use crate::list::SessionsListTool;
use crate::remove::SessionsSubagentRemoveTool;
use crate::send::SessionsSendTool;
use crate::spawn::SessionsSpawnTool;
use crate::SubagentTool;

/// A tool's advertised shape, as handed to the LLM backend (spec §6: JSON
/// schemas restricted to string/number/bool/array/object, no union
/// schemas).
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Description shown to the LLM.
    pub description: String,
    /// Input JSON schema.
    pub input_schema: Value,
}

/// Registry of the five subagent-orchestration tools (spec §6).
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn SubagentTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Create a registry with all five spec §6 tools registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SessionsSpawnTool));
        registry.register(Box::new(SessionsSubagentRemoveTool));
        registry.register(Box::new(SessionsHistoryTool));
        registry.register(Box::new(SessionsSendTool));
        registry.register(Box::new(SessionsListTool));
        registry
    }

    /// Register a tool, replacing any existing registration under the same
    /// name.
    pub fn register(&mut self, tool: Box<dyn SubagentTool>) {
        self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn SubagentTool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// Export every registered tool's definition for the LLM's tool list.
    #[must_use]
    pub fn all_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_owned(),
                description: t.description().to_owned(),
                input_schema: t.input_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_defaults_registers_all_five_tools() {
        let registry = ToolRegistry::with_defaults();
        let names: Vec<String> = registry.all_definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["sessions_history", "sessions_list", "sessions_send", "sessions_spawn", "sessions_subagent_remove",]
        );
    }

    #[test]
    fn unregistered_name_is_none() {
        let registry = ToolRegistry::with_defaults();
        assert!(registry.get("sessions_nonexistent").is_none());
    }

    #[test]
    fn schemas_avoid_union_types() {
        let registry = ToolRegistry::with_defaults();
        for def in registry.all_definitions() {
            let rendered = def.input_schema.to_string();
            assert!(!rendered.contains("anyOf"), "{}", def.name);
            assert!(!rendered.contains("oneOf"), "{}", def.name);
            assert!(!rendered.contains("allOf"), "{}", def.name);
        }
    }
}
