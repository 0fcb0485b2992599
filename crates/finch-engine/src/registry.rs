use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use finch_core::tools::{Tool, ToolDefinition};

use crate::orchestrator::SubAgent;

/// Registry of available tools. Built once at startup; unknown names at
/// dispatch time are a data error, not a lookup surprise.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool definitions advertised to the model, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of sub-agents available for delegation. Same closed-at-startup
/// discipline as the tool registry.
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn SubAgent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    pub fn register(&mut self, agent: Arc<dyn SubAgent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SubAgent>> {
        self.agents.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    /// Delegation definitions advertised to the orchestrating model: each
    /// agent is a callable taking a single `instructions` string.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .agents
            .values()
            .map(|a| ToolDefinition {
                name: a.name().to_string(),
                description: a.description().to_string(),
                parameters_schema: json!({
                    "type": "object",
                    "required": ["instructions"],
                    "properties": {
                        "instructions": {
                            "type": "string",
                            "description": "Complete, self-contained instructions for this agent",
                        },
                    },
                }),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
