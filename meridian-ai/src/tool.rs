use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A single entry in the agent loop's catalog, announced to the LLM as
/// `{name, input_schema, output_schema}` (`spec.md` §4.4 step 2). Mirrors
/// the role `jackbot-strategy::Strategy<E>` plays as a trait-object seam
/// the runtime dispatches on by name rather than by static type.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn input_schema(&self) -> serde_json::Value;

    fn output_schema(&self) -> serde_json::Value;

    /// How long the agent loop waits before treating this tool as timed
    /// out. Defaults to the spec's general tool timeout; market-data-shaped
    /// tools override with the tighter 3s bound.
    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Whether invoking this tool requires credential material from the
    /// vault (`spec.md` §4.4 step 4b). When true, the orchestrator resolves
    /// a credential before calling `invoke` and passes nothing extra — the
    /// tool is expected to have been constructed with a vault handle of its
    /// own, matching how `jackbot-execution::client::ExecutionClient`
    /// implementations close over their own transport.
    fn requires_credentials(&self) -> bool {
        false
    }

    async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, String>;
}

/// The dynamic tool catalog (`spec.md` §9 design note). Keyed by tool name
/// rather than enumerated as a closed set, so new tools register without
/// touching the agent loop.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.name(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// The catalog shape handed to the LLM at the start of a session
    /// (`spec.md` §4.4 step 2): name, both schemas, no opaque handle beyond
    /// the name itself since dispatch happens by name lookup.
    pub fn catalog(&self) -> Vec<serde_json::Value> {
        self.tools
            .values()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "input_schema": tool.input_schema(),
                    "output_schema": tool.output_schema(),
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        fn output_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, String> {
            Ok(args)
        }
    }

    #[test]
    fn registered_tool_is_retrievable_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn catalog_lists_every_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.catalog().len(), 1);
    }
}
