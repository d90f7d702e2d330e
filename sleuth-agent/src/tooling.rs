use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use sleuth_core::{ToolError, ToolResult, ToolSpec};
use uuid::Uuid;

pub use tokio_util::sync::CancellationToken;

/// Everything a tool learns about the attempt it is running in.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub run_id: Uuid,
    pub step_index: u32,
    /// Zero for the first attempt of a step, incremented on every retry.
    pub attempt: u32,
    pub timeout: Duration,
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// A context for invoking a tool outside of any agent run.
    pub fn standalone(timeout: Duration) -> Self {
        Self {
            run_id: Uuid::nil(),
            step_index: 0,
            attempt: 0,
            timeout,
            cancellation: CancellationToken::new(),
        }
    }
}

#[async_trait::async_trait]
pub trait TypedTool: Send + Sync + 'static {
    type Args: DeserializeOwned + JsonSchema + Send;

    const NAME: &'static str;

    /// Field that receives the whole input when the model passes a bare
    /// string instead of an argument object.
    const PRIMARY_ARG: Option<&'static str> = None;

    fn description(&self) -> String;

    async fn run(&self, args: Self::Args, ctx: ToolContext) -> Result<String, ToolError>;
}

#[derive(Clone)]
pub struct RegisteredTool {
    name: String,
    description: String,
    parameters: Value,
    primary_arg: Option<&'static str>,
    runner: Arc<dyn ErasedToolRunner>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("name", &self.name)
            .field("primary_arg", &self.primary_arg)
            .finish()
    }
}

impl RegisteredTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// Runs one attempt. Every exit path, including argument errors, the
    /// per-attempt timeout and a panicking tool, resolves to a [`ToolResult`].
    pub async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult {
        let arguments = self.normalize_arguments(arguments);
        let attempt = AssertUnwindSafe(self.runner.run(arguments, ctx.clone())).catch_unwind();

        match tokio::time::timeout(ctx.timeout, attempt).await {
            Ok(Ok(Ok(text))) => ToolResult::observation(text),
            Ok(Ok(Err(error))) => ToolResult::from(error),
            Ok(Err(panic)) => ToolResult::failure(
                format!("tool panicked: {}", panic_message(panic.as_ref())),
                false,
            ),
            Err(_) => ToolResult::from(ToolError::Timeout(ctx.timeout)),
        }
    }

    fn normalize_arguments(&self, arguments: Value) -> Value {
        match (arguments, self.primary_arg) {
            (Value::String(text), Some(key)) => json!({ key: text }),
            (Value::Null, _) => Value::Object(Map::new()),
            (other, _) => other,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Fixed name-to-tool mapping shared read-only by every run.
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: BTreeMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.by_name.get(name).map(|index| &self.tools[*index])
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(RegisteredTool::name).collect()
    }

    pub fn catalogue(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(RegisteredTool::spec).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistryBuilder {
    pub fn register<T>(mut self, tool: T) -> Self
    where
        T: TypedTool,
    {
        let parameters = serde_json::to_value(schemars::schema_for!(T::Args))
            .unwrap_or_else(|_| json!({ "type": "object" }));
        self.tools.push(RegisteredTool {
            name: T::NAME.to_string(),
            description: tool.description(),
            parameters,
            primary_arg: T::PRIMARY_ARG,
            runner: Arc::new(TypedToolRunner { tool }),
        });
        self
    }

    pub fn build(self) -> Result<ToolRegistry, ToolRegistryError> {
        let mut seen = HashSet::new();
        let mut by_name = BTreeMap::new();

        for (index, tool) in self.tools.iter().enumerate() {
            if tool.name.trim().is_empty() || tool.name.trim() != tool.name {
                return Err(ToolRegistryError::InvalidName {
                    name: tool.name.clone(),
                });
            }

            if !seen.insert(tool.name.clone()) {
                return Err(ToolRegistryError::DuplicateName {
                    name: tool.name.clone(),
                });
            }

            by_name.insert(tool.name.clone(), index);
        }

        Ok(ToolRegistry {
            tools: self.tools,
            by_name,
        })
    }
}

#[async_trait::async_trait]
trait ErasedToolRunner: Send + Sync {
    async fn run(&self, arguments: Value, ctx: ToolContext) -> Result<String, ToolError>;
}

struct TypedToolRunner<T> {
    tool: T,
}

#[async_trait::async_trait]
impl<T> ErasedToolRunner for TypedToolRunner<T>
where
    T: TypedTool,
{
    async fn run(&self, arguments: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let args = serde_json::from_value::<T::Args>(arguments)
            .map_err(|err| ToolError::InvalidInput(err.to_string()))?;
        self.tool.run(args, ctx).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolRegistryError {
    InvalidName { name: String },
    DuplicateName { name: String },
}

impl std::fmt::Display for ToolRegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolRegistryError::InvalidName { name } => {
                write!(f, "tool name must be non-empty without surrounding whitespace: {name:?}")
            }
            ToolRegistryError::DuplicateName { name } => {
                write!(f, "duplicate tool name: {name}")
            }
        }
    }
}

impl std::error::Error for ToolRegistryError {}
