pub mod manifest;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use manifest::{ToolCatalog, ToolSpec, ToolSpecBuilder};

use crate::error::WebAgentError;
use crate::model::{codes, DynamicData, ErrorCode};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub args: DynamicData,
    pub attempt: u32,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, args: DynamicData) -> Self {
        Self {
            name: name.into(),
            args,
            attempt: 1,
        }
    }
}

/// 工具调用成功，`message` 作为反馈消息
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub message: String,
}

impl ToolOutput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 工具调用失败
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub error_code: ErrorCode,
    pub message: String,
}

impl ToolFailure {
    pub fn new(error_code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error_code.is_none() {
            f.write_str(&self.message)
        } else {
            write!(f, "[{}] {}", self.error_code, self.message)
        }
    }
}

impl From<WebAgentError> for ToolFailure {
    fn from(error: WebAgentError) -> Self {
        Self::new(error.code(), error.to_string())
    }
}

impl From<anyhow::Error> for ToolFailure {
    fn from(error: anyhow::Error) -> Self {
        Self::new(codes::TOOL_FAILED, error.to_string())
    }
}

/// 由执行器驱动的浏览器工具
#[async_trait]
pub trait BrowserTool: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolFailure>;

    /// 等待动作后的条件，如 `"network_idle"`，与 `call` 共用单次尝试预算
    async fn wait_for(&self, condition: &str, _budget: Duration) -> Result<(), ToolFailure> {
        debug!(tool = %self.name(), condition, "no wait hook, condition treated as met");
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn BrowserTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn BrowserTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// 以别名注册同一工具，如 `click_element` 对应 `click`
    pub fn register_alias(&mut self, alias: impl Into<String>, tool: Arc<dyn BrowserTool>) {
        self.tools.insert(alias.into(), tool);
    }

    pub fn with(mut self, tool: Arc<dyn BrowserTool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BrowserTool>> {
        self.tools.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}
