use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WebAgentError};
use crate::utils::ConfigValidator;

use super::env::EnvConfig;

pub const ENV_MAX_CYCLES: &str = "WEBAGENT_MAX_CYCLES";
pub const ENV_MAX_SAME_RETRIES: &str = "WEBAGENT_MAX_SAME_RETRIES";
pub const ENV_MAX_PLAN_ITERATIONS: &str = "WEBAGENT_MAX_PLAN_ITERATIONS";
pub const ENV_MEMORY_LIMIT: &str = "WEBAGENT_MEMORY_LIMIT";
pub const ENV_STRICT_TOOL_ARGS: &str = "WEBAGENT_STRICT_TOOL_ARGS";

/// 运行时配置
///
/// 控制循环与计划驱动的参数；单个动作的尝试与超时预算来自 `DecisionAction`。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 单步观察/决策/执行的轮数上限
    pub max_cycles_per_step: u32,
    /// `RETRY_SAME` 重放同一动作的次数上限
    pub max_same_retries: u32,
    /// 计划驱动循环的安全上限
    pub max_plan_iterations: u32,
    /// 跨轮保留的 `memory_context` 字符数
    pub memory_context_limit: usize,
    /// 按内置工具目录检查 `tool_args`
    pub strict_tool_args: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_cycles_per_step: 20,
            max_same_retries: 2,
            max_plan_iterations: 50,
            memory_context_limit: 4000,
            strict_tool_args: false,
        }
    }
}

impl RuntimeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            WebAgentError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            WebAgentError::Config(format!("cannot parse {}: {}", path.display(), err))
        })
    }

    /// 应用 `WEBAGENT_*` 环境变量覆盖
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(value) = EnvConfig::get_parsed(ENV_MAX_CYCLES)? {
            self.max_cycles_per_step = value;
        }
        if let Some(value) = EnvConfig::get_parsed(ENV_MAX_SAME_RETRIES)? {
            self.max_same_retries = value;
        }
        if let Some(value) = EnvConfig::get_parsed(ENV_MAX_PLAN_ITERATIONS)? {
            self.max_plan_iterations = value;
        }
        if let Some(value) = EnvConfig::get_parsed(ENV_MEMORY_LIMIT)? {
            self.memory_context_limit = value;
        }
        if let Some(value) = EnvConfig::get_flag(ENV_STRICT_TOOL_ARGS)? {
            self.strict_tool_args = value;
        }
        Ok(self)
    }

    /// 依次读取文件（如有）、应用环境变量覆盖、校验
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides()?;
        ConfigValidator::validate_runtime(&config)?;
        debug!(?config, "runtime config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_cycles_per_step": 5, "strict_tool_args": true}}"#).unwrap();
        let config = RuntimeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_cycles_per_step, 5);
        assert!(config.strict_tool_args);
        assert_eq!(config.max_plan_iterations, 50);
        assert_eq!(config.memory_context_limit, 4000);
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = RuntimeConfig::from_file("/nonexistent/webagent.json").unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
