use crate::config::RuntimeConfig;
use crate::error::{Result, WebAgentError};

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_runtime(config: &RuntimeConfig) -> Result<()> {
        Self::validate_cycle_limit(config.max_cycles_per_step)?;
        Self::validate_plan_iterations(config.max_plan_iterations)?;
        Self::validate_memory_limit(config.memory_context_limit)?;
        if config.max_same_retries > config.max_cycles_per_step {
            tracing::warn!(
                max_same_retries = config.max_same_retries,
                max_cycles_per_step = config.max_cycles_per_step,
                "max_same_retries exceeds the cycle limit"
            );
        }
        Ok(())
    }

    /// 验证单步循环上限
    pub fn validate_cycle_limit(limit: u32) -> Result<()> {
        if limit == 0 {
            return Err(WebAgentError::Config(
                "max_cycles_per_step must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_plan_iterations(limit: u32) -> Result<()> {
        if limit == 0 {
            return Err(WebAgentError::Config(
                "max_plan_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// 验证记忆上下文长度
    pub fn validate_memory_limit(limit: usize) -> Result<()> {
        if limit < 64 {
            return Err(WebAgentError::Config(format!(
                "memory_context_limit must be at least 64 characters, got {}",
                limit
            )));
        }
        Ok(())
    }

    /// 验证节点 ID
    pub fn validate_node_id(node_id: &str) -> Result<()> {
        if node_id.trim().is_empty() {
            return Err(WebAgentError::Config("node_id must not be empty".to_string()));
        }

        if !node_id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(WebAgentError::Config(format!(
                "node_id '{}' may only contain letters, digits, '_', '-' and '.'",
                node_id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_runtime_defaults() {
        assert!(ConfigValidator::validate_runtime(&RuntimeConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_limits() {
        assert!(ConfigValidator::validate_cycle_limit(0).is_err());
        assert!(ConfigValidator::validate_plan_iterations(0).is_err());
        assert!(ConfigValidator::validate_memory_limit(10).is_err());
        assert!(ConfigValidator::validate_memory_limit(64).is_ok());
    }

    #[test]
    fn test_validate_node_id() {
        assert!(ConfigValidator::validate_node_id("").is_err());
        assert!(ConfigValidator::validate_node_id("N1").is_ok());
        assert!(ConfigValidator::validate_node_id("fix_1.2").is_ok());
        assert!(ConfigValidator::validate_node_id("node@1").is_err());
    }
}
