use crate::error::{Result, WebAgentError};
use std::env;
use std::str::FromStr;

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    /// 从环境变量获取值
    pub fn get_env(key: &str) -> Result<String> {
        env::var(key).map_err(|_| {
            WebAgentError::Config(format!("environment variable `{}` is not set", key))
        })
    }

    /// 获取可选的环境变量
    pub fn get_env_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.trim().is_empty())
    }

    /// 解析可选的环境变量，值存在但无法解析时返回错误
    pub fn get_parsed<T>(key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::get_env_optional(key) {
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|err| {
                WebAgentError::Config(format!("`{}`={:?} is invalid: {}", key, raw, err))
            }),
            None => Ok(None),
        }
    }

    /// 布尔开关，接受 1/0、true/false、yes/no、on/off
    pub fn get_flag(key: &str) -> Result<Option<bool>> {
        let Some(raw) = Self::get_env_optional(key) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(WebAgentError::Config(format!(
                "`{}`={:?} is not a boolean",
                key, raw
            ))),
        }
    }

    /// 检查是否启用调试模式
    pub fn is_debug_mode() -> bool {
        env::var("WEBAGENT_DEBUG").is_ok()
    }

    /// 获取日志级别
    pub fn get_log_level() -> Option<String> {
        Self::get_env_optional("RUST_LOG")
    }
}
