use std::env;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEBUG_ENV: &str = "WEBAGENT_DEBUG";

/// 日志配置
pub struct LoggingConfig;

impl LoggingConfig {
    /// 按 `RUST_LOG` 安装全局 subscriber；未设置时使用 [`Self::default_filter`]。
    /// 设置 `WEBAGENT_DEBUG` 后额外输出 target、文件行号与线程 id。
    pub fn init() {
        let is_debug = Self::is_debug();
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Self::default_filter(is_debug)));

        let fmt_layer = fmt::layer()
            .with_target(is_debug)
            .with_file(is_debug)
            .with_line_number(is_debug)
            .with_thread_ids(is_debug);

        // 重复初始化时保留已有的 subscriber
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();

        if is_debug {
            tracing::debug!("debug logging enabled");
        }
    }

    /// 初始化日志系统（带自定义过滤器）
    pub fn init_with_filter(filter: &str) {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new(filter))
            .with(fmt::layer())
            .try_init();
    }

    pub fn default_filter(is_debug: bool) -> &'static str {
        if is_debug {
            "webagent=debug,info"
        } else {
            "webagent=info,warn"
        }
    }

    /// 检查是否启用调试模式
    pub fn is_debug() -> bool {
        env::var(DEBUG_ENV).is_ok()
    }
}

/// 便捷宏：记录带上下文的错误
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {
        tracing::error!(error = %$err, code = $err.code(), "operation failed")
    };
    ($err:expr, $($key:tt = $value:expr),+) => {
        tracing::error!(error = %$err, code = $err.code(), $($key = $value),+, "operation failed")
    };
}

/// 便捷宏：记录带上下文的警告
#[macro_export]
macro_rules! log_warn {
    ($msg:expr) => {
        tracing::warn!($msg)
    };
    ($msg:expr, $($key:tt = $value:expr),+) => {
        tracing::warn!($($key = $value),+, $msg)
    };
}
