// 配置模块

pub mod env;
pub mod runtime;

pub use env::EnvConfig;
pub use runtime::RuntimeConfig;
