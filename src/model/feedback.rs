use std::fmt;

use serde::{Deserialize, Serialize};

/// 本 crate 自身产生的错误码
pub mod codes {
    pub const TOOL_FAILED: &str = "TOOL_FAILED";
    pub const TOOL_NOT_REGISTERED: &str = "TOOL_NOT_REGISTERED";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const SYSTEM_EXCEPTION: &str = "SYSTEM_EXCEPTION";
    pub const NO_FEEDBACK: &str = "NO_FEEDBACK";
    pub const ARG_RESOLVE_ERROR: &str = "ARG_RESOLVE_ERROR";
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeedbackStatus {
    Success,
    Failed,
    Timeout,
    Other(String),
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FeedbackStatus::Success => "SUCCESS",
            FeedbackStatus::Failed => "FAILED",
            FeedbackStatus::Timeout => "TIMEOUT",
            FeedbackStatus::Other(raw) => raw,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FeedbackStatus::Success)
    }
}

impl From<String> for FeedbackStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => FeedbackStatus::Success,
            "FAILED" => FeedbackStatus::Failed,
            "TIMEOUT" => FeedbackStatus::Timeout,
            _ => FeedbackStatus::Other(raw),
        }
    }
}

impl From<FeedbackStatus> for String {
    fn from(status: FeedbackStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 反馈错误码
///
/// `100..=599` 的三位数字为 HTTP 状态码，空串为 `None`，
/// 其余（含纯空白）原样保存为自定义码，如 `E_404_NOT_FOUND`。序列化形式始终是原字符串。
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    #[default]
    None,
    Http(u16),
    Custom(String),
}

impl ErrorCode {
    pub fn custom(code: impl Into<String>) -> Self {
        ErrorCode::from(code.into())
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            ErrorCode::Http(status) => Some(*status),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ErrorCode::None)
    }

    pub fn as_string(&self) -> String {
        match self {
            ErrorCode::None => String::new(),
            ErrorCode::Http(status) => status.to_string(),
            ErrorCode::Custom(code) => code.clone(),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(raw: String) -> Self {
        if raw.is_empty() {
            return ErrorCode::None;
        }
        let bytes = raw.as_bytes();
        let is_status = bytes.len() == 3
            && bytes.iter().all(u8::is_ascii_digit)
            && (b'1'..=b'5').contains(&bytes[0]);
        if is_status {
            if let Ok(status) = raw.parse::<u16>() {
                return ErrorCode::Http(status);
            }
        }
        ErrorCode::Custom(raw)
    }
}

impl From<&str> for ErrorCode {
    fn from(raw: &str) -> Self {
        ErrorCode::from(raw.to_string())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_string()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// 上一个动作的结果，随下一次观察传入
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionFeedback {
    pub status: FeedbackStatus,
    #[serde(default)]
    pub error_code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

impl ActionFeedback {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: FeedbackStatus::Success,
            error_code: ErrorCode::None,
            message: message.into(),
        }
    }

    pub fn failed(error_code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            status: FeedbackStatus::Failed,
            error_code: error_code.into(),
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            status: FeedbackStatus::Timeout,
            error_code: ErrorCode::custom(codes::TIMEOUT),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
