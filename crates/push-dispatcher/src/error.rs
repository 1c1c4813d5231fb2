//! 推送分发错误类型
//!
//! 区分构造期配置错误、调用参数错误和通知服务错误，
//! 单目标操作直接向调用方返回，多端点发送时按端点隔离。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// 构造期错误，不会产生分发器
    #[error("配置错误: {0}")]
    Config(String),

    /// 必填字段为空，在任何网络调用之前返回
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 通知服务拒绝或处理失败，原样携带服务端信息
    #[error("通知服务错误: {operation} - {message}")]
    Service {
        operation: &'static str,
        code: Option<String>,
        message: String,
    },

    #[error("消息序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// 获取错误分类码
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Service { .. } => "SERVICE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// 构造服务错误
    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            operation,
            code: None,
            message: message.into(),
        }
    }
}
