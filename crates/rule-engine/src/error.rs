//! 规则引擎错误类型

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("function '{0}' not found or not registered")]
    FunctionNotFound(String),

    #[error("function '{func}' failed: {source}")]
    ActionFailed {
        func: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("fact '{fact}' requires data, but the rule has no 'before' result")]
    MissingData { fact: String },

    #[error("fact '{fact}' cannot be resolved: {reason}")]
    UnresolvableFact { fact: String, reason: String },

    #[error("invalid operand type for '{operator}' on {operand}: expected {expected}, got {actual}")]
    InvalidOperandType {
        operator: String,
        operand: String,
        expected: String,
        actual: String,
    },

    #[error("condition has neither 'fact' nor 'constant'")]
    MissingOperand,

    #[error("invalid operator: '{0}'")]
    InvalidOperator(String),

    #[error("invalid fact path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid regular expression '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid nested condition for 'each': {0}")]
    InvalidNestedCondition(String),

    #[error("malformed rule: {0}")]
    MalformedRule(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 错误分类，对应单条规则可能出现的失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// before/after 指向未注册的函数
    ActionNotFound,
    /// 函数执行本身失败（包括超时）
    ActionFailed,
    /// 条件引用了 fact，但没有可用的数据
    MissingData,
    /// 操作符作用在错误类型的操作数上，或路径无法解析
    TypeMismatch,
    /// 操作符不在支持的集合内
    InvalidOperator,
    /// 规则本身的定义有误（操作数、路径、正则、嵌套条件）
    InvalidRule,
    /// 加载阶段的序列化或 I/O 错误
    Load,
}

impl RuleError {
    /// 获取错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FunctionNotFound(_) => ErrorKind::ActionNotFound,
            Self::ActionFailed { .. } => ErrorKind::ActionFailed,
            Self::MissingData { .. } => ErrorKind::MissingData,
            Self::UnresolvableFact { .. } | Self::InvalidOperandType { .. } => {
                ErrorKind::TypeMismatch
            }
            Self::InvalidOperator(_) => ErrorKind::InvalidOperator,
            Self::MissingOperand
            | Self::InvalidPath { .. }
            | Self::InvalidPattern { .. }
            | Self::InvalidNestedCondition(_)
            | Self::MalformedRule(_) => ErrorKind::InvalidRule,
            Self::JsonError(_) | Self::Io(_) => ErrorKind::Load,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
