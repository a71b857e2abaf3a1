//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
///
/// 线上格式为 camelCase 字符串（如 `"strictEqual"`）。无法识别的操作符不会在
/// 反序列化阶段报错，而是保留为 `Unknown`，在评估该条件时才失败，
/// 这样一条写错的规则不会影响同一批次里的其他规则。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    // 相等比较
    StrictEqual,
    StrictNotEqual,
    LooseEqual,
    LooseNotEqual,

    // 有序比较
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,

    // 包含检查
    Contains,
    NotContains,
    ArrayContains,

    // 字符串操作
    StartsWith,
    EndsWith,
    RegexMatch,
    RegexNotMatch,

    // 数组量词
    Each,

    Unknown(String),
}

impl Operator {
    /// 所有受支持的操作符
    pub const SUPPORTED: [Operator; 16] = [
        Self::StrictEqual,
        Self::StrictNotEqual,
        Self::LooseEqual,
        Self::LooseNotEqual,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterThanOrEqual,
        Self::LessThanOrEqual,
        Self::Contains,
        Self::NotContains,
        Self::ArrayContains,
        Self::StartsWith,
        Self::EndsWith,
        Self::RegexMatch,
        Self::RegexNotMatch,
        Self::Each,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::StrictEqual => "strictEqual",
            Self::StrictNotEqual => "strictNotEqual",
            Self::LooseEqual => "looseEqual",
            Self::LooseNotEqual => "looseNotEqual",
            Self::GreaterThan => "greaterThan",
            Self::LessThan => "lessThan",
            Self::GreaterThanOrEqual => "greaterThanOrEqual",
            Self::LessThanOrEqual => "lessThanOrEqual",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::ArrayContains => "arrayContains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::RegexMatch => "regexMatch",
            Self::RegexNotMatch => "regexNotMatch",
            Self::Each => "each",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for Operator {
    fn from(raw: String) -> Self {
        Self::SUPPORTED
            .into_iter()
            .find(|op| op.as_str() == raw)
            .unwrap_or(Self::Unknown(raw))
    }
}

impl From<&str> for Operator {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
