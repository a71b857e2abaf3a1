//! Fact 路径解析
//!
//! 将 `basket.missingItems.array`、`products[1].count` 这样的路径字符串解析为
//! 有序的段序列，条件构造时解析一次，评估时只遍历段。

use crate::error::{Result, RuleError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 缺失的末段解析为 null
static NULL: Value = Value::Null;

/// 代表“当前元素本身”的路径记号，用于 each 的嵌套条件
pub const CURRENT_ELEMENT: &str = "$";

/// 路径段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// 对象字段
    Key(String),
    /// 数组下标
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

/// 已解析的 fact 路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FactPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl FactPath {
    /// 解析路径字符串
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| RuleError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("path is empty"));
        }

        // `$` 本身表示当前数据；`$.a` / `$[0]` 等价于 `a` / `[0]`
        let body = match raw.strip_prefix(CURRENT_ELEMENT) {
            Some("") => "",
            Some(rest) if rest.starts_with('[') => rest,
            Some(rest) => rest
                .strip_prefix('.')
                .ok_or_else(|| invalid("'$' must be followed by '.' or '['"))?,
            None => raw,
        };

        let mut segments = Vec::new();
        if !body.is_empty() {
            for part in body.split('.') {
                Self::parse_part(part, &mut segments).map_err(|reason| invalid(reason))?;
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// 解析单个以 `.` 分隔的部分，如 `products[1]`
    fn parse_part(
        part: &str,
        segments: &mut Vec<PathSegment>,
    ) -> std::result::Result<(), &'static str> {
        let (name, mut rest) = match part.find('[') {
            Some(i) => (&part[..i], &part[i..]),
            None => (part, ""),
        };

        if name.contains(']') {
            return Err("unexpected ']'");
        }

        if !name.is_empty() {
            segments.push(PathSegment::Key(name.to_string()));
        } else if rest.is_empty() {
            return Err("empty segment");
        }

        while !rest.is_empty() {
            let end = rest.find(']').ok_or("unclosed '['")?;
            let index = rest[1..end]
                .parse::<usize>()
                .map_err(|_| "array index must be a non-negative integer")?;
            segments.push(PathSegment::Index(index));

            rest = &rest[end + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err("unexpected characters after ']'");
            }
        }

        Ok(())
    }

    /// 原始路径字符串
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// 是否指向当前数据本身（`$`）
    pub fn is_current_element(&self) -> bool {
        self.segments.is_empty()
    }

    /// 在数据上解析路径
    ///
    /// 中间段缺失、为 null 或无法索引时返回错误；最后一段缺失时返回 null，
    /// 便于用 `looseNotEqual null` 判断字段是否存在。
    pub fn resolve<'a>(&self, data: &'a Value) -> Result<&'a Value> {
        let last = self.segments.len().saturating_sub(1);
        let mut current = data;

        for (i, segment) in self.segments.iter().enumerate() {
            let next = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Index(idx), Value::Array(arr)) => arr.get(*idx),
                (segment, other) => {
                    return Err(self.unresolvable(format!(
                        "cannot read '{}' from {}",
                        segment,
                        type_name(other)
                    )));
                }
            };

            match next {
                Some(value) => current = value,
                None if i == last => return Ok(&NULL),
                None => {
                    return Err(self.unresolvable(format!("segment '{}' is missing", segment)));
                }
            }
        }

        Ok(current)
    }

    fn unresolvable(&self, reason: String) -> RuleError {
        RuleError::UnresolvableFact {
            fact: self.raw.clone(),
            reason,
        }
    }
}

impl FromStr for FactPath {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FactPath {
    type Error = RuleError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<FactPath> for String {
    fn from(path: FactPath) -> Self {
        path.raw
    }
}

impl fmt::Display for FactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// 获取值的类型名称
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
