//! 条件评估器
//!
//! 对条件树做短路求值，实现各操作符的比较逻辑。纯计算，不做任何 I/O。
//!
//! 操作数类型不符合操作符要求时返回 `InvalidOperandType`，不返回 false。

use crate::error::{Result, RuleError};
use crate::models::{Condition, ConditionTree};
use crate::operators::Operator;
use crate::path::type_name;
use regex::Regex;
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件树
    ///
    /// AND 遇到 false 立即返回，OR 遇到 true 立即返回；
    /// 空 AND 为 true，空 OR 为 false。
    pub fn evaluate(tree: &ConditionTree, data: Option<&Value>) -> Result<bool> {
        match tree {
            ConditionTree::And(conditions) => {
                for condition in conditions {
                    if !Self::evaluate_leaf(condition, data)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ConditionTree::Or(conditions) => {
                for condition in conditions {
                    if Self::evaluate_leaf(condition, data)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// 评估单个条件
    ///
    /// # Arguments
    /// * `condition` - 条件节点
    /// * `data` - before 动作的返回值；`None` 表示没有数据
    pub fn evaluate_leaf(condition: &Condition, data: Option<&Value>) -> Result<bool> {
        let left = Self::resolve_operand(condition, data)?;
        let right = &condition.value;

        match &condition.operator {
            Operator::StrictEqual => Ok(Self::strict_eq(left, right)),
            Operator::StrictNotEqual => Ok(!Self::strict_eq(left, right)),
            Operator::LooseEqual => Ok(Self::loose_eq(left, right)),
            Operator::LooseNotEqual => Ok(!Self::loose_eq(left, right)),
            Operator::GreaterThan => Self::compare(condition, left, right, Ordering::is_gt),
            Operator::LessThan => Self::compare(condition, left, right, Ordering::is_lt),
            Operator::GreaterThanOrEqual => Self::compare(condition, left, right, Ordering::is_ge),
            Operator::LessThanOrEqual => Self::compare(condition, left, right, Ordering::is_le),
            Operator::Contains => Self::contains(condition, left, right),
            Operator::NotContains => Self::contains(condition, left, right).map(|r| !r),
            Operator::ArrayContains => Self::array_contains(condition, left, right),
            Operator::StartsWith => Self::affix(condition, left, right, |s, p| s.starts_with(p)),
            Operator::EndsWith => Self::affix(condition, left, right, |s, p| s.ends_with(p)),
            Operator::RegexMatch => Self::regex_match(condition, left, right),
            Operator::RegexNotMatch => Self::regex_match(condition, left, right).map(|r| !r),
            Operator::Each => Self::each(condition, left),
            Operator::Unknown(raw) => Err(RuleError::InvalidOperator(raw.clone())),
        }
    }

    /// 解析左操作数：优先使用常量，否则按 fact 路径取值
    fn resolve_operand<'a>(condition: &'a Condition, data: Option<&'a Value>) -> Result<&'a Value> {
        if let Some(constant) = &condition.constant {
            return Ok(constant);
        }

        let fact = condition.fact.as_ref().ok_or(RuleError::MissingOperand)?;
        let data = data.ok_or_else(|| RuleError::MissingData {
            fact: fact.to_string(),
        })?;

        fact.resolve(data)
    }

    /// 严格相等：不做类型转换，数值按数值比较（10 与 10.0 相等），数组和对象按结构比较
    fn strict_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Self::numbers_eq(x, y),
            (Value::Array(x), Value::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(l, r)| Self::strict_eq(l, r))
            }
            (Value::Object(x), Value::Object(y)) => {
                x.len() == y.len()
                    && x
                        .iter()
                        .all(|(k, v)| y.get(k).is_some_and(|w| Self::strict_eq(v, w)))
            }
            _ => a == b,
        }
    }

    fn numbers_eq(x: &Number, y: &Number) -> bool {
        match (x.as_i64(), y.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => x.as_f64() == y.as_f64(),
        }
    }

    /// 宽松相等
    ///
    /// - null 只等于 null
    /// - 数字与字符串按数值比较（"10" == 10）
    /// - 布尔值先转为 0/1 再比较
    /// - 数组/对象与标量比较时先转为字符串（[1,2] == "1,2"）
    fn loose_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
                n.as_f64() == Some(Self::string_to_number(s))
            }
            (Value::Bool(flag), Value::Bool(other)) => flag == other,
            (Value::Bool(flag), other) | (other, Value::Bool(flag)) => {
                Self::loose_eq(&Value::from(u8::from(*flag)), other)
            }
            (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => {
                Self::strict_eq(a, b)
            }
            (Value::Array(_) | Value::Object(_), scalar)
            | (scalar, Value::Array(_) | Value::Object(_)) => {
                let primitive = if a.is_array() || a.is_object() { a } else { b };
                Self::loose_eq(&Value::String(Self::to_primitive_string(primitive)), scalar)
            }
            _ => Self::strict_eq(a, b),
        }
    }

    /// 字符串转数字，空白串为 0，无法解析为 NaN
    fn string_to_number(s: &str) -> f64 {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return 0.0;
        }
        trimmed.parse().unwrap_or(f64::NAN)
    }

    fn to_primitive_string(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Self::to_primitive_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            other => other.to_string(),
        }
    }

    /// 有序比较
    ///
    /// 左操作数必须是数字或字符串。数字与数字、字符串与字符串直接比较，
    /// 数字与字符串混合时字符串按数值解析，无法解析时结果为 false。
    fn compare(
        condition: &Condition,
        left: &Value,
        right: &Value,
        accept: fn(Ordering) -> bool,
    ) -> Result<bool> {
        let ordering = match (left, right) {
            (Value::Number(a), Value::Number(b)) => {
                if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                    Some(a.cmp(&b))
                } else {
                    a.as_f64().partial_cmp(&b.as_f64())
                }
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Number(a), Value::String(b)) => a
                .as_f64()
                .and_then(|a| a.partial_cmp(&Self::string_to_number(b))),
            (Value::String(a), Value::Number(b)) => b
                .as_f64()
                .and_then(|b| Self::string_to_number(a).partial_cmp(&b)),
            (Value::Number(_) | Value::String(_), other) => {
                return Err(Self::value_mismatch(condition, "number or string", other));
            }
            (other, _) => {
                return Err(Self::operand_mismatch(condition, "number or string", other));
            }
        };

        Ok(ordering.is_some_and(accept))
    }

    /// 字符串/数组包含检查
    fn contains(condition: &Condition, left: &Value, right: &Value) -> Result<bool> {
        match left {
            Value::Array(items) => Ok(items.iter().any(|item| Self::strict_eq(item, right))),
            Value::String(s) => {
                let needle = Self::needle(condition, right)?;
                Ok(s.contains(&*needle))
            }
            other => Err(Self::operand_mismatch(condition, "array or string", other)),
        }
    }

    /// 期望值数组中是否包含左操作数
    fn array_contains(condition: &Condition, left: &Value, right: &Value) -> Result<bool> {
        let items = right
            .as_array()
            .ok_or_else(|| Self::value_mismatch(condition, "array", right))?;

        Ok(items.iter().any(|item| Self::strict_eq(item, left)))
    }

    /// 字符串前缀/后缀检查
    fn affix(
        condition: &Condition,
        left: &Value,
        right: &Value,
        test: fn(&str, &str) -> bool,
    ) -> Result<bool> {
        let s = left
            .as_str()
            .ok_or_else(|| Self::operand_mismatch(condition, "string", left))?;
        let needle = Self::needle(condition, right)?;

        Ok(test(s, &needle))
    }

    /// 正则表达式匹配
    fn regex_match(condition: &Condition, left: &Value, right: &Value) -> Result<bool> {
        let s = left
            .as_str()
            .ok_or_else(|| Self::operand_mismatch(condition, "string", left))?;

        let pattern = right
            .as_str()
            .ok_or_else(|| Self::value_mismatch(condition, "string (regex pattern)", right))?;

        let regex = Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(regex.is_match(s))
    }

    /// each：嵌套条件对数组中每个元素都成立
    ///
    /// 元素作为嵌套条件的数据，`$` 指元素本身，`name` 指元素对象的字段。
    fn each(condition: &Condition, left: &Value) -> Result<bool> {
        let items = left
            .as_array()
            .ok_or_else(|| Self::operand_mismatch(condition, "array", left))?;

        let nested = condition.nested()?;

        for item in items {
            if !Self::evaluate_leaf(nested, Some(item))? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// 字符串操作符的右操作数，标量按字符串处理
    fn needle<'a>(condition: &Condition, right: &'a Value) -> Result<Cow<'a, str>> {
        match right {
            Value::String(s) => Ok(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Ok(Cow::Owned(n.to_string())),
            Value::Bool(b) => Ok(Cow::Owned(b.to_string())),
            other => Err(Self::value_mismatch(condition, "string", other)),
        }
    }

    fn operand_mismatch(condition: &Condition, expected: &str, actual: &Value) -> RuleError {
        RuleError::InvalidOperandType {
            operator: condition.operator.to_string(),
            operand: condition.operand_label(),
            expected: expected.to_string(),
            actual: type_name(actual).to_string(),
        }
    }

    fn value_mismatch(condition: &Condition, expected: &str, actual: &Value) -> RuleError {
        RuleError::InvalidOperandType {
            operator: condition.operator.to_string(),
            operand: "value".to_string(),
            expected: expected.to_string(),
            actual: type_name(actual).to_string(),
        }
    }
}
