//! 规则引擎领域模型

use crate::error::{ErrorKind, Result, RuleError};
use crate::operators::Operator;
use crate::path::FactPath;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// 规则定义
///
/// 规则没有独立的 ID，诊断时以规则自身的结构内容作为标识。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// 取数动作，其返回值作为条件评估的数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Action>,
    pub conditions: ConditionTree,
    /// 条件满足后执行的动作
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Action>,
}

impl Rule {
    pub fn new(conditions: ConditionTree) -> Self {
        Self {
            before: None,
            conditions,
            after: None,
        }
    }

    pub fn with_before(mut self, action: Action) -> Self {
        self.before = Some(action);
        self
    }

    pub fn with_after(mut self, action: Action) -> Self {
        self.after = Some(action);
        self
    }

    /// 规则的 JSON 表示，用于日志
    pub fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// 动作：按名称调用已注册的函数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub func: String,
    /// 原样传给函数的配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Action {
    pub fn new(func: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// 条件树
///
/// 只能是 `{"and": [...]}` 或 `{"or": [...]}` 之一，同时带两个键的输入在
/// 反序列化时即被拒绝。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionTree {
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl ConditionTree {
    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::And(conditions)
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self::Or(conditions)
    }

    pub fn conditions(&self) -> &[Condition] {
        match self {
            Self::And(conditions) | Self::Or(conditions) => conditions,
        }
    }
}

/// 条件节点
///
/// `constant` 存在时直接作为左操作数，否则按 `fact` 路径从数据中取值。
/// `constant: null` 与不写等价。`each` 的嵌套条件在反序列化时解析一次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConditionDef")]
pub struct Condition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact: Option<FactPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<Value>,
    pub operator: Operator,
    /// 右操作数；`each` 时为嵌套条件的原始 JSON
    pub value: Value,
    #[serde(skip_serializing)]
    nested: Option<Box<Condition>>,
}

#[derive(Deserialize)]
struct ConditionDef {
    #[serde(default)]
    fact: Option<FactPath>,
    #[serde(default)]
    constant: Option<Value>,
    operator: Operator,
    #[serde(default)]
    value: Value,
}

impl TryFrom<ConditionDef> for Condition {
    type Error = String;

    fn try_from(def: ConditionDef) -> std::result::Result<Self, Self::Error> {
        let nested = match def.operator {
            Operator::Each => {
                let nested = Condition::deserialize(&def.value)
                    .map_err(|e| RuleError::InvalidNestedCondition(e.to_string()).to_string())?;
                Some(Box::new(nested))
            }
            _ => None,
        };

        Ok(Self {
            fact: def.fact,
            constant: def.constant,
            operator: def.operator,
            value: def.value,
            nested,
        })
    }
}

impl Condition {
    /// 基于 fact 路径的条件
    pub fn fact(path: FactPath, operator: Operator, value: impl Into<Value>) -> Self {
        Self::build(Some(path), None, operator, value.into())
    }

    /// 基于常量的条件
    pub fn constant(
        constant: impl Into<Value>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self::build(None, Some(constant.into()), operator, value.into())
    }

    /// `each` 条件：`nested` 对数组的每个元素都成立
    pub fn each(path: FactPath, nested: Condition) -> Self {
        Self {
            fact: Some(path),
            constant: None,
            operator: Operator::Each,
            value: serde_json::to_value(&nested).unwrap_or(Value::Null),
            nested: Some(Box::new(nested)),
        }
    }

    fn build(
        fact: Option<FactPath>,
        constant: Option<Value>,
        operator: Operator,
        value: Value,
    ) -> Self {
        let nested = match operator {
            Operator::Each => Condition::deserialize(&value).ok().map(Box::new),
            _ => None,
        };

        Self {
            fact,
            constant,
            operator,
            value,
            nested,
        }
    }

    /// `each` 的嵌套条件
    pub fn nested(&self) -> Result<&Condition> {
        self.nested.as_deref().ok_or_else(|| {
            RuleError::InvalidNestedCondition(format!(
                "expected a condition object, got {}",
                self.value
            ))
        })
    }

    /// 左操作数的描述，用于错误信息
    pub fn operand_label(&self) -> String {
        match (&self.constant, &self.fact) {
            (Some(_), _) => "constant".to_string(),
            (None, Some(fact)) => format!("fact '{}'", fact),
            (None, None) => "missing operand".to_string(),
        }
    }
}

/// 已注册的规则条目
///
/// 批量加载时无法解析的元素保留原始 JSON，执行时报告 `InvalidRule`，
/// 结果仍与输入一一对应。
#[derive(Debug, Clone, PartialEq)]
pub enum RuleEntry {
    Rule(Rule),
    Malformed { raw: Value, error: String },
}

impl RuleEntry {
    /// 解析单个 JSON 元素，失败时保留原始内容
    pub fn parse(raw: Value) -> Self {
        match Rule::deserialize(&raw) {
            Ok(rule) => Self::Rule(rule),
            Err(e) => Self::Malformed {
                raw,
                error: e.to_string(),
            },
        }
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Self::Rule(rule) => Some(rule),
            Self::Malformed { .. } => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// 条目的 JSON 表示，用于日志
    pub fn describe(&self) -> String {
        match self {
            Self::Rule(rule) => rule.describe(),
            Self::Malformed { raw, .. } => raw.to_string(),
        }
    }
}

impl From<Rule> for RuleEntry {
    fn from(rule: Rule) -> Self {
        Self::Rule(rule)
    }
}

impl Serialize for RuleEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Rule(rule) => rule.serialize(serializer),
            Self::Malformed { raw, .. } => raw.serialize(serializer),
        }
    }
}

/// 单条规则的执行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub rule: RuleEntry,
    pub satisfied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// 异常失败时的错误分类
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl RuleResult {
    pub const CONDITIONS_NOT_MET: &'static str = "Conditions not met";

    pub fn satisfied(rule: impl Into<RuleEntry>) -> Self {
        Self {
            rule: rule.into(),
            satisfied: true,
            reason: None,
            error_kind: None,
        }
    }

    pub fn not_met(rule: impl Into<RuleEntry>) -> Self {
        Self {
            rule: rule.into(),
            satisfied: false,
            reason: Some(Self::CONDITIONS_NOT_MET.to_string()),
            error_kind: None,
        }
    }

    pub fn errored(
        rule: impl Into<RuleEntry>,
        message: impl std::fmt::Display,
        kind: ErrorKind,
    ) -> Self {
        Self {
            rule: rule.into(),
            satisfied: false,
            reason: Some(format!("An error occurred: {}", message)),
            error_kind: Some(kind),
        }
    }
}

/// 一次批量执行的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub satisfied: usize,
    pub not_met: usize,
    pub errored: usize,
}

impl RunSummary {
    pub fn from_results(results: &[RuleResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.total += 1;
            match (result.satisfied, result.error_kind) {
                (true, _) => summary.satisfied += 1,
                (false, Some(_)) => summary.errored += 1,
                (false, None) => summary.not_met += 1,
            }
            summary
        })
    }
}
