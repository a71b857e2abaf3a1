//! 声明式条件/动作规则引擎
//!
//! 提供可复用的规则执行能力，支持：
//! - JSON 规则定义和解析
//! - 嵌套字段与数组下标路径（`products[1].count`）
//! - AND/OR 短路求值与 `each` 数组量词
//! - 按名称注册的异步动作函数
//! - 单条规则失败隔离，批量结果与注册顺序一一对应

pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod models;
pub mod operators;
pub mod path;

pub use engine::RuleEngine;
pub use error::{ErrorKind, Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use functions::{ActionHandler, FnHandler, FunctionRegistry, TimeoutHandler};
pub use models::{Action, Condition, ConditionTree, Rule, RuleEntry, RuleResult, RunSummary};
pub use operators::Operator;
pub use path::{FactPath, PathSegment};
