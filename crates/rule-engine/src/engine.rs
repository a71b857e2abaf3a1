//! 规则执行引擎
//!
//! 按注册顺序逐条执行规则：调用 before 取数、评估条件、满足时调用 after，
//! 每条规则的任何失败都只体现在它自己的结果里，不会中断整个批次。

use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::functions::FunctionRegistry;
use crate::models::{Rule, RuleEntry, RuleResult, RunSummary};
use rules_shared::observability::metrics::{
    RULE_EVALUATION_DURATION_SECONDS, RULE_EVALUATIONS_TOTAL,
};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// 规则引擎
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: Vec<RuleEntry>,
    functions: FunctionRegistry,
}

impl RuleEngine {
    pub fn new(functions: FunctionRegistry) -> Self {
        Self {
            rules: Vec::new(),
            functions,
        }
    }

    /// 注册规则（追加到末尾，不去重）
    pub fn register(&mut self, rule: Rule) {
        self.rules.push(rule.into());
    }

    /// 批量注册规则，保持列表顺序
    pub fn register_many(&mut self, rules: impl IntoIterator<Item = Rule>) {
        self.rules.extend(rules.into_iter().map(RuleEntry::from));
    }

    /// 从 JSON 数组加载规则
    ///
    /// 数组中每个元素单独解析并按原顺序注册。无法解析的元素同样占一个位置，
    /// 执行时得到 `InvalidRule` 结果。返回注册的条目数，等于数组长度。
    #[instrument(skip(self, json))]
    pub fn load_rules_from_str(&mut self, json: &str) -> Result<usize> {
        let entries: Vec<Value> = serde_json::from_str(json)?;
        let total = entries.len();
        let mut malformed = 0;

        for (index, raw) in entries.into_iter().enumerate() {
            let entry = RuleEntry::parse(raw);
            if let RuleEntry::Malformed { error, .. } = &entry {
                warn!(index, error = %error, "Failed to parse rule, registered as invalid");
                malformed += 1;
            }
            self.rules.push(entry);
        }

        info!("批量加载完成: {} 成功, {} 失败", total - malformed, malformed);
        Ok(total)
    }

    /// 从 JSON 文件加载规则
    pub async fn load_rules_from_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        info!(path = %path.display(), "Loading rules from file");
        self.load_rules_from_str(&json)
    }

    pub fn rules(&self) -> &[RuleEntry] {
        &self.rules
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 按注册顺序执行全部规则
    ///
    /// 返回的结果与注册的规则一一对应、顺序一致。
    #[instrument(skip(self), fields(rules = self.rules.len()))]
    pub async fn run(&self) -> Vec<RuleResult> {
        let mut results = Vec::with_capacity(self.rules.len());

        for entry in &self.rules {
            let result = match entry {
                RuleEntry::Rule(rule) => self.run_one(rule).await,
                RuleEntry::Malformed { error, .. } => Self::reject(entry, error),
            };
            results.push(result);
        }

        let summary = RunSummary::from_results(&results);
        info!(
            total = summary.total,
            satisfied = summary.satisfied,
            not_met = summary.not_met,
            errored = summary.errored,
            "Rule run complete"
        );

        results
    }

    /// 执行单条规则，所有错误都转为失败结果
    pub async fn run_one(&self, rule: &Rule) -> RuleResult {
        let start = Instant::now();

        let result = match self.execute(rule).await {
            Ok(true) => {
                info!(rule = %rule.describe(), "Rule succeeded, rule is executed");
                RuleResult::satisfied(rule.clone())
            }
            Ok(false) => {
                debug!(rule = %rule.describe(), "Rule failed, conditions did not match");
                RuleResult::not_met(rule.clone())
            }
            Err(e) => {
                warn!(rule = %rule.describe(), kind = ?e.kind(), error = %e, "Rule errored");
                RuleResult::errored(rule.clone(), &e, e.kind())
            }
        };

        Self::record_metrics(&result, start);
        result
    }

    /// 无法解析的条目直接得到 `InvalidRule` 结果
    fn reject(entry: &RuleEntry, error: &str) -> RuleResult {
        let start = Instant::now();
        let e = RuleError::MalformedRule(error.to_string());
        warn!(rule = %entry.describe(), kind = ?e.kind(), error = %e, "Rule errored");

        let result = RuleResult::errored(entry.clone(), &e, e.kind());
        Self::record_metrics(&result, start);
        result
    }

    /// before → 条件评估 → after
    async fn execute(&self, rule: &Rule) -> Result<bool> {
        let data = match &rule.before {
            Some(action) => Some(self.functions.call(action, None).await?),
            None => None,
        };
        // before 返回 null 视为没有数据
        let data = data.filter(|value| !value.is_null());

        if !ConditionEvaluator::evaluate(&rule.conditions, data.as_ref())? {
            return Ok(false);
        }

        if let Some(action) = &rule.after {
            self.functions.call(action, data.as_ref()).await?;
        }

        Ok(true)
    }

    fn record_metrics(result: &RuleResult, start: Instant) {
        let outcome = match (result.satisfied, result.error_kind) {
            (true, _) => "satisfied",
            (false, None) => "not_met",
            (false, Some(_)) => "error",
        };

        metrics::counter!(RULE_EVALUATIONS_TOTAL, "outcome" => outcome).increment(1);
        metrics::histogram!(RULE_EVALUATION_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::functions::MockActionHandler;
    use crate::models::{Action, Condition, ConditionTree};
    use crate::operators::Operator;
    use crate::path::FactPath;
    use serde_json::json;

    fn status_rule(operator: Operator, value: Value) -> Rule {
        Rule::new(ConditionTree::and(vec![Condition::fact(
            FactPath::parse("status").unwrap(),
            operator,
            value,
        )]))
        .with_before(Action::new("fetch"))
        .with_after(Action::new("act").with_params(json!({"message": "ok"})))
    }

    fn engine_with(fetch: MockActionHandler, act: MockActionHandler) -> RuleEngine {
        let mut functions = FunctionRegistry::new();
        functions.register("fetch", fetch).register("act", act);
        RuleEngine::new(functions)
    }

    #[tokio::test]
    async fn test_after_receives_before_data() {
        let mut fetch = MockActionHandler::new();
        fetch
            .expect_call()
            .withf(|context, params| context.is_none() && params.is_none())
            .times(1)
            .returning(|_, _| Ok(json!({"status": 10})));

        let mut act = MockActionHandler::new();
        act.expect_call()
            .withf(|context, params| {
                context.as_ref() == Some(&json!({"status": 10}))
                    && params.as_ref() == Some(&json!({"message": "ok"}))
            })
            .times(1)
            .returning(|_, _| Ok(Value::Null));

        let engine = engine_with(fetch, act);
        let result = engine
            .run_one(&status_rule(Operator::StrictEqual, json!(10)))
            .await;

        assert!(result.satisfied);
        assert!(result.reason.is_none());
    }

    #[tokio::test]
    async fn test_after_not_called_when_conditions_fail() {
        let mut fetch = MockActionHandler::new();
        fetch
            .expect_call()
            .times(1)
            .returning(|_, _| Ok(json!({"status": 10})));

        let mut act = MockActionHandler::new();
        act.expect_call().times(0);

        let engine = engine_with(fetch, act);
        let result = engine
            .run_one(&status_rule(Operator::LessThan, json!(10)))
            .await;

        assert!(!result.satisfied);
        assert_eq!(result.reason.as_deref(), Some("Conditions not met"));
        assert!(result.error_kind.is_none());
    }

    #[tokio::test]
    async fn test_after_error_fails_the_rule() {
        let mut fetch = MockActionHandler::new();
        fetch
            .expect_call()
            .returning(|_, _| Ok(json!({"status": 10})));

        let mut act = MockActionHandler::new();
        act.expect_call()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));

        let engine = engine_with(fetch, act);
        let result = engine
            .run_one(&status_rule(Operator::StrictEqual, json!(10)))
            .await;

        assert!(!result.satisfied);
        assert_eq!(
            result.reason.as_deref(),
            Some("An error occurred: function 'act' failed: disk full")
        );
        assert_eq!(result.error_kind, Some(ErrorKind::ActionFailed));
    }

    #[tokio::test]
    async fn test_null_before_result_counts_as_no_data() {
        let mut fetch = MockActionHandler::new();
        fetch.expect_call().returning(|_, _| Ok(Value::Null));

        let mut act = MockActionHandler::new();
        act.expect_call().times(0);

        let engine = engine_with(fetch, act);
        let result = engine
            .run_one(&status_rule(Operator::StrictEqual, json!(10)))
            .await;

        assert_eq!(result.error_kind, Some(ErrorKind::MissingData));
    }

    #[tokio::test]
    async fn test_rule_without_after() {
        let engine = RuleEngine::new(FunctionRegistry::new());
        let rule = Rule::new(ConditionTree::and(vec![Condition::constant(
            1,
            Operator::StrictEqual,
            1,
        )]));

        let result = engine.run_one(&rule).await;
        assert!(result.satisfied);
    }

    #[tokio::test]
    async fn test_after_function_not_registered() {
        let mut fetch = MockActionHandler::new();
        fetch
            .expect_call()
            .times(1)
            .returning(|_, _| Ok(json!({"status": 10})));

        let mut functions = FunctionRegistry::new();
        functions.register("fetch", fetch);
        let engine = RuleEngine::new(functions);

        let rule = status_rule(Operator::StrictEqual, json!(10)).with_after(Action::new("missing"));
        let result = engine.run_one(&rule).await;

        assert!(!result.satisfied);
        assert!(result.reason.as_deref().unwrap().contains("not found"));
        assert_eq!(result.error_kind, Some(ErrorKind::ActionNotFound));
    }

    #[tokio::test]
    async fn test_malformed_entries_keep_their_slot() {
        let mut engine = RuleEngine::default();
        let input = r#"[
            {"conditions": {"and": []}, "after": {"func": "a"}},
            {"conditions": {"and": [{"fact": "products[one]", "operator": "strictEqual", "value": 1}]}},
            {"conditions": {"and": [{"fact": "status", "operator": 5, "value": 1}]}},
            {"conditions": {"and": [], "or": []}, "after": {"func": "b"}},
            {"conditions": {"and": [{"constant": 1, "operator": "bogus", "value": 1}]}}
        ]"#;

        let loaded = engine.load_rules_from_str(input).unwrap();
        assert_eq!(loaded, 5);
        assert_eq!(engine.len(), 5);

        let results = engine.run().await;
        assert_eq!(results.len(), 5);

        let kinds: Vec<Option<ErrorKind>> = results.iter().map(|r| r.error_kind).collect();
        assert_eq!(
            kinds,
            vec![
                Some(ErrorKind::ActionNotFound),
                Some(ErrorKind::InvalidRule),
                Some(ErrorKind::InvalidRule),
                Some(ErrorKind::InvalidRule),
                Some(ErrorKind::InvalidOperator),
            ]
        );
        assert!(results[1].reason.as_deref().unwrap().contains("malformed rule"));
        assert_eq!(
            serde_json::to_value(&results[3].rule).unwrap(),
            json!({"conditions": {"and": [], "or": []}, "after": {"func": "b"}})
        );
        for (result, entry) in results.iter().zip(engine.rules()) {
            assert_eq!(&result.rule, entry);
        }
    }

    #[test]
    fn test_load_rules_requires_array() {
        let mut engine = RuleEngine::default();
        assert!(engine.load_rules_from_str("{\"conditions\": {}}").is_err());
        assert!(engine.is_empty());
    }
}
