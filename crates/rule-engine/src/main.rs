//! 规则执行器
//!
//! 加载 JSON 规则文件，注册示例动作函数，执行一次全部规则并输出结果。
//!
//! 用法：`rule-runner [rules.json]`，未指定时使用 `engine.rules_path`。

use anyhow::{Context, Result};
use rule_engine::{FunctionRegistry, RuleEngine, RunSummary};
use rules_shared::config::AppConfig;
use rules_shared::observability;
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing::info;

const SERVICE_NAME: &str = "rule-runner";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let _guard = observability::init(&config.service_name, &config.observability)?;

    let rules_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.engine.rules_path.clone());

    let mut functions = demo_functions();
    if let Some(timeout) = config.engine.action_timeout() {
        info!(timeout_ms = timeout.as_millis() as u64, "Action timeout enabled");
        functions = functions.with_timeout(timeout);
    }

    let mut engine = RuleEngine::new(functions);
    let loaded = engine
        .load_rules_from_file(&rules_path)
        .await
        .with_context(|| format!("failed to load rules from {}", rules_path.display()))?;
    info!(loaded, path = %rules_path.display(), "Rules loaded");

    let results = engine.run().await;
    let summary = RunSummary::from_results(&results);

    if config.engine.print_results {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    info!(
        total = summary.total,
        satisfied = summary.satisfied,
        errored = summary.errored,
        "Runner finished"
    );
    Ok(())
}

/// 示例动作：订单、骑手和无数据规则使用的函数
fn demo_functions() -> FunctionRegistry {
    let mut functions = FunctionRegistry::new();
    functions
        .register_fn("getOrder", |_, params| get_order(params))
        .register_fn("logOrderInfo", |order, params| log_info("order", order, params))
        .register_fn("getCourier", |_, params| get_courier(params))
        .register_fn("logCourierInfo", |courier, params| {
            log_info("courier", courier, params)
        })
        .register_fn("helloWorld", |_, _| async {
            info!("Hello World");
            Ok(Value::Null)
        });
    functions
}

fn param(params: &Option<Value>, key: &str) -> Value {
    params
        .as_ref()
        .and_then(|p| p.get(key))
        .cloned()
        .unwrap_or(Value::Null)
}

async fn get_order(params: Option<Value>) -> Result<Value> {
    Ok(json!({
        "id": param(&params, "orderId"),
        "status": 700,
        "products": [
            { "_id": "66363f645d9b4260494acbb1", "name": "Nutella", "count": 2, "price": "7$" },
            { "_id": "66363fd83fda3abc3e763ecd", "name": "Coke", "count": 5, "price": "1$" }
        ],
        "basket": {
            "missingItems": { "isValid": true, "array": [1, 2] }
        }
    }))
}

async fn get_courier(params: Option<Value>) -> Result<Value> {
    Ok(json!({
        "id": param(&params, "courierId"),
        "status": 200,
        "vehicle": "Bike",
        "courierInfo": { "name": "John Doe", "warehouse": "Izmir" }
    }))
}

async fn log_info(kind: &'static str, data: Option<Value>, params: Option<Value>) -> Result<Value> {
    let data = data.unwrap_or(Value::Null);
    let params = params.unwrap_or(Value::Null);
    info!(kind, data = %data, params = %params, "Rule action executed");
    Ok(Value::Null)
}
