//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// 规则评估计数器，按 `outcome` 标签区分 satisfied / not_met / error
pub const RULE_EVALUATIONS_TOTAL: &str = "rule_evaluations_total";
/// 单条规则执行耗时
pub const RULE_EVALUATION_DURATION_SECONDS: &str = "rule_evaluation_duration_seconds";

/// 安装 Prometheus recorder 并在指定端口暴露 `/metrics`
pub fn init(service_name: &str, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", service_name)
        .install()?;

    register_rule_metrics();
    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// 注册规则相关指标的描述
///
/// 这些描述会出现在 /metrics 端点的 HELP 注释中
pub fn register_rule_metrics() {
    metrics::describe_counter!(RULE_EVALUATIONS_TOTAL, "Total number of rule evaluations");
    metrics::describe_histogram!(
        RULE_EVALUATION_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Rule evaluation duration in seconds"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_without_recorder() {
        // 没有安装 recorder 时描述是空操作
        register_rule_metrics();
    }
}
