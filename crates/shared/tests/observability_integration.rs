//! 可观测性模块集成测试
//!
//! 在独立进程中安装全局 subscriber 和 recorder。

use rules_shared::config::ObservabilityConfig;
use rules_shared::observability::{self, metrics};

#[tokio::test]
async fn test_init_with_metrics_exporter() {
    let config = ObservabilityConfig {
        log_level: "debug".to_string(),
        log_format: "json".to_string(),
        metrics_enabled: true,
        metrics_port: 0,
    };

    let guard = observability::init("rule-runner-test", &config).unwrap();
    assert!(guard.metrics_enabled());

    ::metrics::counter!(metrics::RULE_EVALUATIONS_TOTAL, "outcome" => "satisfied").increment(1);
    ::metrics::histogram!(metrics::RULE_EVALUATION_DURATION_SECONDS).record(0.01);

    // recorder 是全局的，重复安装会失败
    assert!(metrics::init("rule-runner-test", 0).is_err());
}
