//! 统一可观测性模块
//!
//! 提供 tracing 日志和 Prometheus 指标的统一初始化。

pub mod metrics;
pub mod tracing;

use crate::config::ObservabilityConfig;
use ::tracing::info;
use anyhow::Result;

/// 可观测性资源守卫
///
/// 持有各种可观测性资源的生命周期。
pub struct ObservabilityGuard {
    tracing_guard: Option<tracing::TracingGuard>,
    metrics_enabled: bool,
}

impl ObservabilityGuard {
    /// 创建一个空的 Guard（用于测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            tracing_guard: None,
            metrics_enabled: false,
        }
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if self.tracing_guard.is_some() {
            info!("Shutting down observability...");
        }
    }
}

/// 统一初始化可观测性
///
/// 先初始化 tracing，再按配置安装 Prometheus 指标导出。
/// 指标导出的 HTTP 监听需要在 tokio 运行时内调用。
///
/// ```ignore
/// let config = AppConfig::load("rule-runner")?;
/// let _guard = rules_shared::observability::init(&config.service_name, &config.observability)?;
/// ```
pub fn init(service_name: &str, config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    let tracing_guard = tracing::init(config)?;

    if config.metrics_enabled {
        metrics::init(service_name, config.metrics_port)?;
    }

    info!(
        service = %service_name,
        log_format = %config.log_format,
        metrics_enabled = config.metrics_enabled,
        metrics_port = config.metrics_port,
        "Observability initialized"
    );

    Ok(ObservabilityGuard {
        tracing_guard: Some(tracing_guard),
        metrics_enabled: config.metrics_enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_guard() {
        let guard = ObservabilityGuard::empty();
        assert!(!guard.metrics_enabled());
    }
}
