//! 日志初始化
//!
//! 基于 tracing-subscriber，支持 json（结构化）和 pretty 两种输出格式。

use anyhow::Result;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::ObservabilityConfig;

/// Tracing 资源守卫
///
/// 退出前刷新标准输出，避免最后几条日志丢失。
pub struct TracingGuard {
    _private: (),
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
}

/// 构建环境过滤器，`RUST_LOG` 优先于配置中的级别
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化 tracing
///
/// 日志写到标准错误，标准输出留给结果输出。
pub fn init(config: &ObservabilityConfig) -> Result<TracingGuard> {
    let fmt_layer = if config.json_logs() {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level))
        .with(fmt_layer)
        .try_init()?;

    Ok(TracingGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back() {
        // 非法的过滤表达式不应 panic
        let _ = env_filter("not a [valid filter");
    }

    #[test]
    fn test_second_init_fails() {
        let config = ObservabilityConfig::default();
        let first = init(&config);
        let second = init(&config);
        // 全局 subscriber 只能设置一次
        assert!(first.is_err() || second.is_err());
    }
}
