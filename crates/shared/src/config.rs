//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 规则引擎配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 规则文件路径（JSON 数组）
    pub rules_path: PathBuf,
    /// 单个动作函数的超时时间，未设置时不限时
    pub action_timeout_ms: Option<u64>,
    /// 执行完成后是否把结果以 JSON 打印到标准输出
    pub print_results: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("rules/sample.json"),
            action_timeout_ms: None,
            print_results: true,
        }
    }
}

impl EngineConfig {
    pub fn action_timeout(&self) -> Option<Duration> {
        self.action_timeout_ms.map(Duration::from_millis)
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

impl ObservabilityConfig {
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub engine: EngineConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（RULES_ 前缀，`__` 分隔层级，如 RULES_ENGINE__RULES_PATH -> engine.rules_path）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from(service_name, &config_dir)
    }

    /// 从指定目录加载配置
    pub fn load_from(
        service_name: &str,
        config_dir: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let env = std::env::var("RULES_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix("RULES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rules-config-{}-{}",
            name,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.engine.rules_path, PathBuf::from("rules/sample.json"));
        assert!(config.engine.action_timeout().is_none());
        assert_eq!(config.observability.metrics_port, 9090);
        assert!(!config.observability.json_logs());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let dir = temp_dir("empty");
        let config = AppConfig::load_from("rule-runner", &dir).unwrap();

        assert_eq!(config.service_name, "rule-runner");
        assert!(config.engine.print_results);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_service_file_overrides_default_file() {
        let dir = temp_dir("layered");
        fs::write(
            dir.join("default.toml"),
            "[engine]\nrules_path = \"rules/all.json\"\naction_timeout_ms = 500\n\n[observability]\nlog_format = \"json\"\n",
        )
        .unwrap();
        fs::write(
            dir.join("layered-runner.toml"),
            "[engine]\nrules_path = \"rules/orders.json\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from("layered-runner", &dir).unwrap();

        assert_eq!(config.engine.rules_path, PathBuf::from("rules/orders.json"));
        assert_eq!(
            config.engine.action_timeout(),
            Some(Duration::from_millis(500))
        );
        assert!(config.observability.json_logs());
    }
}
