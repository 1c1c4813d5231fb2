//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// 兼容旧部署方式的环境变量，优先级高于配置文件和 PUSH_ 前缀变量
const LEGACY_SNS_ENV: [(&str, &str); 4] = [
    ("AWS_SNS_REGION", "sns.region"),
    ("AWS_SNS_VERSION", "sns.version"),
    ("AWS_SNS_ACCESSKEY", "sns.access_key"),
    ("AWS_SNS_SECRETKEY", "sns.secret_key"),
];

/// SNS 连接配置
///
/// 只负责承载配置值，是否为空的校验在构造分发器时进行。
#[derive(Clone, Deserialize)]
pub struct SnsConfig {
    #[serde(default)]
    pub region: String,
    /// API 版本，缺省为 "latest"
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    /// 自定义服务地址（本地模拟器等），为空时使用 AWS 默认地址
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

fn default_version() -> String {
    "latest".to_string()
}

impl Default for SnsConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            version: default_version(),
            access_key: String::new(),
            secret_key: String::new(),
            endpoint_url: None,
        }
    }
}

// 手写 Debug，避免密钥出现在日志中
impl std::fmt::Debug for SnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnsConfig")
            .field("region", &self.region)
            .field("version", &self.version)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// 多端点分发配置
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// 多端点发送的并发上限，1 表示逐个顺序发送
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// 删除端点前是否先确认端点存在
    #[serde(default)]
    pub strict_delete: bool,
}

fn default_concurrency() -> usize {
    8
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            strict_delete: false,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    #[serde(default)]
    pub sns: SnsConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. 环境变量（PUSH_ 前缀，层级用双下划线，如 PUSH_SNS__REGION -> sns.region）
    /// 4. AWS_SNS_REGION / AWS_SNS_VERSION / AWS_SNS_ACCESSKEY / AWS_SNS_SECRETKEY
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        // .env 文件不存在时忽略
        let _ = dotenvy::dotenv();

        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::load_from_vars(service_name, &vars)
    }

    /// 使用给定的环境变量集合加载配置，加载顺序同 [`load`](Self::load)
    ///
    /// PUSH_ENV 选择环境配置文件，CONFIG_DIR 指定配置目录（默认 `config`）。
    pub fn load_from_vars(
        service_name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let env = vars
            .get("PUSH_ENV")
            .cloned()
            .unwrap_or_else(|| "development".to_string());
        let config_dir = vars
            .get("CONFIG_DIR")
            .cloned()
            .unwrap_or_else(|| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                Environment::with_prefix("PUSH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            );

        let builder = apply_legacy_env(builder, |key| vars.get(key).cloned())?;

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// 将旧版 AWS_SNS_* 变量作为最高优先级覆盖项写入 builder
///
/// 变量读取通过 `lookup` 注入，空字符串视为未设置。
fn apply_legacy_env(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (var, key) in LEGACY_SNS_ENV {
        let value = lookup(var).filter(|v| !v.is_empty());
        builder = builder.set_override_option(key, value)?;
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> ConfigBuilder<DefaultState> {
        Config::builder()
            .set_default("service_name", "push-dispatcher")
            .unwrap()
            .set_default("environment", "test")
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.sns.version, "latest");
        assert_eq!(config.dispatch.concurrency, 8);
        assert!(!config.dispatch.strict_delete);
    }

    #[test]
    fn test_legacy_env_overrides_sns_section() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("AWS_SNS_REGION", "us-east-1"),
            ("AWS_SNS_ACCESSKEY", "AK"),
            ("AWS_SNS_SECRETKEY", "SK"),
        ]);

        let builder = apply_legacy_env(base_builder(), |key| {
            vars.get(key).map(|v| v.to_string())
        })
        .unwrap();
        let config: AppConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.sns.region, "us-east-1");
        assert_eq!(config.sns.access_key, "AK");
        assert_eq!(config.sns.secret_key, "SK");
        // 未设置 AWS_SNS_VERSION 时保持默认值
        assert_eq!(config.sns.version, "latest");
    }

    #[test]
    fn test_legacy_env_ignores_empty_values() {
        let builder = base_builder()
            .set_default("sns.region", "eu-west-1")
            .unwrap();
        let builder = apply_legacy_env(builder, |key| {
            (key == "AWS_SNS_REGION").then(String::new)
        })
        .unwrap();
        let config: AppConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.sns.region, "eu-west-1");
    }

    #[test]
    fn test_sns_config_debug_hides_secret() {
        let sns = SnsConfig {
            region: "us-east-1".to_string(),
            access_key: "AK".to_string(),
            secret_key: "super-secret".to_string(),
            ..Default::default()
        };

        let printed = format!("{:?}", sns);
        assert!(printed.contains("us-east-1"));
        assert!(!printed.contains("super-secret"));
    }
}
