//! 推送分发数据类型
//!
//! 所有类型都是按次构造的不可变值，分发器不缓存也不持久化任何实体。

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use push_shared::config::SnsConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::error::{DispatchError, Result};

/// SNS 客户端配置
///
/// region、access_key、secret_key 必须非空，否则构造分发器失败。
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub region: String,
    /// API 版本，缺省为 "latest"
    pub api_version: String,
    pub access_key: String,
    pub secret_key: String,
    /// 自定义服务地址（本地模拟器等）
    pub endpoint_url: Option<String>,
}

impl ClientConfig {
    pub fn new(
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            api_version: "latest".to_string(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            endpoint_url: None,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// 校验必填项
    pub fn validate(&self) -> Result<()> {
        if self.region.is_empty() {
            return Err(DispatchError::Config("missing region".to_string()));
        }
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(DispatchError::Config("missing credentials".to_string()));
        }
        Ok(())
    }
}

impl From<&SnsConfig> for ClientConfig {
    fn from(sns: &SnsConfig) -> Self {
        let api_version = if sns.version.is_empty() {
            "latest".to_string()
        } else {
            sns.version.clone()
        };
        Self {
            region: sns.region.clone(),
            api_version,
            access_key: sns.access_key.clone(),
            secret_key: sns.secret_key.clone(),
            endpoint_url: sns.endpoint_url.clone().filter(|url| !url.is_empty()),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("region", &self.region)
            .field("api_version", &self.api_version)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// 发布到主题或端点的消息
///
/// message_structure 为 "json" 时，message 必须是包含字符串类型 "default" 键的 JSON 对象，
/// 该约束由通知服务校验。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    pub target_arn: String,
    pub message: String,
    pub subject: Option<String>,
    pub message_structure: Option<String>,
}

impl TopicMessage {
    pub fn new(target_arn: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target_arn: target_arn.into(),
            message: message.into(),
            subject: None,
            message_structure: None,
        }
    }

    /// 邮件订阅使用的主题
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_message_structure(mut self, message_structure: impl Into<String>) -> Self {
        self.message_structure = Some(message_structure.into());
        self
    }
}

/// 设备端点注册请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRegistration {
    pub platform_application_arn: String,
    pub token: String,
    pub user_data: String,
    /// 端点属性，允许为空
    pub attributes: HashMap<String, String>,
}

impl EndpointRegistration {
    pub fn new(
        platform_application_arn: impl Into<String>,
        token: impl Into<String>,
        user_data: impl Into<String>,
    ) -> Self {
        Self {
            platform_application_arn: platform_application_arn.into(),
            token: token.into(),
            user_data: user_data.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes.extend(attributes);
        self
    }
}

/// 通知服务分配的端点标识（EndpointArn）
///
/// 原样返回给调用方，由调用方持有。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointHandle(String);

impl EndpointHandle {
    pub fn new(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EndpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EndpointHandle {
    fn from(arn: String) -> Self {
        Self(arn)
    }
}

impl From<&str> for EndpointHandle {
    fn from(arn: &str) -> Self {
        Self(arn.to_string())
    }
}

/// 发布回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub message_id: String,
}

/// 推送服务商标识
///
/// 开放的字符串标签集合，统一转为大写。新增服务商无需修改分发逻辑。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Provider(String);

impl Provider {
    pub const GCM: &'static str = "GCM";
    pub const APNS: &'static str = "APNS";
    pub const APNS_SANDBOX: &'static str = "APNS_SANDBOX";
    pub const ADM: &'static str = "ADM";
    pub const BAIDU: &'static str = "BAIDU";

    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_ascii_uppercase())
    }

    pub fn gcm() -> Self {
        Self::new(Self::GCM)
    }

    pub fn apns() -> Self {
        Self::new(Self::APNS)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 默认服务商集合：GCM + APNS
    pub fn defaults() -> BTreeSet<Provider> {
        BTreeSet::from([Self::gcm(), Self::apns()])
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Provider {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// 多端点发送请求
///
/// 同一条逻辑通知投递到多个端点，各端点独立成功或失败。
#[derive(Debug, Clone)]
pub struct FanOutRequest {
    pub endpoints: Vec<EndpointHandle>,
    pub alert: String,
    pub data: Map<String, Value>,
    pub providers: BTreeSet<Provider>,
    /// 为空时使用 alert 作为默认消息
    pub default_message: String,
    /// 到期后不再发起新的发送
    pub deadline: Option<Instant>,
}

impl FanOutRequest {
    pub fn new(
        endpoints: impl IntoIterator<Item = impl Into<EndpointHandle>>,
        alert: impl Into<String>,
    ) -> Self {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            alert: alert.into(),
            data: Map::new(),
            providers: Provider::defaults(),
            default_message: String::new(),
            deadline: None,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_data_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// 设置服务商集合，空白标签被忽略
    pub fn with_providers(mut self, providers: impl IntoIterator<Item = impl Into<Provider>>) -> Self {
        self.providers = providers
            .into_iter()
            .map(Into::into)
            .filter(|p: &Provider| !p.is_empty())
            .collect();
        self
    }

    pub fn with_default_message(mut self, default_message: impl Into<String>) -> Self {
        self.default_message = default_message.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}
