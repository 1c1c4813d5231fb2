//! 通知服务客户端抽象
//!
//! 分发器只依赖 `NotificationClient` trait，生产环境使用 SNS 实现，
//! 测试中可替换为 mock。请求类型按 SNS API 字段命名序列化，
//! 便于断言实际发出的请求内容。

mod sns;

pub use sns::SnsNotificationClient;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::types::{EndpointHandle, EndpointRegistration, PublishReceipt, TopicMessage};

/// Publish 请求
///
/// Subject 与 MessageStructure 为空时不出现在请求中，避免覆盖服务端默认值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishRequest {
    pub target_arn: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_structure: Option<String>,
}

impl From<&TopicMessage> for PublishRequest {
    fn from(msg: &TopicMessage) -> Self {
        Self {
            target_arn: msg.target_arn.clone(),
            message: msg.message.clone(),
            subject: msg.subject.clone().filter(|s| !s.is_empty()),
            message_structure: msg.message_structure.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// CreatePlatformEndpoint 请求，字段原样映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateEndpointRequest {
    pub platform_application_arn: String,
    pub token: String,
    pub custom_user_data: String,
    pub attributes: HashMap<String, String>,
}

impl From<&EndpointRegistration> for CreateEndpointRequest {
    fn from(reg: &EndpointRegistration) -> Self {
        Self {
            platform_application_arn: reg.platform_application_arn.clone(),
            token: reg.token.clone(),
            custom_user_data: reg.user_data.clone(),
            attributes: reg.attributes.clone(),
        }
    }
}

/// DeleteEndpoint 请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteEndpointRequest {
    pub endpoint_arn: String,
}

/// 通知服务能力接口
///
/// 每个方法对应一次网络调用，服务端错误以 `DispatchError::Service` 返回。
/// 实现必须可在多个调用方之间共享，调用过程中不修改内部状态。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationClient: Send + Sync {
    async fn publish(&self, request: PublishRequest) -> Result<PublishReceipt>;

    async fn create_platform_endpoint(
        &self,
        request: CreateEndpointRequest,
    ) -> Result<EndpointHandle>;

    async fn delete_endpoint(&self, request: DeleteEndpointRequest) -> Result<()>;

    /// 查询端点属性，端点不存在时返回 `None`
    async fn get_endpoint_attributes(
        &self,
        endpoint_arn: String,
    ) -> Result<Option<HashMap<String, String>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_request_omits_empty_optional_fields() {
        let msg = TopicMessage::new("arn:x", "hello")
            .with_subject("")
            .with_message_structure("");

        let request = PublishRequest::from(&msg);
        assert!(request.subject.is_none());
        assert!(request.message_structure.is_none());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"TargetArn": "arn:x", "Message": "hello"})
        );
    }

    #[test]
    fn test_publish_request_keeps_non_empty_optional_fields() {
        let msg = TopicMessage::new("arn:x", r#"{"default":"hi"}"#)
            .with_subject("Greeting")
            .with_message_structure("json");

        let value = serde_json::to_value(PublishRequest::from(&msg)).unwrap();
        assert_eq!(value["Subject"], "Greeting");
        assert_eq!(value["MessageStructure"], "json");
    }

    #[test]
    fn test_create_endpoint_request_field_mapping() {
        let reg = EndpointRegistration::new("arn:app/GCM/demo", "device-token", "user-42")
            .with_attribute("Enabled", "true");

        let value = serde_json::to_value(CreateEndpointRequest::from(&reg)).unwrap();
        assert_eq!(
            value,
            json!({
                "PlatformApplicationArn": "arn:app/GCM/demo",
                "Token": "device-token",
                "CustomUserData": "user-42",
                "Attributes": {"Enabled": "true"}
            })
        );
    }
}
