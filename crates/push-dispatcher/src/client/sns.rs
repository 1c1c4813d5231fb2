//! AWS SNS 客户端实现
//!
//! 使用静态凭证构建 SDK 客户端，构建过程只做配置绑定，不发起网络请求。

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_sns::Client;
use aws_sdk_sns::config::Builder as SnsConfigBuilder;
use aws_sdk_sns::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tracing::debug;

use super::{CreateEndpointRequest, DeleteEndpointRequest, NotificationClient, PublishRequest};
use crate::error::{DispatchError, Result};
use crate::types::{ClientConfig, EndpointHandle, PublishReceipt};

/// SNS 通知客户端
///
/// 内部的 SDK 客户端只读，可跨任务共享。
#[derive(Clone, Debug)]
pub struct SnsNotificationClient {
    client: Client,
}

impl SnsNotificationClient {
    /// 根据配置构建客户端
    ///
    /// 调用方需先完成必填项校验；这里只检查自定义服务地址的格式。
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "push-dispatcher",
        );

        let mut builder = SnsConfigBuilder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint_url) = &config.endpoint_url {
            if !(endpoint_url.starts_with("http://") || endpoint_url.starts_with("https://")) {
                return Err(DispatchError::Config(format!(
                    "invalid endpoint url: {}",
                    endpoint_url
                )));
            }
            builder = builder.endpoint_url(endpoint_url);
        }

        debug!(
            region = %config.region,
            api_version = %config.api_version,
            endpoint_url = ?config.endpoint_url,
            "SNS 客户端已构建"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl NotificationClient for SnsNotificationClient {
    async fn publish(&self, request: PublishRequest) -> Result<PublishReceipt> {
        let output = self
            .client
            .publish()
            .target_arn(request.target_arn)
            .message(request.message)
            .set_subject(request.subject)
            .set_message_structure(request.message_structure)
            .send()
            .await
            .map_err(|e| service_error("Publish", e))?;

        Ok(PublishReceipt {
            message_id: output.message_id.unwrap_or_default(),
        })
    }

    async fn create_platform_endpoint(
        &self,
        request: CreateEndpointRequest,
    ) -> Result<EndpointHandle> {
        let output = self
            .client
            .create_platform_endpoint()
            .platform_application_arn(request.platform_application_arn)
            .token(request.token)
            .custom_user_data(request.custom_user_data)
            .set_attributes(Some(request.attributes))
            .send()
            .await
            .map_err(|e| service_error("CreatePlatformEndpoint", e))?;

        output
            .endpoint_arn
            .map(EndpointHandle::from)
            .ok_or_else(|| DispatchError::service("CreatePlatformEndpoint", "响应中缺少 EndpointArn"))
    }

    async fn delete_endpoint(&self, request: DeleteEndpointRequest) -> Result<()> {
        self.client
            .delete_endpoint()
            .endpoint_arn(request.endpoint_arn)
            .send()
            .await
            .map_err(|e| service_error("DeleteEndpoint", e))?;
        Ok(())
    }

    async fn get_endpoint_attributes(
        &self,
        endpoint_arn: String,
    ) -> Result<Option<HashMap<String, String>>> {
        match self
            .client
            .get_endpoint_attributes()
            .endpoint_arn(endpoint_arn)
            .send()
            .await
        {
            Ok(output) => Ok(Some(output.attributes.unwrap_or_default())),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found_exception()) => {
                Ok(None)
            }
            Err(e) => Err(service_error("GetEndpointAttributes", e)),
        }
    }
}

/// 将 SDK 错误转换为服务错误，保留服务端错误码和原始信息
fn service_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> DispatchError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    DispatchError::Service {
        operation,
        code,
        message,
    }
}
