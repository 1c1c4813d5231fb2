//! 命令执行器
//!
//! 将命令行参数转化为分发器调用，结果以 JSON 输出到标准输出。

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::dispatcher::{DeleteMode, DispatchOptions, Dispatcher};
use crate::types::{EndpointHandle, EndpointRegistration, FanOutRequest, TopicMessage};

/// 命令执行器
pub struct CommandRunner {
    dispatcher: Dispatcher,
}

impl CommandRunner {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// 执行 publish 命令
    pub async fn run_publish(
        &self,
        target_arn: String,
        message: String,
        subject: Option<String>,
        message_structure: Option<String>,
    ) -> Result<()> {
        let mut msg = TopicMessage::new(target_arn, message);
        msg.subject = subject;
        msg.message_structure = message_structure;

        let receipt = self.dispatcher.publish(&msg).await?;
        print_json(&receipt)
    }

    /// 执行 create-endpoint 命令
    pub async fn run_create_endpoint(
        &self,
        platform_application_arn: String,
        token: String,
        user_data: String,
        attributes: Vec<(String, String)>,
    ) -> Result<()> {
        let reg = EndpointRegistration::new(platform_application_arn, token, user_data)
            .with_attributes(attributes.into_iter().collect::<HashMap<_, _>>());

        let handle = self.dispatcher.create_platform_endpoint(&reg).await?;
        print_json(&serde_json::json!({ "endpoint_arn": handle }))
    }

    /// 执行 delete-endpoint 命令
    pub async fn run_delete_endpoint(&self, endpoint_arn: String, strict: bool) -> Result<()> {
        let dispatcher = if strict {
            self.dispatcher.clone().with_options(DispatchOptions {
                delete_mode: DeleteMode::Strict,
                ..self.dispatcher.options().clone()
            })
        } else {
            self.dispatcher.clone()
        };

        let deleted = dispatcher
            .delete_endpoint(&EndpointHandle::new(endpoint_arn))
            .await?;
        print_json(&serde_json::json!({ "deleted": deleted }))
    }

    /// 执行 fan-out 命令
    ///
    /// Ctrl-C 后不再发起新的发送，已发出的请求正常完成。
    pub async fn run_fan_out(
        &self,
        endpoints: Vec<String>,
        alert: String,
        data: Option<String>,
        providers: Vec<String>,
        default_message: String,
        concurrency: Option<usize>,
    ) -> Result<()> {
        let data = match data {
            Some(raw) => serde_json::from_str::<Map<String, Value>>(&raw)
                .context("--data 必须是 JSON 对象")?,
            None => Map::new(),
        };

        let mut request = FanOutRequest::new(endpoints, alert)
            .with_data(data)
            .with_default_message(default_message);
        if !providers.is_empty() {
            request = request.with_providers(providers.iter().map(String::as_str));
        }

        let dispatcher = match concurrency {
            Some(concurrency) => self.dispatcher.clone().with_options(DispatchOptions {
                concurrency,
                ..self.dispatcher.options().clone()
            }),
            None => self.dispatcher.clone(),
        };

        let (tx, rx) = watch::channel(false);
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到中断信号，停止发起新的推送");
                tx.send_replace(true);
            }
        });

        let report = dispatcher.publish_to_endpoints_until(&request, rx).await;
        signal_task.abort();

        info!(
            success_count = report.success_count(),
            failure_count = report.failure_count(),
            skipped_count = report.skipped_count(),
            "fan-out 命令完成"
        );
        print_json(&report)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::client::MockNotificationClient;
    use crate::types::{ClientConfig, PublishReceipt};

    fn runner(mock: MockNotificationClient) -> CommandRunner {
        let dispatcher =
            Dispatcher::with_client(ClientConfig::new("us-east-1", "AK", "SK"), Arc::new(mock))
                .unwrap();
        CommandRunner::new(dispatcher)
    }

    #[tokio::test]
    async fn test_fan_out_rejects_non_object_data() {
        let result = runner(MockNotificationClient::new())
            .run_fan_out(
                vec!["e1".to_string()],
                "hi".to_string(),
                Some("[1, 2]".to_string()),
                vec![],
                String::new(),
                None,
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fan_out_uses_requested_providers() {
        let mut mock = MockNotificationClient::new();
        mock.expect_publish()
            .withf(|req| {
                let body: Value = serde_json::from_str(&req.message).unwrap();
                body.get("GCM").is_none() && body.get("ADM").is_some()
            })
            .times(1)
            .returning(|_| {
                Ok(PublishReceipt {
                    message_id: "m-1".to_string(),
                })
            });

        let result = runner(mock)
            .run_fan_out(
                vec!["e1".to_string()],
                "hi".to_string(),
                Some(r#"{"k": "v"}"#.to_string()),
                vec!["adm".to_string()],
                String::new(),
                Some(1),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_strict_delete_checks_existence() {
        let mut mock = MockNotificationClient::new();
        mock.expect_get_endpoint_attributes()
            .times(1)
            .returning(|_| Ok(None));
        mock.expect_delete_endpoint().never();

        let result = runner(mock)
            .run_delete_endpoint("arn:endpoint/gone".to_string(), true)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_publish_validation_error_is_returned() {
        let result = runner(MockNotificationClient::new())
            .run_publish(String::new(), "hello".to_string(), None, None)
            .await;
        assert!(result.is_err());
    }
}
