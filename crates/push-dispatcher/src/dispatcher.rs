//! 推送分发器
//!
//! 负责参数校验、请求构建以及多端点发送的错误隔离策略。
//!
//! ## 设计说明
//!
//! - 单目标操作（publish / create_platform_endpoint / delete_endpoint）快速失败，
//!   错误直接返回调用方，不做本地重试
//! - 多端点发送中单个端点的任何错误都被隔离：记录并通知观察者后继续下一个端点，
//!   调用方只会拿到逐端点的结果列表
//! - 多端点发送使用有界并发，按输入顺序发起，结果按输入顺序返回

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use push_shared::config::{AppConfig, DispatchConfig};
use push_shared::observability::metrics;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{
    CreateEndpointRequest, DeleteEndpointRequest, NotificationClient, PublishRequest,
    SnsNotificationClient,
};
use crate::error::{DispatchError, Result};
use crate::fanout::{EndpointOutcome, FailureEvent, FanOutObserver, FanOutReport, TracingObserver};
use crate::payload;
use crate::types::{
    ClientConfig, EndpointHandle, EndpointRegistration, FanOutRequest, Provider, PublishReceipt,
    TopicMessage,
};

/// 删除端点的确认方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// 删除调用未报错即视为成功，不关心端点是否存在
    #[default]
    BestEffort,
    /// 先查询端点属性，端点不存在时返回 false 且不发起删除
    Strict,
}

/// 分发器选项
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// 多端点发送的并发上限，最小为 1
    pub concurrency: usize,
    pub delete_mode: DeleteMode,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatchOptions {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            delete_mode: if config.strict_delete {
                DeleteMode::Strict
            } else {
                DeleteMode::BestEffort
            },
        }
    }
}

/// 推送分发器
///
/// 进程内长期持有一个通知服务客户端，构造后不再重新配置。
/// 克隆成本很低，可在多个任务间共享。
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn NotificationClient>,
    observer: Arc<dyn FanOutObserver>,
    options: DispatchOptions,
}

impl Dispatcher {
    /// 校验配置并构建 SNS 客户端，不发起网络请求
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = SnsNotificationClient::from_config(&config)?;
        Self::with_client(config, Arc::new(client))
    }

    /// 使用外部注入的客户端构造
    pub fn with_client(config: ClientConfig, client: Arc<dyn NotificationClient>) -> Result<Self> {
        config.validate()?;

        info!(
            region = %config.region,
            api_version = %config.api_version,
            "推送分发器已创建"
        );

        Ok(Self {
            client,
            observer: Arc::new(TracingObserver),
            options: DispatchOptions::default(),
        })
    }

    /// 根据应用配置构造
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(ClientConfig::from(&config.sns))?
            .with_options(DispatchOptions::from(&config.dispatch)))
    }

    pub fn with_observer(mut self, observer: Arc<dyn FanOutObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = DispatchOptions {
            concurrency: options.concurrency.max(1),
            ..options
        };
        self
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// 发布消息到主题或端点
    ///
    /// Subject 与 MessageStructure 为空时不会出现在请求中。
    pub async fn publish(&self, msg: &TopicMessage) -> Result<PublishReceipt> {
        if msg.target_arn.is_empty() || msg.message.is_empty() {
            return Err(DispatchError::Validation(
                "发布消息必须提供 TargetArn 和 Message".to_string(),
            ));
        }

        let request = PublishRequest::from(msg);
        debug!(
            target_arn = %request.target_arn,
            has_subject = request.subject.is_some(),
            message_structure = ?request.message_structure,
            "发布消息"
        );

        let result = self.client.publish(request).await;
        record("publish", &result);
        result
    }

    /// 注册设备端点，返回服务端分配的 EndpointArn
    pub async fn create_platform_endpoint(
        &self,
        reg: &EndpointRegistration,
    ) -> Result<EndpointHandle> {
        if reg.platform_application_arn.is_empty() || reg.token.is_empty() || reg.user_data.is_empty()
        {
            return Err(DispatchError::Validation(
                "创建平台端点必须提供 PlatformApplicationArn、Token 和 UserData".to_string(),
            ));
        }

        let result = self
            .client
            .create_platform_endpoint(CreateEndpointRequest::from(reg))
            .await;
        record("create_platform_endpoint", &result);

        let handle = result?;
        info!(
            platform_application_arn = %reg.platform_application_arn,
            endpoint = %handle,
            "平台端点已创建"
        );
        Ok(handle)
    }

    /// 注销设备端点
    ///
    /// 尽力模式下，删除调用未报错即返回 `true`，即使端点原本不存在；
    /// 严格模式下端点不存在时返回 `false`。服务错误始终向上传播。
    pub async fn delete_endpoint(&self, handle: &EndpointHandle) -> Result<bool> {
        if handle.is_empty() {
            return Err(DispatchError::Validation(
                "注销端点必须提供 EndpointArn".to_string(),
            ));
        }

        if self.options.delete_mode == DeleteMode::Strict {
            let attributes = self
                .client
                .get_endpoint_attributes(handle.to_string())
                .await;
            if let Ok(None) = attributes {
                warn!(endpoint = %handle, "端点不存在，跳过删除");
                metrics::record_operation("delete_endpoint", "not_found");
                return Ok(false);
            }
            attributes?;
        }

        let result = self
            .client
            .delete_endpoint(DeleteEndpointRequest {
                endpoint_arn: handle.to_string(),
            })
            .await;
        record("delete_endpoint", &result);
        result?;

        info!(endpoint = %handle, "平台端点已删除");
        Ok(true)
    }

    /// 向单个端点发送多服务商通知
    ///
    /// 失败只影响本次调用，多端点发送依赖这一点做错误隔离。
    pub async fn publish_to_endpoint(
        &self,
        endpoint: &EndpointHandle,
        alert: &str,
        data: &Map<String, Value>,
        providers: &BTreeSet<Provider>,
        default_message: &str,
    ) -> Result<PublishReceipt> {
        if endpoint.is_empty() {
            return Err(DispatchError::Validation(
                "端点推送必须提供 EndpointArn".to_string(),
            ));
        }
        // 只发送数据时 alert 可以为空，但 default 消息不能为空
        if alert.is_empty() && default_message.is_empty() {
            return Err(DispatchError::Validation(
                "端点推送必须提供 alert 或 default_message".to_string(),
            ));
        }

        let message = payload::build_endpoint_message(alert, data, providers, default_message)?;
        let msg = TopicMessage::new(endpoint.as_str(), message).with_message_structure("json");
        self.publish(&msg).await
    }

    /// 向多个端点发送同一条通知
    ///
    /// 不向调用方返回错误，逐端点结果见返回的报告，失败同时通知观察者。
    pub async fn publish_to_endpoints(&self, request: &FanOutRequest) -> FanOutReport {
        self.fan_out(request, None).await
    }

    /// 同 [`publish_to_endpoints`](Self::publish_to_endpoints)，收到取消信号后不再发起新的发送
    ///
    /// 已发出的请求正常完成，未发起的端点标记为跳过。
    pub async fn publish_to_endpoints_until(
        &self,
        request: &FanOutRequest,
        shutdown: watch::Receiver<bool>,
    ) -> FanOutReport {
        self.fan_out(request, Some(shutdown)).await
    }

    async fn fan_out(
        &self,
        request: &FanOutRequest,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> FanOutReport {
        let start = Instant::now();

        info!(
            endpoints = request.endpoints.len(),
            providers = ?request.providers,
            concurrency = self.options.concurrency,
            "开始多端点推送"
        );

        let outcomes: Vec<EndpointOutcome> = stream::iter(request.endpoints.iter())
            .map(|endpoint| {
                let shutdown = shutdown.clone();
                async move {
                    if let Some(reason) = stop_reason(shutdown.as_ref(), request.deadline) {
                        debug!(endpoint = %endpoint, reason, "跳过端点推送");
                        return EndpointOutcome::skipped(endpoint.clone(), reason);
                    }

                    let send_start = Instant::now();
                    let result = self
                        .publish_to_endpoint(
                            endpoint,
                            &request.alert,
                            &request.data,
                            &request.providers,
                            &request.default_message,
                        )
                        .await;
                    let elapsed = send_start.elapsed().as_millis() as u64;

                    match result {
                        Ok(receipt) => {
                            self.observer.on_delivered(endpoint, &receipt);
                            EndpointOutcome::delivered(endpoint.clone(), receipt, elapsed)
                        }
                        Err(e) => {
                            let event = FailureEvent::new(endpoint.clone(), &e);
                            self.observer.on_failure(&event);
                            EndpointOutcome::failed(event, elapsed)
                        }
                    }
                }
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let report = FanOutReport {
            outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        metrics::record_fanout(
            report.success_count(),
            report.failure_count(),
            report.skipped_count(),
            start.elapsed().as_secs_f64(),
        );

        if report.failure_count() > 0 || report.skipped_count() > 0 {
            warn!(
                total = report.outcomes.len(),
                success_count = report.success_count(),
                failure_count = report.failure_count(),
                skipped_count = report.skipped_count(),
                "多端点推送部分未完成"
            );
        } else {
            info!(
                total = report.outcomes.len(),
                duration_ms = report.duration_ms,
                "多端点推送完成"
            );
        }

        report
    }
}

/// 判断是否应停止发起新的发送
fn stop_reason(
    shutdown: Option<&watch::Receiver<bool>>,
    deadline: Option<Instant>,
) -> Option<&'static str> {
    if shutdown.is_some_and(|rx| *rx.borrow()) {
        return Some("cancelled");
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Some("deadline exceeded");
    }
    None
}

fn record<T>(operation: &str, result: &Result<T>) {
    let status = match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::record_operation(operation, status);
}
