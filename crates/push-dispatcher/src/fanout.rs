//! 多端点发送结果与观察者
//!
//! 多端点发送不向调用方返回错误，每个端点的结果汇总到 `FanOutReport`，
//! 失败事件同时通知 `FanOutObserver`，便于日志记录或在测试中断言。

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::DispatchError;
use crate::types::{EndpointHandle, PublishReceipt};

/// 单端点投递状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// 服务端已接受
    Delivered,
    /// 发送失败
    Failed,
    /// 因取消或超时未发起
    Skipped,
}

/// 单端点失败事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEvent {
    pub endpoint: EndpointHandle,
    pub error_kind: &'static str,
    pub message: String,
}

impl FailureEvent {
    pub fn new(endpoint: EndpointHandle, err: &DispatchError) -> Self {
        Self {
            endpoint,
            error_kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// 单端点发送结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointOutcome {
    pub endpoint: EndpointHandle,
    pub status: DeliveryStatus,
    /// 服务端消息 ID（成功时）
    pub message_id: Option<String>,
    /// 错误分类码（失败时）
    pub error_kind: Option<&'static str>,
    /// 失败原因或跳过原因
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl EndpointOutcome {
    pub fn delivered(endpoint: EndpointHandle, receipt: PublishReceipt, duration_ms: u64) -> Self {
        Self {
            endpoint,
            status: DeliveryStatus::Delivered,
            message_id: Some(receipt.message_id),
            error_kind: None,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(event: FailureEvent, duration_ms: u64) -> Self {
        Self {
            endpoint: event.endpoint,
            status: DeliveryStatus::Failed,
            message_id: None,
            error_kind: Some(event.error_kind),
            error: Some(event.message),
            duration_ms,
        }
    }

    pub fn skipped(endpoint: EndpointHandle, reason: impl Into<String>) -> Self {
        Self {
            endpoint,
            status: DeliveryStatus::Skipped,
            message_id: None,
            error_kind: None,
            error: Some(reason.into()),
            duration_ms: 0,
        }
    }
}

/// 多端点发送汇总，结果顺序与请求中的端点顺序一致
#[derive(Debug, Clone, Default, Serialize)]
pub struct FanOutReport {
    pub outcomes: Vec<EndpointOutcome>,
    pub duration_ms: u64,
}

impl FanOutReport {
    fn count(&self, status: DeliveryStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn success_count(&self) -> usize {
        self.count(DeliveryStatus::Delivered)
    }

    pub fn failure_count(&self) -> usize {
        self.count(DeliveryStatus::Failed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(DeliveryStatus::Skipped)
    }

    /// 是否部分成功
    pub fn is_partial_success(&self) -> bool {
        let success_count = self.success_count();
        success_count > 0 && success_count < self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &EndpointOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::Failed)
    }
}

/// 多端点发送观察者
///
/// 回调在发送任务内同步执行，实现应尽快返回。
pub trait FanOutObserver: Send + Sync {
    fn on_failure(&self, event: &FailureEvent);

    fn on_delivered(&self, _endpoint: &EndpointHandle, _receipt: &PublishReceipt) {}
}

/// 默认观察者：失败写 error 日志
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FanOutObserver for TracingObserver {
    fn on_failure(&self, event: &FailureEvent) {
        error!(
            endpoint = %event.endpoint,
            error_kind = event.error_kind,
            error = %event.message,
            "端点推送失败"
        );
    }

    fn on_delivered(&self, endpoint: &EndpointHandle, receipt: &PublishReceipt) {
        debug!(
            endpoint = %endpoint,
            message_id = %receipt.message_id,
            "端点推送成功"
        );
    }
}

/// 在内存中收集失败事件
#[derive(Debug, Default)]
pub struct CollectingObserver {
    failures: Mutex<Vec<FailureEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收集的失败事件快照
    pub fn failures(&self) -> Vec<FailureEvent> {
        self.failures.lock().clone()
    }
}

impl FanOutObserver for CollectingObserver {
    fn on_failure(&self, event: &FailureEvent) {
        self.failures.lock().push(event.clone());
    }
}

/// 将失败事件转发到 channel，接收端关闭后静默丢弃
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<FailureEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FailureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FanOutObserver for ChannelObserver {
    fn on_failure(&self, event: &FailureEvent) {
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(id: &str) -> PublishReceipt {
        PublishReceipt {
            message_id: id.to_string(),
        }
    }

    #[test]
    fn test_report_counts() {
        let report = FanOutReport {
            outcomes: vec![
                EndpointOutcome::delivered("e1".into(), receipt("m1"), 10),
                EndpointOutcome::failed(
                    FailureEvent::new("e2".into(), &DispatchError::service("Publish", "boom")),
                    12,
                ),
                EndpointOutcome::skipped("e3".into(), "cancelled"),
            ],
            duration_ms: 25,
        };

        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(report.is_partial_success());

        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].endpoint.as_str(), "e2");
        assert_eq!(failed[0].error_kind, Some("SERVICE_ERROR"));
    }

    #[test]
    fn test_empty_report_is_not_partial_success() {
        let report = FanOutReport::default();
        assert_eq!(report.success_count(), 0);
        assert!(!report.is_partial_success());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = EndpointOutcome::delivered("arn:endpoint/1".into(), receipt("m1"), 3);
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["endpoint"], "arn:endpoint/1");
        assert_eq!(value["status"], "DELIVERED");
        assert_eq!(value["message_id"], "m1");
    }

    #[test]
    fn test_collecting_observer() {
        let observer = CollectingObserver::new();
        let event = FailureEvent::new("e1".into(), &DispatchError::Validation("empty".into()));

        observer.on_failure(&event);
        observer.on_delivered(&"e2".into(), &receipt("m2"));

        let failures = observer.failures();
        assert_eq!(failures, vec![event]);
    }

    #[tokio::test]
    async fn test_channel_observer_forwards_events() {
        let (observer, mut rx) = ChannelObserver::channel();
        let event = FailureEvent::new("e1".into(), &DispatchError::service("Publish", "boom"));

        observer.on_failure(&event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.endpoint.as_str(), "e1");
        assert_eq!(received.error_kind, "SERVICE_ERROR");
    }

    #[test]
    fn test_channel_observer_ignores_closed_receiver() {
        let (observer, rx) = ChannelObserver::channel();
        drop(rx);

        observer.on_failure(&FailureEvent::new(
            "e1".into(),
            &DispatchError::service("Publish", "boom"),
        ));
    }
}
