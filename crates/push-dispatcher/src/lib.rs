//! 推送分发客户端
//!
//! 通过 SNS 向主题或单个设备端点发布消息，并管理设备端点的注册与注销。
//! 多端点发送时各端点独立投递，单个端点失败不影响其他端点。

pub mod cli;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod payload;
pub mod types;

pub use client::{NotificationClient, SnsNotificationClient};
pub use dispatcher::{DeleteMode, DispatchOptions, Dispatcher};
pub use error::{DispatchError, Result};
pub use fanout::{
    ChannelObserver, CollectingObserver, DeliveryStatus, EndpointOutcome, FailureEvent,
    FanOutObserver, FanOutReport, TracingObserver,
};
pub use types::{
    ClientConfig, EndpointHandle, EndpointRegistration, FanOutRequest, Provider, PublishReceipt,
    TopicMessage,
};
