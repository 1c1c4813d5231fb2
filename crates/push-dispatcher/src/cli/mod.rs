//! CLI 模块
//!
//! 提供命令行接口，支持以下功能：
//!
//! - `publish` - 发布消息到主题或端点
//! - `create-endpoint` - 注册设备端点
//! - `delete-endpoint` - 注销设备端点
//! - `fan-out` - 向多个端点发送同一条通知
//!
//! # 使用示例
//!
//! ```bash
//! push-dispatcher publish --target-arn arn:aws:sns:us-east-1:123:news --message hello
//! push-dispatcher create-endpoint -p arn:aws:sns:...:app/GCM/demo -t TOKEN -u user-1
//! push-dispatcher fan-out -e ARN1 -e ARN2 --alert "新消息" --provider GCM
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
