//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构，每个子命令对应分发器的一个操作。

use clap::{Parser, Subcommand};
use push_shared::observability::ObservabilityConfig;

/// 推送分发命令行工具
///
/// SNS 区域与凭证从配置文件或 AWS_SNS_* 环境变量读取。
#[derive(Parser, Debug)]
#[command(name = "push-dispatcher")]
#[command(version, about = "SNS 推送分发工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，未指定时使用配置
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// 合并命令行与配置中的日志设置，命令行指定时优先
    pub fn observability_config(&self, configured: &ObservabilityConfig) -> ObservabilityConfig {
        match &self.log_level {
            Some(level) => ObservabilityConfig {
                log_level: level.clone(),
                ..configured.clone()
            },
            None => configured.clone(),
        }
    }
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 发布消息到主题或端点
    Publish {
        /// 目标 ARN（主题或端点）
        #[arg(long)]
        target_arn: String,

        /// 消息内容
        #[arg(short, long)]
        message: String,

        /// 邮件主题
        #[arg(short, long)]
        subject: Option<String>,

        /// 消息结构，"json" 表示按协议区分消息
        #[arg(long)]
        message_structure: Option<String>,
    },

    /// 注册设备端点
    CreateEndpoint {
        /// 平台应用 ARN
        #[arg(short, long)]
        platform_application_arn: String,

        /// 设备推送 token
        #[arg(short, long)]
        token: String,

        /// 自定义用户数据
        #[arg(short, long)]
        user_data: String,

        /// 端点属性（格式：KEY=VALUE，可重复）
        #[arg(short, long = "attribute", value_parser = parse_key_val)]
        attributes: Vec<(String, String)>,
    },

    /// 注销设备端点
    DeleteEndpoint {
        /// 端点 ARN
        #[arg(short, long)]
        endpoint_arn: String,

        /// 删除前确认端点存在
        #[arg(long)]
        strict: bool,
    },

    /// 向多个端点发送同一条通知
    ///
    /// 单个端点失败不会中断其他端点，结果以 JSON 输出。
    FanOut {
        /// 端点 ARN（可重复，按顺序发送）
        #[arg(short, long = "endpoint", required = true)]
        endpoints: Vec<String>,

        /// 通知文本，只发送数据时可省略（需提供默认消息）
        #[arg(short, long, default_value = "")]
        alert: String,

        /// 附加数据（JSON 对象）
        #[arg(short, long)]
        data: Option<String>,

        /// 推送服务商（可重复，默认 GCM + APNS）
        #[arg(short, long = "provider", value_parser = parse_provider)]
        providers: Vec<String>,

        /// 默认消息，为空时使用 alert
        #[arg(long, default_value = "")]
        default_message: String,

        /// 并发上限（覆盖配置）
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
}

/// 解析 KEY=VALUE 形式的参数
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("无效的 KEY=VALUE 参数: {s}"))?;
    Ok((key.to_string(), value.to_string()))
}

/// 推送服务商标识不能为空
fn parse_provider(s: &str) -> Result<String, String> {
    let tag = s.trim();
    if tag.is_empty() {
        return Err("推送服务商不能为空".to_string());
    }
    Ok(tag.to_string())
}

// ============================================================================
// 单元测试
// ============================================================================
