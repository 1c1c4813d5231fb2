//! 推送分发 CLI
//!
//! 加载配置、初始化日志后执行子命令。

use clap::Parser;
use push_dispatcher::Dispatcher;
use push_dispatcher::cli::{Cli, CommandRunner, Commands};
use push_shared::config::AppConfig;
use push_shared::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load("push-dispatcher")?;
    // 命令行指定的日志级别优先于配置文件，RUST_LOG 仍然最优先
    observability::init(&cli.observability_config(&config.observability))?;

    let dispatcher = Dispatcher::from_app_config(&config)?;
    let runner = CommandRunner::new(dispatcher);

    match cli.command {
        Commands::Publish {
            target_arn,
            message,
            subject,
            message_structure,
        } => {
            runner
                .run_publish(target_arn, message, subject, message_structure)
                .await?;
        }
        Commands::CreateEndpoint {
            platform_application_arn,
            token,
            user_data,
            attributes,
        } => {
            runner
                .run_create_endpoint(platform_application_arn, token, user_data, attributes)
                .await?;
        }
        Commands::DeleteEndpoint {
            endpoint_arn,
            strict,
        } => {
            runner.run_delete_endpoint(endpoint_arn, strict).await?;
        }
        Commands::FanOut {
            endpoints,
            alert,
            data,
            providers,
            default_message,
            concurrency,
        } => {
            runner
                .run_fan_out(
                    endpoints,
                    alert,
                    data,
                    providers,
                    default_message,
                    concurrency,
                )
                .await?;
        }
    }

    Ok(())
}
