//! 推送指标
//!
//! 基于 metrics crate 记录发布与多端点分发的计数和耗时。

/// 注册指标描述，会出现在导出器的 HELP 注释中
pub fn describe_metrics(service_name: &str) {
    metrics::describe_counter!(
        "push_publish_total",
        "Total number of single-target SNS operations"
    );
    metrics::describe_counter!(
        "push_fanout_deliveries_total",
        "Total number of per-endpoint deliveries in fan-out sends"
    );
    metrics::describe_histogram!(
        "push_fanout_duration_seconds",
        "Fan-out send duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 记录单次 SNS 操作（publish / create_endpoint / delete_endpoint）
#[inline]
pub fn record_operation(operation: &str, status: &str) {
    metrics::counter!(
        "push_publish_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次多端点分发的结果
#[inline]
pub fn record_fanout(delivered: usize, failed: usize, skipped: usize, duration_secs: f64) {
    for (status, count) in [
        ("delivered", delivered),
        ("failed", failed),
        ("skipped", skipped),
    ] {
        if count > 0 {
            metrics::counter!("push_fanout_deliveries_total", "status" => status)
                .increment(count as u64);
        }
    }

    metrics::histogram!("push_fanout_duration_seconds").record(duration_secs);
}
