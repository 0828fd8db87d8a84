//! Prometheus 指标模块
//!
//! 指标通过独立的 HTTP 端口暴露 `/metrics`，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 安装 Prometheus recorder 并启动指标 HTTP 服务
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

fn describe_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("orders_created_total", "Total number of orders created");
    metrics::describe_counter!(
        "payments_completed_total",
        "Total number of payment completion attempts by outcome"
    );
    metrics::describe_counter!(
        "payment_failures_total",
        "Total number of failed payments by reason"
    );
    metrics::describe_counter!(
        "webhook_events_total",
        "Total number of payment webhook events received"
    );
    metrics::describe_histogram!(
        "order_completion_duration_seconds",
        "Order completion duration in seconds"
    );
    metrics::describe_counter!(
        "preorders_fulfilled_total",
        "Total number of preorder items fulfilled after the sheet file was attached"
    );
    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last background worker run"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("指标服务监听于 {}", addr);

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("指标服务异常退出: {}", e);
        }
    }))
}

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录订单创建（order_type: product / cash）
#[inline]
pub fn record_order_created(order_type: &str) {
    metrics::counter!("orders_created_total", "order_type" => order_type.to_string()).increment(1);
}

/// 记录一次支付完成尝试（outcome: completed / already_completed / rejected）
#[inline]
pub fn record_payment_completion(provider: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "payments_completed_total",
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "order_completion_duration_seconds",
        "provider" => provider.to_string()
    )
    .record(duration_secs);
}

/// 记录支付失败
#[inline]
pub fn record_payment_failure(provider: &str, reason: &str) {
    metrics::counter!(
        "payment_failures_total",
        "provider" => provider.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录 webhook 事件（result: processed / duplicate / ignored / rejected）
#[inline]
pub fn record_webhook_event(provider: &str, result: &str) {
    metrics::counter!(
        "webhook_events_total",
        "provider" => provider.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// 记录预购履约数量
#[inline]
pub fn record_preorders_fulfilled(count: u64) {
    metrics::counter!("preorders_fulfilled_total").increment(count);
}

/// 更新后台任务最近运行时间
#[inline]
pub fn set_worker_last_run(worker: &str) {
    metrics::gauge!("worker_last_run_timestamp", "worker" => worker.to_string())
        .set(chrono::Utc::now().timestamp() as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 未安装 recorder 时这些调用是空操作
        record_http_request("GET", "/api/sheets", 200, 0.1);
        record_order_created("product");
        record_payment_completion("paypal", "completed", 0.2);
        record_payment_failure("portone", "amount_mismatch");
        record_webhook_event("dodo", "duplicate");
        record_preorders_fulfilled(3);
        set_worker_last_run("pending_order_expiry");
    }
}
