//! 统一可观测性模块
//!
//! 日志、分布式追踪与 Prometheus 指标的统一初始化入口。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use serde::Deserialize;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 服务名称，标识追踪和指标的来源
    pub service_name: String,

    /// OpenTelemetry OTLP 端点，为空时不导出追踪
    pub otlp_endpoint: Option<String>,

    /// Prometheus 指标导出端口
    pub metrics_port: u16,

    /// 是否启动指标导出
    pub metrics_enabled: bool,

    /// 日志级别（如 "info", "debug"）
    pub log_level: String,

    /// 是否启用 JSON 格式日志
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "storefront".to_string(),
            otlp_endpoint: None,
            metrics_port: 9090,
            metrics_enabled: true,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }
}

/// 可观测性资源守卫
///
/// Drop 时关闭追踪 provider 并刷新待发送的 span
pub struct ObservabilityGuard {
    _metrics_handle: Option<metrics::MetricsHandle>,
    _tracing_guard: Option<tracing::TracingGuard>,
}

impl ObservabilityGuard {
    /// 空守卫（测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            _metrics_handle: None,
            _tracing_guard: None,
        }
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("正在关闭可观测性组件...");
    }
}

/// 统一初始化可观测性
///
/// 先初始化 tracing，保证后续 metrics 启动日志可见
pub async fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    let tracing_guard = tracing::init(config)?;

    info!(
        service = %config.service_name,
        metrics_port = %config.metrics_port,
        otlp_endpoint = ?config.otlp_endpoint,
        "可观测性已初始化"
    );

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::init(config).await?)
    } else {
        None
    };

    Ok(ObservabilityGuard {
        _metrics_handle: metrics_handle,
        _tracing_guard: Some(tracing_guard),
    })
}
