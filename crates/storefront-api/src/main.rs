//! 鼓谱商店 API 服务入口

use std::sync::Arc;

use sheet_shared::{cache::Cache, config::AppConfig, database::Database, observability};
use storefront_api::{AppState, build_app, cors_layer, worker::PendingOrderWorker};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：config/default.toml + config/{service_name}.toml + 环境变量
    let config = AppConfig::load("storefront-api").unwrap_or_else(|e| {
        eprintln!("加载配置失败，使用默认配置: {}", e);
        AppConfig::default()
    });

    let obs_config = config.observability.clone().with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        addr = %config.server_addr(),
        "Starting storefront-api"
    );

    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }
    info!("Database connection established");

    // Redis 只用于目录缓存与 webhook 去重，不可用时降级为直连数据库
    let cache = match Cache::new(&config.redis) {
        Ok(cache) => match cache.health_check().await {
            Ok(()) => {
                info!("Redis connection established");
                Some(Arc::new(cache))
            }
            Err(e) => {
                warn!(error = %e, "Redis 不可用，缓存已禁用");
                None
            }
        },
        Err(e) => {
            warn!(error = %e, "Redis 配置无效，缓存已禁用");
            None
        }
    };

    let state = AppState::from_config(db.pool().clone(), cache, &config)?;
    info!("Services initialized");

    let worker = PendingOrderWorker::with_defaults(db.pool().clone(), &config.store);
    tokio::spawn(async move {
        worker.run().await;
    });

    let cors = cors_layer(&config.server.cors_origins, config.is_production());
    let app = build_app(state, cors);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
