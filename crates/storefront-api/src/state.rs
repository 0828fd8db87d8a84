//! 应用状态定义
//!
//! 组装仓储、支付渠道与各业务服务，通过 Arc 在 handler 间共享

use std::sync::Arc;

use commerce::payment::build_http_client;
use commerce::pricing::{ChargePackages, ExchangeRates};
use commerce::service::{
    CartService, CashService, CatalogService, CheckoutService, CompletionService,
    CompletionSettings, DownloadService, FulfilmentService, OrderQueryService, PaymentService,
    PointsService, RefundService, WebhookService, WebhookVerifiers,
};
use commerce::{
    AccountRepository, CartRepository, CatalogRepository, EmailNotifier, GatewayRegistry,
    NoopNotifier, OrderNotifier, OrderRepository, PaymentEventRepository, PurchaseRepository,
    SupabaseStorage,
};
use sheet_shared::cache::Cache;
use sheet_shared::config::AppConfig;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::JwtVerifier;

pub type Catalog = CatalogService<CatalogRepository>;
pub type Cart = CartService<CatalogRepository, CartRepository, PurchaseRepository>;
pub type Checkout = CheckoutService<CatalogRepository, PurchaseRepository, OrderRepository>;
pub type Completion = CompletionService<CartRepository, AccountRepository, OrderRepository>;
pub type Payments = PaymentService<CartRepository, AccountRepository, OrderRepository>;
pub type Points = PointsService<CartRepository, AccountRepository, OrderRepository>;
pub type Webhooks =
    WebhookService<CartRepository, AccountRepository, OrderRepository, PaymentEventRepository>;
pub type Cash = CashService<AccountRepository>;
pub type Downloads = DownloadService<CatalogRepository, PurchaseRepository>;
pub type Orders = OrderQueryService<OrderRepository, PurchaseRepository>;
pub type Fulfilment = FulfilmentService<CatalogRepository>;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Redis 不可用时为空，目录查询与 webhook 去重直接走数据库
    pub cache: Option<Arc<Cache>>,
    pub jwt: Arc<JwtVerifier>,
    pub accounts: Arc<AccountRepository>,
    pub catalog: Arc<Catalog>,
    pub cart: Arc<Cart>,
    pub checkout: Arc<Checkout>,
    pub payments: Arc<Payments>,
    pub points: Arc<Points>,
    pub webhooks: Arc<Webhooks>,
    pub cash: Arc<Cash>,
    pub downloads: Arc<Downloads>,
    pub orders: Arc<Orders>,
    pub fulfilment: Arc<Fulfilment>,
    pub refunds: Arc<RefundService>,
}

impl AppState {
    /// 按配置组装全部服务
    pub fn from_config(
        pool: PgPool,
        cache: Option<Arc<Cache>>,
        config: &AppConfig,
    ) -> commerce::Result<Self> {
        if config.supabase.jwt_secret.trim().is_empty() {
            warn!("supabase.jwt_secret 未配置，所有需要登录的接口都将返回 401");
        }

        let http = build_http_client()?;
        let rates = ExchangeRates::from(&config.store.exchange_rates);
        let gateways = Arc::new(GatewayRegistry::from_config(&config.payments, &config.store)?);

        let catalog_repo = Arc::new(CatalogRepository::new(pool.clone()));
        let cart_repo = Arc::new(CartRepository::new(pool.clone()));
        let purchase_repo = Arc::new(PurchaseRepository::new(pool.clone()));
        let order_repo = Arc::new(OrderRepository::new(pool.clone()));
        let account_repo = Arc::new(AccountRepository::new(pool.clone()));
        let event_repo = Arc::new(PaymentEventRepository::new(pool.clone()));

        let notifier: Arc<dyn OrderNotifier> = if config.notification.is_configured() {
            Arc::new(EmailNotifier::new(http.clone(), config.notification.clone()))
        } else {
            info!("邮件服务未配置，订单通知将被跳过");
            Arc::new(NoopNotifier)
        };

        let catalog = Arc::new(CatalogService::new(catalog_repo.clone(), cache.clone(), rates));
        let completion: Arc<Completion> = Arc::new(CompletionService::new(
            pool.clone(),
            cart_repo.clone(),
            account_repo.clone(),
            order_repo.clone(),
            notifier,
            CompletionSettings::from(&config.store),
        ));

        Ok(Self {
            jwt: Arc::new(JwtVerifier::new(&config.supabase.jwt_secret)),
            cart: Arc::new(CartService::new(
                catalog_repo.clone(),
                cart_repo,
                purchase_repo.clone(),
                gateways.clone(),
                rates,
            )),
            checkout: Arc::new(CheckoutService::new(
                catalog_repo.clone(),
                purchase_repo.clone(),
                order_repo.clone(),
                gateways.clone(),
                rates,
                ChargePackages::new(config.store.charge_packages.clone()),
                config.store.site_url.clone(),
            )),
            payments: Arc::new(PaymentService::new(
                order_repo.clone(),
                gateways.clone(),
                completion.clone(),
            )),
            points: Arc::new(PointsService::new(completion.clone())),
            webhooks: Arc::new(WebhookService::new(
                order_repo.clone(),
                event_repo,
                gateways,
                completion,
                cache.clone(),
                WebhookVerifiers::from_config(&config.payments)?,
            )),
            cash: Arc::new(CashService::new(pool.clone(), account_repo.clone())),
            downloads: Arc::new(DownloadService::new(
                catalog_repo,
                purchase_repo.clone(),
                Arc::new(SupabaseStorage::new(http, &config.supabase)),
                config.store.download_url_ttl_secs,
            )),
            orders: Arc::new(OrderQueryService::new(order_repo, purchase_repo)),
            fulfilment: Arc::new(FulfilmentService::new(pool.clone(), catalog.clone())),
            refunds: Arc::new(RefundService::new(pool.clone())),
            catalog,
            accounts: account_repo,
            cache,
            pool,
        })
    }
}
