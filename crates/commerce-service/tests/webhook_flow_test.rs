//! Dodo webhook 集成测试
//!
//! 验证签名通过的 webhook 能完成订单、重复投递只处理一次、已取消订单不会被支付。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p commerce-service --test webhook_flow_test -- --ignored
//! ```

use std::sync::Arc;

use chrono::Utc;
use commerce::models::{Currency, OrderStatus, PaymentMethod, PaymentStatus, PaymentProvider, SalesType};
use commerce::notification::NoopNotifier;
use commerce::payment::{GatewayRegistry, WebhookHeaders, WebhookVerifier};
use commerce::pricing::{ChargePackages, ExchangeRates};
use commerce::repository::{
    AccountRepository, CartRepository, CatalogRepository, OrderRepository, PaymentEventRepository,
    PurchaseRepository,
};
use commerce::service::{
    CheckoutSelection, CheckoutService, CompletionService, CompletionSettings, WebhookOutcome,
    WebhookService, WebhookVerifiers,
};
use serde_json::json;
use sheet_shared::config::StoreConfig;
use sheet_shared::database::Database;
use sheet_shared::test_utils::{TEST_WEBHOOK_SECRET, test_app_config};
use sqlx::PgPool;
use uuid::Uuid;

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

async fn setup_pool() -> PgPool {
    let pool = PgPool::connect(&database_url()).await.expect("数据库连接失败");
    Database::from_pool(pool.clone())
        .run_migrations()
        .await
        .expect("数据库迁移失败");
    pool
}

type Webhooks = WebhookService<CartRepository, AccountRepository, OrderRepository, PaymentEventRepository>;

struct Fixture {
    pool: PgPool,
    orders: Arc<OrderRepository>,
    checkout: CheckoutService<CatalogRepository, PurchaseRepository, OrderRepository>,
    webhooks: Webhooks,
}

async fn setup() -> Fixture {
    let pool = setup_pool().await;
    let config = test_app_config();
    let store = StoreConfig::default();
    let gateways = Arc::new(GatewayRegistry::from_config(&config.payments, &store).unwrap());

    let orders = Arc::new(OrderRepository::new(pool.clone()));
    let completion = Arc::new(CompletionService::new(
        pool.clone(),
        Arc::new(CartRepository::new(pool.clone())),
        Arc::new(AccountRepository::new(pool.clone())),
        orders.clone(),
        Arc::new(NoopNotifier),
        CompletionSettings::from(&store),
    ));

    let checkout = CheckoutService::new(
        Arc::new(CatalogRepository::new(pool.clone())),
        Arc::new(PurchaseRepository::new(pool.clone())),
        orders.clone(),
        gateways.clone(),
        ExchangeRates::from(&store.exchange_rates),
        ChargePackages::default(),
        store.site_url.clone(),
    );

    let webhooks = WebhookService::new(
        orders.clone(),
        Arc::new(PaymentEventRepository::new(pool.clone())),
        gateways,
        completion,
        None,
        WebhookVerifiers::from_config(&config.payments).unwrap(),
    );

    Fixture {
        pool,
        orders,
        checkout,
        webhooks,
    }
}

async fn dodo_order(fixture: &Fixture) -> (Uuid, i64) {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO profiles (id, email) VALUES ($1, 'webhook@example.com')")
        .bind(user_id)
        .execute(&fixture.pool)
        .await
        .unwrap();
    let sheet_id: Uuid = sqlx::query_scalar(
        "INSERT INTO drum_sheets (title, artist, price, sales_type, pdf_path) \
         VALUES ('Webhook Song', 'IntegTest', 12000, $1, 'sheets/webhook.pdf') RETURNING id",
    )
    .bind(SalesType::Instant)
    .fetch_one(&fixture.pool)
    .await
    .unwrap();

    let detail = fixture
        .checkout
        .create_order(
            user_id,
            &CheckoutSelection::Sheets(vec![sheet_id]),
            PaymentMethod::Dodo,
            Currency::Usd,
        )
        .await
        .unwrap();
    (detail.order.id, detail.order.display_amount)
}

fn succeeded_body(order_id: Uuid, amount: i64) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "business_id": "bus_integ",
        "type": "payment.succeeded",
        "timestamp": Utc::now().to_rfc3339(),
        "data": {
            "payload_type": "Payment",
            "payment_id": format!("pay_{}", order_id.simple()),
            "status": "succeeded",
            "total_amount": amount,
            "currency": "USD",
            "metadata": {"order_id": order_id.to_string()}
        }
    }))
    .unwrap()
}

async fn deliver(fixture: &Fixture, event_id: &str, body: &[u8]) -> WebhookOutcome {
    let timestamp = Utc::now().timestamp().to_string();
    let signature = WebhookVerifier::new(TEST_WEBHOOK_SECRET)
        .unwrap()
        .sign(event_id, &timestamp, body);
    let headers = WebhookHeaders {
        id: event_id,
        timestamp: &timestamp,
        signature: &signature,
    };
    fixture
        .webhooks
        .handle(PaymentProvider::Dodo, &headers, body)
        .await
        .expect("webhook 处理失败")
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_dodo_webhook_completes_order_once() {
    let fixture = setup().await;
    let (order_id, amount) = dodo_order(&fixture).await;
    let event_id = format!("msg_{}", Uuid::new_v4().simple());
    let body = succeeded_body(order_id, amount);

    assert_eq!(deliver(&fixture, &event_id, &body).await, WebhookOutcome::Processed);

    let order = fixture.orders.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.payment_provider, Some(PaymentProvider::Dodo));

    // 同一事件重投
    assert_eq!(deliver(&fixture, &event_id, &body).await, WebhookOutcome::Duplicate);

    // 不同事件 ID 但订单已支付
    let other_event = format!("msg_{}", Uuid::new_v4().simple());
    assert_eq!(
        deliver(&fixture, &other_event, &body).await,
        WebhookOutcome::Duplicate
    );

    let purchases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(&fixture.pool)
        .await
        .unwrap();
    assert_eq!(purchases, 1);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_amount_mismatch_is_rejected() {
    let fixture = setup().await;
    let (order_id, amount) = dodo_order(&fixture).await;
    let event_id = format!("msg_{}", Uuid::new_v4().simple());

    let outcome = deliver(&fixture, &event_id, &succeeded_body(order_id, amount - 1)).await;
    assert_eq!(outcome, WebhookOutcome::Rejected("AMOUNT_MISMATCH".into()));

    let order = fixture.orders.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_late_webhook_for_cancelled_order() {
    let fixture = setup().await;
    let (order_id, amount) = dodo_order(&fixture).await;
    sqlx::query("UPDATE orders SET status = 'cancelled', payment_status = 'cancelled' WHERE id = $1")
        .bind(order_id)
        .execute(&fixture.pool)
        .await
        .unwrap();

    let event_id = format!("msg_{}", Uuid::new_v4().simple());
    let outcome = deliver(&fixture, &event_id, &succeeded_body(order_id, amount)).await;
    assert_eq!(outcome, WebhookOutcome::Rejected("INVALID_ORDER_STATUS".into()));

    let order = fixture.orders.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.payment_status, PaymentStatus::Cancelled);
}
