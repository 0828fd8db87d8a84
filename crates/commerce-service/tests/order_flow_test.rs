//! 下单到完成的集成测试
//!
//! 使用真实 PostgreSQL 验证订单完成流程中的行锁、购买记录、积分流水。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p commerce-service --test order_flow_test -- --ignored
//! ```

use std::sync::Arc;

use chrono::Utc;
use commerce::models::{
    CompletionSource, Currency, OrderStatus, PaymentMethod, PaymentStatus, SalesType,
};
use commerce::notification::NoopNotifier;
use commerce::payment::GatewayRegistry;
use commerce::pricing::{ChargePackages, ExchangeRates};
use commerce::repository::{
    AccountRepository, CartRepository, CatalogRepository, OrderRepository, PurchaseRepository,
};
use commerce::service::{
    CatalogService, CheckoutSelection, CheckoutService, CompletionOutcome, CompletionService,
    CompletionSettings, ExpiryPolicy, FulfilmentService, PaymentService, PointsService,
    RefundService, cancel_expired_orders,
};
use commerce::CommerceError;
use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Words;
use sheet_shared::config::StoreConfig;
use sheet_shared::database::Database;
use sheet_shared::test_utils::test_app_config;
use sqlx::PgPool;
use uuid::Uuid;

// ==================== 辅助函数 ====================

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

async fn seed_profile(pool: &PgPool, credits: i64) -> Uuid {
    let id = Uuid::new_v4();
    let email: String = SafeEmail().fake();
    sqlx::query("INSERT INTO profiles (id, email, display_name, credits) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(email)
        .bind("integ-test")
        .bind(credits)
        .execute(pool)
        .await
        .expect("插入测试用户失败");
    id
}

async fn seed_sheet(pool: &PgPool, price: i64, sales_type: SalesType, pdf_path: Option<&str>) -> Uuid {
    let words: Vec<String> = Words(2..4).fake();
    sqlx::query_scalar(
        r#"
        INSERT INTO drum_sheets (title, artist, price, sales_type, pdf_path)
        VALUES ($1, 'IntegTest Artist', $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(words.join(" "))
    .bind(price)
    .bind(sales_type)
    .bind(pdf_path)
    .fetch_one(pool)
    .await
    .expect("插入测试乐谱失败")
}

async fn credits_of(pool: &PgPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT credits FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("查询积分失败")
}

type Completion = CompletionService<CartRepository, AccountRepository, OrderRepository>;

struct Services {
    orders: Arc<OrderRepository>,
    purchases: Arc<PurchaseRepository>,
    checkout: CheckoutService<CatalogRepository, PurchaseRepository, OrderRepository>,
    completion: Arc<Completion>,
    points: PointsService<CartRepository, AccountRepository, OrderRepository>,
    payments: PaymentService<CartRepository, AccountRepository, OrderRepository>,
    fulfilment: FulfilmentService<CatalogRepository>,
    refunds: RefundService,
}

fn build_services(pool: &PgPool) -> Services {
    let config = test_app_config();
    let store = StoreConfig::default();
    let rates = ExchangeRates::from(&store.exchange_rates);
    let gateways = Arc::new(
        GatewayRegistry::from_config(&config.payments, &store).expect("支付渠道注册失败"),
    );

    let catalog = Arc::new(CatalogRepository::new(pool.clone()));
    let carts = Arc::new(CartRepository::new(pool.clone()));
    let accounts = Arc::new(AccountRepository::new(pool.clone()));
    let orders = Arc::new(OrderRepository::new(pool.clone()));
    let purchases = Arc::new(PurchaseRepository::new(pool.clone()));

    let completion = Arc::new(CompletionService::new(
        pool.clone(),
        carts,
        accounts,
        orders.clone(),
        Arc::new(NoopNotifier),
        CompletionSettings::from(&store),
    ));

    Services {
        orders: orders.clone(),
        purchases: purchases.clone(),
        checkout: CheckoutService::new(
            catalog.clone(),
            purchases,
            orders.clone(),
            gateways.clone(),
            rates,
            ChargePackages::new(store.charge_packages.clone()),
            store.site_url.clone(),
        ),
        completion: completion.clone(),
        points: PointsService::new(completion.clone()),
        payments: PaymentService::new(orders, gateways, completion),
        fulfilment: FulfilmentService::new(
            pool.clone(),
            Arc::new(CatalogService::new(catalog, None, rates)),
        ),
        refunds: RefundService::new(pool.clone()),
    }
}

// ==================== 测试 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_points_purchase_with_preorder_then_fulfilment_and_refund() {
    let pool = setup_pool().await;
    let services = build_services(&pool);

    let user_id = seed_profile(&pool, 20_000).await;
    let instant = seed_sheet(&pool, 3_000, SalesType::Instant, Some("sheets/instant.pdf")).await;
    let preorder = seed_sheet(&pool, 5_000, SalesType::Preorder, None).await;

    let detail = services
        .checkout
        .create_order(
            user_id,
            &CheckoutSelection::Sheets(vec![instant, preorder]),
            PaymentMethod::Points,
            Currency::Krw,
        )
        .await
        .expect("下单失败");
    let order_id = detail.order.id;
    assert_eq!(detail.order.total_amount, 8_000);

    // 积分支付：含未上传文件的预购乐谱，订单进入 processing
    let outcome = services
        .points
        .pay_with_points(user_id, order_id)
        .await
        .expect("积分支付失败");
    let CompletionOutcome::Completed(done) = outcome else {
        panic!("首次支付应当完成订单");
    };
    assert_eq!(done.order.status, OrderStatus::Processing);
    assert_eq!(done.order.payment_status, PaymentStatus::Paid);
    assert!(done.order.expected_completion_at.is_some());
    assert_eq!(done.source, CompletionSource::Points);
    assert_eq!(credits_of(&pool, user_id).await, 12_000);

    // 重复支付不再扣减
    let again = services
        .points
        .pay_with_points(user_id, order_id)
        .await
        .expect("重复支付应当幂等");
    assert!(again.is_duplicate());
    assert_eq!(credits_of(&pool, user_id).await, 12_000);

    let owned = services
        .purchases
        .owned_sheet_ids(user_id, &[instant, preorder])
        .await
        .unwrap();
    assert_eq!(owned.len(), 2);

    // 上传文件后订单完成
    let result = services
        .fulfilment
        .attach_sheet_file(preorder, "/sheets/preorder.pdf")
        .await
        .expect("挂载文件失败");
    assert!(result.completed_order_ids.contains(&order_id));
    assert_eq!(result.sheet.sales_type, SalesType::Instant);

    let order = services.orders.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.completed_at.is_some());

    // 退款：积分返还、购买记录移除
    let refund = services
        .refunds
        .refund_order(Uuid::new_v4(), order_id)
        .await
        .expect("退款失败");
    assert_eq!(refund.credit_delta, 8_000);
    assert_eq!(refund.purchases_removed, 2);
    assert_eq!(refund.purchases_reassigned, 0);
    assert_eq!(credits_of(&pool, user_id).await, 20_000);
    assert!(
        services
            .purchases
            .find_active_purchase(user_id, instant)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_refund_keeps_entitlement_paid_by_another_order() {
    let pool = setup_pool().await;
    let services = build_services(&pool);

    let user_id = seed_profile(&pool, 20_000).await;
    let sheet = seed_sheet(&pool, 3_000, SalesType::Instant, Some("sheets/twice.pdf")).await;
    let selection = CheckoutSelection::Sheets(vec![sheet]);

    // 两笔待支付订单都包含同一乐谱，下单时都还未拥有
    let first = services
        .checkout
        .create_order(user_id, &selection, PaymentMethod::Points, Currency::Krw)
        .await
        .expect("下单失败");
    let second = services
        .checkout
        .create_order(user_id, &selection, PaymentMethod::Points, Currency::Krw)
        .await
        .expect("下单失败");

    services
        .points
        .pay_with_points(user_id, first.order.id)
        .await
        .expect("积分支付失败");
    let outcome = services
        .points
        .pay_with_points(user_id, second.order.id)
        .await
        .expect("积分支付失败");
    assert!(!outcome.is_duplicate());
    assert_eq!(outcome.order().payment_status, PaymentStatus::Paid);
    assert_eq!(credits_of(&pool, user_id).await, 14_000);

    let purchase = services
        .purchases
        .find_active_purchase(user_id, sheet)
        .await
        .unwrap()
        .expect("应当拥有乐谱");
    assert_eq!(purchase.order_id, first.order.id);

    // 退掉第一笔：购买记录转挂到第二笔，仍可下载
    let refund = services
        .refunds
        .refund_order(Uuid::new_v4(), first.order.id)
        .await
        .expect("退款失败");
    assert_eq!(refund.purchases_removed, 0);
    assert_eq!(refund.purchases_reassigned, 1);

    let purchase = services
        .purchases
        .find_active_purchase(user_id, sheet)
        .await
        .unwrap()
        .expect("第二笔订单仍持有购买记录");
    assert_eq!(purchase.order_id, second.order.id);

    // 两笔都退掉后不再拥有
    let refund = services
        .refunds
        .refund_order(Uuid::new_v4(), second.order.id)
        .await
        .expect("退款失败");
    assert_eq!(refund.purchases_removed, 1);
    assert_eq!(refund.purchases_reassigned, 0);
    assert!(
        services
            .purchases
            .find_active_purchase(user_id, sheet)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(credits_of(&pool, user_id).await, 20_000);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_insufficient_credits_rolls_back() {
    let pool = setup_pool().await;
    let services = build_services(&pool);

    let user_id = seed_profile(&pool, 1_000).await;
    let sheet = seed_sheet(&pool, 3_000, SalesType::Instant, Some("sheets/a.pdf")).await;

    let detail = services
        .checkout
        .create_order(
            user_id,
            &CheckoutSelection::Sheets(vec![sheet]),
            PaymentMethod::Points,
            Currency::Krw,
        )
        .await
        .unwrap();

    let err = services
        .points
        .pay_with_points(user_id, detail.order.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CommerceError::InsufficientCredits { required: 3_000, available: 1_000 }
    ));

    let order = services.orders.get_order(detail.order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(credits_of(&pool, user_id).await, 1_000);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_bank_transfer_charge_confirmed_by_admin() {
    let pool = setup_pool().await;
    let services = build_services(&pool);

    let user_id = seed_profile(&pool, 0).await;
    let order = services
        .checkout
        .create_cash_order(user_id, 30_000, PaymentMethod::BankTransfer, Currency::Krw)
        .await
        .expect("创建充值订单失败");

    let outcome = services
        .payments
        .confirm_bank_deposit(Uuid::new_v4(), order.id, Some("deposit-0001".into()))
        .await
        .expect("确认入账失败");
    let CompletionOutcome::Completed(done) = outcome else {
        panic!("首次确认应当完成订单");
    };
    assert_eq!(done.credited, Some(33_000));
    assert_eq!(done.balance_after, Some(33_000));
    assert_eq!(done.order.status, OrderStatus::Completed);
    assert_eq!(credits_of(&pool, user_id).await, 33_000);

    let again = services
        .payments
        .confirm_bank_deposit(Uuid::new_v4(), order.id, None)
        .await
        .unwrap();
    assert!(again.is_duplicate());
    assert_eq!(credits_of(&pool, user_id).await, 33_000);

    // 已消费部分积分后，充值订单不能退款
    sqlx::query("UPDATE profiles SET credits = 1000 WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();
    let err = services
        .refunds
        .refund_order(Uuid::new_v4(), order.id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INSUFFICIENT_CREDITS");
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_cancelled_order_is_not_completed() {
    let pool = setup_pool().await;
    let services = build_services(&pool);

    let user_id = seed_profile(&pool, 50_000).await;
    let sheet = seed_sheet(&pool, 3_000, SalesType::Instant, Some("sheets/b.pdf")).await;
    let detail = services
        .checkout
        .create_order(
            user_id,
            &CheckoutSelection::Sheets(vec![sheet]),
            PaymentMethod::Points,
            Currency::Krw,
        )
        .await
        .unwrap();

    services
        .checkout
        .cancel_order(user_id, detail.order.id)
        .await
        .expect("取消订单失败");

    let err = services
        .points
        .pay_with_points(user_id, detail.order.id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_ORDER_STATUS");
    assert_eq!(credits_of(&pool, user_id).await, 50_000);

    let err = services
        .completion
        .complete_order(commerce::service::CompletionRequest {
            order_id: detail.order.id,
            method: PaymentMethod::Points,
            provider: commerce::models::PaymentProvider::Points,
            transaction_id: None,
            paid: None,
            source: CompletionSource::Webhook,
        })
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_ORDER_STATUS");
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_expired_pending_orders_are_cancelled() {
    let pool = setup_pool().await;
    let services = build_services(&pool);

    let user_id = seed_profile(&pool, 0).await;
    let sheet = seed_sheet(&pool, 3_000, SalesType::Instant, Some("sheets/c.pdf")).await;
    let detail = services
        .checkout
        .create_order(
            user_id,
            &CheckoutSelection::Sheets(vec![sheet]),
            PaymentMethod::Points,
            Currency::Krw,
        )
        .await
        .unwrap();

    sqlx::query("UPDATE orders SET created_at = NOW() - INTERVAL '2 days' WHERE id = $1")
        .bind(detail.order.id)
        .execute(&pool)
        .await
        .unwrap();

    let policy = ExpiryPolicy::from_config(&StoreConfig::default(), 500);
    let cancelled = cancel_expired_orders(&pool, &policy, Utc::now())
        .await
        .expect("过期取消失败");
    assert!(cancelled >= 1);

    let order = services.orders.get_order(detail.order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.payment_status, PaymentStatus::Cancelled);
}
