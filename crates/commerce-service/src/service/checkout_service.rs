//! 结算服务
//!
//! 报价、下单、充值下单、准备支付与取消订单。
//!
//! ## 报价规则
//!
//! - 重复的乐谱 ID 合并，下架或不存在的乐谱报 `SHEET_NOT_FOUND`
//! - 合集按单曲定价比例分摊合集售价
//! - 已购买的乐谱从报价中排除；全部已购买时报 `ALREADY_PURCHASED`
//! - 展示金额按订单总额一次换算，明细展示价仅供参考

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sheet_shared::config::ChargePackage;
use sheet_shared::observability::metrics;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{CommerceError, Result};
use crate::models::{
    CashOrderMetadata, Currency, DrumSheet, NewOrder, NewOrderItem, Order, OrderItem,
    OrderStatus, OrderType, PaymentMethod, generate_order_number,
};
use crate::payment::{GatewayRegistry, PrepareContext, PreparedPayment};
use crate::pricing::{
    ChargePackages, ExchangeRates, allocate_bundle_price, available_methods, format_amount,
    is_method_available,
};
use crate::repository::{CatalogRepositoryTrait, OrderRepositoryTrait, PurchaseRepositoryTrait};
use crate::service::dto::{CheckoutSelection, OrderDetailDto, Quote, QuoteLine};

pub struct CheckoutService<CatR, PurR, OR>
where
    CatR: CatalogRepositoryTrait,
    PurR: PurchaseRepositoryTrait,
    OR: OrderRepositoryTrait,
{
    catalog_repo: Arc<CatR>,
    purchase_repo: Arc<PurR>,
    order_repo: Arc<OR>,
    gateways: Arc<GatewayRegistry>,
    rates: ExchangeRates,
    packages: ChargePackages,
    site_url: String,
}

impl<CatR, PurR, OR> CheckoutService<CatR, PurR, OR>
where
    CatR: CatalogRepositoryTrait,
    PurR: PurchaseRepositoryTrait,
    OR: OrderRepositoryTrait,
{
    pub fn new(
        catalog_repo: Arc<CatR>,
        purchase_repo: Arc<PurR>,
        order_repo: Arc<OR>,
        gateways: Arc<GatewayRegistry>,
        rates: ExchangeRates,
        packages: ChargePackages,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog_repo,
            purchase_repo,
            order_repo,
            gateways,
            rates,
            packages,
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// 当前可用的支付方式（币种规则 + 渠道已配置）
    pub fn payment_methods(&self, currency: Currency, order_type: OrderType) -> Vec<PaymentMethod> {
        available_methods(currency, order_type)
            .into_iter()
            .filter(|m| self.gateways.supports(*m))
            .collect()
    }

    pub fn charge_packages(&self) -> &[ChargePackage] {
        self.packages.all()
    }

    fn ensure_method_available(
        &self,
        method: PaymentMethod,
        currency: Currency,
        order_type: OrderType,
    ) -> Result<()> {
        if is_method_available(method, currency, order_type) && self.gateways.supports(method) {
            Ok(())
        } else {
            Err(CommerceError::PaymentMethodUnavailable {
                method: method.as_str().to_string(),
                currency: currency.code().to_string(),
            })
        }
    }

    // ==================== 报价 ====================

    async fn selection_lines(&self, selection: &CheckoutSelection) -> Result<Vec<(DrumSheet, i64)>> {
        match selection {
            CheckoutSelection::Sheets(ids) => {
                let mut seen = HashSet::new();
                let ids: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
                if ids.is_empty() {
                    return Err(CommerceError::EmptyOrder);
                }

                let sheets = self.catalog_repo.get_sheets_by_ids(&ids).await?;
                ids.iter()
                    .map(|id| {
                        sheets
                            .iter()
                            .find(|s| s.id == *id && s.is_active)
                            .map(|s| (s.clone(), s.price))
                            .ok_or(CommerceError::SheetNotFound(*id))
                    })
                    .collect()
            }
            CheckoutSelection::Collection(collection_id) => {
                let collection = self
                    .catalog_repo
                    .get_collection(*collection_id)
                    .await?
                    .filter(|c| c.is_active)
                    .ok_or(CommerceError::CollectionNotFound(*collection_id))?;

                let sheets: Vec<DrumSheet> = self
                    .catalog_repo
                    .list_collection_sheets(*collection_id)
                    .await?
                    .into_iter()
                    .filter(|s| s.is_active)
                    .collect();
                if sheets.is_empty() {
                    return Err(CommerceError::EmptyOrder);
                }

                let list_prices: Vec<i64> = sheets.iter().map(|s| s.price).collect();
                let allocations = allocate_bundle_price(collection.sale_price, &list_prices);
                Ok(sheets.into_iter().zip(allocations).collect())
            }
        }
    }

    /// 生成报价
    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        user_id: Uuid,
        selection: &CheckoutSelection,
        currency: Currency,
    ) -> Result<Quote> {
        let lines = self.selection_lines(selection).await?;

        let sheet_ids: Vec<Uuid> = lines.iter().map(|(s, _)| s.id).collect();
        let owned: HashSet<Uuid> = self
            .purchase_repo
            .owned_sheet_ids(user_id, &sheet_ids)
            .await?
            .into_iter()
            .collect();

        let (owned_lines, lines): (Vec<_>, Vec<_>) =
            lines.into_iter().partition(|(s, _)| owned.contains(&s.id));

        if lines.is_empty() {
            return Err(if owned_lines.is_empty() {
                CommerceError::EmptyOrder
            } else {
                CommerceError::AlreadyPurchased
            });
        }

        let quote_lines: Vec<QuoteLine> = lines
            .iter()
            .map(|(sheet, price)| QuoteLine {
                sheet_id: sheet.id,
                title: sheet.title.clone(),
                price: *price,
                display_price: self.rates.money(*price, currency),
                sales_type: sheet.sales_type,
            })
            .collect();

        let total_amount: i64 = quote_lines.iter().map(|l| l.price).sum();
        let display_total = self.rates.money(total_amount, currency);

        Ok(Quote {
            lines: quote_lines,
            total_amount,
            currency,
            display_amount: display_total.amount,
            display_total,
            skipped_owned: owned_lines.iter().map(|(s, _)| s.id).collect(),
            payment_methods: self.payment_methods(currency, OrderType::Product),
        })
    }

    // ==================== 下单 ====================

    /// 创建乐谱订单（待支付）
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        selection: &CheckoutSelection,
        method: PaymentMethod,
        currency: Currency,
    ) -> Result<OrderDetailDto> {
        self.ensure_method_available(method, currency, OrderType::Product)?;

        let quote = self.quote(user_id, selection, currency).await?;
        let metadata = match selection {
            CheckoutSelection::Collection(id) => json!({ "collectionId": id }),
            CheckoutSelection::Sheets(_) => json!({}),
        };

        let new_order = NewOrder {
            id: Uuid::new_v4(),
            order_number: generate_order_number(Utc::now()),
            user_id,
            order_type: OrderType::Product,
            payment_method: method,
            total_amount: quote.total_amount,
            display_currency: currency,
            display_amount: quote.display_amount,
            metadata,
        };
        let items: Vec<NewOrderItem> = quote
            .lines
            .iter()
            .map(|l| NewOrderItem {
                drum_sheet_id: l.sheet_id,
                sheet_title: l.title.clone(),
                price: l.price,
            })
            .collect();

        let order = self.order_repo.create_order(&new_order, &items).await?;
        let items = self.order_repo.list_items(order.id).await?;

        metrics::record_order_created(OrderType::Product.as_str());
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_amount = order.total_amount,
            items = items.len(),
            "订单已创建"
        );

        Ok(OrderDetailDto::new(order, items))
    }

    /// 创建积分充值订单
    #[instrument(skip(self))]
    pub async fn create_cash_order(
        &self,
        user_id: Uuid,
        amount: i64,
        method: PaymentMethod,
        currency: Currency,
    ) -> Result<Order> {
        let bonus = self.packages.bonus_for(amount)?;
        self.ensure_method_available(method, currency, OrderType::Cash)?;

        let metadata = serde_json::to_value(CashOrderMetadata {
            charge_amount: amount,
            bonus_amount: bonus,
        })?;

        let new_order = NewOrder {
            id: Uuid::new_v4(),
            order_number: generate_order_number(Utc::now()),
            user_id,
            order_type: OrderType::Cash,
            payment_method: method,
            total_amount: amount,
            display_currency: currency,
            display_amount: self.rates.convert(amount, currency),
            metadata,
        };

        let order = self.order_repo.create_order(&new_order, &[]).await?;

        metrics::record_order_created(OrderType::Cash.as_str());
        info!(order_id = %order.id, amount, bonus, "充值订单已创建");

        Ok(order)
    }

    // ==================== 支付准备 / 取消 ====================

    async fn owned_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        let order = self
            .order_repo
            .get_order(order_id)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        if !order.is_owned_by(user_id) {
            return Err(CommerceError::OrderForbidden(order_id));
        }
        Ok(order)
    }

    /// 调用渠道准备支付参数
    #[instrument(skip(self, customer_email))]
    pub async fn prepare_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        customer_email: Option<String>,
    ) -> Result<PreparedPayment> {
        let order = self.owned_order(user_id, order_id).await?;
        if order.status != OrderStatus::Pending || order.is_paid() {
            return Err(CommerceError::invalid_status(order_id, order.status.as_str()));
        }
        if order.payment_method == PaymentMethod::Points {
            return Err(CommerceError::Validation(
                "积分支付无需准备，请直接调用积分支付".into(),
            ));
        }

        let gateway = self.gateways.for_method(order.payment_method)?;
        let items = self.order_repo.list_items(order.id).await?;
        let ctx = self.prepare_context(&order, &items, customer_email);

        let prepared = gateway.prepare(&order, &ctx).await?;
        if let Some(reference) = prepared.reference() {
            self.order_repo
                .set_transaction_reference(order.id, reference)
                .await?;
        }

        info!(
            order_id = %order.id,
            provider = gateway.description(),
            "支付参数已生成"
        );
        Ok(prepared)
    }

    fn prepare_context(
        &self,
        order: &Order,
        items: &[OrderItem],
        customer_email: Option<String>,
    ) -> PrepareContext {
        let order_name = match (order.order_type, items) {
            (OrderType::Cash, _) => {
                format!("캐시 충전 {}", format_amount(order.total_amount, Currency::Krw))
            }
            (OrderType::Product, [only]) => only.sheet_title.clone(),
            (OrderType::Product, [first, rest @ ..]) => {
                format!("{} 외 {}건", first.sheet_title, rest.len())
            }
            (OrderType::Product, []) => order.order_number.clone(),
        };

        let return_path = match order.payment_method {
            PaymentMethod::PayPal => "/payments/paypal/return",
            PaymentMethod::Dodo => "/payments/dodo/return",
            _ => "/payments/complete",
        };

        PrepareContext {
            order_name,
            customer_email,
            return_url: format!("{}{}?orderId={}", self.site_url, return_path, order.id),
            cancel_url: format!("{}/checkout?orderId={}", self.site_url, order.id),
        }
    }

    /// 取消待支付订单
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, user_id: Uuid, order_id: Uuid) -> Result<()> {
        let order = self.owned_order(user_id, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(CommerceError::invalid_status(order_id, order.status.as_str()));
        }

        if !self.order_repo.cancel_pending(order_id).await? {
            // 并发下已被支付或取消
            return Err(CommerceError::invalid_status(order_id, "changed"));
        }

        info!(order_id = %order_id, "订单已取消");
        Ok(())
    }
}
