//! 购物车服务

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{CommerceError, Result};
use crate::models::{Currency, OrderType};
use crate::payment::GatewayRegistry;
use crate::pricing::{ExchangeRates, available_methods};
use crate::repository::{CartRepositoryTrait, CatalogRepositoryTrait, PurchaseRepositoryTrait};
use crate::service::dto::{CartLineDto, CartSummaryDto};

pub struct CartService<CatR, CartR, PurR>
where
    CatR: CatalogRepositoryTrait,
    CartR: CartRepositoryTrait,
    PurR: PurchaseRepositoryTrait,
{
    catalog_repo: Arc<CatR>,
    cart_repo: Arc<CartR>,
    purchase_repo: Arc<PurR>,
    gateways: Arc<GatewayRegistry>,
    rates: ExchangeRates,
}

impl<CatR, CartR, PurR> CartService<CatR, CartR, PurR>
where
    CatR: CatalogRepositoryTrait,
    CartR: CartRepositoryTrait,
    PurR: PurchaseRepositoryTrait,
{
    pub fn new(
        catalog_repo: Arc<CatR>,
        cart_repo: Arc<CartR>,
        purchase_repo: Arc<PurR>,
        gateways: Arc<GatewayRegistry>,
        rates: ExchangeRates,
    ) -> Self {
        Self {
            catalog_repo,
            cart_repo,
            purchase_repo,
            gateways,
            rates,
        }
    }

    /// 加入购物车（幂等），返回是否新增
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, user_id: Uuid, sheet_id: Uuid) -> Result<bool> {
        self.catalog_repo
            .get_sheet(sheet_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or(CommerceError::SheetNotFound(sheet_id))?;

        let added = self.cart_repo.add_item(user_id, sheet_id).await?;
        debug!(added, "购物车已更新");
        Ok(added)
    }

    pub async fn remove_from_cart(&self, user_id: Uuid, sheet_id: Uuid) -> Result<bool> {
        self.cart_repo.remove_item(user_id, sheet_id).await
    }

    pub async fn clear_cart(&self, user_id: Uuid) -> Result<u64> {
        self.cart_repo.clear(user_id).await
    }

    /// 购物车汇总；下架的乐谱不展示，已购买的乐谱标记出来且不计入小计
    #[instrument(skip(self))]
    pub async fn cart_summary(&self, user_id: Uuid, currency: Currency) -> Result<CartSummaryDto> {
        let items = self.cart_repo.list_items(user_id).await?;
        let sheet_ids: Vec<Uuid> = items.iter().map(|i| i.sheet_id).collect();

        let sheets = self.catalog_repo.get_sheets_by_ids(&sheet_ids).await?;
        let owned: HashSet<Uuid> = self
            .purchase_repo
            .owned_sheet_ids(user_id, &sheet_ids)
            .await?
            .into_iter()
            .collect();

        // 保持加入购物车的顺序
        let lines: Vec<CartLineDto> = items
            .iter()
            .filter_map(|item| sheets.iter().find(|s| s.id == item.sheet_id))
            .filter(|sheet| sheet.is_active)
            .map(|sheet| CartLineDto {
                sheet_id: sheet.id,
                title: sheet.title.clone(),
                artist: sheet.artist.clone(),
                price: sheet.price,
                display_price: self.rates.money(sheet.price, currency),
                sales_type: sheet.sales_type,
                already_owned: owned.contains(&sheet.id),
            })
            .collect();

        let subtotal: i64 = lines
            .iter()
            .filter(|l| !l.already_owned)
            .map(|l| l.price)
            .sum();

        let payment_methods = available_methods(currency, OrderType::Product)
            .into_iter()
            .filter(|m| self.gateways.supports(*m))
            .collect();

        Ok(CartSummaryDto {
            lines,
            subtotal,
            currency,
            display_total: self.rates.money(subtotal, currency),
            payment_methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CartItem, PaymentMethod, SalesType};
    use crate::repository::{
        MockCartRepositoryTrait, MockCatalogRepositoryTrait, MockPurchaseRepositoryTrait,
    };
    use crate::test_fixtures::sample_sheet;
    use chrono::Utc;

    type TestCartService =
        CartService<MockCatalogRepositoryTrait, MockCartRepositoryTrait, MockPurchaseRepositoryTrait>;

    fn service(
        catalog: MockCatalogRepositoryTrait,
        cart: MockCartRepositoryTrait,
        purchases: MockPurchaseRepositoryTrait,
    ) -> TestCartService {
        CartService::new(
            Arc::new(catalog),
            Arc::new(cart),
            Arc::new(purchases),
            Arc::new(GatewayRegistry::new()),
            ExchangeRates::default(),
        )
    }

    #[tokio::test]
    async fn test_add_missing_sheet_rejected() {
        let mut catalog = MockCatalogRepositoryTrait::new();
        catalog.expect_get_sheet().returning(|_| Ok(None));
        let mut cart = MockCartRepositoryTrait::new();
        cart.expect_add_item().never();

        let err = service(catalog, cart, MockPurchaseRepositoryTrait::new())
            .add_to_cart(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "SHEET_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let sheet = sample_sheet(3_000, SalesType::Instant, true);
        let mut catalog = MockCatalogRepositoryTrait::new();
        catalog
            .expect_get_sheet()
            .returning(move |_| Ok(Some(sheet.clone())));
        let mut cart = MockCartRepositoryTrait::new();
        let mut first = true;
        cart.expect_add_item().times(2).returning(move |_, _| {
            let added = first;
            first = false;
            Ok(added)
        });

        let service = service(catalog, cart, MockPurchaseRepositoryTrait::new());
        let user = Uuid::new_v4();
        let sheet_id = Uuid::new_v4();
        assert!(service.add_to_cart(user, sheet_id).await.unwrap());
        assert!(!service.add_to_cart(user, sheet_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_summary_excludes_owned_from_subtotal() {
        let user = Uuid::new_v4();
        let a = sample_sheet(3_000, SalesType::Instant, true);
        let b = sample_sheet(5_000, SalesType::Preorder, false);
        let owned_id = a.id;
        let items: Vec<CartItem> = [a.id, b.id]
            .iter()
            .map(|id| CartItem {
                id: Uuid::new_v4(),
                user_id: user,
                sheet_id: *id,
                created_at: Utc::now(),
            })
            .collect();
        let sheets = vec![b.clone(), a.clone()];

        let mut cart = MockCartRepositoryTrait::new();
        cart.expect_list_items()
            .returning(move |_| Ok(items.clone()));
        let mut catalog = MockCatalogRepositoryTrait::new();
        catalog
            .expect_get_sheets_by_ids()
            .returning(move |_| Ok(sheets.clone()));
        let mut purchases = MockPurchaseRepositoryTrait::new();
        purchases
            .expect_owned_sheet_ids()
            .returning(move |_, _| Ok(vec![owned_id]));

        let summary = service(catalog, cart, purchases)
            .cart_summary(user, Currency::Krw)
            .await
            .unwrap();

        assert_eq!(summary.lines.len(), 2);
        assert_eq!(summary.lines[0].sheet_id, a.id);
        assert!(summary.lines[0].already_owned);
        assert_eq!(summary.subtotal, 5_000);
        assert_eq!(summary.display_total.formatted, "₩5,000");
        // 未注册任何渠道时只剩积分
        assert_eq!(summary.payment_methods, vec![PaymentMethod::Points]);
    }
}
