//! 支付渠道注册表
//!
//! 只注册凭证已配置的渠道；积分支付不经过外部渠道，始终可用。

use std::collections::HashMap;
use std::sync::Arc;

use sheet_shared::config::{PaymentsConfig, StoreConfig};
use tracing::info;

use super::gateway::PaymentGateway;
use super::gateways::{BankTransferGateway, DodoGateway, PayPalGateway, PortOneGateway};
use super::http::build_http_client;
use crate::error::{CommerceError, Result};
use crate::models::{PaymentMethod, PaymentProvider};

#[derive(Default, Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentProvider, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按配置注册渠道
    pub fn from_config(payments: &PaymentsConfig, store: &StoreConfig) -> Result<Self> {
        let client = build_http_client()?;
        let mut registry = Self::new();

        if payments.portone.is_configured() {
            registry.register(Arc::new(PortOneGateway::new(
                client.clone(),
                payments.portone.clone(),
            )));
        }
        if payments.paypal.is_configured() {
            registry.register(Arc::new(PayPalGateway::new(
                client.clone(),
                payments.paypal.clone(),
            )));
        }
        if payments.dodo.is_configured() {
            registry.register(Arc::new(DodoGateway::new(client, payments.dodo.clone())));
        }
        if payments.bank_transfer.is_configured() {
            registry.register(Arc::new(BankTransferGateway::new(
                payments.bank_transfer.clone(),
                store.bank_transfer_ttl_hours,
            )));
        }

        let providers: Vec<&str> = registry.gateways.keys().map(|p| p.as_str()).collect();
        info!(providers = ?providers, "支付渠道已注册");

        Ok(registry)
    }

    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(gateway.provider(), gateway);
    }

    pub fn get(&self, provider: PaymentProvider) -> Result<Arc<dyn PaymentGateway>> {
        self.gateways
            .get(&provider)
            .cloned()
            .ok_or_else(|| CommerceError::GatewayNotConfigured(provider.as_str().to_string()))
    }

    /// 支付方式对应的渠道
    pub fn for_method(&self, method: PaymentMethod) -> Result<Arc<dyn PaymentGateway>> {
        self.get(method.provider())
    }

    /// 支付方式当前是否可用
    pub fn supports(&self, method: PaymentMethod) -> bool {
        method == PaymentMethod::Points || self.gateways.contains_key(&method.provider())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_shared::test_utils::test_app_config;

    #[test]
    fn test_empty_registry() {
        let registry = GatewayRegistry::from_config(
            &PaymentsConfig::default(),
            &StoreConfig::default(),
        )
        .unwrap();

        assert!(registry.supports(PaymentMethod::Points));
        assert!(!registry.supports(PaymentMethod::Card));
        assert!(!registry.supports(PaymentMethod::PayPal));
        let err = match registry.for_method(PaymentMethod::Dodo) {
            Err(e) => e,
            Ok(_) => panic!("dodo should not be registered"),
        };
        assert_eq!(err.error_code(), "GATEWAY_NOT_CONFIGURED");
    }

    #[test]
    fn test_configured_registry() {
        let config = test_app_config();
        let registry = GatewayRegistry::from_config(&config.payments, &config.store).unwrap();

        for method in [
            PaymentMethod::Card,
            PaymentMethod::KakaoPay,
            PaymentMethod::BankTransfer,
            PaymentMethod::PayPal,
            PaymentMethod::Dodo,
        ] {
            assert!(registry.supports(method), "{:?}", method);
        }
        assert_eq!(
            registry.for_method(PaymentMethod::KakaoPay).unwrap().provider(),
            PaymentProvider::PortOne
        );
    }
}
