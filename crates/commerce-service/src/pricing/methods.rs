//! 结算可用的支付方式

use super::Currency;
use crate::models::{OrderType, PaymentMethod};

/// 某币种、某订单类型下可选的支付方式
///
/// 韩元走国内渠道；外币走 PayPal / Dodo。充值订单不能用积分支付。
pub fn available_methods(currency: Currency, order_type: OrderType) -> Vec<PaymentMethod> {
    let mut methods = match currency {
        Currency::Krw => vec![
            PaymentMethod::Card,
            PaymentMethod::KakaoPay,
            PaymentMethod::BankTransfer,
            PaymentMethod::Points,
        ],
        Currency::Usd | Currency::Jpy => vec![
            PaymentMethod::PayPal,
            PaymentMethod::Dodo,
            PaymentMethod::Points,
        ],
    };

    if order_type == OrderType::Cash {
        methods.retain(|m| *m != PaymentMethod::Points);
    }
    methods
}

pub fn is_method_available(
    method: PaymentMethod,
    currency: Currency,
    order_type: OrderType,
) -> bool {
    available_methods(currency, order_type).contains(&method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_krw_methods() {
        let methods = available_methods(Currency::Krw, OrderType::Product);
        assert_eq!(
            methods,
            vec![
                PaymentMethod::Card,
                PaymentMethod::KakaoPay,
                PaymentMethod::BankTransfer,
                PaymentMethod::Points
            ]
        );
    }

    #[test]
    fn test_foreign_currency_methods() {
        for currency in [Currency::Usd, Currency::Jpy] {
            let methods = available_methods(currency, OrderType::Product);
            assert!(methods.contains(&PaymentMethod::PayPal));
            assert!(methods.contains(&PaymentMethod::Dodo));
            assert!(!methods.contains(&PaymentMethod::Card));
        }
    }

    #[test]
    fn test_cash_orders_never_offer_points() {
        assert!(!is_method_available(
            PaymentMethod::Points,
            Currency::Krw,
            OrderType::Cash
        ));
        assert!(is_method_available(
            PaymentMethod::Card,
            Currency::Krw,
            OrderType::Cash
        ));
        assert!(!is_method_available(
            PaymentMethod::Card,
            Currency::Usd,
            OrderType::Product
        ));
    }
}
