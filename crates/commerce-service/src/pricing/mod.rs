//! 定价与币种
//!
//! - `currency`: 币种、汇率换算、金额格式化
//! - `methods`: 各币种可用的支付方式
//! - `bundle`: 合集售价分摊
//! - `charge`: 积分充值套餐
//! - `eta`: 预购完成时间

mod bundle;
mod charge;
mod currency;
mod eta;
mod methods;

pub use bundle::allocate_bundle_price;
pub use charge::ChargePackages;
pub use currency::{Currency, ExchangeRates, Money, format_amount};
pub use eta::{DEFAULT_PREORDER_LEAD_DAYS, preorder_eta};
pub use methods::{available_methods, is_method_available};
