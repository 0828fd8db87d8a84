//! 各支付渠道实现

mod bank_transfer;
pub mod dodo;
mod paypal;
mod portone;

pub use bank_transfer::BankTransferGateway;
pub use dodo::DodoGateway;
pub use paypal::PayPalGateway;
pub use portone::PortOneGateway;
