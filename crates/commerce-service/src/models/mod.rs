//! 商店领域模型

pub mod account;
pub mod catalog;
pub mod enums;
pub mod order;

pub use account::{CashTransaction, NewCashTransaction, PaymentEvent, Profile};
pub use catalog::{Category, Collection, DrumSheet, SheetFilter, SheetSort};
pub use enums::{
    CashTransactionType, CompletionSource, OrderStatus, OrderType, PaymentMethod,
    PaymentProvider, PaymentStatus, SalesType,
};
pub use order::{
    CartItem, CashOrderMetadata, NewOrder, NewOrderItem, Order, OrderItem, OrderItemSheetState,
    OrderPaidUpdate, Purchase, generate_order_number,
};

pub use crate::pricing::Currency;
