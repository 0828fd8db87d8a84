//! 数据访问层
//!
//! 每个仓储持有连接池并提供固有方法；服务层通过 `traits` 中的接口依赖仓储。
//! 需要行锁的写入以 `*_in_tx` 关联函数暴露，由调用方控制事务边界。

mod account_repo;
mod cart_repo;
mod catalog_repo;
mod order_repo;
mod payment_event_repo;
mod purchase_repo;
pub mod traits;

pub use account_repo::AccountRepository;
pub use cart_repo::CartRepository;
pub use catalog_repo::CatalogRepository;
pub use order_repo::OrderRepository;
pub use payment_event_repo::PaymentEventRepository;
pub use purchase_repo::{LibraryRow, PurchaseRepository};
pub use traits::*;
