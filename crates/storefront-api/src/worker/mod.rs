//! 后台任务

pub mod pending_order_worker;

pub use pending_order_worker::PendingOrderWorker;
