//! 数据传输对象
//!
//! - `request`: 请求体与查询参数
//! - `response`: 统一响应包装与接口专用的响应体

mod request;
mod response;

pub use request::*;
pub use response::*;
