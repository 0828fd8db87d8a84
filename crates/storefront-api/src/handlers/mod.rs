//! HTTP 请求处理器
//!
//! 请求体、查询参数与路径参数的解析失败统一转换为 `VALIDATION_ERROR` JSON 响应

pub mod admin;
pub mod cart;
pub mod cash;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod library;
pub mod orders;
pub mod payments;
pub mod webhooks;

use axum::Json;
use axum::extract::{Path, Query};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::error::ApiError;

pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;
pub type QueryParams<T> = WithRejection<Query<T>, ApiError>;
pub type PathId = WithRejection<Path<Uuid>, ApiError>;
