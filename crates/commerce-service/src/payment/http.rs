//! 渠道 HTTP 调用
//!
//! 所有渠道共用一个 `reqwest::Client`；查询类请求按短退避策略重试瞬时错误。

use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use sheet_shared::retry::{RetryPolicy, retry_with_policy};

use crate::error::{CommerceError, Result};
use crate::models::PaymentProvider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ERROR_BODY_CHARS: usize = 500;

/// 构建渠道共用的 HTTP 客户端
pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| CommerceError::Internal(format!("HTTP 客户端初始化失败: {}", e)))
}

/// 渠道资源 ID 只允许出现在 URL 路径段中的字符
pub(crate) fn ensure_path_id(field: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value.len() <= 100
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(CommerceError::Validation(format!("{} 格式错误", field)))
    }
}

/// 单个渠道的 HTTP 调用封装
#[derive(Clone)]
pub(crate) struct GatewayHttp {
    client: reqwest::Client,
    provider: PaymentProvider,
    retry: RetryPolicy,
}

impl GatewayHttp {
    pub fn new(client: reqwest::Client, provider: PaymentProvider) -> Self {
        Self {
            client,
            provider,
            retry: RetryPolicy::http_request(),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// 发送请求并解析 JSON 响应；非 2xx 转为 `Gateway` 错误
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        if !status.is_success() {
            return Err(CommerceError::Gateway {
                provider: self.provider.as_str().to_string(),
                status: Some(status.as_u16()),
                message: truncate(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| CommerceError::Gateway {
            provider: self.provider.as_str().to_string(),
            status: Some(status.as_u16()),
            message: format!("响应解析失败: {}", e),
        })
    }

    /// 幂等查询，瞬时错误按策略重试
    pub async fn get_json<T, F>(&self, operation: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        retry_with_policy(&self.retry, operation, CommerceError::is_retryable, || {
            self.send_json::<T>(build(&self.client))
        })
        .await
    }

    fn map_error(&self, err: reqwest::Error) -> CommerceError {
        if err.is_timeout() {
            CommerceError::GatewayTimeout(self.provider.as_str().to_string())
        } else {
            CommerceError::Gateway {
                provider: self.provider.as_str().to_string(),
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let mut truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        truncated.push('…');
        truncated
    }
}
