//! 乐谱文件存储（Supabase Storage）

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use sheet_shared::config::SupabaseConfig;
use tracing::instrument;

use crate::error::{CommerceError, Result};

/// 文件存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SheetStorage: Send + Sync {
    /// 生成限时下载链接
    async fn signed_download_url(&self, path: &str, expires_in_secs: u64) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_role_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(client: reqwest::Client, config: &SupabaseConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
            bucket: config.storage_bucket.clone(),
        }
    }

    fn sign_endpoint(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl SheetStorage for SupabaseStorage {
    #[instrument(skip(self))]
    async fn signed_download_url(&self, path: &str, expires_in_secs: u64) -> Result<String> {
        let response = self
            .client
            .post(self.sign_endpoint(path))
            .header("apikey", &self.service_role_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.service_role_key))
            .json(&json!({ "expiresIn": expires_in_secs }))
            .send()
            .await
            .map_err(|e| CommerceError::Storage(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CommerceError::Storage(format!(
                "签名 URL 生成失败 ({}): {}",
                status, body
            )));
        }

        let signed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| CommerceError::Storage(e.to_string()))?;

        Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
    }
}
