//! Redis 缓存管理模块
//!
//! 目录数据的读缓存，以及 webhook 事件去重的快速路径。

use crate::config::RedisConfig;
use crate::error::{InfraError, Result};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Redis 缓存客户端
#[derive(Clone)]
pub struct Cache {
    client: Client,
}

impl Cache {
    /// 创建 Redis 客户端（惰性连接）
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis 客户端已创建");
        Ok(Self { client })
    }

    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(InfraError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(InfraError::from)
    }

    /// 获取值
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await?;

        value
            .map(|v| {
                serde_json::from_str(&v).map_err(|e| InfraError::CacheSerialization(e.to_string()))
            })
            .transpose()
    }

    /// 设置值
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let serialized = serde_json::to_string(value)
            .map_err(|e| InfraError::CacheSerialization(e.to_string()))?;

        let _: () = conn.set_ex(key, serialized, ttl.as_secs()).await?;
        Ok(())
    }

    /// 删除值
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    /// 按模式批量删除
    #[instrument(skip(self))]
    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.get_conn().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let count: u64 = conn.del(&keys).await?;
        debug!(pattern, count, "已清理缓存键");
        Ok(count)
    }

    /// 仅在 key 不存在时写入，并指定 TTL
    ///
    /// 基于 SET NX EX。返回 true 表示写入成功（首次出现），false 表示已存在。
    pub async fn set_nx<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<bool> {
        let mut conn = self.get_conn().await?;
        let serialized = serde_json::to_string(value)
            .map_err(|e| InfraError::CacheSerialization(e.to_string()))?;

        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(serialized)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }
}

/// 缓存键生成器
pub struct CacheKey;

impl CacheKey {
    /// 目录缓存统一前缀，乐谱/合集变更时按此前缀失效
    pub const CATALOG_PATTERN: &'static str = "catalog:*";

    pub fn categories() -> String {
        "catalog:categories".to_string()
    }

    /// 列表查询以归一化后的查询串区分
    pub fn sheet_list(query_fingerprint: &str) -> String {
        format!("catalog:sheets:{}", query_fingerprint)
    }

    pub fn sheet_detail(sheet_id: &str) -> String {
        format!("catalog:sheet:{}", sheet_id)
    }

    pub fn collection_list() -> String {
        "catalog:collections".to_string()
    }

    pub fn collection_detail(collection_id: &str) -> String {
        format!("catalog:collection:{}", collection_id)
    }

    pub fn webhook_event(provider: &str, event_id: &str) -> String {
        format!("webhook:{}:{}", provider, event_id)
    }
}
