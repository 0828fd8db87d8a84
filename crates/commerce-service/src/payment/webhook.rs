//! Webhook 签名校验（Standard Webhooks）
//!
//! 签名内容为 `{webhook-id}.{webhook-timestamp}.{body}`，HMAC-SHA256，
//! 密钥为 `whsec_` 前缀之后的 base64 串。`webhook-signature` 头可包含多个
//! 以空格分隔的 `v1,<base64>` 条目，任一匹配即通过。

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use ring::hmac;
use subtle::ConstantTimeEq;

use crate::error::{CommerceError, Result};

/// 允许的时间偏差（秒）
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// 签名相关的请求头
#[derive(Debug, Clone, Copy)]
pub struct WebhookHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

/// Webhook 签名校验器
pub struct WebhookVerifier {
    key: hmac::Key,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        if encoded.is_empty() {
            return Err(CommerceError::Internal("webhook 密钥为空".into()));
        }
        let secret = STANDARD
            .decode(encoded)
            .map_err(|e| CommerceError::Internal(format!("webhook 密钥不是合法的 base64: {}", e)))?;

        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, &secret),
        })
    }

    /// 校验签名与时间戳
    pub fn verify(&self, headers: &WebhookHeaders<'_>, body: &[u8], now: DateTime<Utc>) -> Result<()> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| CommerceError::InvalidSignature("webhook-timestamp 格式错误".into()))?;

        let within_tolerance = now
            .timestamp()
            .checked_sub(timestamp)
            .is_some_and(|skew| skew.unsigned_abs() <= TIMESTAMP_TOLERANCE_SECS.unsigned_abs());
        if !within_tolerance {
            return Err(CommerceError::InvalidSignature(
                "webhook-timestamp 超出允许范围".into(),
            ));
        }

        let expected = self.tag(headers.id, headers.timestamp.trim(), body);

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|sig| bool::from(sig.as_slice().ct_eq(expected.as_ref())));

        if matched {
            Ok(())
        } else {
            Err(CommerceError::InvalidSignature("签名不匹配".into()))
        }
    }

    /// 生成 `v1,<base64>` 签名
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> String {
        let tag = self.tag(id, timestamp, body);
        format!("{},{}", SIGNATURE_VERSION, STANDARD.encode(tag.as_ref()))
    }

    fn tag(&self, id: &str, timestamp: &str, body: &[u8]) -> hmac::Tag {
        let mut ctx = hmac::Context::with_key(&self.key);
        ctx.update(id.as_bytes());
        ctx.update(b".");
        ctx.update(timestamp.as_bytes());
        ctx.update(b".");
        ctx.update(body);
        ctx.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_shared::test_utils::TEST_WEBHOOK_SECRET;

    fn headers<'a>(id: &'a str, ts: &'a str, sig: &'a str) -> WebhookHeaders<'a> {
        WebhookHeaders {
            id,
            timestamp: ts,
            signature: sig,
        }
    }

    #[test]
    fn test_valid_signature() {
        let verifier = WebhookVerifier::new(TEST_WEBHOOK_SECRET).unwrap();
        let now = Utc::now();
        let ts = now.timestamp().to_string();
        let body = br#"{"type":"payment.succeeded"}"#;
        let sig = verifier.sign("msg_1", &ts, body);

        assert!(verifier.verify(&headers("msg_1", &ts, &sig), body, now).is_ok());

        // 多个签名条目，其中一个有效
        let multi = format!("v1,AAAA {}", sig);
        assert!(verifier.verify(&headers("msg_1", &ts, &multi), body, now).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let verifier = WebhookVerifier::new(TEST_WEBHOOK_SECRET).unwrap();
        let now = Utc::now();
        let ts = now.timestamp().to_string();
        let sig = verifier.sign("msg_1", &ts, b"{\"amount\":100}");

        let err = verifier
            .verify(&headers("msg_1", &ts, &sig), b"{\"amount\":1}", now)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");

        // 换了 id 也不通过
        assert!(
            verifier
                .verify(&headers("msg_2", &ts, &sig), b"{\"amount\":100}", now)
                .is_err()
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let verifier = WebhookVerifier::new(TEST_WEBHOOK_SECRET).unwrap();
        let now = Utc::now();
        let stale = (now.timestamp() - TIMESTAMP_TOLERANCE_SECS - 1).to_string();
        let body = b"{}";
        let sig = verifier.sign("msg_1", &stale, body);

        assert!(verifier.verify(&headers("msg_1", &stale, &sig), body, now).is_err());
        assert!(verifier.verify(&headers("msg_1", "not-a-number", &sig), body, now).is_err());
    }

    #[test]
    fn test_extreme_timestamp_rejected_without_overflow() {
        let verifier = WebhookVerifier::new(TEST_WEBHOOK_SECRET).unwrap();
        let now = Utc::now();
        let body = b"{}";

        for ts in ["-9223372036854775808", "9223372036854775807"] {
            let sig = verifier.sign("msg_1", ts, body);
            let err = verifier
                .verify(&headers("msg_1", ts, &sig), body, now)
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_SIGNATURE");
        }
    }

    #[test]
    fn test_unknown_version_and_bad_secret() {
        let verifier = WebhookVerifier::new(TEST_WEBHOOK_SECRET).unwrap();
        let now = Utc::now();
        let ts = now.timestamp().to_string();
        let sig = verifier.sign("msg_1", &ts, b"{}").replacen("v1,", "v2,", 1);
        assert!(verifier.verify(&headers("msg_1", &ts, &sig), b"{}", now).is_err());

        assert!(WebhookVerifier::new("whsec_").is_err());
        assert!(WebhookVerifier::new("whsec_***not base64***").is_err());
    }
}
