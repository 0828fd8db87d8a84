//! Supabase access token 校验
//!
//! Supabase 以 HS256 签发用户 token：`aud = "authenticated"`，`sub` 为用户 UUID。

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// 已登录用户的 token 受众
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Supabase JWT 载荷（只取用到的字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// 当前请求的用户，由认证中间件注入请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// JWT 校验器
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// 校验 token 并解析出用户
    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let data = decode::<SupabaseClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token 已过期".to_string()),
                ErrorKind::InvalidAudience => {
                    ApiError::Unauthorized("Token 受众无效".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ApiError::Unauthorized("Token 中的用户 ID 无效".to_string()))?;

        Ok(AuthUser {
            id,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
pub(crate) fn sign_test_token(secret: &str, user_id: Uuid, email: Option<&str>, ttl_secs: i64) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = SupabaseClaims {
        sub: user_id.to_string(),
        aud: AUTHENTICATED_AUDIENCE.to_string(),
        exp: chrono::Utc::now().timestamp() + ttl_secs,
        email: email.map(String::from),
        role: Some("authenticated".to_string()),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("签发测试 token 失败")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::Fake;
    use fake::faker::internet::en::SafeEmail;
    use sheet_shared::test_utils::TEST_JWT_SECRET;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_verify_supabase_token() {
        let verifier = JwtVerifier::new(TEST_JWT_SECRET);
        let user_id = Uuid::new_v4();
        let email: String = SafeEmail().fake();

        let token = sign_test_token(TEST_JWT_SECRET, user_id, Some(&email), 3600);
        let user = assert_ok!(verifier.verify(&token));
        assert_eq!(user.id, user_id);
        assert_eq!(user.email.as_deref(), Some(email.as_str()));
    }

    #[test]
    fn test_rejects_wrong_secret_and_expired() {
        let verifier = JwtVerifier::new(TEST_JWT_SECRET);
        let user_id = Uuid::new_v4();

        let forged = sign_test_token("another-secret-with-enough-length!!", user_id, None, 3600);
        assert_err!(verifier.verify(&forged));

        let expired = sign_test_token(TEST_JWT_SECRET, user_id, None, -3600);
        let err = verifier.verify(&expired).unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");
        assert!(err.to_string().contains("过期"));

        assert_err!(verifier.verify("invalid.token.here"));
    }

    #[test]
    fn test_rejects_anon_audience() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let claims = SupabaseClaims {
            sub: Uuid::new_v4().to_string(),
            aud: "anon".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            email: None,
            role: Some("anon".to_string()),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .unwrap();

        assert_err!(JwtVerifier::new(TEST_JWT_SECRET).verify(&token));
    }
}
