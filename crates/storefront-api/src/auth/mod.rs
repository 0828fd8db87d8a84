//! 认证模块
//!
//! 校验 Supabase 签发的用户 access token

mod jwt;

pub use jwt::{AUTHENTICATED_AUDIENCE, AuthUser, JwtVerifier, SupabaseClaims};

#[cfg(test)]
pub(crate) use jwt::sign_test_token;
