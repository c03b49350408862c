//! # 인증
//!
//! 인증 자체는 이 서비스의 관심사가 아니므로 최소한만 구현합니다.
//! 로그인 시 HS256 JWT 액세스 토큰(24시간)을 발급하고,
//! 보호된 핸들러는 `AuthUser` 추출기로 `Authorization: Bearer <token>`을 검증합니다.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::state::AppState;

/// 액세스 토큰 유효 시간. 리프레시 토큰은 발급하지 않습니다.
const ACCESS_TOKEN_HOURS: i64 = 24;

// JWT 페이로드. Serialize는 발급(encode), Deserialize는 검증(decode)에 필요합니다.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: i64,    // 만료 시각 (Unix 초), Validation::default()가 검사
    pub iat: i64,    // 발급 시각
}

/// 인증된 요청자. 핸들러 인자로 선언하면 토큰 검증이 선행됩니다.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

// FromRequestParts: 요청 본문을 소비하지 않는 추출기.
// 헤더만 읽으므로 Json / Multipart 같은 본문 추출기보다 앞에 둘 수 있습니다.
// axum 0.8부터는 async fn을 트레이트 구현에 바로 쓸 수 있습니다.
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        // "Bearer " 접두사가 없으면 형식 오류로 취급
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let claims = verify_access_token(token, &state.jwt_secret)?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

/// 추출기 거부 사유. 모두 401로 응답하고 `code`로만 구분합니다.
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            AuthError::MissingToken => ("missing_token", "Authorization token is required"),
            AuthError::InvalidToken => ("invalid_token", "Invalid authorization token"),
            AuthError::ExpiredToken => ("expired_token", "Authorization token has expired"),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

pub fn create_access_token(
    user_id: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(ACCESS_TOKEN_HOURS)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    // 만료만 따로 구분하고 서명 불일치, 형식 오류 등은 모두 InvalidToken
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_with_same_secret_only() {
        let token = create_access_token("user-1", "secret").unwrap();
        assert_eq!(verify_access_token(&token, "secret").unwrap().sub, "user-1");
        assert!(matches!(
            verify_access_token(&token, "other"),
            Err(AuthError::InvalidToken)
        ));
    }
}
