use drape_core::error::AppError;
use drape_core::ports::IdentityProvider;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

/// Session token claims. Issuers store the user id as either a string or a
/// number, so both are accepted.
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserId {
    Text(String),
    Number(i64),
}

impl UserId {
    fn into_string(self) -> String {
        match self {
            UserId::Text(s) => s,
            UserId::Number(n) => n.to_string(),
        }
    }
}

/// Verifies HS256 session tokens signed with a shared secret.
///
/// Tokens must carry an `exp` claim; expired tokens are rejected.
pub struct JwtIdentity {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentity {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl IdentityProvider for JwtIdentity {
    fn verify(&self, token: &str) -> Result<String, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized("Missing session token".to_string()));
        }

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("Rejected session token: {}", e);
            AppError::Unauthorized("Invalid session token".to_string())
        })?;

        let user_id = data.claims.user_id.into_string();
        if user_id.is_empty() {
            return Err(AppError::Unauthorized("Invalid session token".to_string()));
        }
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn mint(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn expiry(offset: Duration) -> i64 {
        (Utc::now() + offset).timestamp()
    }

    #[test]
    fn test_valid_token_yields_user_id() {
        let token = mint(
            serde_json::json!({ "userId": "u-42", "exp": expiry(Duration::hours(24)) }),
            SECRET,
        );
        assert_eq!(JwtIdentity::new(SECRET).verify(&token).unwrap(), "u-42");
    }

    #[test]
    fn test_numeric_user_id() {
        let token = mint(
            serde_json::json!({ "userId": 7, "exp": expiry(Duration::hours(1)) }),
            SECRET,
        );
        assert_eq!(JwtIdentity::new(SECRET).verify(&token).unwrap(), "7");
    }

    #[test]
    fn test_missing_token() {
        let err = JwtIdentity::new(SECRET).verify("  ").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_wrong_secret_and_garbage_rejected() {
        let identity = JwtIdentity::new(SECRET);
        let forged = mint(
            serde_json::json!({ "userId": "u-42", "exp": expiry(Duration::hours(1)) }),
            "other-secret",
        );
        assert!(matches!(identity.verify(&forged), Err(AppError::Unauthorized(_))));
        assert!(matches!(identity.verify("not.a.jwt"), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = mint(
            serde_json::json!({ "userId": "u-42", "exp": expiry(Duration::hours(-2)) }),
            SECRET,
        );
        assert!(matches!(
            JwtIdentity::new(SECRET).verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_missing_user_claim_rejected() {
        let token = mint(
            serde_json::json!({ "sub": "u-42", "exp": expiry(Duration::hours(1)) }),
            SECRET,
        );
        assert!(matches!(
            JwtIdentity::new(SECRET).verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
