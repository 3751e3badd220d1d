use common::errors::AppError;
use common::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Checks a caller token issued by the external auth service.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, AppError>;
}

/// HS256 JWT verification against the shared secret.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation: Validation::default(),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::auth(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn token(secret: &str, exp_offset: i64) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            sub: "visitor-1".into(),
            exp: (now + exp_offset) as usize,
            role: "user".into(),
            permissions: vec!["weather:read".into()],
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_token_signed_with_shared_secret() {
        let claims = JwtVerifier::new("s3cret")
            .verify(&token("s3cret", 3600))
            .unwrap();
        assert_eq!(claims.sub, "visitor-1");
        assert_eq!(claims.permissions, vec!["weather:read"]);
    }

    #[test]
    fn rejects_foreign_signature_and_expired_tokens() {
        let verifier = JwtVerifier::new("s3cret");
        assert!(matches!(
            verifier.verify(&token("other", 3600)),
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            verifier.verify(&token("s3cret", -3600)),
            Err(AppError::AuthError(_))
        ));
        assert!(verifier.verify("not-a-jwt").is_err());
    }
}
