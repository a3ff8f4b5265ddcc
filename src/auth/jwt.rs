use std::collections::HashSet;

use jsonwebtoken::{decode, errors::Result, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by the hosted auth service's access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

/// Reads the claims of an access token and checks that it has not expired.
///
/// The signature is not checked here: the token is only ever sent back to the
/// service that issued it, and that service verifies it on every request.
pub fn decode_session(token: &str) -> Result<SessionClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);
    let data = decode::<SessionClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(exp: chrono::DateTime<Utc>) -> String {
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            email: Some("ani@example.com".into()),
            role: Some("authenticated".into()),
            exp: exp.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"project-secret"),
        )
        .unwrap()
    }

    #[test]
    fn decodes_live_token_without_secret() {
        let claims = decode_session(&token(Utc::now() + Duration::hours(1))).unwrap();
        assert_eq!(claims.email.as_deref(), Some("ani@example.com"));
    }

    #[test]
    fn rejects_expired_token() {
        assert!(decode_session(&token(Utc::now() - Duration::hours(2))).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_session("not-a-jwt").is_err());
    }
}
