use std::time::{SystemTime, UNIX_EPOCH};

use crate::{model::role::Role, models::Claims};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

pub fn generate_session_token(
    user_id: u64,
    tenant_id: u64,
    email: String,
    role: Role,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id,
        tenant_id,
        sub: email,
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_tenant_and_role() {
        let (token, issued) =
            generate_session_token(5, 2, "hr@acme.com".into(), Role::Hr, "k", 60).unwrap();
        let claims = verify_token(&token, "k").unwrap();

        assert_eq!(claims.user_id, 5);
        assert_eq!(claims.tenant_id, 2);
        assert_eq!(claims.sub, "hr@acme.com");
        assert_eq!(claims.role, Role::Hr);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) =
            generate_session_token(1, 1, "a@b.co".into(), Role::Admin, "right", 60).unwrap();
        assert!(verify_token(&token, "wrong").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            user_id: 1,
            tenant_id: 1,
            sub: "a@b.co".into(),
            role: Role::Employee,
            exp: now() - 3600,
            jti: "x".into(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        assert!(verify_token(&token, "k").is_err());
    }
}
