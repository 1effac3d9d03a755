use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::db::models::User;

pub use jsonwebtoken::errors::Error as JwtError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id the token was issued for.
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
}

pub fn issue(user: &User, secret: &str, ttl_days: i64) -> Result<String, JwtError> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        exp: (OffsetDateTime::now_utc() + Duration::days(ttl_days)).unix_timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::UserRole;

    const SECRET: &str = "test-secret";

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            phone: None,
            role: UserRole::Citizen,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn token_round_trips() {
        let user = user();
        let token = issue(&user, SECRET, 7).unwrap();
        let claims = verify(&token, SECRET).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert!(claims.exp > OffsetDateTime::now_utc().unix_timestamp());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue(&user(), SECRET, 7).unwrap();
        assert!(verify(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Well past the default validation leeway.
        let token = issue(&user(), SECRET, -2).unwrap();
        assert!(verify(&token, SECRET).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify("not.a.token", SECRET).is_err());
    }
}
