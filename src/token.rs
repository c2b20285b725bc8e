use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

/// Tokens expire this long after they are issued.
pub const TOKEN_LIFETIME_HOURS: i64 = 5;

/// Claims
///
/// Payload of every bearer token: the subject user id plus issued-at and expiry
/// timestamps (seconds since the epoch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub iat: i64,
    pub exp: i64,
}

/// TokenCodec
///
/// Issues and verifies HS256-signed bearer tokens with one process-wide secret.
/// Built once from [`crate::AppConfig`] and shared through the application state.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is absolute; no grace period.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issues a token for `user_id` valid for [`TOKEN_LIFETIME_HOURS`] from now.
    pub fn issue(&self, user_id: i32) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a token as if it had been created at `issued_at`.
    pub fn issue_at(
        &self,
        user_id: i32,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// verify
    ///
    /// Returns the subject user id, or `None` when the token is malformed, carries a bad
    /// signature, or has expired. Failures never propagate: callers treat `None` as anonymous.
    pub fn verify(&self, token: &str) -> Option<i32> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims.user_id),
            Err(err) => {
                match err.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("token has expired"),
                    _ => tracing::debug!(error = %err, "token rejected"),
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn issued_token_verifies_to_its_subject() {
        let codec = TokenCodec::new(SECRET);
        for user_id in [1, 42, i32::MAX] {
            let token = codec.issue(user_id).unwrap();
            assert_eq!(codec.verify(&token), Some(user_id));
        }
    }

    #[test]
    fn expired_token_is_absent() {
        let codec = TokenCodec::new(SECRET);
        let issued_at = Utc::now() - Duration::hours(TOKEN_LIFETIME_HOURS) - Duration::seconds(1);
        let token = codec.issue_at(7, issued_at).unwrap();
        assert_eq!(codec.verify(&token), None);
    }

    #[test]
    fn token_expiry_is_five_hours_after_issue() {
        let codec = TokenCodec::new(SECRET);
        let token = codec.issue(3).unwrap();
        let data = decode::<Claims>(&token, &codec.decoding, &codec.validation).unwrap();
        assert_eq!(data.claims.exp - data.claims.iat, 5 * 60 * 60);
    }

    #[test]
    fn any_flipped_character_invalidates_the_token() {
        let codec = TokenCodec::new(SECRET);
        let token = codec.issue(9).unwrap();

        for (index, original) in token.char_indices() {
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(index..index + original.len_utf8(), &replacement.to_string());
            assert_eq!(codec.verify(&tampered), None, "flip at {index} was accepted");
        }
    }

    #[test]
    fn token_signed_with_another_secret_is_absent() {
        let token = TokenCodec::new("other-secret").issue(1).unwrap();
        assert_eq!(TokenCodec::new(SECRET).verify(&token), None);
    }

    #[test]
    fn garbage_is_absent() {
        let codec = TokenCodec::new(SECRET);
        assert_eq!(codec.verify(""), None);
        assert_eq!(codec.verify("not.a.token"), None);
    }
}
