use crate::app::{AppError, AppResult};
use chrono::Utc;
use jsonwebtoken::{
    errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use model::access::Caller;
use uuid::Uuid;

/// Verifies bearer tokens issued by the identity provider, signed with the shared secret.
#[derive(Clone)]
pub struct TokenHandler {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl TokenHandler {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn parse_token(&self, token: &str) -> Result<Claims, JwtError> {
        match jsonwebtoken::decode(token, &self.decoding_key, &self.validation) {
            Ok(token_data) => Ok(token_data.claims),
            Err(e) => {
                error!("failed to validate token with error: '{}'", e);
                Err(e)
            }
        }
    }

    /// Signs `claims`. Tokens normally come from the identity provider; this is for tests and
    /// local tooling.
    pub fn generate_token(&self, claims: &Claims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id` that expire `valid_for_s` seconds from now.
    pub fn new(user_id: Uuid, email: &str, valid_for_s: i64) -> Self {
        Self {
            sub: user_id,
            email: email.to_owned(),
            exp: Utc::now().timestamp() + valid_for_s,
        }
    }
}

impl From<&Claims> for Caller {
    fn from(claims: &Claims) -> Self {
        Caller::new(claims.sub, &claims.email)
    }
}

/// Every method needs a verified token.
pub fn authenticate(claims: &Option<Claims>) -> AppResult<Caller> {
    match claims {
        Some(claims) => Ok(Caller::from(claims)),
        None => Err(AppError::unauthenticated()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_to_a_caller() {
        let tokens = TokenHandler::new("secret");
        let user_id = Uuid::new_v4();
        let token = tokens
            .generate_token(&Claims::new(user_id, "Chef@Example.com", 60))
            .unwrap();

        let claims = tokens.parse_token(&token).unwrap();
        let caller = authenticate(&Some(claims)).unwrap();
        assert_eq!(caller.user_id, user_id);
        assert_eq!(caller.email, "chef@example.com");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let tokens = TokenHandler::new("secret");
        let token = tokens
            .generate_token(&Claims::new(Uuid::new_v4(), "chef@example.com", -3600))
            .unwrap();
        assert!(tokens.parse_token(&token).is_err());
    }

    #[test]
    fn missing_claims_are_unauthenticated() {
        let error = authenticate(&None).unwrap_err();
        assert_eq!(error.rpc_error.http_status(), 401);
    }
}
