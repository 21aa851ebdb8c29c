//! HMAC-signed JWT adapter for the `TokenCodec` port.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::domain::ports::{TokenCodec, TokenCodecError};
use crate::domain::token::TokenClaims;

/// Error raised when the codec cannot be configured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwtConfigError {
    #[error("unsupported JWT algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("JWT secret must not be empty")]
    EmptySecret,
}

/// Signs and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct JwtTokenCodec {
    header: Header,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokenCodec {
    /// Build a codec for `algorithm`, which must be one of the HMAC family.
    ///
    /// # Errors
    ///
    /// Returns [`JwtConfigError`] for an empty secret or a non-HMAC algorithm.
    ///
    /// # Examples
    /// ```
    /// use carbon_tracker::outbound::token::JwtTokenCodec;
    ///
    /// assert!(JwtTokenCodec::new("devsecret", "HS256").is_ok());
    /// assert!(JwtTokenCodec::new("devsecret", "RS256").is_err());
    /// ```
    pub fn new(secret: &str, algorithm: &str) -> Result<Self, JwtConfigError> {
        if secret.is_empty() {
            return Err(JwtConfigError::EmptySecret);
        }
        let algorithm = match algorithm.trim().to_ascii_uppercase().as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => return Err(JwtConfigError::UnsupportedAlgorithm(other.to_owned())),
        };
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Ok(Self {
            header: Header::new(algorithm),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

impl TokenCodec for JwtTokenCodec {
    fn encode(&self, claims: &TokenClaims) -> Result<String, TokenCodecError> {
        encode(&self.header, claims, &self.encoding)
            .map_err(|err| TokenCodecError::encode(err.to_string()))
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenCodecError> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| TokenCodecError::decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rstest::{fixture, rstest};

    #[fixture]
    fn codec() -> JwtTokenCodec {
        JwtTokenCodec::new("devsecret", "HS256").expect("valid codec")
    }

    #[rstest]
    fn issued_claims_verify(codec: JwtTokenCodec) {
        let claims = TokenClaims::issue("user-1", Utc::now(), Duration::hours(1));
        let token = codec.encode(&claims).expect("encodes");
        assert_eq!(codec.decode(&token).expect("decodes"), claims);
    }

    #[rstest]
    fn expired_tokens_are_rejected(codec: JwtTokenCodec) {
        let claims = TokenClaims::issue("user-1", Utc::now() - Duration::hours(2), Duration::hours(1));
        let token = codec.encode(&claims).expect("encodes");
        assert!(matches!(codec.decode(&token), Err(TokenCodecError::Decode { .. })));
    }

    #[rstest]
    fn foreign_signatures_are_rejected(codec: JwtTokenCodec) {
        let other = JwtTokenCodec::new("othersecret", "HS256").expect("valid codec");
        let claims = TokenClaims::issue("user-1", Utc::now(), Duration::hours(1));
        let token = other.encode(&claims).expect("encodes");
        assert!(codec.decode(&token).is_err());
    }

    #[rstest]
    fn tokens_without_jti_still_decode(codec: JwtTokenCodec) {
        let mut claims = TokenClaims::issue("user-1", Utc::now(), Duration::hours(1));
        claims.jti = None;
        let token = codec.encode(&claims).expect("encodes");
        assert_eq!(codec.decode(&token).expect("decodes").jti(), None);
    }

    #[rstest]
    #[case("", "HS256", JwtConfigError::EmptySecret)]
    #[case("s", "none", JwtConfigError::UnsupportedAlgorithm("NONE".to_owned()))]
    fn invalid_configuration_is_rejected(
        #[case] secret: &str,
        #[case] algorithm: &str,
        #[case] expected: JwtConfigError,
    ) {
        assert_eq!(JwtTokenCodec::new(secret, algorithm).err(), Some(expected));
    }
}
