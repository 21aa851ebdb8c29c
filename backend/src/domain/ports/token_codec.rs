//! Port for signing and verifying access tokens.

use crate::domain::token::TokenClaims;

use super::define_port_error;

define_port_error! {
    /// Errors raised by token codecs.
    pub enum TokenCodecError {
        /// Claims could not be signed.
        Encode { message: String } =>
            "token encoding failed: {message}",
        /// Token signature, format or expiry is invalid.
        Decode { message: String } =>
            "token decoding failed: {message}",
    }
}

/// Port for token serialisation.
#[cfg_attr(test, mockall::automock)]
pub trait TokenCodec: Send + Sync {
    fn encode(&self, claims: &TokenClaims) -> Result<String, TokenCodecError>;

    /// Verify the signature and expiry, returning the claims.
    fn decode(&self, token: &str) -> Result<TokenClaims, TokenCodecError>;
}
