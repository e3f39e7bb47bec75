//! HS256 JSON Web Token codec.

use std::collections::HashSet;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;

use bastion_application::{TokenCodec, TokenDecodeError};
use bastion_core::{AppError, AppResult, SubjectId};
use bastion_domain::TokenClaims;

/// Shortest accepted signing secret, in bytes.
pub const MIN_SIGNING_SECRET_BYTES: usize = 32;

#[derive(Deserialize)]
struct SubjectClaim {
    sub: String,
}

/// Signs and verifies tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct JwtTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    peek_validation: Validation,
}

impl JwtTokenCodec {
    /// Creates a codec for the given secret and expected issuer.
    pub fn new(secret: &[u8], issuer: &str) -> AppResult<Self> {
        if secret.len() < MIN_SIGNING_SECRET_BYTES {
            return Err(AppError::Validation(format!(
                "token signing secret must be at least {MIN_SIGNING_SECRET_BYTES} bytes"
            )));
        }

        // Expiry is evaluated by the token service against its own clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["sub".to_owned(), "iss".to_owned()]);
        validation.set_issuer(&[issuer]);

        let mut peek_validation = Validation::new(Algorithm::HS256);
        peek_validation.insecure_disable_signature_validation();
        peek_validation.validate_exp = false;
        peek_validation.required_spec_claims = HashSet::new();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            peek_validation,
        })
    }
}

impl TokenCodec for JwtTokenCodec {
    fn encode(&self, claims: &TokenClaims) -> AppResult<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign token: {error}")))
    }

    fn peek_subject(&self, token: &str) -> Option<SubjectId> {
        let data = jsonwebtoken::decode::<SubjectClaim>(
            token,
            &DecodingKey::from_secret(&[]),
            &self.peek_validation,
        )
        .ok()?;
        SubjectId::new(data.claims.sub).ok()
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenDecodeError> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|error| match error.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::ImmatureSignature => TokenDecodeError::InvalidSignature,
                _ => TokenDecodeError::Malformed,
            })
    }
}
