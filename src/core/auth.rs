//! Stateless bearer-token verification.
//!
//! The identity service issues HS256 tokens signed with a secret that is
//! shared, out of band, with the gateway and the media service. Any of the
//! three processes can therefore authenticate a request from the token alone:
//! no session store, no database lookup, no cross-service call. Verification
//! is a pure function of (token, secret, current time) and is safe to run
//! concurrently from many requests.
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by token verification.
///
/// All three variants surface to clients as an opaque `401 Unauthorized`;
/// the distinction exists for logging and tests only.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// The token could not be split into header/claims/signature segments or
    /// its segments did not decode.
    #[error("malformed token")]
    MalformedToken,

    /// The signature did not match the shared secret, or the token declared
    /// an unsupported algorithm (including `none`).
    #[error("bad signature")]
    BadSignature,

    /// The `exp` claim is at or before the current time.
    #[error("token expired")]
    Expired,
}

/// The signing secret shared between the identity service, the media service
/// and the gateway.
#[derive(Clone)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Wrap a raw secret value.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Read the secret from the named environment variable.
    pub fn from_env(var: &str) -> Result<Self, SecretError> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(Self(value.into_bytes())),
            Ok(_) => Err(SecretError::Empty(var.to_string())),
            Err(_) => Err(SecretError::Missing(var.to_string())),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Never print the secret itself.
impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Errors resolving the shared secret at startup.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("environment variable {0} is not set")]
    Missing(String),
    #[error("environment variable {0} is empty")]
    Empty(String),
}

/// The identity carried by a verified token. Built purely from claims,
/// never persisted; its lifetime is the request that presented the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: i64,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Claim layout the identity service signs. Unknown claims (`jti`,
/// `token_type`, ...) are ignored on decode.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: i64,
    #[serde(default)]
    pub email: String,
    pub exp: i64,
}

/// Verifies bearer tokens against the shared secret.
///
/// Holds only the derived decoding key and the pinned validation rules;
/// nothing here is mutated after construction, so one instance is shared
/// freely across all in-flight requests.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &SharedSecret) -> Self {
        // Pinning the algorithm list is what rejects `alg: none` and any
        // token signed with a different scheme.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a raw token string and derive the [`Principal`] it names.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(map_jwt_error)?;

        let expires_at = DateTime::<Utc>::from_timestamp(data.claims.exp, 0)
            .ok_or(AuthError::MalformedToken)?;

        Ok(Principal {
            subject_id: data.claims.user_id,
            email: data.claims.email,
            expires_at,
        })
    }

    /// Verify an `Authorization` header value of the form `Bearer <token>`.
    pub fn verify_bearer(&self, header_value: &str) -> Result<Principal, AuthError> {
        let (prefix, token) = header_value
            .split_once(' ')
            .ok_or(AuthError::MalformedToken)?;
        if prefix != "Bearer" || token.is_empty() {
            return Err(AuthError::MalformedToken);
        }
        self.verify(token.trim())
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        // Declared algorithm differs from the pinned HS256 list; covers
        // `none` and asymmetric algorithms alike.
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => AuthError::BadSignature,
        _ => AuthError::MalformedToken,
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    fn secret() -> SharedSecret {
        SharedSecret::new("test-signing-key")
    }

    fn sign(claims: &TokenClaims, secret: &SharedSecret) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_claims(user_id: i64) -> TokenClaims {
        TokenClaims {
            user_id,
            email: format!("user{user_id}@example.com"),
            exp: Utc::now().timestamp() + 3600,
        }
    }

    #[test]
    fn valid_token_yields_matching_principal() {
        let secret = secret();
        let verifier = TokenVerifier::new(&secret);
        let claims = future_claims(42);
        let token = sign(&claims, &secret);

        let principal = verifier.verify(&token).unwrap();
        assert_eq!(principal.subject_id, 42);
        assert_eq!(principal.email, "user42@example.com");
        assert_eq!(principal.expires_at.timestamp(), claims.exp);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let secret = secret();
        let verifier = TokenVerifier::new(&secret);
        let token = sign(&future_claims(1), &secret);

        // Flip one character inside the signature segment.
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(verifier.verify(&tampered), Err(AuthError::BadSignature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let verifier = TokenVerifier::new(&secret());
        let token = sign(&future_claims(1), &SharedSecret::new("other-key"));
        assert_eq!(verifier.verify(&token), Err(AuthError::BadSignature));
    }

    #[test]
    fn expired_token_is_rejected_even_with_valid_signature() {
        let secret = secret();
        let verifier = TokenVerifier::new(&secret);
        let claims = TokenClaims {
            user_id: 7,
            email: String::new(),
            exp: Utc::now().timestamp() - 120,
        };
        let token = sign(&claims, &secret);
        assert_eq!(verifier.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        let verifier = TokenVerifier::new(&secret());
        assert_eq!(
            verifier.verify("not-a-token"),
            Err(AuthError::MalformedToken)
        );
        assert_eq!(verifier.verify(""), Err(AuthError::MalformedToken));
    }

    #[test]
    fn bearer_header_parsing() {
        let secret = secret();
        let verifier = TokenVerifier::new(&secret);
        let token = sign(&future_claims(3), &secret);

        let principal = verifier.verify_bearer(&format!("Bearer {token}")).unwrap();
        assert_eq!(principal.subject_id, 3);

        assert_eq!(
            verifier.verify_bearer(&format!("Token {token}")),
            Err(AuthError::MalformedToken)
        );
        assert_eq!(
            verifier.verify_bearer("Bearer"),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = SharedSecret::new("super-sensitive");
        assert_eq!(format!("{secret:?}"), "SharedSecret(..)");
    }
}
