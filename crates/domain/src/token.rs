//! Stay token pushed by the remote endpoint.
//!
//! The token is a JWT issued by the cloud for the current hotel stay. The
//! unit only reads its claims; signature verification happens upstream.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "stayId", default)]
    pub stay_id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token {
    raw: String,
    claims: TokenClaims,
}

impl Token {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into().trim().to_string();

        let mut parts = raw.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(DomainError::InvalidToken(
                    "expected three dot-separated segments".to_string(),
                ));
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| DomainError::InvalidToken(format!("payload is not base64url: {e}")))?;
        let claims: TokenClaims = serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::InvalidToken(format!("payload is not a claim set: {e}")))?;

        Ok(Self { raw, claims })
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    pub fn stay_id(&self) -> Option<&str> {
        self.claims.stay_id.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }

    /// Constant-shape comparison against a presented credential
    pub fn matches(&self, presented: &str) -> bool {
        let presented = presented.trim().as_bytes();
        let raw = self.raw.as_bytes();
        raw.len() == presented.len()
            && raw
                .iter()
                .zip(presented)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<String> for Token {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.raw
    }
}

// Never print the credential itself
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
