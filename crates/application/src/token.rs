use std::sync::{Arc, RwLock};

use domain::{DomainError, SubjectId, Token};
use tracing::{debug, info, warn};

/// Holds the stay token currently active for the room
#[derive(Clone, Default)]
pub struct TokenService {
    active: Arc<RwLock<Option<Token>>>,
}

impl TokenService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active token. An unparseable token leaves the old one in place.
    pub fn update(&self, raw: &str) -> Result<(), DomainError> {
        let token = Token::parse(raw)?;
        info!(stay_id = ?token.stay_id(), "🔑 Stay token updated");
        *self.active.write().unwrap_or_else(|p| p.into_inner()) = Some(token);
        Ok(())
    }

    pub fn revoke(&self) {
        let previous = self.active.write().unwrap_or_else(|p| p.into_inner()).take();
        match previous {
            Some(token) => info!(stay_id = ?token.stay_id(), "Stay token revoked"),
            None => debug!("Token revoke without an active token"),
        }
    }

    pub fn stay_id(&self) -> Option<String> {
        self.read(|token| token.stay_id().map(str::to_string))
    }

    /// Map a locally presented credential to the subject it authenticates.
    ///
    /// Anything but the active token resolves to the unknown subject.
    pub fn resolve(&self, credential: &str) -> SubjectId {
        let resolved = self.read(|token| {
            if !token.matches(credential) {
                return None;
            }
            let id = match (token.subject(), token.stay_id()) {
                (Some(sub), _) => sub.to_string(),
                (None, Some(stay)) => format!("stay:{stay}"),
                (None, None) => return None,
            };
            SubjectId::new(id).ok()
        });

        resolved.unwrap_or_else(|| {
            warn!("Credential did not match the active stay token");
            SubjectId::unknown()
        })
    }

    fn read<T>(&self, f: impl FnOnce(&Token) -> Option<T>) -> Option<T> {
        self.active
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .and_then(f)
    }
}
