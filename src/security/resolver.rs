//! Principal resolution from the `Authorization` header.

use std::sync::Arc;

use axum::http::HeaderValue;

use crate::security::credential;
use crate::security::error::GateError;
use crate::security::principal::{Principal, TokenScope};
use crate::store::{StoreError, UserStore};

/// Resolves bearer credentials to principals through the user store.
#[derive(Clone)]
pub struct PrincipalResolver {
    users: Arc<dyn UserStore>,
}

impl PrincipalResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Resolve an `Authorization` header value.
    ///
    /// No header means [`Principal::Anonymous`]. Malformed and unknown
    /// credentials both yield [`GateError::InvalidCredential`].
    pub async fn resolve(&self, header: Option<&HeaderValue>) -> Result<Principal, GateError> {
        let Some(header) = header else {
            return Ok(Principal::Anonymous);
        };

        let token = header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .filter(|token| credential::validate(token))
            .ok_or(GateError::InvalidCredential)?;

        let scope = TokenScope::Authentication;
        match self.users.find_by_token(scope, token).await {
            Ok(user) => Ok(Principal::User(user)),
            Err(StoreError::NotFound) => Err(GateError::InvalidCredential),
            Err(e) => Err(GateError::internal(format!(
                "{} token lookup failed: {e}",
                scope.as_str()
            ))),
        }
    }
}

/// Extract the token from a `Bearer <token>` header.
fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::principal::User;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FailingStore;

    #[async_trait]
    impl UserStore for FailingStore {
        async fn find_by_token(&self, _: TokenScope, _: &str) -> Result<User, StoreError> {
            Err(StoreError::Unavailable("connection reset".to_string()))
        }
    }

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_anonymous() {
        let resolver = PrincipalResolver::new(Arc::new(MemoryStore::new()));
        assert_eq!(resolver.resolve(None).await.unwrap(), Principal::Anonymous);
    }

    #[tokio::test]
    async fn known_token_resolves_user() {
        let store = Arc::new(MemoryStore::new());
        let user = store.insert_user("Alice", "alice@example.com", true);
        let token = store.issue_token(user.id, TokenScope::Authentication, Duration::from_secs(60));
        let resolver = PrincipalResolver::new(store);

        let principal = resolver
            .resolve(Some(&header(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(principal, Principal::User(user));
    }

    #[tokio::test]
    async fn malformed_and_unknown_credentials_are_indistinguishable() {
        let resolver = PrincipalResolver::new(Arc::new(MemoryStore::new()));

        for value in [
            "Bearer short",
            "Basic ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            "Bearer",
            "Bearer  ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            "Bearer ABCDEFGHIJKLMNOPQRSTUVWXYZ extra",
            "bearer ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            "Bearer ABCDEFGHIJKLMNOPQRSTUVWXYZ",
        ] {
            let err = resolver.resolve(Some(&header(value))).await.unwrap_err();
            assert!(
                matches!(err, GateError::InvalidCredential),
                "{value:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn non_utf8_header_is_invalid_credential() {
        let resolver = PrincipalResolver::new(Arc::new(MemoryStore::new()));
        let value = HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap();
        let err = resolver.resolve(Some(&value)).await.unwrap_err();
        assert!(matches!(err, GateError::InvalidCredential));
    }

    #[tokio::test]
    async fn store_failure_is_internal() {
        let resolver = PrincipalResolver::new(Arc::new(FailingStore));
        let err = resolver
            .resolve(Some(&header("Bearer ABCDEFGHIJKLMNOPQRSTUVWXYZ")))
            .await
            .unwrap_err();
        match err {
            GateError::Internal(detail) => assert_eq!(
                detail,
                "authentication token lookup failed: store unavailable: connection reset"
            ),
            other => panic!("expected internal error, got {other:?}"),
        }
    }

    #[test]
    fn bearer_token_requires_exact_shape() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Token abc"), None);
        assert_eq!(bearer_token("Bearer a b"), None);
    }
}
