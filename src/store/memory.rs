//! In-memory user, token and permission store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::config::FixtureUser;
use crate::security::credential;
use crate::security::principal::{TokenScope, User, UserId};
use crate::store::{PermissionStore, Permissions, StoreError, UserStore};

#[derive(Debug, Clone)]
struct TokenRecord {
    user: UserId,
    expiry: Option<SystemTime>,
}

impl TokenRecord {
    fn is_live(&self, now: SystemTime) -> bool {
        self.expiry.map_or(true, |expiry| expiry > now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    users: HashMap<UserId, User>,
    tokens: HashMap<(TokenScope, String), TokenRecord>,
    permissions: HashMap<UserId, Permissions>,
}

/// A thread-safe store holding users, tokens and grants in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store seeded with configured users and their tokens.
    pub fn from_fixtures(fixtures: &[FixtureUser]) -> Self {
        let store = Self::new();
        for fixture in fixtures {
            let user = store.insert_user(&fixture.name, &fixture.email, fixture.activated);
            store.insert_token(TokenScope::Authentication, &fixture.token, user.id, None);
            store.grant(user.id, fixture.permissions.iter().cloned());
        }
        tracing::info!(users = fixtures.len(), "Seeded in-memory store");
        store
    }

    /// Insert a new user and return it with its assigned id.
    pub fn insert_user(&self, name: &str, email: &str, activated: bool) -> User {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let user = User {
            id: UserId(inner.next_id),
            name: name.to_string(),
            email: email.to_string(),
            activated,
        };
        inner.users.insert(user.id, user.clone());
        user
    }

    /// Register an existing plaintext as a token for `user`.
    pub fn insert_token(
        &self,
        scope: TokenScope,
        plaintext: &str,
        user: UserId,
        expiry: Option<SystemTime>,
    ) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner
            .tokens
            .insert((scope, plaintext.to_string()), TokenRecord { user, expiry });
    }

    /// Issue a fresh token for `user`, valid for `ttl`.
    pub fn issue_token(&self, user: UserId, scope: TokenScope, ttl: Duration) -> String {
        let plaintext = credential::generate();
        self.insert_token(scope, &plaintext, user, Some(SystemTime::now() + ttl));
        plaintext
    }

    /// Grant permission codes to `user`.
    pub fn grant<I, S>(&self, user: UserId, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let granted = inner.permissions.entry(user).or_default();
        for code in codes {
            granted.add(code.into());
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_token(&self, scope: TokenScope, plaintext: &str) -> Result<User, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let record = inner
            .tokens
            .get(&(scope, plaintext.to_string()))
            .filter(|record| record.is_live(SystemTime::now()))
            .ok_or(StoreError::NotFound)?;

        inner
            .users
            .get(&record.user)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn permissions_for(&self, user: UserId) -> Result<Permissions, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.permissions.get(&user).cloned().unwrap_or_default())
    }
}
