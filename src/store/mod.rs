//! Collaborator interfaces for identity lookups.
//!
//! # Responsibilities
//! - Resolve a token plaintext to its user (user store)
//! - List the permission codes granted to a user (permission store)
//!
//! # Design Decisions
//! - Persistence lives behind these traits; the gatekeeper only reads
//! - `NotFound` is distinguished from every other failure so the resolver
//!   can fold it into a credential rejection
//! - Permissions are fetched per check, never cached on the principal

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::security::principal::{TokenScope, User, UserId};

pub use memory::MemoryStore;

/// Errors returned by store collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record matched the lookup.
    #[error("record not found")]
    NotFound,

    /// The backing store failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Permission codes granted to a user, e.g. `"permissions:read"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(Vec<String>);

impl Permissions {
    pub fn includes(&self, code: &str) -> bool {
        self.0.iter().any(|granted| granted == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn add(&mut self, code: String) {
        if !self.includes(&code) {
            self.0.push(code);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for Permissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut permissions = Permissions::default();
        for code in iter {
            permissions.add(code.into());
        }
        permissions
    }
}

/// Looks up users by credential.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the user owning an unexpired token of the given scope.
    async fn find_by_token(&self, scope: TokenScope, plaintext: &str) -> Result<User, StoreError>;
}

/// Looks up the permission codes of a user.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn permissions_for(&self, user: UserId) -> Result<Permissions, StoreError>;
}
