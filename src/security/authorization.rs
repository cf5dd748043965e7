//! Layered authorization checks.
//!
//! # Layers
//! ```text
//! Authenticated   principal is not anonymous
//!   └─ Activated  ... and the account is activated
//!        └─ Permission(code)  ... and the code is granted
//! ```
//!
//! Each requirement implies every layer above it, and layers are checked
//! top-down. An unactivated user never causes a permission lookup.

use std::fmt;

use crate::security::error::GateError;
use crate::security::principal::Principal;
use crate::store::PermissionStore;

/// Capability a route demands of its principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    Activated,
    Permission(String),
}

impl Requirement {
    pub fn permission(code: impl Into<String>) -> Self {
        Requirement::Permission(code.into())
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Authenticated => f.write_str("authenticated"),
            Requirement::Activated => f.write_str("activated"),
            Requirement::Permission(code) => write!(f, "permission({code})"),
        }
    }
}

/// Decide whether `principal` satisfies `requirement`.
pub async fn authorize(
    requirement: &Requirement,
    principal: &Principal,
    permissions: &dyn PermissionStore,
) -> Result<(), GateError> {
    let Some(user_id) = principal.id() else {
        return Err(GateError::AuthenticationRequired);
    };
    if *requirement == Requirement::Authenticated {
        return Ok(());
    }

    if !principal.is_activated() {
        return Err(GateError::AccountInactive);
    }
    let Requirement::Permission(code) = requirement else {
        return Ok(());
    };

    let granted = permissions
        .permissions_for(user_id)
        .await
        .map_err(|e| GateError::internal(format!("permission lookup failed: {e}")))?;
    tracing::debug!(user = %user_id, granted = granted.len(), required = %code, "Permissions fetched");

    if granted.includes(code) {
        Ok(())
    } else {
        Err(GateError::NotPermitted)
    }
}
