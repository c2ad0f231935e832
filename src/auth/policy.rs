//! Role based access policy.
//!
//! Privilege comes from the `role` column of the user record, loaded fresh on
//! every authenticated request. Handlers ask for a [`Capability`] rather than
//! a role so the mapping lives in one place.

use super::AuthUser;
use crate::errors::ServiceError;
pub use crate::entities::Role;
use tracing::warn;

/// Privileged operations guarded by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    /// Create, update and delete meals
    ManageMeals,
    /// List users and toggle their activation
    ManageUsers,
}

/// Whether `role` grants `capability`.
pub fn allows(role: Role, capability: Capability) -> bool {
    match (role, capability) {
        (Role::Admin, _) => true,
        (Role::Customer, Capability::ManageMeals | Capability::ManageUsers) => false,
    }
}

impl AuthUser {
    /// Fails with `Forbidden` unless the caller's role grants `capability`.
    pub fn require(&self, capability: Capability) -> Result<(), ServiceError> {
        if allows(self.role, capability) {
            return Ok(());
        }
        warn!(
            user_id = self.user_id,
            capability = capability.as_ref(),
            "Capability denied"
        );
        Err(ServiceError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ))
    }
}
