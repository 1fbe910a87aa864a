//! Acting-user identity and role, as supplied by the out-of-scope auth layer.

use super::UserId;
use serde::{Deserialize, Serialize};

/// Role of a user within the project that owns the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Ordinary project member: may create, claim, and work on tasks.
    Member,
    /// Project administrator: additionally manages cards and milestones.
    Admin,
}

/// Authenticated user identity plus project role.
///
/// The core never authenticates; it trusts the identity handed in by the
/// excluded web layer and only enforces role and ownership guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user_id: UserId,
    role: Role,
}

impl Actor {
    /// Creates an actor from an authenticated identity and role.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Returns the acting user's identifier.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the acting user's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns `true` when the actor holds the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}
