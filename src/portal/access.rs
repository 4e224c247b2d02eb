//! Role and ownership checks

use crate::db::entities::status::Role;
use crate::db::entities::user;
use crate::error::{Result, ServerError};

pub fn is_admin(user: &user::Model) -> bool {
    user.role == Role::Admin
}

/// Fail with `Forbidden` unless the user holds exactly `role`
pub fn require_role(user: &user::Model, role: Role) -> Result<&user::Model> {
    if user.role == role {
        Ok(user)
    } else {
        Err(ServerError::Forbidden)
    }
}

/// Fail with `Forbidden` unless the user owns the resource or is an admin
pub fn ensure_owner_or_admin(user: &user::Model, owner_id: i32) -> Result<()> {
    if user.id == owner_id || is_admin(user) {
        Ok(())
    } else {
        Err(ServerError::Forbidden)
    }
}
