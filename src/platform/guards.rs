//! Small predicates each handler calls explicitly. There is no central policy:
//! every operation states its own role and ownership requirement.

use crate::{
    domain::roles::Role,
    platform::{app_error::AppError, auth::AuthUser},
};

pub const PRIVILEGED: [Role; 2] = [Role::Admin, Role::Owner];

pub fn has_role(actor: &AuthUser, allowed: &[Role]) -> bool {
    allowed.contains(&actor.role)
}

pub fn is_privileged(actor: &AuthUser) -> bool {
    has_role(actor, &PRIVILEGED)
}

pub fn is_owner(owner_id: i32, actor: &AuthUser) -> bool {
    actor.id == Some(owner_id)
}

pub fn require_role(actor: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if has_role(actor, allowed) {
        Ok(())
    } else {
        Err(AppError::ForbiddenResource(
            "You do not have permission to perform this action".into(),
        ))
    }
}

pub fn require_privileged(actor: &AuthUser) -> Result<(), AppError> {
    if is_privileged(actor) {
        Ok(())
    } else {
        Err(AppError::ForbiddenResource("Admin or owner access required".into()))
    }
}

pub fn require_owner(owner_id: i32, actor: &AuthUser) -> Result<(), AppError> {
    if is_owner(owner_id, actor) {
        Ok(())
    } else {
        Err(AppError::ForbiddenResource(
            "You can only modify your own records".into(),
        ))
    }
}

pub fn require_owner_or_privileged(owner_id: i32, actor: &AuthUser) -> Result<(), AppError> {
    if is_owner(owner_id, actor) || is_privileged(actor) {
        Ok(())
    } else {
        Err(AppError::ForbiddenResource("Access denied".into()))
    }
}

/// The persisted identity id, which the built-in accounts do not have.
pub fn require_identity(actor: &AuthUser) -> Result<i32, AppError> {
    actor.id.ok_or_else(|| {
        AppError::ForbiddenResource("This action requires a registered account".into())
    })
}
