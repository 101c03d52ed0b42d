//!
//! # Authorization Rules
//!
//! Pure decision functions over already-loaded membership data. No data access
//! happens here, which keeps the permission logic unit-testable on its own;
//! the services load memberships and call these before mutating anything.
//! A failed check is signalled by the caller as `AppError::Authorization`,
//! distinct from `Authentication` (not logged in vs. logged in but forbidden).

use uuid::Uuid;

use crate::models::project::{MemberDetail, ProjectMember};
use crate::models::task::Task;
use crate::models::user::UserRole;

/// Anything that looks like a membership row: both the slim `ProjectMember`
/// and the user-enriched `MemberDetail` satisfy it.
pub trait Membership {
    fn user_id(&self) -> Uuid;
    fn role(&self) -> UserRole;
}

impl Membership for ProjectMember {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
    fn role(&self) -> UserRole {
        self.role
    }
}

impl Membership for MemberDetail {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
    fn role(&self) -> UserRole {
        self.role
    }
}

pub fn find_membership<M: Membership>(members: &[M], user_id: Uuid) -> Option<&M> {
    members.iter().find(|m| m.user_id() == user_id)
}

pub fn is_member<M: Membership>(members: &[M], user_id: Uuid) -> bool {
    find_membership(members, user_id).is_some()
}

/// True iff the user's membership role in the project is ADMIN.
pub fn is_project_admin<M: Membership>(members: &[M], user_id: Uuid) -> bool {
    find_membership(members, user_id).map_or(false, can_mutate_project)
}

pub fn admin_count<M: Membership>(members: &[M]) -> usize {
    members
        .iter()
        .filter(|m| m.role() == UserRole::Admin)
        .count()
}

/// Only ADMIN may mutate project, membership, or task-creation state.
/// MANAGER carries no elevated rights over USER in this model.
pub fn can_mutate_project<M: Membership>(membership: &M) -> bool {
    membership.role() == UserRole::Admin
}

/// Admins see every task; everyone else only tasks assigned to them.
pub fn can_view_task<M: Membership>(task: &Task, membership: &M) -> bool {
    membership.role() == UserRole::Admin || task.assigned_to == Some(membership.user_id())
}

/// Deletion is allowed to the original creator or a project admin.
pub fn can_delete_task<M: Membership>(task: &Task, user_id: Uuid, membership: &M) -> bool {
    task.created_by == user_id || membership.role() == UserRole::Admin
}
