/// Authorization predicates
///
/// Every check here is a pure function of the resource and the requester's
/// [`AuthContext`], so the rules can be tested without a database. The
/// `require_*` helpers turn a `false` into an [`AuthzError`] for handlers.
///
/// # Task rules
///
/// | Requester            | view | edit | delete |
/// |----------------------|------|------|--------|
/// | admin                | yes  | yes  | yes    |
/// | creator              | yes  | yes  | yes    |
/// | assignee             | yes  | yes  | no     |
/// | anyone else          | yes  | no   | no     |
///
/// # Example
///
/// ```no_run
/// use teamtask_shared::auth::authorization::{require_task_edit, task_permissions};
/// use teamtask_shared::auth::middleware::AuthContext;
/// use teamtask_shared::models::task::Task;
///
/// fn check(task: &Task, auth: &AuthContext) -> bool {
///     let perms = task_permissions(task, auth);
///     perms.can_edit && require_task_edit(task, auth).is_ok()
/// }
/// ```

use serde::Serialize;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::project::Project;
use crate::models::task::Task;
use crate::models::time_entry::TimeEntry;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Requester may not perform the action on the resource
    #[error("{0}")]
    NotAuthorized(String),

    #[error("Admin access required")]
    AdminRequired,
}

/// What the requester may do with one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskPermissions {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

/// Computes the requester's permissions on a task
pub fn task_permissions(task: &Task, auth: &AuthContext) -> TaskPermissions {
    permissions_for(task.created_by, task.assigned_to, auth)
}

/// The permission rule itself, on just the ownership fields
pub fn permissions_for(
    created_by: Uuid,
    assigned_to: Option<Uuid>,
    auth: &AuthContext,
) -> TaskPermissions {
    let is_creator = created_by == auth.user_id;
    let is_assignee = assigned_to == Some(auth.user_id);

    TaskPermissions {
        can_view: true,
        can_edit: auth.is_admin() || is_creator || is_assignee,
        can_delete: auth.is_admin() || is_creator,
    }
}

pub fn require_task_edit(task: &Task, auth: &AuthContext) -> Result<(), AuthzError> {
    if !task_permissions(task, auth).can_edit {
        return Err(AuthzError::NotAuthorized(
            "You can only edit tasks you created or are assigned to".to_string(),
        ));
    }
    Ok(())
}

pub fn require_task_delete(task: &Task, auth: &AuthContext) -> Result<(), AuthzError> {
    if !task_permissions(task, auth).can_delete {
        return Err(AuthzError::NotAuthorized(
            "Only the task creator or an admin can delete this task".to_string(),
        ));
    }
    Ok(())
}

/// Whether the requester may set a task's assignee to `assignee`
///
/// Admins assign to anyone. A regular user can assign to themselves or
/// leave the task unassigned.
pub fn can_assign(auth: &AuthContext, assignee: Option<Uuid>) -> bool {
    auth.is_admin() || assignee.map_or(true, |id| id == auth.user_id)
}

pub fn require_assign(auth: &AuthContext, assignee: Option<Uuid>) -> Result<(), AuthzError> {
    if !can_assign(auth, assignee) {
        return Err(AuthzError::NotAuthorized(
            "Only admins can assign tasks to other users".to_string(),
        ));
    }
    Ok(())
}

/// Admin or project owner
pub fn can_manage_project(project: &Project, auth: &AuthContext) -> bool {
    auth.is_admin() || project.owner == auth.user_id
}

pub fn require_project_manage(project: &Project, auth: &AuthContext) -> Result<(), AuthzError> {
    if !can_manage_project(project, auth) {
        return Err(AuthzError::NotAuthorized(
            "Only the project owner or an admin can modify this project".to_string(),
        ));
    }
    Ok(())
}

/// Only the user who logged an entry may change it
pub fn can_modify_time_entry(entry: &TimeEntry, auth: &AuthContext) -> bool {
    entry.user_id == auth.user_id
}

pub fn require_time_entry_owner(entry: &TimeEntry, auth: &AuthContext) -> Result<(), AuthzError> {
    if !can_modify_time_entry(entry, auth) {
        return Err(AuthzError::NotAuthorized(
            "You can only modify your own time entries".to_string(),
        ));
    }
    Ok(())
}

pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if !auth.is_admin() {
        return Err(AuthzError::AdminRequired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::ProjectStatus;
    use crate::models::user::UserRole;
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;

    fn user(id: Uuid) -> AuthContext {
        AuthContext::new(id, UserRole::User)
    }

    fn admin(id: Uuid) -> AuthContext {
        AuthContext::new(id, UserRole::Admin)
    }

    #[test]
    fn test_creator_has_full_access() {
        let creator = Uuid::new_v4();
        let perms = permissions_for(creator, None, &user(creator));

        assert_eq!(
            perms,
            TaskPermissions { can_view: true, can_edit: true, can_delete: true }
        );
    }

    #[test]
    fn test_assignee_can_edit_but_not_delete() {
        let assignee = Uuid::new_v4();
        let perms = permissions_for(Uuid::new_v4(), Some(assignee), &user(assignee));

        assert!(perms.can_view);
        assert!(perms.can_edit);
        assert!(!perms.can_delete);
    }

    #[test]
    fn test_bystander_can_only_view() {
        let perms = permissions_for(Uuid::new_v4(), Some(Uuid::new_v4()), &user(Uuid::new_v4()));

        assert!(perms.can_view);
        assert!(!perms.can_edit);
        assert!(!perms.can_delete);
    }

    #[test]
    fn test_admin_has_full_access() {
        let perms = permissions_for(Uuid::new_v4(), None, &admin(Uuid::new_v4()));

        assert!(perms.can_edit);
        assert!(perms.can_delete);
    }

    #[test]
    fn test_can_assign() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(can_assign(&user(me), None));
        assert!(can_assign(&user(me), Some(me)));
        assert!(!can_assign(&user(me), Some(other)));
        assert!(can_assign(&admin(me), Some(other)));
        assert!(require_assign(&user(me), Some(other)).is_err());
    }

    #[test]
    fn test_project_management() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let project = Project {
            id: Uuid::new_v4(),
            name: "Launch".to_string(),
            description: None,
            status: ProjectStatus::Active,
            owner,
            team_members: vec![member],
            progress: 0,
            task_count: 0,
            deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(can_manage_project(&project, &user(owner)));
        assert!(!can_manage_project(&project, &user(member)));
        assert!(can_manage_project(&project, &admin(Uuid::new_v4())));
    }

    #[test]
    fn test_time_entry_owner_only() {
        let owner = Uuid::new_v4();
        let entry = TimeEntry {
            id: Uuid::new_v4(),
            user_id: owner,
            task_id: Uuid::new_v4(),
            hours: 2.5,
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(require_time_entry_owner(&entry, &user(owner)).is_ok());
        assert!(require_time_entry_owner(&entry, &admin(Uuid::new_v4())).is_err());
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&admin(Uuid::new_v4())).is_ok());
        assert!(matches!(
            require_admin(&user(Uuid::new_v4())),
            Err(AuthzError::AdminRequired)
        ));
    }

    proptest! {
        #[test]
        fn prop_edit_iff_admin_creator_or_assignee(
            is_admin in any::<bool>(),
            is_creator in any::<bool>(),
            assignment in 0u8..3,
        ) {
            let me = Uuid::new_v4();
            let someone = Uuid::new_v4();

            let created_by = if is_creator { me } else { someone };
            // 0: unassigned, 1: assigned to requester, 2: assigned to someone else
            let assigned_to = match assignment {
                0 => None,
                1 => Some(me),
                _ => Some(Uuid::new_v4()),
            };
            let auth = if is_admin { admin(me) } else { user(me) };

            let perms = permissions_for(created_by, assigned_to, &auth);

            prop_assert!(perms.can_view);
            prop_assert_eq!(perms.can_edit, is_admin || is_creator || assignment == 1);
            prop_assert_eq!(perms.can_delete, is_admin || is_creator);
            prop_assert!(!perms.can_delete || perms.can_edit);
        }
    }
}
