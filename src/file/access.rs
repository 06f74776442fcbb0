//! Read/write capability for folders.
//!
//! Capability is a pure function of the requester's role, whether they own
//! the folder, and whether the folder owner is in their department:
//!
//! | role              | read                      | write        |
//! |-------------------|---------------------------|--------------|
//! | Admin, Deanship   | everything                | everything   |
//! | Hod               | owner in own department   | own folders  |
//! | Professor         | owner in own department   | own folders  |

use serde::Serialize;

use super::folder::Folder;
use crate::db::{DbPool, Role, UserRepository};
use crate::Result;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
    pub department_id: Option<i64>,
}

impl Principal {
    pub fn new(user_id: i64, role: Role, department_id: Option<i64>) -> Self {
        Self {
            user_id,
            role,
            department_id,
        }
    }
}

/// Independent read and write permissions for one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capability {
    pub read: bool,
    pub write: bool,
}

impl Capability {
    pub const NONE: Capability = Capability {
        read: false,
        write: false,
    };
    pub const FULL: Capability = Capability {
        read: true,
        write: true,
    };
}

/// Resolve capability from role, ownership and department match.
pub fn capability(role: Role, is_owner: bool, same_department: bool) -> Capability {
    match role {
        Role::Admin | Role::Deanship => Capability::FULL,
        Role::Hod | Role::Professor => Capability {
            read: is_owner || same_department,
            write: is_owner,
        },
    }
}

/// Capability of `principal` on a folder owned by `owner_id`, whose
/// department is `owner_department`.
///
/// Unowned folders are visible to global roles only. A missing department
/// on either side never matches.
pub fn capability_for(
    principal: &Principal,
    owner_id: Option<i64>,
    owner_department: Option<i64>,
) -> Capability {
    let is_owner = owner_id == Some(principal.user_id);
    let same_department = owner_id.is_some()
        && matches!((principal.department_id, owner_department), (Some(a), Some(b)) if a == b);
    capability(principal.role, is_owner, same_department)
}

/// Capability on a stored folder, loading the owner's department.
pub async fn folder_capability(
    pool: &DbPool,
    principal: &Principal,
    folder: &Folder,
) -> Result<Capability> {
    if principal.role.is_global() {
        return Ok(Capability::FULL);
    }
    let owner_department = match folder.owner_id {
        Some(owner_id) => UserRepository::new(pool)
            .get_by_id(owner_id)
            .await?
            .and_then(|owner| owner.department_id),
        None => None,
    };
    Ok(capability_for(principal, folder.owner_id, owner_department))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPT: i64 = 1;
    const OTHER_DEPT: i64 = 2;
    const OWNER: i64 = 10;

    fn cap(principal: Principal) -> Capability {
        capability_for(&principal, Some(OWNER), Some(DEPT))
    }

    #[test]
    fn test_owner_has_read_and_write() {
        assert_eq!(cap(Principal::new(OWNER, Role::Professor, Some(DEPT))), Capability::FULL);
    }

    #[test]
    fn test_peer_professor_reads_but_cannot_write() {
        let c = cap(Principal::new(11, Role::Professor, Some(DEPT)));
        assert!(c.read);
        assert!(!c.write);
    }

    #[test]
    fn test_professor_in_other_department_sees_nothing() {
        assert_eq!(
            cap(Principal::new(12, Role::Professor, Some(OTHER_DEPT))),
            Capability::NONE
        );
    }

    #[test]
    fn test_hod_reads_department_but_cannot_write() {
        let c = cap(Principal::new(20, Role::Hod, Some(DEPT)));
        assert!(c.read);
        assert!(!c.write);
        assert_eq!(cap(Principal::new(21, Role::Hod, Some(OTHER_DEPT))), Capability::NONE);
    }

    #[test]
    fn test_global_roles_have_everything() {
        assert_eq!(cap(Principal::new(30, Role::Deanship, None)), Capability::FULL);
        assert_eq!(cap(Principal::new(31, Role::Admin, None)), Capability::FULL);
    }

    #[test]
    fn test_missing_departments_never_match() {
        let p = Principal::new(11, Role::Professor, None);
        assert_eq!(capability_for(&p, Some(OWNER), None), Capability::NONE);
    }

    #[test]
    fn test_unowned_folder_only_global() {
        let p = Principal::new(11, Role::Professor, Some(DEPT));
        assert_eq!(capability_for(&p, None, Some(DEPT)), Capability::NONE);
        let d = Principal::new(30, Role::Deanship, None);
        assert_eq!(capability_for(&d, None, None), Capability::FULL);
    }

    #[test]
    fn test_capability_table() {
        for (role, owner, dept, read, write) in [
            (Role::Professor, true, true, true, true),
            (Role::Professor, false, true, true, false),
            (Role::Professor, false, false, false, false),
            (Role::Hod, true, false, true, true),
            (Role::Hod, false, true, true, false),
            (Role::Deanship, false, false, true, true),
        ] {
            assert_eq!(capability(role, owner, dept), Capability { read, write });
        }
    }
}
