use std::collections::HashSet;

use thiserror::Error;

use super::caller::CallerContext;
use crate::database::models::{OrgType, Organization, Role};
use crate::database::StoreError;
use crate::types::Operation;

/// Why the evaluator refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The caller's role is not sufficient for the operation
    RoleRequired,
    /// The target lies outside the organizations the caller may manage
    OrganizationScope,
    /// A platform or general organization deleting itself
    SelfDelete,
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Access denied: {0:?}")]
    Denied(Denial),
    #[error("Profile not found")]
    ProfileNotFound,
    #[error("User must belong to an organization")]
    NoOrganization,
    #[error("Could not verify organization")]
    OwnOrganizationMissing,
    #[error("Organization not found: {0}")]
    TargetNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Decide whether a user caller may perform `op` on `target`.
///
/// `creator_emails` is the set of emails of admin or site-creator profiles in the
/// caller's own organization. It is only consulted when a platform or general admin
/// targets another organization.
pub fn evaluate(
    caller: &CallerContext,
    target: &Organization,
    creator_emails: &HashSet<String>,
    op: Operation,
) -> Result<(), Denial> {
    let own_target = target.id == caller.own_org_id;

    if caller.own_org_type.manages_others() {
        if caller.profile.role != Role::Admin {
            return Err(Denial::RoleRequired);
        }
        if own_target {
            return match op {
                Operation::Delete => Err(Denial::SelfDelete),
                Operation::Read | Operation::Write => Ok(()),
            };
        }
        return match &target.created_by_email {
            Some(email) if creator_emails.contains(email) => Ok(()),
            _ => Err(Denial::OrganizationScope),
        };
    }

    // Child organizations only ever reach themselves
    if !own_target {
        return Err(Denial::OrganizationScope);
    }
    match op {
        Operation::Delete => Err(Denial::RoleRequired),
        Operation::Read | Operation::Write => match caller.profile.role {
            Role::Admin | Role::Member => Ok(()),
            Role::Other => Err(Denial::RoleRequired),
        },
    }
}

/// Whether [`evaluate`] will need the creator email set for this request
pub fn needs_creator_emails(caller: &CallerContext, target: &Organization) -> bool {
    caller.own_org_type != OrgType::Child && caller.profile.role == Role::Admin && target.id != caller.own_org_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Profile;

    const OWN: &str = "org-own";
    const OTHER: &str = "org-other";

    fn caller(org_type: OrgType, role: Role) -> CallerContext {
        CallerContext {
            profile: Profile {
                id: "p1".to_string(),
                role,
                organization_id: Some(OWN.to_string()),
                is_site_creator: false,
                email: Some("admin@own.test".to_string()),
            },
            own_org_type: org_type,
            own_org_id: OWN.to_string(),
        }
    }

    fn target(id: &str, creator: &str) -> Organization {
        Organization {
            id: id.to_string(),
            name: Some("Target".to_string()),
            org_type: OrgType::Child,
            created_by_email: Some(creator.to_string()),
        }
    }

    fn team() -> HashSet<String> {
        ["admin@own.test".to_string(), "creator@own.test".to_string()].into()
    }

    const ALL_OPS: [Operation; 3] = [Operation::Read, Operation::Write, Operation::Delete];

    #[test]
    fn managing_admin_on_own_org() {
        for org_type in [OrgType::Platform, OrgType::General] {
            let c = caller(org_type, Role::Admin);
            let own = target(OWN, "someone@else.test");
            assert_eq!(evaluate(&c, &own, &team(), Operation::Read), Ok(()));
            assert_eq!(evaluate(&c, &own, &team(), Operation::Write), Ok(()));
            assert_eq!(evaluate(&c, &own, &team(), Operation::Delete), Err(Denial::SelfDelete));
        }
    }

    #[test]
    fn managing_admin_on_team_created_org() {
        for org_type in [OrgType::Platform, OrgType::General] {
            let c = caller(org_type, Role::Admin);
            let other = target(OTHER, "creator@own.test");
            for op in ALL_OPS {
                assert_eq!(evaluate(&c, &other, &team(), op), Ok(()), "{:?} {:?}", org_type, op);
            }
        }
    }

    #[test]
    fn managing_admin_on_foreign_org() {
        let c = caller(OrgType::General, Role::Admin);
        let other = target(OTHER, "stranger@else.test");
        for op in ALL_OPS {
            assert_eq!(evaluate(&c, &other, &team(), op), Err(Denial::OrganizationScope));
        }

        let mut anonymous = target(OTHER, "x");
        anonymous.created_by_email = None;
        assert_eq!(evaluate(&c, &anonymous, &team(), Operation::Read), Err(Denial::OrganizationScope));
    }

    #[test]
    fn managing_non_admin_always_needs_role() {
        for role in [Role::Member, Role::Other] {
            let c = caller(OrgType::Platform, role);
            for t in [target(OWN, "x"), target(OTHER, "creator@own.test")] {
                for op in ALL_OPS {
                    assert_eq!(evaluate(&c, &t, &team(), op), Err(Denial::RoleRequired));
                }
            }
        }
    }

    #[test]
    fn child_caller_on_own_org() {
        let own = target(OWN, "x");
        for role in [Role::Admin, Role::Member] {
            let c = caller(OrgType::Child, role);
            assert_eq!(evaluate(&c, &own, &team(), Operation::Read), Ok(()));
            assert_eq!(evaluate(&c, &own, &team(), Operation::Write), Ok(()));
            assert_eq!(evaluate(&c, &own, &team(), Operation::Delete), Err(Denial::RoleRequired));
        }

        let c = caller(OrgType::Child, Role::Other);
        assert_eq!(evaluate(&c, &own, &team(), Operation::Write), Err(Denial::RoleRequired));
    }

    #[test]
    fn child_caller_never_reaches_other_orgs() {
        // Even when the target was created by someone on the caller's team
        let other = target(OTHER, "creator@own.test");
        for role in [Role::Admin, Role::Member, Role::Other] {
            let c = caller(OrgType::Child, role);
            for op in ALL_OPS {
                assert_eq!(evaluate(&c, &other, &team(), op), Err(Denial::OrganizationScope));
            }
        }
    }

    #[test]
    fn creator_emails_only_needed_for_cross_org_admins() {
        let other = target(OTHER, "x");
        assert!(needs_creator_emails(&caller(OrgType::General, Role::Admin), &other));
        assert!(!needs_creator_emails(&caller(OrgType::General, Role::Admin), &target(OWN, "x")));
        assert!(!needs_creator_emails(&caller(OrgType::General, Role::Member), &other));
        assert!(!needs_creator_emails(&caller(OrgType::Child, Role::Admin), &other));
    }
}
