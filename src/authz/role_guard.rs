use crate::authz::decision::AuthzError;
use crate::types::Role;

/// Fixed set of roles allowed through a route. Built once at router
/// construction with [`restrict_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGuard {
    mask: u8,
}

const fn bit(role: Role) -> u8 {
    match role {
        Role::Student => 1 << 0,
        Role::Staff => 1 << 1,
        Role::Admin => 1 << 2,
        Role::BoardAdmin => 1 << 3,
        Role::Superadmin => 1 << 4,
    }
}

pub const fn restrict_to(roles: &[Role]) -> RoleGuard {
    let mut mask = 0;
    let mut i = 0;
    while i < roles.len() {
        mask |= bit(roles[i]);
        i += 1;
    }
    RoleGuard { mask }
}

impl RoleGuard {
    pub const ANY: RoleGuard = restrict_to(&Role::ALL);

    pub fn allows(&self, role: Role) -> bool {
        self.mask & bit(role) != 0
    }

    pub fn check(&self, role: Role) -> Result<(), AuthzError> {
        if self.allows(role) {
            Ok(())
        } else {
            Err(AuthzError::RoleNotPermitted { role })
        }
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|role| self.allows(*role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMINS: RoleGuard = restrict_to(&[Role::Admin, Role::Superadmin]);

    #[test]
    fn admin_guard_rejects_staff_and_accepts_admin() {
        assert_eq!(ADMINS.check(Role::Staff), Err(AuthzError::RoleNotPermitted { role: Role::Staff }));
        assert!(ADMINS.check(Role::Admin).is_ok());
        assert!(ADMINS.check(Role::Superadmin).is_ok());
    }

    #[test]
    fn empty_guard_allows_nobody() {
        let guard = restrict_to(&[]);
        assert!(Role::ALL.iter().all(|r| !guard.allows(*r)));
    }

    #[test]
    fn any_allows_everyone() {
        assert_eq!(RoleGuard::ANY.roles().count(), Role::ALL.len());
    }

    #[test]
    fn duplicates_are_harmless() {
        let guard = restrict_to(&[Role::Staff, Role::Staff]);
        assert_eq!(guard.roles().collect::<Vec<_>>(), vec![Role::Staff]);
    }
}
