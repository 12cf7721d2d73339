//! Principal -> Role 할당 저장소 (Assignment Store)
//!
//! principal은 외부에서 주어지는 불투명한 키로만 다룬다.
//! 권한 확인은 실패 시 항상 거부(fail closed)하며 에러를 내지 않는다.

use super::role::RoleRegistry;
use crate::{EntityKind, Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Principal별 역할 할당
#[derive(Debug, Clone, Default)]
pub struct AssignmentStore {
    /// principal id -> 역할 이름들 (할당 순서)
    assignments: BTreeMap<String, Vec<String>>,
}

impl AssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 할당 가능 여부 검사
    pub fn check_assign(&self, role: &str, roles: &RoleRegistry) -> Result<()> {
        if !roles.exists(role) {
            return Err(Error::not_found(EntityKind::Role, role));
        }
        Ok(())
    }

    /// 역할 할당 (멱등)
    ///
    /// 새로 추가되었으면 `true`, 이미 가지고 있었으면 `false`.
    pub fn assign_role(&mut self, principal: &str, role: &str, roles: &RoleRegistry) -> Result<bool> {
        self.check_assign(role, roles)?;

        let held = self.assignments.entry(principal.to_string()).or_default();
        if held.iter().any(|r| r == role) {
            return Ok(false);
        }
        held.push(role.to_string());
        Ok(true)
    }

    /// 역할 회수 (없으면 아무 일도 하지 않음)
    pub fn revoke_role(&mut self, principal: &str, role: &str) -> bool {
        let Some(held) = self.assignments.get_mut(principal) else {
            return false;
        };

        let before = held.len();
        held.retain(|r| r != role);
        let changed = held.len() != before;

        if held.is_empty() {
            self.assignments.remove(principal);
        }
        changed
    }

    /// principal이 가진 역할 이름들 (모르는 principal이면 빈 목록)
    pub fn roles_of(&self, principal: &str) -> &[String] {
        self.assignments
            .get(principal)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 역할을 통해 권한을 가지고 있는지 확인
    pub fn is_authorized(&self, principal: &str, permission: &str, roles: &RoleRegistry) -> bool {
        self.roles_of(principal)
            .iter()
            .any(|role| roles.has_permission(role, permission).unwrap_or(false))
    }

    /// principal의 모든 유효 권한 (역할 합집합)
    pub fn permissions_of(&self, principal: &str, roles: &RoleRegistry) -> BTreeSet<String> {
        self.roles_of(principal)
            .iter()
            .filter_map(|role| roles.get(role))
            .flat_map(|role| role.permissions.iter().cloned())
            .collect()
    }

    /// 특정 역할을 가진 principal들 (id 순)
    pub fn principals_with(&self, role: &str) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|(_, held)| held.iter().any(|r| r == role))
            .map(|(principal, _)| principal.as_str())
            .collect()
    }

    /// 삭제된 역할을 모든 principal에서 제거
    pub fn forget_role(&mut self, role: &str) {
        for held in self.assignments.values_mut() {
            held.retain(|r| r != role);
        }
        self.assignments.retain(|_, held| !held.is_empty());
    }

    /// 역할 이름 변경을 참조에 반영
    pub fn rename_role(&mut self, old: &str, new: &str) {
        for held in self.assignments.values_mut() {
            for role in held.iter_mut().filter(|r| r.as_str() == old) {
                *role = new.to_string();
            }
        }
    }

    /// 할당이 하나라도 있는 principal들
    pub fn principals(&self) -> impl Iterator<Item = &str> {
        self.assignments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::PermissionRegistry;

    fn fixture() -> (PermissionRegistry, RoleRegistry) {
        let mut catalog = PermissionRegistry::new();
        for name in ["user.view", "user.create", "role.delete"] {
            catalog.create(name).unwrap();
        }

        let mut roles = RoleRegistry::new();
        roles.create("Admin").unwrap();
        roles.create("HRD").unwrap();
        roles.grant_all("Admin", &catalog).unwrap();
        roles
            .sync_permissions("HRD", ["user.view", "user.create"], &catalog)
            .unwrap();

        (catalog, roles)
    }

    #[test]
    fn test_assign_is_idempotent() {
        let (_, roles) = fixture();
        let mut store = AssignmentStore::new();

        assert!(store.assign_role("u-1", "HRD", &roles).unwrap());
        assert!(!store.assign_role("u-1", "HRD", &roles).unwrap());
        assert_eq!(store.roles_of("u-1"), ["HRD".to_string()]);
    }

    #[test]
    fn test_assign_unknown_role() {
        let (_, roles) = fixture();
        let mut store = AssignmentStore::new();

        let err = store.assign_role("u-1", "Auditor", &roles).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: EntityKind::Role, .. }));
        assert!(store.roles_of("u-1").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_is_authorized_through_roles() {
        let (_, roles) = fixture();
        let mut store = AssignmentStore::new();
        store.assign_role("admin", "Admin", &roles).unwrap();
        store.assign_role("hrd", "HRD", &roles).unwrap();

        assert!(store.is_authorized("admin", "role.delete", &roles));
        assert!(!store.is_authorized("hrd", "role.delete", &roles));
        assert!(store.is_authorized("hrd", "user.view", &roles));
    }

    #[test]
    fn test_fails_closed_on_unknown_input() {
        let (_, roles) = fixture();
        let store = AssignmentStore::new();

        assert!(!store.is_authorized("nonexistent-user", "user.view", &roles));
        assert!(!store.is_authorized("admin", "no.such.permission", &roles));
        assert!(store.roles_of("nonexistent-user").is_empty());
    }

    #[test]
    fn test_permissions_of_unions_roles() {
        let (_, roles) = fixture();
        let mut store = AssignmentStore::new();
        store.assign_role("u-1", "HRD", &roles).unwrap();
        store.assign_role("u-1", "Admin", &roles).unwrap();

        let perms = store.permissions_of("u-1", &roles);
        assert_eq!(perms.len(), 3);
        assert!(perms.contains("role.delete"));
    }

    #[test]
    fn test_revoke_and_forget() {
        let (_, roles) = fixture();
        let mut store = AssignmentStore::new();
        store.assign_role("a", "HRD", &roles).unwrap();
        store.assign_role("b", "HRD", &roles).unwrap();
        store.assign_role("b", "Admin", &roles).unwrap();

        assert_eq!(store.principals_with("HRD"), vec!["a", "b"]);

        assert!(store.revoke_role("a", "HRD"));
        assert!(!store.revoke_role("a", "HRD"));
        assert_eq!(store.len(), 1);

        store.rename_role("Admin", "Root");
        assert_eq!(store.roles_of("b"), ["HRD".to_string(), "Root".to_string()]);

        store.forget_role("HRD");
        assert_eq!(store.roles_of("b"), ["Root".to_string()]);
    }
}
