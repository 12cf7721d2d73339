//! 역할 레지스트리 (Role Registry)
//!
//! 역할은 권한 이름의 집합을 가진다. 권한은 이름으로만 참조하며
//! 소유권은 PermissionRegistry에 있다.

use super::permission::PermissionRegistry;
use super::validate_name;
use crate::{EntityKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 역할
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// 역할 이름 (예: "Admin", "HRD")
    pub name: String,

    /// 부여된 권한 이름들 (카탈로그 등록 순서)
    pub permissions: Vec<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// 역할 레지스트리
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    /// 등록된 역할들 (등록 순서)
    roles: Vec<Role>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.roles
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| Error::not_found(EntityKind::Role, name))
    }

    /// 생성 가능 여부 검사 (이름 형식 + 중복)
    pub fn check_new(&self, name: &str) -> Result<()> {
        validate_name(EntityKind::Role, name)?;
        if self.exists(name) {
            return Err(Error::duplicate(EntityKind::Role, name));
        }
        Ok(())
    }

    /// 빈 권한 집합으로 역할 생성
    pub fn create(&mut self, name: &str) -> Result<&Role> {
        self.check_new(name)?;
        self.roles.push(Role::new(name));
        Ok(&self.roles[self.roles.len() - 1])
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 모든 역할 (등록 순서)
    pub fn all(&self) -> &[Role] {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// sync 대상 권한 목록 검증
    ///
    /// 역할이 없으면 `NotFound(role)`, 등록되지 않은 권한이 하나라도 있으면
    /// 첫 번째 것에 대해 `NotFound(permission)`. 성공 시 중복을 제거하고
    /// 카탈로그 순서로 정렬한 목록을 돌려준다. 아무것도 변경하지 않는다.
    pub fn resolve_sync<I>(
        &self,
        role: &str,
        names: I,
        catalog: &PermissionRegistry,
    ) -> Result<Vec<String>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.position(role)?;

        let mut requested = HashSet::new();
        for name in names {
            let name = name.as_ref();
            if !catalog.exists(name) {
                return Err(Error::not_found(EntityKind::Permission, name));
            }
            requested.insert(name.to_string());
        }

        let mut granted: Vec<String> = requested.into_iter().collect();
        granted.sort_by_key(|name| catalog.position(name));
        Ok(granted)
    }

    /// 역할의 권한 집합을 주어진 목록으로 통째로 교체
    ///
    /// 검증이 모두 끝난 뒤에만 적용되므로 실패 시 기존 집합은 그대로 남는다.
    pub fn sync_permissions<I>(
        &mut self,
        role: &str,
        names: I,
        catalog: &PermissionRegistry,
    ) -> Result<&Role>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let granted = self.resolve_sync(role, names, catalog)?;
        let position = self.position(role)?;

        let entry = &mut self.roles[position];
        entry.permissions = granted;
        Ok(entry)
    }

    /// 현재 카탈로그의 모든 권한 부여 (호출 시점 기준)
    pub fn grant_all(&mut self, role: &str, catalog: &PermissionRegistry) -> Result<&Role> {
        let all: Vec<String> = catalog.names().map(str::to_string).collect();
        self.sync_permissions(role, all, catalog)
    }

    /// 역할이 권한을 가지고 있는지 확인
    ///
    /// 역할이 없으면 에러, 권한이 없을 뿐이면 `Ok(false)`.
    pub fn has_permission(&self, role: &str, permission: &str) -> Result<bool> {
        let position = self.position(role)?;
        Ok(self.roles[position].has_permission(permission))
    }

    /// 역할 삭제
    pub fn remove(&mut self, name: &str) -> Result<Role> {
        let position = self.position(name)?;
        Ok(self.roles.remove(position))
    }

    /// 이름 변경 가능 여부 검사
    pub fn check_rename(&self, old: &str, new: &str) -> Result<()> {
        self.position(old)?;
        if old != new {
            self.check_new(new)?;
        }
        Ok(())
    }

    /// 역할 이름 변경 (권한 집합 유지)
    pub fn rename(&mut self, old: &str, new: &str) -> Result<&Role> {
        self.check_rename(old, new)?;
        let position = self.position(old)?;

        let entry = &mut self.roles[position];
        entry.name = new.to_string();
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PermissionRegistry {
        let mut catalog = PermissionRegistry::new();
        for name in ["user.view", "user.create", "user.edit", "user.delete"] {
            catalog.create(name).unwrap();
        }
        catalog
    }

    #[test]
    fn test_create_role() {
        let mut roles = RoleRegistry::new();

        let role = roles.create("Admin").unwrap();
        assert!(role.permissions.is_empty());
        assert!(roles.create("Admin").unwrap_err().is_duplicate());
        assert_eq!(roles.len(), 1);
    }

    #[test]
    fn test_sync_replaces_and_orders() {
        let catalog = catalog();
        let mut roles = RoleRegistry::new();
        roles.create("HRD").unwrap();

        roles
            .sync_permissions("HRD", ["user.edit", "user.view", "user.view"], &catalog)
            .unwrap();
        assert_eq!(
            roles.get("HRD").unwrap().permissions,
            vec!["user.view", "user.edit"]
        );

        roles
            .sync_permissions("HRD", ["user.delete"], &catalog)
            .unwrap();
        assert!(roles.has_permission("HRD", "user.delete").unwrap());
        assert!(!roles.has_permission("HRD", "user.view").unwrap());
    }

    #[test]
    fn test_sync_is_atomic() {
        let catalog = catalog();
        let mut roles = RoleRegistry::new();
        roles.create("HRD").unwrap();
        roles.sync_permissions("HRD", ["user.view"], &catalog).unwrap();

        let err = roles
            .sync_permissions("HRD", ["user.edit", "role.delete"], &catalog)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound { kind: EntityKind::Permission, ref name } if name == "role.delete"
        ));
        assert_eq!(roles.get("HRD").unwrap().permissions, vec!["user.view"]);
    }

    #[test]
    fn test_sync_unknown_role() {
        let catalog = catalog();
        let mut roles = RoleRegistry::new();

        let err = roles
            .sync_permissions("Ghost", ["user.view"], &catalog)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: EntityKind::Role, .. }));
        assert!(roles.has_permission("Ghost", "user.view").is_err());
    }

    #[test]
    fn test_grant_all_is_a_snapshot() {
        let mut catalog = catalog();
        let mut roles = RoleRegistry::new();
        roles.create("Admin").unwrap();

        roles.grant_all("Admin", &catalog).unwrap();
        assert_eq!(roles.get("Admin").unwrap().permissions.len(), 4);

        catalog.create("role.view").unwrap();
        assert!(!roles.has_permission("Admin", "role.view").unwrap());

        roles.grant_all("Admin", &catalog).unwrap();
        assert!(roles.has_permission("Admin", "role.view").unwrap());
    }

    #[test]
    fn test_rename_and_remove() {
        let catalog = catalog();
        let mut roles = RoleRegistry::new();
        roles.create("Staff").unwrap();
        roles.create("User").unwrap();
        roles.sync_permissions("Staff", ["user.view"], &catalog).unwrap();

        assert!(roles.rename("Staff", "User").unwrap_err().is_duplicate());

        let renamed = roles.rename("Staff", "Employee").unwrap();
        assert_eq!(renamed.permissions, vec!["user.view"]);
        assert!(!roles.exists("Staff"));

        let removed = roles.remove("Employee").unwrap();
        assert_eq!(removed.name, "Employee");
        assert!(roles.remove("Employee").unwrap_err().is_not_found());
    }
}
