//! Seeder - 카탈로그를 AccessControl에 적용
//!
//! 순서:
//! 0. 권한 캐시 무효화
//! 1. principal 등록
//! 2. 권한 생성
//! 3. 역할 생성
//! 4. 역할 권한 sync (grant_all 포함)
//! 5. 역할 할당 (모르는 principal은 건너뛰고 기록)

use super::catalog::{AssignmentSeed, RoleGrants, SeedCatalog};
use crate::access::AccessControl;
use roleforge_foundation::{Result, SeedPolicy};
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

/// 시딩 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub permissions_created: usize,
    pub permissions_skipped: usize,
    pub roles_created: usize,
    pub roles_skipped: usize,
    pub principals_registered: usize,
    pub principals_skipped: usize,
    pub roles_synced: usize,
    pub assignments_created: usize,
    pub assignments_unchanged: usize,

    /// 디렉토리에 없는 principal 때문에 건너뛴 할당
    pub skipped_assignments: Vec<AssignmentSeed>,

    /// 시딩 직후 캐시 generation
    pub generation: u64,
}

impl SeedReport {
    /// 새로 만든 것이 하나도 없는지 (재실행 확인용)
    pub fn is_noop(&self) -> bool {
        self.permissions_created == 0
            && self.roles_created == 0
            && self.principals_registered == 0
            && self.assignments_created == 0
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "permissions: {} created, {} skipped",
            self.permissions_created, self.permissions_skipped
        )?;
        writeln!(
            f,
            "roles:       {} created, {} skipped, {} synced",
            self.roles_created, self.roles_skipped, self.roles_synced
        )?;
        writeln!(
            f,
            "principals:  {} registered, {} skipped",
            self.principals_registered, self.principals_skipped
        )?;
        write!(
            f,
            "assignments: {} created, {} unchanged, {} skipped",
            self.assignments_created,
            self.assignments_unchanged,
            self.skipped_assignments.len()
        )?;
        for skipped in &self.skipped_assignments {
            write!(
                f,
                "\n  skipped {} -> {} (unknown principal)",
                skipped.principal, skipped.role
            )?;
        }
        Ok(())
    }
}

/// 카탈로그 적용기
pub struct Seeder<'a> {
    access: &'a AccessControl,
    policy: SeedPolicy,
}

impl<'a> Seeder<'a> {
    pub fn new(access: &'a AccessControl) -> Self {
        Self {
            access,
            policy: SeedPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SeedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SeedPolicy {
        self.policy
    }

    /// 카탈로그 적용
    ///
    /// `NotFound` / `DuplicateName`(FailFast)에서 중단한다. 중단 이전 단계의
    /// 변경은 그대로 남으며, Upsert 정책으로 다시 실행하면 이어서 진행된다.
    pub fn run(&self, catalog: &SeedCatalog) -> Result<SeedReport> {
        catalog.validate()?;
        info!(policy = %self.policy, "Seeding access control");

        let mut report = SeedReport::default();

        // 0. 캐시 무효화
        self.access.forget_cached_permissions();

        // 1. principals
        for principal in &catalog.principals {
            let registered = self.access.ensure_principal(principal).map_err(|e| {
                error!(principal = %principal.id, error = %e, "Seeding principal failed");
                e
            })?;
            if registered {
                report.principals_registered += 1;
            } else {
                report.principals_skipped += 1;
            }
        }

        // 2. permissions
        for name in &catalog.permissions {
            let created = match self.policy {
                SeedPolicy::Upsert => self.access.ensure_permission(name),
                SeedPolicy::FailFast => self.access.create_permission(name).map(|_| true),
            }
            .map_err(|e| {
                error!(permission = %name, error = %e, "Seeding permission failed");
                e
            })?;
            if created {
                report.permissions_created += 1;
            } else {
                report.permissions_skipped += 1;
            }
        }

        // 3. roles
        for role in &catalog.roles {
            let created = match self.policy {
                SeedPolicy::Upsert => self.access.ensure_role(&role.name),
                SeedPolicy::FailFast => self.access.create_role(&role.name).map(|_| true),
            }
            .map_err(|e| {
                error!(role = %role.name, error = %e, "Seeding role failed");
                e
            })?;
            if created {
                report.roles_created += 1;
            } else {
                report.roles_skipped += 1;
            }
        }

        // 4. sync
        for role in &catalog.roles {
            let synced = match role.grants() {
                RoleGrants::All => self.access.grant_all(&role.name),
                RoleGrants::Only(permissions) => {
                    self.access.sync_permissions(&role.name, permissions)
                }
            }
            .map_err(|e| {
                error!(role = %role.name, error = %e, "Syncing role permissions failed");
                e
            })?;
            debug!(role = %synced.name, permissions = synced.permissions.len(), "Role synced");
            report.roles_synced += 1;
        }

        // 5. assignments
        for assignment in &catalog.assignments {
            if !self.access.principal_exists(&assignment.principal) {
                warn!(
                    principal = %assignment.principal,
                    role = %assignment.role,
                    "Skipping assignment for unknown principal"
                );
                report.skipped_assignments.push(assignment.clone());
                continue;
            }
            let added = self
                .access
                .assign_role(&assignment.principal, &assignment.role)
                .map_err(|e| {
                    error!(
                        principal = %assignment.principal,
                        role = %assignment.role,
                        error = %e,
                        "Seeding assignment failed"
                    );
                    e
                })?;
            if added {
                report.assignments_created += 1;
            } else {
                report.assignments_unchanged += 1;
            }
        }

        report.generation = self.access.generation();
        info!(
            permissions = report.permissions_created,
            roles = report.roles_created,
            assignments = report.assignments_created,
            skipped = report.skipped_assignments.len(),
            "Seeding complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::RoleSeed;
    use roleforge_foundation::{EntityKind, Error};

    #[test]
    fn test_seed_builtin() {
        let access = AccessControl::new();
        let report = Seeder::new(&access).run(&SeedCatalog::builtin()).unwrap();

        assert_eq!(report.permissions_created, 8);
        assert_eq!(report.roles_created, 3);
        assert_eq!(report.roles_synced, 3);
        assert_eq!(report.assignments_created, 3);
        assert!(report.skipped_assignments.is_empty());

        assert!(access.is_authorized("administrator", "role.delete"));
        assert!(!access.is_authorized("hrd", "role.delete"));
        assert!(access.is_authorized("hrd", "user.edit"));
        assert!(!access.is_authorized("user", "user.view"));
    }

    #[test]
    fn test_unknown_principal_is_skipped() {
        let access = AccessControl::new();
        let catalog = SeedCatalog::builtin().assign("ghost", "Admin");

        let report = Seeder::new(&access).run(&catalog).unwrap();

        assert_eq!(report.skipped_assignments, vec![AssignmentSeed::new("ghost", "Admin")]);
        assert!(access.roles_of("ghost").is_empty());
        assert!(report.to_string().contains("ghost -> Admin"));
    }

    #[test]
    fn test_role_with_uncatalogued_permission_aborts() {
        let access = AccessControl::new();
        let catalog = SeedCatalog::new()
            .permissions(["user.view"])
            .role(RoleSeed::new("Auditor", ["audit.read"]));

        let err = Seeder::new(&access).run(&catalog).unwrap_err();
        match err {
            Error::NotFound { kind, name } => {
                assert_eq!(kind, EntityKind::Permission);
                assert_eq!(name, "audit.read");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_seed_bumps_generation() {
        let access = AccessControl::new();
        let before = access.generation();
        let report = Seeder::new(&access).run(&SeedCatalog::new()).unwrap();
        assert!(report.generation > before);
        assert!(report.is_noop());
    }
}
