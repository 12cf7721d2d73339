//! 시딩 통합 테스트 - 내장 카탈로그, 재시딩 정책, 영속성, 역할 관리
//!
//! `cargo test -p roleforge-core --test seeding`

use roleforge_core::{
    AccessControl, Error, Guard, RoleAdmin, RoleForm, SeedCatalog, SeedPolicy, Seeder, Storage,
};
use std::sync::Arc;
use std::thread;

fn seeded() -> AccessControl {
    let access = AccessControl::new();
    Seeder::new(&access)
        .run(&SeedCatalog::builtin())
        .expect("seeding failed");
    access
}

#[test]
fn test_builtin_scenario() {
    let access = seeded();

    assert!(access.is_authorized("administrator", "role.delete"));
    assert!(!access.is_authorized("hrd", "role.delete"));
    assert!(access.is_authorized("hrd", "user.view"));
    assert!(!access.is_authorized("nonexistent-user", "user.view"));

    assert!(access.has_permission("Admin", "role.create").unwrap());
    assert!(!access.has_permission("User", "user.view").unwrap());
    assert!(access.has_permission("Ghost", "user.view").unwrap_err().is_not_found());

    assert_eq!(access.roles_of("hrd"), vec!["HRD"]);
    assert!(access.roles_of("nobody").is_empty());
}

#[test]
fn test_admin_role_has_every_permission() {
    let access = seeded();
    let admin = access.role("Admin").unwrap();
    let all: Vec<String> = access.permissions().into_iter().map(|p| p.name).collect();
    assert_eq!(admin.permissions, all);
}

#[test]
fn test_grant_all_is_a_snapshot() {
    let access = seeded();
    access.create_permission("report.view").unwrap();

    assert!(!access.has_permission("Admin", "report.view").unwrap());
    access.grant_all("Admin").unwrap();
    assert!(access.is_authorized("administrator", "report.view"));
}

#[test]
fn test_reseed_upsert_is_noop() {
    let access = seeded();
    let generation = access.generation();

    let report = Seeder::new(&access).run(&SeedCatalog::builtin()).unwrap();

    assert!(report.is_noop());
    assert_eq!(report.permissions_skipped, 8);
    assert_eq!(report.roles_skipped, 3);
    assert_eq!(report.assignments_unchanged, 3);
    assert!(report.generation > generation);
    assert_eq!(access.permissions().len(), 8);
}

#[test]
fn test_reseed_fail_fast() {
    let access = seeded();

    let err = Seeder::new(&access)
        .with_policy(SeedPolicy::FailFast)
        .run(&SeedCatalog::builtin())
        .unwrap_err();

    assert!(err.is_duplicate());
    assert_eq!(err.to_string(), "Duplicate permission name: user.view");
}

#[test]
fn test_sync_failure_keeps_previous_set() {
    let access = seeded();

    let err = access
        .sync_permissions("HRD", ["user.view", "user.fly"])
        .unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }));
    assert_eq!(
        access.role("HRD").unwrap().permissions,
        vec!["user.view", "user.create", "user.edit"]
    );
}

#[test]
fn test_delete_role_removes_from_principals() {
    let access = seeded();
    access.assign_role("user", "HRD").unwrap();

    access.delete_role("HRD").unwrap();

    assert!(access.roles_of("hrd").is_empty());
    assert_eq!(access.roles_of("user"), vec!["User"]);
    assert!(!access.is_authorized("hrd", "user.view"));
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roleforge.db");

    {
        let access = AccessControl::open(Storage::open(&path).unwrap()).unwrap();
        Seeder::new(&access).run(&SeedCatalog::builtin()).unwrap();
        access.rename_role("HRD", "People").unwrap();
    }

    let access = AccessControl::open(Storage::open(&path).unwrap()).unwrap();
    assert_eq!(access.permissions().len(), 8);
    assert_eq!(access.roles_of("hrd"), vec!["People"]);
    assert!(access.is_authorized("hrd", "user.create"));
    assert!(access.is_authorized("administrator", "role.delete"));
    assert_eq!(
        access.principal("hrd").unwrap().email.as_deref(),
        Some("hrd@gmail.com")
    );

    let report = Seeder::new(&access).run(&SeedCatalog::builtin()).unwrap();
    assert_eq!(report.roles_created, 1, "HRD is recreated after the rename");
}

#[test]
fn test_role_admin_guards() {
    let admin = RoleAdmin::new(Guard::new(Arc::new(seeded())));

    let err = admin
        .store("hrd", &RoleForm::new("Auditor", ["user.view"]))
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    let role = admin
        .store("administrator", &RoleForm::new("Auditor", ["user.view"]))
        .unwrap();
    assert_eq!(role.permissions, vec!["user.view"]);
    assert_eq!(admin.index("administrator").unwrap().len(), 4);
}

#[test]
fn test_concurrent_readers_see_consistent_answers() {
    let access = Arc::new(seeded());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let access = Arc::clone(&access);
            thread::spawn(move || {
                for _ in 0..200 {
                    assert!(access.is_authorized("administrator", "user.view"));
                    assert!(!access.is_authorized("user", "role.delete"));
                }
            })
        })
        .collect();

    for i in 0..20 {
        let name = format!("extra.{}", i);
        access.create_permission(&name).unwrap();
        access.grant_all("Admin").unwrap();
        assert!(access.is_authorized("administrator", &name));
    }

    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_concurrent_upsert_seeders_both_succeed() {
    let access = Arc::new(AccessControl::new());

    let seeders: Vec<_> = (0..4)
        .map(|_| {
            let access = Arc::clone(&access);
            thread::spawn(move || Seeder::new(&access).run(&SeedCatalog::builtin()))
        })
        .collect();

    let reports: Vec<_> = seeders
        .into_iter()
        .map(|seeder| seeder.join().unwrap().expect("upsert seeding failed"))
        .collect();

    let created: usize = reports.iter().map(|r| r.permissions_created).sum();
    assert_eq!(created, 8);
    assert_eq!(access.permissions().len(), 8);
    assert_eq!(access.roles().len(), 3);
    assert!(access.is_authorized("administrator", "role.delete"));
}
