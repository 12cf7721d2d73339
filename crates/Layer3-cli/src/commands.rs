//! Subcommand handlers

use anyhow::{bail, Context};
use roleforge_core::{AccessControl, AccessOverview, SeedCatalog, Seeder};
use roleforge_foundation::{Principal, RoleForgeConfig, SeedPolicy};
use std::path::PathBuf;

/// 설정된 데이터베이스 열기
pub fn open(config: &RoleForgeConfig) -> anyhow::Result<AccessControl> {
    let path = config.resolved_database_path()?;
    tracing::debug!("Using database {}", path.display());
    AccessControl::from_config(config)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

pub fn seed(
    access: &AccessControl,
    config: &RoleForgeConfig,
    catalog: Option<PathBuf>,
    policy: Option<SeedPolicy>,
    json: bool,
) -> anyhow::Result<()> {
    let catalog = match catalog.or_else(|| config.seed_catalog.clone()) {
        Some(path) => SeedCatalog::load(&path)
            .with_context(|| format!("Failed to load seed catalog {}", path.display()))?,
        None => SeedCatalog::builtin(),
    };
    let policy = policy.unwrap_or_else(|| config.seed_policy());

    let report = Seeder::new(access)
        .with_policy(policy)
        .run(&catalog)
        .context("Seeding failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

pub fn catalog() -> anyhow::Result<()> {
    print!("{}", SeedCatalog::builtin().to_toml_string()?);
    Ok(())
}

pub fn permissions(access: &AccessControl, add: &[String]) -> anyhow::Result<()> {
    for name in add {
        access.create_permission(name)?;
    }
    for permission in access.permissions() {
        println!("{}", permission.name);
    }
    Ok(())
}

pub fn roles(
    access: &AccessControl,
    create: Option<&str>,
    delete: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(name) = create {
        access.create_role(name)?;
    }
    if let Some(name) = delete {
        access.delete_role(name)?;
    }

    let roles = access.roles();
    if roles.is_empty() {
        println!("No roles found. Run 'roleforge seed' first.");
        return Ok(());
    }
    for role in roles {
        println!("{:<16} {}", role.name, role.permissions.join(", "));
    }
    Ok(())
}

pub fn overview(access: &AccessControl, json: bool) -> anyhow::Result<()> {
    let overview = AccessOverview::capture(access);
    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("\nRoles\n");
    println!("{:<16} {}", "Name", "Permissions");
    println!("{}", "-".repeat(60));
    for role in &overview.roles {
        println!("{:<16} {}", role.name, role.permissions.join(", "));
    }

    println!("\nPermissions\n");
    for permission in &overview.permissions {
        println!("  {}", permission);
    }
    println!();
    Ok(())
}

pub fn check(access: &AccessControl, principal: &str, permission: &str) -> bool {
    let allowed = access.is_authorized(principal, permission);
    let verdict = if allowed { "allowed" } else { "denied" };
    println!("{} {} {}", principal, verdict, permission);
    allowed
}

/// 이름 또는 id로 principal id 결정 (이름이 여러 명이면 에러)
fn resolve_principal(
    access: &AccessControl,
    principal: &str,
    by_name: bool,
) -> anyhow::Result<String> {
    if !by_name {
        return Ok(principal.to_string());
    }
    let matches = access.find_principal_by_name(principal);
    match matches.as_slice() {
        [] => bail!("No principal named '{}'", principal),
        [only] => Ok(only.id.clone()),
        many => {
            let ids: Vec<_> = many.iter().map(|p| p.id.as_str()).collect();
            bail!(
                "Principal name '{}' is ambiguous: {}",
                principal,
                ids.join(", ")
            )
        }
    }
}

pub fn assign(
    access: &AccessControl,
    principal: &str,
    role: &str,
    by_name: bool,
) -> anyhow::Result<()> {
    let id = resolve_principal(access, principal, by_name)?;
    if !access.principal_exists(&id) {
        tracing::warn!("Principal '{}' is not registered", id);
    }
    if access.assign_role(&id, role)? {
        println!("Assigned {} to {}", role, id);
    } else {
        println!("{} already has {}", id, role);
    }
    Ok(())
}

pub fn revoke(
    access: &AccessControl,
    principal: &str,
    role: &str,
    by_name: bool,
) -> anyhow::Result<()> {
    let id = resolve_principal(access, principal, by_name)?;
    if access.revoke_role(&id, role)? {
        println!("Revoked {} from {}", role, id);
    } else {
        println!("{} does not have {}", id, role);
    }
    Ok(())
}

pub fn sync(access: &AccessControl, role: &str, permissions: &[String]) -> anyhow::Result<()> {
    let role = access.sync_permissions(role, permissions)?;
    println!("{:<16} {}", role.name, role.permissions.join(", "));
    Ok(())
}

pub fn grant_all(access: &AccessControl, role: &str) -> anyhow::Result<()> {
    let role = access.grant_all(role)?;
    println!("{:<16} {}", role.name, role.permissions.join(", "));
    Ok(())
}

pub fn principals(
    access: &AccessControl,
    register: Option<String>,
    id: Option<String>,
    email: Option<String>,
) -> anyhow::Result<()> {
    if let Some(name) = register {
        let mut principal = match id {
            Some(id) => Principal::new(id, name),
            None => Principal::generated(name),
        };
        if let Some(email) = email {
            principal = principal.email(email);
        }
        let registered = access.register_principal(principal)?;
        println!("Registered {} ({})", registered.name, registered.id);
    }

    let principals = access.principals();
    if principals.is_empty() {
        println!("No principals found.");
        return Ok(());
    }

    println!("{:<38} {:<16} {:<24} {}", "ID", "Name", "Email", "Roles");
    println!("{}", "-".repeat(90));
    for principal in principals {
        println!(
            "{:<38} {:<16} {:<24} {}",
            principal.id,
            principal.name,
            principal.email.as_deref().unwrap_or("-"),
            access.roles_of(&principal.id).join(", ")
        );
    }
    Ok(())
}
