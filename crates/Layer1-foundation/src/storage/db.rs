//! SQLite Storage for access-control data
//!
//! 영속 데이터:
//! - Permissions: 권한 카탈로그
//! - Roles / Role Permissions: 역할과 역할별 권한 집합
//! - Principals: identity provider가 알려준 principal 메타데이터
//! - Principal Roles: principal -> 역할 할당
//!
//! 설정 데이터는 JSON (storage/json/)에서 관리
//!
//! ## Migration System
//!
//! Database schema is versioned. Migrations run automatically on startup.
//! - Version 1: Initial schema
//! - Version 2: Index principals by display name

use crate::rbac::Principal;
use crate::{EntityKind, Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// 기본 데이터베이스 파일명
pub const DATABASE_FILE: &str = "roleforge.db";

/// 저장된 역할 (권한은 카탈로그 순서)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub name: String,
    pub permissions: Vec<String>,
}

/// 저장된 할당
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub principal_id: String,
    pub role: String,
}

/// 데이터베이스 전체 상태 (시작 시 레지스트리 복원용)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
    pub permissions: Vec<String>,
    pub roles: Vec<RoleRecord>,
    pub principals: Vec<Principal>,
    pub assignments: Vec<AssignmentRecord>,
}

/// Storage service for persisting registries
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    /// 데이터 디렉토리 안의 기본 파일로 열기
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;

        Self::open(&data_dir.join(DATABASE_FILE))
    }

    /// 지정한 데이터베이스 파일 열기
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )
        .map_err(|e| Error::Storage(format!("Failed to set pragmas: {}", e)))?;

        debug!("Opened database at {}", db_path.display());
        Self::from_connection(conn)
    }

    /// Create an in-memory storage (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Storage(format!("Failed to create in-memory database: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Storage(format!("Failed to set pragmas: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        storage.initialize_schema()?;
        storage.run_migrations()?;

        Ok(storage)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("Lock poisoned".to_string()))
    }

    /// Get current schema version from database
    pub fn get_schema_version(&self) -> Result<i32> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::Storage(format!("Failed to get schema version: {}", e)))
    }

    /// Initialize database schema (base tables)
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Permission catalog
            CREATE TABLE IF NOT EXISTS permissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            -- Roles
            CREATE TABLE IF NOT EXISTS roles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Role -> permission sets
            CREATE TABLE IF NOT EXISTS role_has_permissions (
                role_id INTEGER NOT NULL,
                permission_id INTEGER NOT NULL,
                PRIMARY KEY (role_id, permission_id),
                FOREIGN KEY (role_id) REFERENCES roles(id) ON DELETE CASCADE,
                FOREIGN KEY (permission_id) REFERENCES permissions(id) ON DELETE CASCADE
            );

            -- Principal metadata
            CREATE TABLE IF NOT EXISTS principals (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                email TEXT UNIQUE,
                created_at TEXT NOT NULL
            );

            -- Principal -> role sets (principal_id is an opaque key)
            CREATE TABLE IF NOT EXISTS principal_has_roles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                principal_id TEXT NOT NULL,
                role_id INTEGER NOT NULL,
                assigned_at TEXT NOT NULL,
                UNIQUE (principal_id, role_id),
                FOREIGN KEY (role_id) REFERENCES roles(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_principal_has_roles_principal
                ON principal_has_roles(principal_id);

            -- Insert initial schema version if not exists
            INSERT OR IGNORE INTO schema_version (version) VALUES (1);
            "#,
        )
        .map_err(|e| Error::Storage(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    /// Run all pending migrations
    fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version()?;

        if current_version >= CURRENT_SCHEMA_VERSION {
            debug!(
                "Database schema is up to date (version {})",
                current_version
            );
            return Ok(());
        }

        info!(
            "Running database migrations from version {} to {}",
            current_version, CURRENT_SCHEMA_VERSION
        );

        let conn = self.conn()?;

        for version in (current_version + 1)..=CURRENT_SCHEMA_VERSION {
            match version {
                2 => Self::migrate_v2(&conn)?,
                _ => {
                    warn!("Unknown migration version: {}", version);
                }
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![version],
            )
            .map_err(|e| Error::Storage(format!("Failed to record migration: {}", e)))?;

            info!("Applied migration to version {}", version);
        }

        Ok(())
    }

    /// Migration to version 2: principal name lookups
    fn migrate_v2(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_principals_name ON principals(name)",
            [],
        )
        .map_err(|e| Error::Storage(format!("Failed to migrate to v2: {}", e)))?;
        Ok(())
    }

    // ========================================================================
    // Permission Operations
    // ========================================================================

    /// 권한 추가
    pub fn insert_permission(&self, name: &str) -> Result<()> {
        let conn = self.conn()?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO permissions (name, created_at) VALUES (?1, ?2)",
            params![name, now],
        )
        .map_err(|e| Error::Storage(format!("Failed to insert permission {}: {}", name, e)))?;

        Ok(())
    }

    // ========================================================================
    // Role Operations
    // ========================================================================

    /// 역할 추가
    pub fn insert_role(&self, name: &str) -> Result<()> {
        let conn = self.conn()?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO roles (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, now],
        )
        .map_err(|e| Error::Storage(format!("Failed to insert role {}: {}", name, e)))?;

        Ok(())
    }

    /// 역할 이름 변경
    pub fn rename_role(&self, old: &str, new: &str) -> Result<()> {
        let conn = self.conn()?;
        let now = chrono::Utc::now().to_rfc3339();

        let changed = conn
            .execute(
                "UPDATE roles SET name = ?2, updated_at = ?3 WHERE name = ?1",
                params![old, new, now],
            )
            .map_err(|e| Error::Storage(format!("Failed to rename role {}: {}", old, e)))?;

        if changed == 0 {
            return Err(Error::not_found(EntityKind::Role, old));
        }
        Ok(())
    }

    /// 역할 삭제 (권한 집합과 할당은 cascade)
    pub fn delete_role(&self, name: &str) -> Result<()> {
        let conn = self.conn()?;

        let changed = conn
            .execute("DELETE FROM roles WHERE name = ?1", params![name])
            .map_err(|e| Error::Storage(format!("Failed to delete role {}: {}", name, e)))?;

        if changed == 0 {
            return Err(Error::not_found(EntityKind::Role, name));
        }
        Ok(())
    }

    /// 역할 생성 + 권한 부여 (단일 트랜잭션)
    pub fn insert_role_with_permissions(&self, name: &str, permissions: &[String]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Storage(format!("Failed to begin transaction: {}", e)))?;
        let now = chrono::Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO roles (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, now],
        )
        .map_err(|e| Error::Storage(format!("Failed to insert role {}: {}", name, e)))?;
        let role_id = tx.last_insert_rowid();

        Self::write_role_permissions(&tx, role_id, permissions)?;

        tx.commit()
            .map_err(|e| Error::Storage(format!("Failed to commit role {}: {}", name, e)))?;
        Ok(())
    }

    /// 역할의 권한 집합 교체 (단일 트랜잭션)
    pub fn replace_role_permissions(&self, role: &str, permissions: &[String]) -> Result<()> {
        self.update_role(role, role, permissions)
    }

    /// 역할 이름 변경 + 권한 집합 교체 (단일 트랜잭션)
    pub fn update_role(&self, role: &str, new_name: &str, permissions: &[String]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Storage(format!("Failed to begin transaction: {}", e)))?;

        let role_id: i64 = tx
            .query_row("SELECT id FROM roles WHERE name = ?1", params![role], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or_else(|| Error::not_found(EntityKind::Role, role))?;

        let now = chrono::Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE roles SET name = ?2, updated_at = ?3 WHERE id = ?1",
            params![role_id, new_name, now],
        )
        .map_err(|e| Error::Storage(format!("Failed to update role {}: {}", role, e)))?;

        Self::write_role_permissions(&tx, role_id, permissions)?;

        tx.commit()
            .map_err(|e| Error::Storage(format!("Failed to commit role permissions: {}", e)))?;
        Ok(())
    }

    fn write_role_permissions(
        tx: &rusqlite::Transaction<'_>,
        role_id: i64,
        permissions: &[String],
    ) -> Result<()> {
        tx.execute(
            "DELETE FROM role_has_permissions WHERE role_id = ?1",
            params![role_id],
        )?;

        let mut insert = tx.prepare(
            r#"
            INSERT INTO role_has_permissions (role_id, permission_id)
            SELECT ?1, id FROM permissions WHERE name = ?2
            "#,
        )?;
        for permission in permissions {
            if insert.execute(params![role_id, permission])? == 0 {
                return Err(Error::not_found(EntityKind::Permission, permission));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Principal Operations
    // ========================================================================

    /// principal 메타데이터 추가
    pub fn insert_principal(&self, principal: &Principal) -> Result<()> {
        let conn = self.conn()?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO principals (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![principal.id, principal.name, principal.email, now],
        )
        .map_err(|e| {
            Error::Storage(format!("Failed to insert principal {}: {}", principal.id, e))
        })?;

        Ok(())
    }

    /// 역할 할당 (이미 있으면 무시)
    pub fn insert_assignment(&self, principal_id: &str, role: &str) -> Result<()> {
        let conn = self.conn()?;
        let now = chrono::Utc::now().to_rfc3339();

        let changed = conn
            .execute(
                r#"
                INSERT OR IGNORE INTO principal_has_roles (principal_id, role_id, assigned_at)
                SELECT ?1, id, ?3 FROM roles WHERE name = ?2
                "#,
                params![principal_id, role, now],
            )
            .map_err(|e| Error::Storage(format!("Failed to assign role {}: {}", role, e)))?;

        if changed == 0 {
            let role_exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM roles WHERE name = ?1)",
                params![role],
                |row| row.get(0),
            )?;
            if !role_exists {
                return Err(Error::not_found(EntityKind::Role, role));
            }
        }
        Ok(())
    }

    /// 역할 회수
    pub fn delete_assignment(&self, principal_id: &str, role: &str) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            DELETE FROM principal_has_roles
            WHERE principal_id = ?1
              AND role_id = (SELECT id FROM roles WHERE name = ?2)
            "#,
            params![principal_id, role],
        )
        .map_err(|e| Error::Storage(format!("Failed to revoke role {}: {}", role, e)))?;

        Ok(())
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 전체 상태 로드
    pub fn load_state(&self) -> Result<StoredState> {
        let conn = self.conn()?;

        let permissions = {
            let mut stmt = conn.prepare("SELECT name FROM permissions ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut roles = {
            let mut stmt = conn.prepare("SELECT name FROM roles ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(RoleRecord {
                    name: row.get(0)?,
                    permissions: Vec::new(),
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        {
            let mut stmt = conn.prepare(
                r#"
                SELECT p.name FROM role_has_permissions rp
                JOIN roles r ON r.id = rp.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE r.name = ?1
                ORDER BY p.id
                "#,
            )?;
            for role in roles.iter_mut() {
                let rows = stmt.query_map(params![role.name], |row| row.get::<_, String>(0))?;
                role.permissions = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            }
        }

        let principals = {
            let mut stmt = conn.prepare("SELECT id, name, email FROM principals ORDER BY seq")?;
            let rows = stmt.query_map([], |row| {
                Ok(Principal {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let assignments = {
            let mut stmt = conn.prepare(
                r#"
                SELECT pr.principal_id, r.name FROM principal_has_roles pr
                JOIN roles r ON r.id = pr.role_id
                ORDER BY pr.id
                "#,
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(AssignmentRecord {
                    principal_id: row.get(0)?,
                    role: row.get(1)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        debug!(
            permissions = permissions.len(),
            roles = roles.len(),
            principals = principals.len(),
            assignments = assignments.len(),
            "Loaded access-control state"
        );

        Ok(StoredState {
            permissions,
            roles,
            principals,
            assignments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Storage {
        let storage = Storage::in_memory().unwrap();
        for name in ["user.view", "user.create", "role.delete"] {
            storage.insert_permission(name).unwrap();
        }
        storage.insert_role("Admin").unwrap();
        storage.insert_role("HRD").unwrap();
        storage
    }

    #[test]
    fn test_schema_version() {
        let storage = Storage::in_memory().unwrap();
        assert_eq!(storage.get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_unique_names() {
        let storage = seeded();
        assert!(storage.insert_permission("user.view").is_err());
        assert!(storage.insert_role("Admin").is_err());
    }

    #[test]
    fn test_replace_role_permissions() {
        let storage = seeded();

        storage
            .replace_role_permissions("HRD", &["user.create".into(), "user.view".into()])
            .unwrap();
        storage
            .replace_role_permissions("HRD", &["user.view".into()])
            .unwrap();

        let state = storage.load_state().unwrap();
        let hrd = state.roles.iter().find(|r| r.name == "HRD").unwrap();
        assert_eq!(hrd.permissions, vec!["user.view"]);
    }

    #[test]
    fn test_replace_rolls_back_on_unknown_permission() {
        let storage = seeded();
        storage
            .replace_role_permissions("HRD", &["user.view".into()])
            .unwrap();

        let err = storage
            .replace_role_permissions("HRD", &["user.create".into(), "ghost.perm".into()])
            .unwrap_err();
        assert!(err.is_not_found());

        let state = storage.load_state().unwrap();
        assert_eq!(state.roles[1].permissions, vec!["user.view"]);
    }

    #[test]
    fn test_assignments_and_cascade() {
        let storage = seeded();
        storage.insert_principal(&Principal::new("hrd", "HRD")).unwrap();
        storage.insert_assignment("hrd", "HRD").unwrap();
        storage.insert_assignment("hrd", "HRD").unwrap();
        assert!(storage.insert_assignment("hrd", "Ghost").unwrap_err().is_not_found());

        let state = storage.load_state().unwrap();
        assert_eq!(state.assignments.len(), 1);
        assert_eq!(state.principals[0].name, "HRD");

        storage.delete_role("HRD").unwrap();
        let state = storage.load_state().unwrap();
        assert!(state.assignments.is_empty());
        assert_eq!(state.roles.len(), 1);
    }

    #[test]
    fn test_rename_and_revoke() {
        let storage = seeded();
        storage.insert_assignment("u-1", "Admin").unwrap();

        storage.rename_role("Admin", "Root").unwrap();
        let state = storage.load_state().unwrap();
        assert_eq!(state.assignments[0].role, "Root");

        storage.delete_assignment("u-1", "Root").unwrap();
        assert!(storage.load_state().unwrap().assignments.is_empty());
        assert!(storage.rename_role("Admin", "X").unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_role_is_atomic() {
        let storage = seeded();
        storage
            .insert_role_with_permissions("Auditor", &["user.view".into()])
            .unwrap();

        let err = storage
            .update_role("Auditor", "Reviewer", &["ghost.perm".into()])
            .unwrap_err();
        assert!(err.is_not_found());
        let state = storage.load_state().unwrap();
        assert_eq!(state.roles[2].name, "Auditor");
        assert_eq!(state.roles[2].permissions, vec!["user.view"]);

        storage
            .update_role("Auditor", "Reviewer", &["role.delete".into()])
            .unwrap();
        let state = storage.load_state().unwrap();
        assert_eq!(state.roles[2].name, "Reviewer");
        assert_eq!(state.roles[2].permissions, vec!["role.delete"]);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Storage::new(dir.path()).unwrap();
            storage.insert_permission("user.view").unwrap();
        }

        let storage = Storage::new(dir.path()).unwrap();
        assert_eq!(storage.load_state().unwrap().permissions, vec!["user.view"]);
    }
}
