//! # roleforge-core
//!
//! Core runtime for RoleForge:
//! - [`AccessControl`]: 레지스트리 + 캐시 + 저장소를 묶은 동기화된 서비스
//! - [`Seeder`]: 참조 데이터 시딩
//! - [`Guard`], [`RoleAdmin`]: 프레젠테이션 계층용 권한 게이트와 역할 관리
//!
//! ```
//! use roleforge_core::{AccessControl, SeedCatalog, Seeder};
//!
//! let access = AccessControl::new();
//! Seeder::new(&access).run(&SeedCatalog::builtin())?;
//!
//! assert!(access.is_authorized("administrator", "role.delete"));
//! assert!(!access.is_authorized("hrd", "role.delete"));
//! # Ok::<(), roleforge_core::Error>(())
//! ```

pub mod access;
pub mod admin;
pub mod guard;
pub mod seed;

pub use access::{AccessControl, AccessState};
pub use admin::{abilities, AccessOverview, RoleAdmin, RoleForm};
pub use guard::Guard;
pub use seed::{AssignmentSeed, RoleGrants, RoleSeed, SeedCatalog, SeedReport, Seeder};

// Foundation re-exports
pub use roleforge_foundation::{
    EntityKind, Error, Permission, Principal, Result, Role, RoleForgeConfig, SeedPolicy, Storage,
};
