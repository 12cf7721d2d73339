//! # roleforge-foundation
//!
//! Foundation layer for RoleForge:
//! - RBAC: 권한 카탈로그, 역할, principal 할당, 권한 캐시
//! - Storage: SQLite (RBAC 데이터), JsonStore (설정)
//! - Config: 통합 설정 (RoleForgeConfig, SeedPolicy)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  PermissionRegistry   (user.view, role.delete, ...)      │
//! │          ▲                                              │
//! │          │ 이름 참조                                     │
//! │  RoleRegistry         (Admin, HRD, User)                │
//! │          ▲                                              │
//! │          │ 이름 참조                                     │
//! │  AssignmentStore      (principal -> roles)              │
//! │          │                                              │
//! │          ▼                                              │
//! │  Storage (SQLite)     permissions / roles /             │
//! │                       role_has_permissions /            │
//! │                       principals / principal_has_roles  │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod rbac;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{EntityKind, Error, Result};

// ============================================================================
// RBAC (권한 시스템)
// ============================================================================
pub use rbac::{
    AssignmentStore, CacheStats, Permission, PermissionCache, PermissionRegistry, Principal,
    PrincipalDirectory, Role, RoleRegistry, DEFAULT_CACHE_ENTRIES,
};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{RoleForgeConfig, SeedPolicy, CONFIG_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{
    AssignmentRecord, JsonStore, RoleRecord, Storage, StoredState, DATABASE_FILE,
};
