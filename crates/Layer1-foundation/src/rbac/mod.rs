//! RBAC registries for RoleForge
//!
//! - `permission`: 권한 카탈로그 (PermissionRegistry)
//! - `role`: 역할 + 권한 집합 (RoleRegistry)
//! - `assignment`: principal -> 역할 할당 (AssignmentStore)
//! - `principal`: principal 메타데이터 (PrincipalDirectory)
//! - `cache`: 세대 기반 권한 캐시 (PermissionCache)
//!
//! 레지스트리는 내부 잠금 없이 `&mut self`로만 변경된다. 동시 접근은
//! 상위 레이어(roleforge-core의 AccessControl)가 하나의 RwLock으로 감싼다.
//!
//! ## 사용 예시
//!
//! ```rust
//! use roleforge_foundation::rbac::{AssignmentStore, PermissionRegistry, RoleRegistry};
//!
//! let mut permissions = PermissionRegistry::new();
//! permissions.create("user.view").unwrap();
//!
//! let mut roles = RoleRegistry::new();
//! roles.create("HRD").unwrap();
//! roles.sync_permissions("HRD", ["user.view"], &permissions).unwrap();
//!
//! let mut assignments = AssignmentStore::new();
//! assignments.assign_role("hrd", "HRD", &roles).unwrap();
//! assert!(assignments.is_authorized("hrd", "user.view", &roles));
//! ```

mod assignment;
mod cache;
mod permission;
mod principal;
mod role;

pub use assignment::AssignmentStore;
pub use cache::{CacheStats, PermissionCache, DEFAULT_CACHE_ENTRIES};
pub use permission::{Permission, PermissionRegistry};
pub use principal::{Principal, PrincipalDirectory};
pub use role::{Role, RoleRegistry};

use crate::{EntityKind, Error, Result};

/// 이름 형식 검증: 비어 있지 않고 앞뒤 공백이 없어야 함
pub(crate) fn validate_name(kind: EntityKind, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} name must not be empty", kind)));
    }
    if name.trim() != name {
        return Err(Error::InvalidInput(format!(
            "{} name has surrounding whitespace: {:?}",
            kind, name
        )));
    }
    Ok(())
}
