//! Guard - 권한 확인 게이트
//!
//! 프레젠테이션 계층은 동작 전에 `Guard::require`로 principal의 권한을 확인한다.

use crate::access::AccessControl;
use roleforge_foundation::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// 권한 게이트
#[derive(Clone)]
pub struct Guard {
    access: Arc<AccessControl>,
}

impl Guard {
    pub fn new(access: Arc<AccessControl>) -> Self {
        Self { access }
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// 권한 보유 여부
    pub fn allows(&self, principal: &str, permission: &str) -> bool {
        self.access.is_authorized(principal, permission)
    }

    /// 권한이 없으면 `Error::Forbidden`
    pub fn require(&self, principal: &str, permission: &str) -> Result<()> {
        if self.allows(principal, permission) {
            return Ok(());
        }
        debug!(principal, permission, "Access denied");
        Err(Error::forbidden(principal, permission))
    }

    /// 하나라도 있으면 통과, 모두 없으면 첫 번째 권한으로 Forbidden
    ///
    /// 빈 목록은 `InvalidInput`.
    pub fn require_any(&self, principal: &str, permissions: &[&str]) -> Result<()> {
        let Some(first) = permissions.first() else {
            return Err(Error::InvalidInput(
                "require_any needs at least one permission".to_string(),
            ));
        };
        if permissions.iter().any(|p| self.allows(principal, p)) {
            return Ok(());
        }
        debug!(principal, ?permissions, "Access denied");
        Err(Error::forbidden(principal, *first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> Guard {
        let access = AccessControl::new();
        access.create_permission("role.view").unwrap();
        access.create_permission("role.delete").unwrap();
        access
            .create_role_with_permissions("Viewer", ["role.view"])
            .unwrap();
        access.assign_role("kim", "Viewer").unwrap();
        Guard::new(access.into_shared())
    }

    #[test]
    fn test_require() {
        let guard = guard();
        guard.require("kim", "role.view").unwrap();

        let err = guard.require("kim", "role.delete").unwrap_err();
        assert_eq!(err.to_string(), "Forbidden: kim lacks 'role.delete'");
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_require_any() {
        let guard = guard();
        guard.require_any("kim", &["role.delete", "role.view"]).unwrap();
        assert!(guard.require_any("lee", &["role.view"]).is_err());
        assert!(matches!(
            guard.require_any("kim", &[]),
            Err(Error::InvalidInput(_))
        ));
    }
}
