//! Error types for RoleForge
//!
//! 모든 에러를 중앙에서 관리

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// 에러가 가리키는 엔티티 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Permission,
    Role,
    Principal,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Permission => "permission",
            Self::Role => "role",
            Self::Principal => "principal",
        };
        f.write_str(name)
    }
}

/// RoleForge 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // RBAC 관련
    // ========================================================================
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("Unknown {kind}: {name}")]
    NotFound { kind: EntityKind, name: String },

    #[error("Forbidden: {principal} lacks '{permission}'")]
    Forbidden {
        principal: String,
        permission: String,
    },

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 중복 이름 에러 생성 헬퍼
    pub fn duplicate(kind: EntityKind, name: impl Into<String>) -> Self {
        Error::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// NotFound 에러 생성 헬퍼
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// 권한 거부 에러 생성 헬퍼
    pub fn forbidden(principal: impl Into<String>, permission: impl Into<String>) -> Self {
        Error::Forbidden {
            principal: principal.into(),
            permission: permission.into(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::DuplicateName { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::DuplicateName { .. }
                | Error::NotFound { .. }
                | Error::Forbidden { .. }
                | Error::InvalidInput(_)
        )
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::not_found(EntityKind::Role, "Auditor");
        assert_eq!(err.to_string(), "Unknown role: Auditor");
        assert!(err.is_not_found());

        let err = Error::duplicate(EntityKind::Permission, "user.view");
        assert_eq!(err.to_string(), "Duplicate permission name: user.view");
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_user_facing() {
        assert!(Error::forbidden("hrd", "role.delete").is_user_facing());
        assert!(!Error::Storage("disk full".into()).is_user_facing());
    }
}
