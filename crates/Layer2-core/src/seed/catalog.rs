//! Seed catalog - 시딩할 참조 데이터
//!
//! 내장 카탈로그(`SeedCatalog::builtin`) 또는 TOML 파일에서 로드한다.
//!
//! ```toml
//! permissions = ["user.view", "user.create"]
//!
//! [[roles]]
//! name = "Admin"
//! grant_all = true
//!
//! [[roles]]
//! name = "HRD"
//! permissions = ["user.view"]
//!
//! [[principals]]
//! id = "hrd"
//! name = "HRD"
//! email = "hrd@gmail.com"
//!
//! [[assignments]]
//! principal = "hrd"
//! role = "HRD"
//! ```

use roleforge_foundation::{Error, Principal, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// 역할에 부여할 권한
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleGrants<'a> {
    /// 시딩 시점의 모든 권한
    All,
    /// 명시된 권한만
    Only(&'a [String]),
}

/// 역할 시드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSeed {
    pub name: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub grant_all: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

impl RoleSeed {
    pub fn new<I>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.into(),
            grant_all: false,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn all(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grant_all: true,
            permissions: Vec::new(),
        }
    }

    pub fn grants(&self) -> RoleGrants<'_> {
        if self.grant_all {
            RoleGrants::All
        } else {
            RoleGrants::Only(&self.permissions)
        }
    }
}

/// 할당 시드 (principal은 안정 id로 참조)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSeed {
    pub principal: String,
    pub role: String,
}

impl AssignmentSeed {
    pub fn new(principal: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            role: role.into(),
        }
    }
}

/// 시드 카탈로그
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(default)]
    pub roles: Vec<RoleSeed>,

    #[serde(default)]
    pub principals: Vec<Principal>,

    #[serde(default)]
    pub assignments: Vec<AssignmentSeed>,
}

impl SeedCatalog {
    /// 빈 카탈로그
    pub fn new() -> Self {
        Self {
            permissions: Vec::new(),
            roles: Vec::new(),
            principals: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// 내장 카탈로그: 사용자/역할 관리 권한과 Admin, HRD, User 역할
    pub fn builtin() -> Self {
        let permissions = [
            "user.view",
            "user.create",
            "user.edit",
            "user.delete",
            "role.view",
            "role.create",
            "role.edit",
            "role.delete",
        ];

        Self::new()
            .permissions(permissions)
            .role(RoleSeed::all("Admin"))
            .role(RoleSeed::new("HRD", ["user.view", "user.create", "user.edit"]))
            .role(RoleSeed::new("User", Vec::<String>::new()))
            .principal(Principal::new("administrator", "Administrator").email("admin@gmail.com"))
            .principal(Principal::new("hrd", "HRD").email("hrd@gmail.com"))
            .principal(Principal::new("user", "User").email("user@gmail.com"))
            .assign("administrator", "Admin")
            .assign("hrd", "HRD")
            .assign("user", "User")
    }

    // ========================================================================
    // TOML
    // ========================================================================

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let catalog: Self = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// 파일에서 로드
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read seed catalog {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize seed catalog: {}", e)))
    }

    /// 구조 검증: 카탈로그 안의 중복, grant_all과 명시 목록의 혼용
    ///
    /// 권한/역할 참조의 존재 여부는 시딩 시 레지스트리 기준으로 확인한다.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in &self.permissions {
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "permission '{}' listed twice in seed catalog",
                    name
                )));
            }
        }

        let mut seen = HashSet::new();
        for role in &self.roles {
            if !seen.insert(role.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "role '{}' listed twice in seed catalog",
                    role.name
                )));
            }
            if role.grant_all && !role.permissions.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "role '{}' sets grant_all and an explicit permission list",
                    role.name
                )));
            }
        }

        let mut seen = HashSet::new();
        let mut emails = HashSet::new();
        for principal in &self.principals {
            if !seen.insert(principal.id.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "principal '{}' listed twice in seed catalog",
                    principal.id
                )));
            }
            if let Some(email) = principal.email.as_deref() {
                if !emails.insert(email) {
                    return Err(Error::InvalidInput(format!(
                        "email '{}' used by more than one principal in seed catalog",
                        email
                    )));
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn permissions<I>(mut self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.permissions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn role(mut self, role: RoleSeed) -> Self {
        self.roles.push(role);
        self
    }

    pub fn principal(mut self, principal: Principal) -> Self {
        self.principals.push(principal);
        self
    }

    pub fn assign(mut self, principal: impl Into<String>, role: impl Into<String>) -> Self {
        self.assignments.push(AssignmentSeed::new(principal, role));
        self
    }
}

impl Default for SeedCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = SeedCatalog::builtin();
        assert_eq!(catalog.permissions.len(), 8);
        assert_eq!(catalog.roles.len(), 3);
        assert_eq!(catalog.roles[0].grants(), RoleGrants::All);
        assert!(matches!(catalog.roles[2].grants(), RoleGrants::Only(p) if p.is_empty()));
        assert_eq!(catalog.assignments[1], AssignmentSeed::new("hrd", "HRD"));
        catalog.validate().unwrap();
    }

    #[test]
    fn test_toml_catalog() {
        let catalog = SeedCatalog::from_toml_str(
            r#"
            permissions = ["report.view", "report.export"]

            [[roles]]
            name = "Analyst"
            permissions = ["report.view"]

            [[roles]]
            name = "Owner"
            grant_all = true

            [[principals]]
            id = "u-1"
            name = "Kim"

            [[assignments]]
            principal = "u-1"
            role = "Analyst"
            "#,
        )
        .unwrap();

        assert_eq!(catalog.permissions, vec!["report.view", "report.export"]);
        assert_eq!(catalog.roles[1].grants(), RoleGrants::All);
        assert!(catalog.principals[0].email.is_none());
        assert_eq!(catalog.assignments[0].role, "Analyst");
    }

    #[test]
    fn test_builtin_survives_toml() {
        let builtin = SeedCatalog::builtin();
        let text = builtin.to_toml_string().unwrap();
        assert_eq!(SeedCatalog::from_toml_str(&text).unwrap(), builtin);
    }

    #[test]
    fn test_rejects_ambiguous_role() {
        let err = SeedCatalog::from_toml_str(
            r#"
            [[roles]]
            name = "Admin"
            grant_all = true
            permissions = ["user.view"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_duplicate_permission() {
        let catalog = SeedCatalog::new().permissions(["a.view", "a.view"]);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_rejects_shared_email() {
        let catalog = SeedCatalog::new()
            .principal(Principal::new("a", "A").email("team@example.com"))
            .principal(Principal::new("b", "B").email("team@example.com"));
        assert!(matches!(catalog.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let err = SeedCatalog::from_toml_str("permissions = [").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }
}
