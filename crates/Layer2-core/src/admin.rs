//! Role administration - 역할 리소스 관리와 대시보드 데이터
//!
//! 각 동작은 수행하는 principal의 `role.*` 권한으로 보호된다.

use crate::access::AccessControl;
use crate::guard::Guard;
use roleforge_foundation::{EntityKind, Error, Result, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 역할 관리 권한 이름
pub mod abilities {
    pub const ROLE_VIEW: &str = "role.view";
    pub const ROLE_CREATE: &str = "role.create";
    pub const ROLE_EDIT: &str = "role.edit";
    pub const ROLE_DELETE: &str = "role.delete";
}

/// 역할 생성/수정 입력
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleForm {
    pub name: String,

    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleForm {
    pub fn new<I>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

/// 대시보드 데이터: 역할(권한 포함) + 전체 권한
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessOverview {
    pub roles: Vec<Role>,
    pub permissions: Vec<String>,
}

impl AccessOverview {
    /// 한 번의 읽기 잠금으로 일관된 스냅샷 생성
    pub fn capture(access: &AccessControl) -> Self {
        access.read(|state| Self {
            roles: state.roles().all().to_vec(),
            permissions: state.permissions().names().map(str::to_string).collect(),
        })
    }
}

/// 역할 리소스 관리
pub struct RoleAdmin {
    guard: Guard,
}

impl RoleAdmin {
    pub fn new(guard: Guard) -> Self {
        Self { guard }
    }

    fn access(&self) -> &AccessControl {
        self.guard.access()
    }

    /// 대시보드
    pub fn overview(&self, actor: &str) -> Result<AccessOverview> {
        self.guard.require(actor, abilities::ROLE_VIEW)?;
        Ok(AccessOverview::capture(self.access()))
    }

    pub fn index(&self, actor: &str) -> Result<Vec<Role>> {
        self.guard.require(actor, abilities::ROLE_VIEW)?;
        Ok(self.access().roles())
    }

    pub fn show(&self, actor: &str, name: &str) -> Result<Role> {
        self.guard.require(actor, abilities::ROLE_VIEW)?;
        self.access()
            .role(name)
            .ok_or_else(|| Error::not_found(EntityKind::Role, name))
    }

    pub fn store(&self, actor: &str, form: &RoleForm) -> Result<Role> {
        self.guard.require(actor, abilities::ROLE_CREATE)?;
        let role = self
            .access()
            .create_role_with_permissions(&form.name, &form.permissions)?;
        info!(actor, role = %role.name, "Role stored");
        Ok(role)
    }

    pub fn update(&self, actor: &str, name: &str, form: &RoleForm) -> Result<Role> {
        self.guard.require(actor, abilities::ROLE_EDIT)?;
        let role = self
            .access()
            .update_role(name, &form.name, &form.permissions)?;
        info!(actor, role = name, new_name = %role.name, "Role updated");
        Ok(role)
    }

    pub fn destroy(&self, actor: &str, name: &str) -> Result<Role> {
        self.guard.require(actor, abilities::ROLE_DELETE)?;
        let role = self.access().delete_role(name)?;
        info!(actor, role = name, "Role destroyed");
        Ok(role)
    }
}
