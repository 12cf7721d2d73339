//! 권한 카탈로그 (Permission Registry)
//!
//! 권한 이름은 관례상 `<resource>.<action>` 형식 (예: "user.view")

use super::validate_name;
use crate::{EntityKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 권한 (생성 후 불변)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// 권한 이름 (예: "user.view", "role.delete")
    pub name: String,
}

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 리소스 부분 ("user.view" -> "user")
    pub fn resource(&self) -> &str {
        self.name
            .split_once('.')
            .map(|(resource, _)| resource)
            .unwrap_or(&self.name)
    }

    /// 액션 부분 ("user.view" -> "view"), 점이 없으면 None
    pub fn action(&self) -> Option<&str> {
        self.name.split_once('.').map(|(_, action)| action)
    }
}

/// 권한 레지스트리
///
/// 등록 순서를 유지하므로 `all()`의 열거 순서가 항상 같다.
#[derive(Debug, Clone, Default)]
pub struct PermissionRegistry {
    /// 등록된 권한들 (등록 순서)
    permissions: Vec<Permission>,

    /// name -> permissions 인덱스
    index: HashMap<String, usize>,
}

impl PermissionRegistry {
    /// 새 레지스트리 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 생성 가능 여부 검사 (이름 형식 + 중복)
    pub fn check_new(&self, name: &str) -> Result<()> {
        validate_name(EntityKind::Permission, name)?;
        if self.exists(name) {
            return Err(Error::duplicate(EntityKind::Permission, name));
        }
        Ok(())
    }

    /// 권한 생성
    pub fn create(&mut self, name: &str) -> Result<&Permission> {
        self.check_new(name)?;

        let position = self.permissions.len();
        self.permissions.push(Permission::new(name));
        self.index.insert(name.to_string(), position);

        Ok(&self.permissions[position])
    }

    /// 권한 조회
    pub fn get(&self, name: &str) -> Option<&Permission> {
        self.index.get(name).map(|&i| &self.permissions[i])
    }

    /// 권한 존재 여부
    pub fn exists(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 모든 권한 조회 (등록 순서)
    pub fn all(&self) -> &[Permission] {
        &self.permissions
    }

    /// 모든 권한 이름 (등록 순서)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(|p| p.name.as_str())
    }

    /// 카탈로그 내 위치 (정렬용)
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// 등록된 권한 개수
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
