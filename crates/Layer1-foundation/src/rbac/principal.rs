//! Principal 디렉토리
//!
//! identity provider가 알려준 principal 메타데이터(id, 이름, 이메일)를 보관한다.
//! 인증이나 비밀번호는 다루지 않는다.

use super::validate_name;
use crate::{EntityKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Principal 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// 안정적인 외부 키 (사용자 id)
    pub id: String,

    /// 표시 이름 (유일하지 않을 수 있음)
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
        }
    }

    /// 새 UUID id로 생성
    pub fn generated(name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), name)
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Principal 디렉토리
#[derive(Debug, Clone, Default)]
pub struct PrincipalDirectory {
    principals: Vec<Principal>,
    index: HashMap<String, usize>,

    /// email -> principal id (저장소의 UNIQUE 제약과 동일)
    emails: HashMap<String, String>,
}

impl PrincipalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 등록 가능 여부 검사
    pub fn check_new(&self, principal: &Principal) -> Result<()> {
        validate_name(EntityKind::Principal, &principal.id)?;
        if principal.name.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "principal {} has an empty name",
                principal.id
            )));
        }
        if self.exists(&principal.id) {
            return Err(Error::duplicate(EntityKind::Principal, &principal.id));
        }
        if let Some(email) = &principal.email {
            if self.emails.contains_key(email) {
                return Err(Error::duplicate(EntityKind::Principal, email));
            }
        }
        Ok(())
    }

    /// principal 등록
    pub fn register(&mut self, principal: Principal) -> Result<&Principal> {
        self.check_new(&principal)?;

        let position = self.principals.len();
        self.index.insert(principal.id.clone(), position);
        if let Some(email) = &principal.email {
            self.emails.insert(email.clone(), principal.id.clone());
        }
        self.principals.push(principal);

        Ok(&self.principals[position])
    }

    pub fn get(&self, id: &str) -> Option<&Principal> {
        self.index.get(id).map(|&i| &self.principals[i])
    }

    pub fn exists(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// email로 검색
    pub fn find_by_email(&self, email: &str) -> Option<&Principal> {
        self.emails.get(email).and_then(|id| self.get(id))
    }

    /// 표시 이름으로 검색 (여러 개일 수 있음)
    pub fn find_by_name(&self, name: &str) -> Vec<&Principal> {
        self.principals.iter().filter(|p| p.name == name).collect()
    }

    /// 모든 principal (등록 순서)
    pub fn all(&self) -> &[Principal] {
        &self.principals
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}
