//! RoleForge Config - 통합 설정
//!
//! 글로벌(~/.config/roleforge/config.json) + 프로젝트(.roleforge/config.json) 병합

use crate::rbac::DEFAULT_CACHE_ENTRIES;
use crate::storage::{JsonStore, DATABASE_FILE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 설정 파일명
pub const CONFIG_FILE: &str = "config.json";

/// 재시딩 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeedPolicy {
    /// 이미 있는 권한/역할은 건너뜀 (재실행 시 no-op)
    #[default]
    Upsert,

    /// 이미 있는 권한/역할이 있으면 DuplicateName으로 중단
    FailFast,
}

impl fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upsert => f.write_str("upsert"),
            Self::FailFast => f.write_str("fail-fast"),
        }
    }
}

impl FromStr for SeedPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "upsert" => Ok(Self::Upsert),
            "fail-fast" | "failfast" | "fail_fast" => Ok(Self::FailFast),
            other => Err(Error::InvalidInput(format!("unknown seed policy: {}", other))),
        }
    }
}

/// RoleForge 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleForgeConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// SQLite 데이터베이스 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// 시드 카탈로그(TOML) 경로, 없으면 내장 카탈로그 사용
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_catalog: Option<PathBuf>,

    /// 재시딩 정책
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_policy: Option<SeedPolicy>,

    /// 권한 캐시 사용 여부
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_cache: Option<bool>,

    /// 권한 캐시 최대 항목 수
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_cache_size: Option<usize>,
}

impl RoleForgeConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Self::default()
        }
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<RoleForgeConfig>(CONFIG_FILE)? {
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) = project.load_optional::<RoleForgeConfig>(CONFIG_FILE)? {
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// 특정 저장소에서만 로드
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        let mut config = Self::new();
        if let Some(stored) = store.load_optional::<RoleForgeConfig>(CONFIG_FILE)? {
            config.merge(stored);
        }
        Ok(config)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: RoleForgeConfig) {
        if other.database_path.is_some() {
            self.database_path = other.database_path;
        }
        if other.seed_catalog.is_some() {
            self.seed_catalog = other.seed_catalog;
        }
        if other.seed_policy.is_some() {
            self.seed_policy = other.seed_policy;
        }
        if other.permission_cache.is_some() {
            self.permission_cache = other.permission_cache;
        }
        if other.permission_cache_size.is_some() {
            self.permission_cache_size = other.permission_cache_size;
        }
    }

    // ========================================================================
    // Resolved values
    // ========================================================================

    /// 데이터베이스 경로 (설정 없으면 플랫폼 데이터 디렉토리)
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("roleforge").join(DATABASE_FILE))
            .ok_or_else(|| Error::Config("Cannot find data directory".to_string()))
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        self.seed_policy.unwrap_or_default()
    }

    pub fn permission_cache_enabled(&self) -> bool {
        self.permission_cache.unwrap_or(true)
    }

    pub fn permission_cache_size(&self) -> usize {
        self.permission_cache_size.unwrap_or(DEFAULT_CACHE_ENTRIES)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn seed_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_catalog = Some(path.into());
        self
    }

    pub fn with_seed_policy(mut self, policy: SeedPolicy) -> Self {
        self.seed_policy = Some(policy);
        self
    }

    pub fn with_permission_cache(mut self, enabled: bool) -> Self {
        self.permission_cache = Some(enabled);
        self
    }

    pub fn with_permission_cache_size(mut self, max_entries: usize) -> Self {
        self.permission_cache_size = Some(max_entries);
        self
    }
}

fn default_version() -> u32 {
    1
}
