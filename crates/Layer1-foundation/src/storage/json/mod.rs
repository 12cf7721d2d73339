//! JSON 설정 파일 읽기
//!
//! 글로벌(~/.config/roleforge/)과 프로젝트(.roleforge/) 디렉토리에서
//! 설정 파일을 읽는다. 파일이 없으면 `None`.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::PathBuf;

/// 프로젝트 설정 디렉토리명
pub const PROJECT_DIR: &str = ".roleforge";

/// 설정 디렉토리 하나
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// 글로벌 설정 디렉토리
    pub fn global() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?;
        Ok(Self {
            dir: config_dir.join("roleforge"),
        })
    }

    /// `root` 아래의 프로젝트 설정 디렉토리
    pub fn project(root: impl Into<PathBuf>) -> Self {
        Self {
            dir: root.into().join(PROJECT_DIR),
        }
    }

    /// 현재 작업 디렉토리의 프로젝트 설정
    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Cannot get current directory: {}", e)))?;
        Ok(Self::project(cwd))
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// 파일을 읽어 역직렬화, 파일이 없으면 `None`
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_reads_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());
        std::fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(
            store.file_path("config.json"),
            r#"{"databasePath":"/tmp/roleforge.db"}"#,
        )
        .unwrap();

        let loaded: BTreeMap<String, String> = store.load_optional("config.json").unwrap().unwrap();
        assert_eq!(loaded["databasePath"], "/tmp/roleforge.db");
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());

        let missing: Option<BTreeMap<String, String>> =
            store.load_optional("nothing.json").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());
        std::fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(store.file_path("config.json"), "{ not json").unwrap();

        let err = store
            .load_optional::<BTreeMap<String, String>>("config.json")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
