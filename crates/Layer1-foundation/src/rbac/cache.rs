//! 권한 캐시 (세대 기반 무효화)
//!
//! principal별로 계산된 유효 권한 집합을 보관한다. 레지스트리가 변경될 때마다
//! generation을 올리며, 이전 generation에서 만들어진 항목은 miss로 취급한다.
//! 항목 수는 `max_entries`로 제한되고, 가득 차면 가장 오래 쓰이지 않은 항목을 내보낸다.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// 기본 최대 항목 수
pub const DEFAULT_CACHE_ENTRIES: usize = 4096;

#[derive(Debug)]
struct CachedPermissions {
    generation: u64,
    permissions: Arc<BTreeSet<String>>,
    last_access: u64,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CachedPermissions>,
    access_counter: u64,
}

impl Entries {
    fn tick(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    fn evict_lru(&mut self) {
        let lru_key = self
            .map
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(k, _)| k.clone());
        if let Some(key) = lru_key {
            self.map.remove(&key);
        }
    }
}

/// 캐시 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub generation: u64,
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// principal -> 유효 권한 집합 캐시
#[derive(Debug)]
pub struct PermissionCache {
    generation: AtomicU64,
    entries: Mutex<Entries>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_CACHE_ENTRIES)
    }

    /// 최대 항목 수 지정 (0이면 아무것도 저장하지 않음)
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            generation: AtomicU64::new(0),
            entries: Mutex::new(Entries::default()),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// 현재 generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// 모든 항목 무효화 (generation 증가), 새 generation 반환
    pub fn invalidate(&self) -> u64 {
        let next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.entries.lock().map.clear();
        trace!(generation = next, "permission cache invalidated");
        next
    }

    /// 현재 generation의 항목만 반환
    pub fn get(&self, principal: &str) -> Option<Arc<BTreeSet<String>>> {
        let current = self.generation();
        let mut entries = self.entries.lock();
        let tick = entries.tick();

        match entries.map.get_mut(principal) {
            Some(cached) if cached.generation == current => {
                cached.last_access = tick;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&cached.permissions))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// 계산 결과 저장
    ///
    /// 계산 도중 generation이 바뀌었으면 저장하지 않는다.
    pub fn insert(
        &self,
        principal: &str,
        generation: u64,
        permissions: BTreeSet<String>,
    ) -> Arc<BTreeSet<String>> {
        let permissions = Arc::new(permissions);
        if self.max_entries == 0 {
            return permissions;
        }

        let mut entries = self.entries.lock();
        if generation != self.generation() {
            return permissions;
        }

        if !entries.map.contains_key(principal) {
            while entries.map.len() >= self.max_entries {
                entries.evict_lru();
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        let tick = entries.tick();
        entries.map.insert(
            principal.to_string(),
            CachedPermissions {
                generation,
                permissions: Arc::clone(&permissions),
                last_access: tick,
            },
        );
        permissions
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            generation: self.generation(),
            entries: self.entries.lock().map.len(),
            max_entries: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new()
    }
}
