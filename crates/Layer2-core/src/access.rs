//! AccessControl - 레지스트리 통합 서비스
//!
//! PermissionRegistry / RoleRegistry / AssignmentStore / PrincipalDirectory를
//! 하나의 RwLock 뒤에 두고, 변경은 "검증 → 저장소 기록 → 메모리 반영" 순서로
//! 쓰기 잠금 안에서 수행한다. 저장소 기록이 실패하면 메모리는 변하지 않는다.
//!
//! 읽기(`is_authorized`, `permissions`, `roles_of`)는 동시에 처리된다.

use parking_lot::RwLock;
use roleforge_foundation::{
    AssignmentStore, CacheStats, EntityKind, Error, Permission, PermissionCache,
    PermissionRegistry, Principal, PrincipalDirectory, Result, Role, RoleForgeConfig,
    RoleRegistry, Storage, StoredState,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// AccessState
// ============================================================================

/// 잠금 안쪽의 레지스트리 묶음
#[derive(Debug, Clone, Default)]
pub struct AccessState {
    permissions: PermissionRegistry,
    roles: RoleRegistry,
    assignments: AssignmentStore,
    principals: PrincipalDirectory,
}

impl AccessState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장소에서 읽은 상태로 레지스트리 복원
    pub fn from_stored(stored: &StoredState) -> Result<Self> {
        let mut state = Self::new();

        for name in &stored.permissions {
            state.permissions.create(name)?;
        }
        for role in &stored.roles {
            state.roles.create(&role.name)?;
            state
                .roles
                .sync_permissions(&role.name, &role.permissions, &state.permissions)?;
        }
        for principal in &stored.principals {
            state.principals.register(principal.clone())?;
        }
        for assignment in &stored.assignments {
            state
                .assignments
                .assign_role(&assignment.principal_id, &assignment.role, &state.roles)?;
        }

        Ok(state)
    }

    pub fn permissions(&self) -> &PermissionRegistry {
        &self.permissions
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn assignments(&self) -> &AssignmentStore {
        &self.assignments
    }

    pub fn principals(&self) -> &PrincipalDirectory {
        &self.principals
    }
}

// ============================================================================
// AccessControl
// ============================================================================

/// 동기화된 RBAC 서비스
///
/// `Storage`가 있으면 모든 변경을 write-through로 기록한다.
pub struct AccessControl {
    state: RwLock<AccessState>,
    storage: Option<Storage>,
    cache: PermissionCache,
    cache_enabled: bool,
}

impl AccessControl {
    /// 메모리 전용 인스턴스
    pub fn new() -> Self {
        Self {
            state: RwLock::new(AccessState::new()),
            storage: None,
            cache: PermissionCache::new(),
            cache_enabled: true,
        }
    }

    /// 저장소에서 상태를 로드하여 생성
    pub fn open(storage: Storage) -> Result<Self> {
        let stored = storage.load_state()?;
        let state = AccessState::from_stored(&stored)?;

        info!(
            permissions = state.permissions.len(),
            roles = state.roles.len(),
            principals = state.principals.len(),
            "Access control state loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
            storage: Some(storage),
            cache: PermissionCache::new(),
            cache_enabled: true,
        })
    }

    /// 설정에 따라 데이터베이스를 열어 생성
    pub fn from_config(config: &RoleForgeConfig) -> Result<Self> {
        let path = config.resolved_database_path()?;
        let storage = Storage::open(&path)?;
        Ok(Self::open(storage)?
            .with_cache(config.permission_cache_enabled())
            .with_cache_capacity(config.permission_cache_size()))
    }

    /// 권한 캐시 사용 여부 설정
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// 권한 캐시 최대 항목 수 설정
    pub fn with_cache_capacity(mut self, max_entries: usize) -> Self {
        self.cache = PermissionCache::with_max_entries(max_entries);
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    fn persist(&self, op: impl FnOnce(&Storage) -> Result<()>) -> Result<()> {
        match &self.storage {
            Some(storage) => op(storage),
            None => Ok(()),
        }
    }

    /// 일관된 스냅샷 위에서 읽기 작업 수행
    pub fn read<R>(&self, f: impl FnOnce(&AccessState) -> R) -> R {
        f(&self.state.read())
    }

    // ========================================================================
    // Permissions
    // ========================================================================

    /// 권한 생성
    pub fn create_permission(&self, name: &str) -> Result<Permission> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.permissions.check_new(name)?;
        self.persist(|s| s.insert_permission(name))?;
        let created = state.permissions.create(name)?.clone();

        self.cache.invalidate();
        debug!(permission = name, "Permission created");
        Ok(created)
    }

    /// 없으면 생성 (확인과 생성이 하나의 쓰기 잠금 안에서 이루어짐)
    ///
    /// 새로 만들었으면 true.
    pub fn ensure_permission(&self, name: &str) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.permissions.exists(name) {
            return Ok(false);
        }
        state.permissions.check_new(name)?;
        self.persist(|s| s.insert_permission(name))?;
        state.permissions.create(name)?;

        self.cache.invalidate();
        debug!(permission = name, "Permission created");
        Ok(true)
    }

    /// 모든 권한 (등록 순서)
    pub fn permissions(&self) -> Vec<Permission> {
        self.state.read().permissions.all().to_vec()
    }

    pub fn permission_exists(&self, name: &str) -> bool {
        self.state.read().permissions.exists(name)
    }

    // ========================================================================
    // Roles
    // ========================================================================

    /// 빈 권한 집합으로 역할 생성
    pub fn create_role(&self, name: &str) -> Result<Role> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.roles.check_new(name)?;
        self.persist(|s| s.insert_role(name))?;
        let created = state.roles.create(name)?.clone();

        self.cache.invalidate();
        debug!(role = name, "Role created");
        Ok(created)
    }

    /// 없으면 빈 역할 생성, 새로 만들었으면 true
    pub fn ensure_role(&self, name: &str) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.roles.exists(name) {
            return Ok(false);
        }
        state.roles.check_new(name)?;
        self.persist(|s| s.insert_role(name))?;
        state.roles.create(name)?;

        self.cache.invalidate();
        debug!(role = name, "Role created");
        Ok(true)
    }

    /// 없으면 principal 등록, 새로 등록했으면 true
    pub fn ensure_principal(&self, principal: &Principal) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.principals.exists(&principal.id) {
            return Ok(false);
        }
        state.principals.check_new(principal)?;
        self.persist(|s| s.insert_principal(principal))?;
        state.principals.register(principal.clone())?;

        debug!(principal = %principal.id, name = %principal.name, "Principal registered");
        Ok(true)
    }

    /// 역할 생성과 권한 부여를 한 번에 (검증 실패 시 아무것도 만들지 않음)
    pub fn create_role_with_permissions<I>(&self, name: &str, permissions: I) -> Result<Role>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.roles.check_new(name)?;
        let mut staged = RoleRegistry::new();
        staged.create(name)?;
        let granted = staged.resolve_sync(name, permissions, &state.permissions)?;

        self.persist(|s| s.insert_role_with_permissions(name, &granted))?;

        state.roles.create(name)?;
        let created = state
            .roles
            .sync_permissions(name, &granted, &state.permissions)?
            .clone();

        self.cache.invalidate();
        debug!(role = name, permissions = granted.len(), "Role created");
        Ok(created)
    }

    /// 역할의 권한 집합을 통째로 교체 (원자적)
    pub fn sync_permissions<I>(&self, role: &str, permissions: I) -> Result<Role>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let granted = state.roles.resolve_sync(role, permissions, &state.permissions)?;
        self.persist(|s| s.replace_role_permissions(role, &granted))?;
        let synced = state
            .roles
            .sync_permissions(role, &granted, &state.permissions)?
            .clone();

        self.cache.invalidate();
        debug!(role, permissions = granted.len(), "Role permissions synced");
        Ok(synced)
    }

    /// 현재 등록된 모든 권한을 역할에 부여 (이후 추가되는 권한은 포함되지 않음)
    pub fn grant_all(&self, role: &str) -> Result<Role> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let all: Vec<&str> = state.permissions.names().collect();
        let granted = state.roles.resolve_sync(role, all, &state.permissions)?;
        self.persist(|s| s.replace_role_permissions(role, &granted))?;
        let synced = state
            .roles
            .sync_permissions(role, &granted, &state.permissions)?
            .clone();

        self.cache.invalidate();
        debug!(role, permissions = granted.len(), "Granted all permissions");
        Ok(synced)
    }

    /// 역할이 권한을 가지는지 (역할이 없으면 NotFound)
    pub fn has_permission(&self, role: &str, permission: &str) -> Result<bool> {
        self.state.read().roles.has_permission(role, permission)
    }

    pub fn role(&self, name: &str) -> Option<Role> {
        self.state.read().roles.get(name).cloned()
    }

    pub fn role_exists(&self, name: &str) -> bool {
        self.state.read().roles.exists(name)
    }

    /// 모든 역할 (권한 포함, 등록 순서)
    pub fn roles(&self) -> Vec<Role> {
        self.state.read().roles.all().to_vec()
    }

    /// 역할 이름 변경 + 권한 교체 (하나라도 검증 실패 시 아무것도 바뀌지 않음)
    pub fn update_role<I>(&self, name: &str, new_name: &str, permissions: I) -> Result<Role>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.roles.check_rename(name, new_name)?;
        let granted = state.roles.resolve_sync(name, permissions, &state.permissions)?;

        self.persist(|s| s.update_role(name, new_name, &granted))?;

        if name != new_name {
            state.roles.rename(name, new_name)?;
            state.assignments.rename_role(name, new_name);
        }
        let updated = state
            .roles
            .sync_permissions(new_name, &granted, &state.permissions)?
            .clone();

        self.cache.invalidate();
        debug!(role = name, new_name, "Role updated");
        Ok(updated)
    }

    /// 역할 이름 변경
    pub fn rename_role(&self, name: &str, new_name: &str) -> Result<Role> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.roles.check_rename(name, new_name)?;
        if name == new_name {
            return state
                .roles
                .get(name)
                .cloned()
                .ok_or_else(|| Error::not_found(EntityKind::Role, name));
        }

        self.persist(|s| s.rename_role(name, new_name))?;
        let renamed = state.roles.rename(name, new_name)?.clone();
        state.assignments.rename_role(name, new_name);

        self.cache.invalidate();
        debug!(role = name, new_name, "Role renamed");
        Ok(renamed)
    }

    /// 역할 삭제 (모든 principal에서 제거됨)
    pub fn delete_role(&self, name: &str) -> Result<Role> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if !state.roles.exists(name) {
            return Err(Error::not_found(EntityKind::Role, name));
        }
        self.persist(|s| s.delete_role(name))?;
        let holders = state.assignments.principals_with(name).len();
        let removed = state.roles.remove(name)?;
        state.assignments.forget_role(name);

        self.cache.invalidate();
        info!(role = name, revoked_from = holders, "Role deleted");
        Ok(removed)
    }

    // ========================================================================
    // Assignments
    // ========================================================================

    /// 역할 할당 (멱등, 새로 추가되면 true)
    pub fn assign_role(&self, principal: &str, role: &str) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.assignments.check_assign(role, &state.roles)?;
        if state.assignments.roles_of(principal).iter().any(|r| r == role) {
            return Ok(false);
        }

        self.persist(|s| s.insert_assignment(principal, role))?;
        let added = state.assignments.assign_role(principal, role, &state.roles)?;

        self.cache.invalidate();
        debug!(principal, role, "Role assigned");
        Ok(added)
    }

    /// 역할 회수 (변경되면 true)
    pub fn revoke_role(&self, principal: &str, role: &str) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if !state.assignments.roles_of(principal).iter().any(|r| r == role) {
            return Ok(false);
        }

        self.persist(|s| s.delete_assignment(principal, role))?;
        let removed = state.assignments.revoke_role(principal, role);

        self.cache.invalidate();
        debug!(principal, role, "Role revoked");
        Ok(removed)
    }

    /// principal이 역할을 통해 권한을 가지는지 (에러 없이 실패 시 거부)
    pub fn is_authorized(&self, principal: &str, permission: &str) -> bool {
        let state = self.state.read();
        if !self.cache_enabled {
            return state
                .assignments
                .is_authorized(principal, permission, &state.roles);
        }
        self.cached_permissions(&state, principal).contains(permission)
    }

    /// principal의 유효 권한 전체
    pub fn effective_permissions(&self, principal: &str) -> BTreeSet<String> {
        let state = self.state.read();
        if !self.cache_enabled {
            return state.assignments.permissions_of(principal, &state.roles);
        }
        self.cached_permissions(&state, principal).as_ref().clone()
    }

    fn cached_permissions(&self, state: &AccessState, principal: &str) -> Arc<BTreeSet<String>> {
        // 역할 없는 principal은 캐시에 남기지 않음
        if state.assignments.roles_of(principal).is_empty() {
            return Arc::new(BTreeSet::new());
        }
        if let Some(hit) = self.cache.get(principal) {
            return hit;
        }
        let generation = self.cache.generation();
        let computed = state.assignments.permissions_of(principal, &state.roles);
        self.cache.insert(principal, generation, computed)
    }

    /// 역할을 가진 principal 목록
    pub fn principals_with(&self, role: &str) -> Vec<String> {
        self.state
            .read()
            .assignments
            .principals_with(role)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// principal이 가진 역할 (모르면 빈 목록)
    pub fn roles_of(&self, principal: &str) -> Vec<String> {
        self.state.read().assignments.roles_of(principal).to_vec()
    }

    // ========================================================================
    // Principals
    // ========================================================================

    /// principal 메타데이터 등록
    pub fn register_principal(&self, principal: Principal) -> Result<Principal> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.principals.check_new(&principal)?;
        self.persist(|s| s.insert_principal(&principal))?;
        let registered = state.principals.register(principal)?.clone();

        debug!(principal = %registered.id, name = %registered.name, "Principal registered");
        Ok(registered)
    }

    pub fn principal(&self, id: &str) -> Option<Principal> {
        self.state.read().principals.get(id).cloned()
    }

    pub fn principal_exists(&self, id: &str) -> bool {
        self.state.read().principals.exists(id)
    }

    /// 표시 이름으로 검색 (유일하지 않을 수 있음)
    pub fn find_principal_by_name(&self, name: &str) -> Vec<Principal> {
        self.state
            .read()
            .principals
            .find_by_name(name)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn principals(&self) -> Vec<Principal> {
        self.state.read().principals.all().to_vec()
    }

    // ========================================================================
    // Cache
    // ========================================================================

    /// 캐시된 권한 전체 무효화, 새 generation 반환
    pub fn forget_cached_permissions(&self) -> u64 {
        let _guard = self.state.write();
        self.cache.invalidate()
    }

    /// 현재 캐시 generation (모든 변경마다 증가)
    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for AccessControl {
    fn default() -> Self {
        Self::new()
    }
}
