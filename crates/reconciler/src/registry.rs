//! 컨테이너 레지스트리
//!
//! 실행 중인 플랫폼 관리 컨테이너의 마지막 스냅샷을 ID별로 보관합니다.
//! 이벤트 루프 태스크가 단독으로 소유하므로 내부 잠금이 없습니다.

use std::collections::HashMap;

use harbormaster_core::metrics as m;
use harbormaster_core::types::ContainerSnapshot;

/// 컨테이너 ID → 마지막 스냅샷
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    entries: HashMap<String, ContainerSnapshot>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&ContainerSnapshot> {
        self.entries.get(id)
    }

    /// 스냅샷을 등록하거나 교체하고 이전 스냅샷을 반환합니다.
    pub fn put(&mut self, snapshot: ContainerSnapshot) -> Option<ContainerSnapshot> {
        let previous = self.entries.insert(snapshot.id.clone(), snapshot);
        self.record_size();
        previous
    }

    /// 컨테이너를 제거합니다. 없으면 아무 일도 하지 않습니다.
    pub fn remove(&mut self, id: &str) -> Option<ContainerSnapshot> {
        let removed = self.entries.remove(id);
        if removed.is_some() {
            self.record_size();
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 등록된 컨테이너 ID 목록 (정렬됨)
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn record_size(&self) {
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!(m::REGISTERED_CONTAINERS).set(self.entries.len() as f64);
    }
}
