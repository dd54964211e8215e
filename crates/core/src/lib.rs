//! Harbormaster 공통 타입, 에러, 설정, 메트릭 이름
//!
//! # Module Structure
//!
//! - [`types`]: 컨테이너 스냅샷, 재시작 정책, 라이프사이클 이벤트
//! - [`error`]: 최상위 에러 (`HarbormasterError`)
//! - [`config`]: `harbormaster.toml` 설정 (`HarbormasterConfig`)
//! - [`metrics`]: 메트릭 이름 상수 및 설명 등록

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, HarbormasterError, RuntimeError};

// 설정
pub use config::HarbormasterConfig;

// 도메인 타입
pub use types::{
    ContainerSnapshot, EventAction, LifecycleEvent, RestartPolicy, RestartPolicyName, short_id,
};
