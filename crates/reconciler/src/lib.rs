//! Harbormaster 컨테이너 이벤트 리컨실레이션 엔진
//!
//! 플랫폼 관리 컨테이너의 라이프사이클 이벤트를 관찰하여 실행 중인 컨테이너와
//! 네트워크 주소를 메모리에 유지하고, 상태가 어긋나면 외부 교정 명령
//! (프록시 설정 재생성, 앱 재빌드)을 실행합니다.
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 (`ReconcilerError`)
//! - [`config`]: 엔진 설정 (`ReconcilerConfig`, `PlatformSelector`, 빌더)
//! - [`docker`]: 컨테이너 런타임 추상화 (`ContainerInspector` trait, `BollardInspector`)
//! - [`registry`]: 실행 중인 컨테이너 레지스트리 (`ContainerRegistry`)
//! - [`bootstrap`]: 시작 시 스캔 (`BootstrapScanner`)
//! - [`dispatcher`]: 외부 명령 디스패치 (`CommandRunner` trait, `ActionDispatcher`)
//! - [`classifier`]: 이벤트 분류 및 상태 전이 (`EventClassifier`, `Outcome`)
//! - [`event_loop`]: 순차 이벤트 처리 (`EventLoop`)
//! - [`reconciler`]: 최상위 엔진 (`Reconciler`, `ReconcilerBuilder`)

pub mod bootstrap;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod docker;
pub mod error;
pub mod event_loop;
pub mod reconciler;
pub mod registry;

// --- Public API Re-exports ---

// Engine
pub use reconciler::{Reconciler, ReconcilerBuilder};

// Configuration
pub use config::{PlatformSelector, ReconcilerConfig};

// Error
pub use error::ReconcilerError;

// Docker API
pub use docker::{BollardInspector, ContainerInspector, EventStream};

// Dispatch
pub use dispatcher::{ActionDispatcher, CommandRunner, RemediationAction, ShellCommandRunner};

// Classification
pub use bootstrap::{BootstrapReport, BootstrapScanner};
pub use classifier::{EventClassifier, IgnoreReason, Outcome};
pub use event_loop::{EventLoop, EventLoopStats};
pub use registry::ContainerRegistry;
