//! 리컨실러 에러 타입
//!
//! [`ReconcilerError`]는 리컨실레이션 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<ReconcilerError> for HarbormasterError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use harbormaster_core::error::{ConfigError, HarbormasterError, RuntimeError};

/// 리컨실러 도메인 에러
///
/// Docker API 호출, 이벤트 스트림, 외부 명령 실행, 부트스트랩, 설정 에러 등
/// 엔진 내부의 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 컨테이너를 찾을 수 없음
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// 이벤트 스트림 실패 (프로세스 종료 사유)
    #[error("event stream error: {0}")]
    EventStream(String),

    /// 외부 명령 실행 실패
    #[error("command '{command}' failed: {reason}")]
    DispatchFailed {
        /// 실행한 명령줄
        command: String,
        /// 실패 사유
        reason: String,
    },

    /// 부트스트랩 스캔 실패
    #[error("bootstrap failed for container '{container_id}': {reason}")]
    Bootstrap {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<ReconcilerError> for HarbormasterError {
    fn from(err: ReconcilerError) -> Self {
        match err {
            ReconcilerError::DockerApi(msg) | ReconcilerError::DockerConnection(msg) => {
                HarbormasterError::Runtime(RuntimeError::DockerApi(msg))
            }
            ReconcilerError::ContainerNotFound(id) => {
                HarbormasterError::Runtime(RuntimeError::NotFound(id))
            }
            ReconcilerError::EventStream(msg) => {
                HarbormasterError::Runtime(RuntimeError::EventStream(msg))
            }
            ReconcilerError::DispatchFailed { command, reason } => {
                HarbormasterError::Runtime(RuntimeError::DispatchFailed { command, reason })
            }
            err @ ReconcilerError::Bootstrap { .. } => {
                HarbormasterError::Runtime(RuntimeError::DockerApi(err.to_string()))
            }
            ReconcilerError::Config { field, reason } => {
                HarbormasterError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
