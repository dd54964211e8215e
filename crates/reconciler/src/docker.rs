//! Docker API 추상화
//!
//! [`ContainerInspector`] 트레이트는 리컨실러가 필요로 하는 컨테이너 런타임 조회를
//! 추상화합니다. 프로덕션에서는 [`BollardInspector`]를, 테스트에서는 `MockInspector`를
//! 사용합니다.
//!
//! ```text
//! ┌────────────┐      ┌──────────────────┐
//! │ Reconciler │─────▶│ContainerInspector│ (trait)
//! └────────────┘      └──────────────────┘
//!                          │         │
//!                          ▼         ▼
//!                    ┌─────────┐ ┌──────┐
//!                    │ Bollard │ │ Mock │
//!                    └────┬────┘ └──────┘
//!                         ▼
//!                   Docker Daemon
//! ```
//!
//! inspect 응답은 [`snapshot_from_inspect`]에서 한 번에 [`ContainerSnapshot`]으로
//! 변환됩니다. 이후 단계는 라벨 맵이나 네트워크 맵을 직접 보지 않습니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bollard::models::{ContainerInspectResponse, EventMessage};
use futures::StreamExt;
use futures::stream::BoxStream;
use harbormaster_core::config::DockerConfig;
use harbormaster_core::types::{
    ContainerSnapshot, EventAction, LifecycleEvent, RestartPolicy, RestartPolicyName,
};
use tracing::debug;

use crate::config::PlatformSelector;
use crate::error::ReconcilerError;

/// 라이프사이클 이벤트 스트림
///
/// `Err` 항목은 스트림 실패를 의미하며 이벤트 루프를 종료시킵니다.
pub type EventStream = BoxStream<'static, Result<LifecycleEvent, ReconcilerError>>;

/// 컨테이너 ID 형식을 검증합니다. (1-64자 hex)
fn validate_container_id(id: &str) -> Result<(), ReconcilerError> {
    if id.is_empty() || id.len() > 64 {
        return Err(ReconcilerError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ReconcilerError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// 컨테이너 런타임 조회 트레이트
///
/// `Send + Sync + 'static`이므로 `Arc`로 공유하여 비동기 컨텍스트에서 사용할 수 있습니다.
///
/// # 에러 처리
///
/// - 404 응답: `ReconcilerError::ContainerNotFound`
/// - 연결 실패: `ReconcilerError::DockerConnection`
/// - 그 외 API 실패: `ReconcilerError::DockerApi`
pub trait ContainerInspector: Send + Sync + 'static {
    /// 선택 조건에 맞는 실행 중인 컨테이너 ID 목록을 반환합니다.
    fn list_containers(
        &self,
        selector: &PlatformSelector,
    ) -> impl Future<Output = Result<Vec<String>, ReconcilerError>> + Send;

    /// 컨테이너를 inspect하여 스냅샷을 반환합니다.
    ///
    /// 앱 라벨이 없는 컨테이너도 에러가 아니며 `app_name: None`인 스냅샷을 반환합니다.
    fn inspect_container(
        &self,
        id: &str,
        selector: &PlatformSelector,
    ) -> impl Future<Output = Result<ContainerSnapshot, ReconcilerError>> + Send;

    /// `since`(Unix 초) 이후의 컨테이너 이벤트를 구독합니다.
    ///
    /// 이벤트 종류는 `container`로, 라벨은 선택 조건으로 서버 측에서 필터링됩니다.
    fn subscribe_events(&self, since: i64, selector: &PlatformSelector) -> EventStream;

    /// Docker 데몬 연결 상태를 확인합니다.
    fn ping(&self) -> impl Future<Output = Result<(), ReconcilerError>> + Send;
}

/// 선택 조건으로 Docker 필터 맵을 생성합니다.
fn label_filter_map(selector: &PlatformSelector) -> HashMap<String, Vec<String>> {
    let mut filters = HashMap::new();
    filters.insert("label".to_owned(), selector.label_filters());
    filters
}

/// inspect 응답을 [`ContainerSnapshot`]으로 변환합니다.
///
/// 네트워크 주소는 선택 조건의 네트워크 키가 존재할 때만 채워집니다.
/// 키가 있고 주소가 빈 문자열이면 `Some("")`입니다.
pub fn snapshot_from_inspect(
    fallback_id: &str,
    details: ContainerInspectResponse,
    selector: &PlatformSelector,
) -> ContainerSnapshot {
    let id = details
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| fallback_id.to_owned());

    let app_name = details
        .config
        .and_then(|c| c.labels)
        .and_then(|mut labels| labels.remove(&selector.app_label));

    let network_address = details
        .network_settings
        .and_then(|n| n.networks)
        .and_then(|mut networks| networks.remove(&selector.network))
        .map(|endpoint| endpoint.ip_address.unwrap_or_default());

    let restart_policy = details
        .host_config
        .and_then(|h| h.restart_policy)
        .map(|p| {
            let name = p
                .name
                .map(|n| RestartPolicyName::parse(&n.to_string()))
                .unwrap_or(RestartPolicyName::Unspecified);
            let max_retries = u64::try_from(p.maximum_retry_count.unwrap_or(0)).unwrap_or(0);
            RestartPolicy::new(name, max_retries)
        })
        .unwrap_or_else(|| RestartPolicy::new(RestartPolicyName::Unspecified, 0));

    let restart_count = u64::try_from(details.restart_count.unwrap_or(0)).unwrap_or(0);

    ContainerSnapshot {
        id,
        app_name,
        network_address,
        restart_policy,
        restart_count,
    }
}

/// 이벤트 메시지를 [`LifecycleEvent`]로 변환합니다.
///
/// 액터 ID나 액션이 없는 메시지는 `None`을 반환합니다.
pub fn lifecycle_event_from_message(message: EventMessage) -> Option<LifecycleEvent> {
    let action = message.action.filter(|a| !a.is_empty())?;
    let container_id = message
        .actor
        .and_then(|actor| actor.id)
        .filter(|id| !id.is_empty())?;

    Some(LifecycleEvent {
        container_id,
        action: EventAction::parse(&action),
        time: message.time,
    })
}

/// `bollard` 기반 프로덕션 구현
pub struct BollardInspector {
    docker: Arc<bollard::Docker>,
}

impl BollardInspector {
    /// Docker 설정으로 연결합니다.
    ///
    /// 소켓 경로가 비어 있으면 플랫폼 기본값(`DOCKER_HOST` 또는 로컬 소켓)을 사용합니다.
    ///
    /// # Errors
    ///
    /// 연결 생성에 실패하면 `ReconcilerError::DockerConnection`을 반환합니다.
    pub fn connect(config: &DockerConfig) -> Result<Self, ReconcilerError> {
        let docker = if config.socket.trim().is_empty() {
            bollard::Docker::connect_with_local_defaults().map_err(|e| {
                ReconcilerError::DockerConnection(format!("failed to connect to docker: {e}"))
            })?
        } else {
            bollard::Docker::connect_with_socket(
                &config.socket,
                config.request_timeout_secs,
                bollard::API_DEFAULT_VERSION,
            )
            .map_err(|e| {
                ReconcilerError::DockerConnection(format!(
                    "failed to connect to docker at {}: {e}",
                    config.socket
                ))
            })?
        };

        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl ContainerInspector for BollardInspector {
    async fn list_containers(
        &self,
        selector: &PlatformSelector,
    ) -> Result<Vec<String>, ReconcilerError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false,
            filters: label_filter_map(selector),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| ReconcilerError::DockerApi(format!("list containers failed: {e}")))?;

        Ok(containers
            .into_iter()
            .filter_map(|c| c.id)
            .filter(|id| !id.is_empty())
            .collect())
    }

    async fn inspect_container(
        &self,
        id: &str,
        selector: &PlatformSelector,
    ) -> Result<ContainerSnapshot, ReconcilerError> {
        validate_container_id(id)?;

        let details = self
            .docker
            .inspect_container(id, None)
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => ReconcilerError::ContainerNotFound(id.to_owned()),
                other => ReconcilerError::DockerApi(format!("inspect container failed: {other}")),
            })?;

        Ok(snapshot_from_inspect(id, details, selector))
    }

    fn subscribe_events(&self, since: i64, selector: &PlatformSelector) -> EventStream {
        use bollard::system::EventsOptions;

        let mut filters = label_filter_map(selector);
        filters.insert("type".to_owned(), vec!["container".to_owned()]);

        let options = EventsOptions::<String> {
            since: Some(since.to_string()),
            until: None,
            filters,
        };

        self.docker
            .events(Some(options))
            .filter_map(|item| async move {
                match item {
                    Ok(message) => {
                        let event = lifecycle_event_from_message(message);
                        if event.is_none() {
                            debug!("skipping event message without actor id or action");
                        }
                        event.map(Ok)
                    }
                    Err(e) => Some(Err(ReconcilerError::EventStream(e.to_string()))),
                }
            })
            .boxed()
    }

    async fn ping(&self) -> Result<(), ReconcilerError> {
        self.docker
            .ping()
            .await
            .map_err(|e| ReconcilerError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// 테스트용 Mock inspector
///
/// 스냅샷은 테스트 도중 `set_snapshot`으로 교체할 수 있어
/// 같은 컨테이너의 주소 변경 시나리오를 재현할 수 있습니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockInspector {
    snapshots: std::sync::Mutex<std::collections::BTreeMap<String, ContainerSnapshot>>,
    listed: Vec<String>,
    events: std::sync::Mutex<Vec<Result<LifecycleEvent, ReconcilerError>>>,
    subscribed_since: std::sync::Mutex<Option<i64>>,
    inspect_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// inspect 대상 스냅샷을 추가합니다. (목록에는 포함되지 않음)
    pub fn with_snapshot(self, snapshot: ContainerSnapshot) -> Self {
        self.set_snapshot(snapshot);
        self
    }

    /// 목록 조회에 포함될 컨테이너 ID를 추가합니다.
    pub fn with_listed_id(mut self, id: &str) -> Self {
        self.listed.push(id.to_owned());
        self
    }

    /// 구독 시 반환할 이벤트 시퀀스를 설정합니다.
    pub fn with_events(self, events: Vec<Result<LifecycleEvent, ReconcilerError>>) -> Self {
        *self.events.lock().unwrap() = events;
        self
    }

    /// 스냅샷을 교체합니다.
    pub fn set_snapshot(&self, snapshot: ContainerSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.id.clone(), snapshot);
    }

    pub fn subscribed_since(&self) -> Option<i64> {
        *self.subscribed_since.lock().unwrap()
    }

    pub fn inspect_calls(&self) -> usize {
        self.inspect_calls
            .load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl ContainerInspector for MockInspector {
    async fn list_containers(
        &self,
        _selector: &PlatformSelector,
    ) -> Result<Vec<String>, ReconcilerError> {
        Ok(self.listed.clone())
    }

    async fn inspect_container(
        &self,
        id: &str,
        _selector: &PlatformSelector,
    ) -> Result<ContainerSnapshot, ReconcilerError> {
        self.inspect_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.snapshots
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ReconcilerError::ContainerNotFound(id.to_owned()))
    }

    fn subscribe_events(&self, since: i64, _selector: &PlatformSelector) -> EventStream {
        *self.subscribed_since.lock().unwrap() = Some(since);
        let events = std::mem::take(&mut *self.events.lock().unwrap());
        futures::stream::iter(events).boxed()
    }

    async fn ping(&self) -> Result<(), ReconcilerError> {
        Ok(())
    }
}
