//! 이벤트 분류기
//!
//! 라이프사이클 이벤트 하나와 현재 레지스트리 상태로부터 수행할 액션을 결정하고
//! 레지스트리를 갱신합니다.
//!
//! # 처리 순서
//!
//! 1. `delete`/`destroy` → 레지스트리에서 제거 (inspect 없음)
//! 2. 그 외 액션 → 컨테이너 inspect (실패 시 무시)
//! 3. `die` → 재시작 예산 소진 시 앱 재빌드 후 종료 (레지스트리 유지)
//! 4. `start`/`restart`가 아니면 종료
//! 5. 네트워크 미연결이면 종료
//! 6. 신규 등록, 또는 주소 변경 시 프록시 재생성
//!
//! 디스패치 실패는 로그만 남기며 다음 단계 평가를 막지 않습니다.

use std::sync::Arc;

use harbormaster_core::types::{ContainerSnapshot, EventAction, LifecycleEvent, RestartPolicyName};
use tracing::{debug, info, warn};

use crate::config::PlatformSelector;
use crate::dispatcher::{ActionDispatcher, CommandRunner, RemediationAction};
use crate::docker::ContainerInspector;
use crate::registry::ContainerRegistry;

/// 이벤트를 무시한 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    /// 레지스트리에 없는 컨테이너의 제거 이벤트
    UnknownContainer,
    /// inspect 실패 (컨테이너가 이미 사라짐 등)
    InspectFailed,
    /// 앱 라벨 없음
    NotPlatformManaged,
    /// 재시작 정책 `no`인 컨테이너의 종료
    RestartDisabled,
    /// 재시작 예산이 남아 있는 종료 (Docker가 재시작함)
    RestartPending,
    /// 처리 대상이 아닌 액션
    NotStartAction,
    /// 데이터 플레인 네트워크에 연결되지 않음
    NetworkNotReady,
}

impl IgnoreReason {
    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownContainer => "unknown_container",
            Self::InspectFailed => "inspect_failed",
            Self::NotPlatformManaged => "not_platform_managed",
            Self::RestartDisabled => "restart_disabled",
            Self::RestartPending => "restart_pending",
            Self::NotStartAction => "not_start_action",
            Self::NetworkNotReady => "network_not_ready",
        }
    }
}

/// 이벤트 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 레지스트리에서 제거됨
    Deregistered,
    /// 아무 변화 없음
    Ignored(IgnoreReason),
    /// 새로 등록됨
    Registered,
    /// 같은 주소로 스냅샷만 갱신됨
    Refreshed,
    /// 앱 재빌드를 디스패치함
    RebuildDispatched { succeeded: bool },
    /// 주소 변경으로 프록시 재생성을 디스패치함
    ReloadDispatched {
        old_address: String,
        new_address: String,
        succeeded: bool,
    },
}

/// 이벤트 분류기
pub struct EventClassifier<I: ContainerInspector, R: CommandRunner> {
    inspector: Arc<I>,
    dispatcher: ActionDispatcher<R>,
    selector: PlatformSelector,
}

impl<I: ContainerInspector, R: CommandRunner> EventClassifier<I, R> {
    pub fn new(
        inspector: Arc<I>,
        dispatcher: ActionDispatcher<R>,
        selector: PlatformSelector,
    ) -> Self {
        Self {
            inspector,
            dispatcher,
            selector,
        }
    }

    /// 이벤트 하나를 처리합니다.
    ///
    /// 디스패치한 외부 명령이 끝날 때까지 반환하지 않습니다.
    pub async fn classify(
        &self,
        registry: &mut ContainerRegistry,
        event: &LifecycleEvent,
    ) -> Outcome {
        let container_id = event.short_id();

        if event.action.is_removal() {
            return match registry.remove(&event.container_id) {
                Some(removed) => {
                    info!(container_id, app = removed.app(), "dead_container");
                    Outcome::Deregistered
                }
                None => Outcome::Ignored(IgnoreReason::UnknownContainer),
            };
        }

        let snapshot = match self
            .inspector
            .inspect_container(&event.container_id, &self.selector)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                info!(container_id, action = %event.action, error = %e, "inspect_failed");
                return Outcome::Ignored(IgnoreReason::InspectFailed);
            }
        };

        if !snapshot.is_platform_managed() {
            debug!(container_id, action = %event.action, "non-platform-container");
            return Outcome::Ignored(IgnoreReason::NotPlatformManaged);
        }

        // die는 레지스트리를 건드리지 않음. 제거는 delete/destroy에서만
        if event.action == EventAction::Die {
            if snapshot.restart_policy.name == RestartPolicyName::No {
                return Outcome::Ignored(IgnoreReason::RestartDisabled);
            }
            return self
                .handle_death(&snapshot)
                .await
                .unwrap_or(Outcome::Ignored(IgnoreReason::RestartPending));
        }

        if !event.action.is_start() {
            return Outcome::Ignored(IgnoreReason::NotStartAction);
        }

        self.handle_start(registry, snapshot).await
    }

    /// 재시작 예산이 소진되었으면 앱 재빌드를 디스패치합니다.
    async fn handle_death(&self, snapshot: &ContainerSnapshot) -> Option<Outcome> {
        let policy = snapshot.restart_policy;
        if !policy.budget_exhausted(snapshot.restart_count) {
            return None;
        }

        info!(
            container_id = snapshot.short_id(),
            app = snapshot.app(),
            restart_policy = %policy.name,
            restart_count = snapshot.restart_count,
            max_restart_count = policy.max_retries,
            "rebuilding_app"
        );

        let action = RemediationAction::RebuildApp {
            app: snapshot.app().to_owned(),
        };
        let succeeded = match self.dispatcher.dispatch(&action).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    container_id = snapshot.short_id(),
                    app = snapshot.app(),
                    error = %e,
                    "rebuild_failed"
                );
                false
            }
        };
        Some(Outcome::RebuildDispatched { succeeded })
    }

    async fn handle_start(
        &self,
        registry: &mut ContainerRegistry,
        snapshot: ContainerSnapshot,
    ) -> Outcome {
        let Some(new_address) = snapshot.network_address.clone() else {
            info!(
                container_id = snapshot.short_id(),
                app = snapshot.app(),
                network = %self.selector.network,
                "non-attached-network"
            );
            return Outcome::Ignored(IgnoreReason::NetworkNotReady);
        };

        let container_id = snapshot.short_id().to_owned();
        let app = snapshot.app().to_owned();

        let Some(previous) = registry.put(snapshot) else {
            info!(
                container_id = %container_id,
                app = %app,
                ip_address = %new_address,
                "new_container"
            );
            return Outcome::Registered;
        };

        let old_address = previous.network_address.unwrap_or_default();
        if old_address == new_address {
            return Outcome::Refreshed;
        }

        info!(
            container_id = %container_id,
            app = %app,
            old_ip_address = %old_address,
            new_ip_address = %new_address,
            "reloading_proxy"
        );

        let action = RemediationAction::ReloadProxy { app: app.clone() };
        let succeeded = match self.dispatcher.dispatch(&action).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    container_id = %container_id,
                    app = %app,
                    error = %e,
                    "reload_failed"
                );
                false
            }
        };

        Outcome::ReloadDispatched {
            old_address,
            new_address,
            succeeded,
        }
    }
}
