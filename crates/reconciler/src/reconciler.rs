//! 리컨실러 -- 부트스트랩 스캔과 이벤트 루프를 묶는 최상위 엔진
//!
//! # 내부 아키텍처
//! ```text
//! BootstrapScanner.scan() ──> ContainerRegistry
//!          | started_at
//!          v
//! ContainerInspector.subscribe_events(since = started_at)
//!          |
//!      EventLoop.run() ──> EventClassifier ──> ActionDispatcher ──> CommandRunner
//! ```
//!
//! # 사용 예시
//! ```ignore
//! use std::sync::Arc;
//! use harbormaster_reconciler::{BollardInspector, ReconcilerBuilder, ShellCommandRunner};
//!
//! let mut reconciler = ReconcilerBuilder::new()
//!     .config(config)
//!     .inspector(Arc::new(BollardInspector::connect(&docker_config)?))
//!     .command_runner(Arc::new(ShellCommandRunner::new()))
//!     .build()?;
//!
//! // 스트림 실패 시에만 반환
//! let err = reconciler.run().await.unwrap_err();
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use tracing::{error, info};

use crate::bootstrap::{BootstrapReport, BootstrapScanner};
use crate::classifier::EventClassifier;
use crate::config::ReconcilerConfig;
use crate::dispatcher::{ActionDispatcher, CommandRunner};
use crate::docker::ContainerInspector;
use crate::error::ReconcilerError;
use crate::event_loop::{EventLoop, EventLoopStats};
use crate::registry::ContainerRegistry;

/// 리컨실레이션 엔진
pub struct Reconciler<I: ContainerInspector, R: CommandRunner> {
    config: ReconcilerConfig,
    scanner: BootstrapScanner<I>,
    event_loop: EventLoop<I, R>,
}

impl<I: ContainerInspector, R: CommandRunner> Reconciler<I, R> {
    /// 레지스트리를 초기 스캔으로 채웁니다.
    ///
    /// # Errors
    ///
    /// 스캔 실패는 치명적입니다. 호출자는 이벤트 처리를 시작하지 않아야 합니다.
    pub async fn bootstrap(&mut self) -> Result<BootstrapReport, ReconcilerError> {
        self.scanner
            .scan(self.event_loop.registry_mut())
            .await
            .inspect_err(|e| error!(error = %e, "containers_init_failed"))
    }

    /// 부트스트랩 후 이벤트 루프를 실행합니다.
    ///
    /// 이벤트 구독의 시작 시각은 부트스트랩 시작 시각입니다.
    ///
    /// # Errors
    ///
    /// 부트스트랩 실패 또는 이벤트 스트림 실패 시 반환합니다.
    pub async fn run(&mut self) -> Result<Infallible, ReconcilerError> {
        info!(
            network = %self.config.selector.network,
            app_label = %self.config.selector.app_label,
            "starting reconciler"
        );
        let report = self.bootstrap().await?;
        self.event_loop.run(report.started_at).await
    }

    pub fn registry(&self) -> &ContainerRegistry {
        self.event_loop.registry()
    }

    pub fn stats(&self) -> EventLoopStats {
        self.event_loop.stats()
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// 리컨실러 빌더
pub struct ReconcilerBuilder<I: ContainerInspector, R: CommandRunner> {
    config: ReconcilerConfig,
    inspector: Option<Arc<I>>,
    runner: Option<Arc<R>>,
}

impl<I: ContainerInspector, R: CommandRunner> Default for ReconcilerBuilder<I, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ContainerInspector, R: CommandRunner> ReconcilerBuilder<I, R> {
    pub fn new() -> Self {
        Self {
            config: ReconcilerConfig::default(),
            inspector: None,
            runner: None,
        }
    }

    pub fn config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// 컨테이너 런타임 inspector를 설정합니다.
    pub fn inspector(mut self, inspector: Arc<I>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// 외부 명령 실행기를 설정합니다.
    pub fn command_runner(mut self, runner: Arc<R>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// 설정을 검증하고 리컨실러를 생성합니다.
    pub fn build(self) -> Result<Reconciler<I, R>, ReconcilerError> {
        self.config.validate()?;

        let inspector = self.inspector.ok_or_else(|| ReconcilerError::Config {
            field: "inspector".to_owned(),
            reason: "container inspector must be provided".to_owned(),
        })?;
        let runner = self.runner.ok_or_else(|| ReconcilerError::Config {
            field: "command_runner".to_owned(),
            reason: "command runner must be provided".to_owned(),
        })?;

        let selector = self.config.selector.clone();
        let scanner = BootstrapScanner::new(
            Arc::clone(&inspector),
            selector.clone(),
            self.config.strict_network,
        );
        let classifier = EventClassifier::new(
            Arc::clone(&inspector),
            ActionDispatcher::new(runner, self.config.dispatch.clone()),
            selector.clone(),
        );
        let event_loop = EventLoop::new(ContainerRegistry::new(), classifier, inspector, selector);

        Ok(Reconciler {
            config: self.config,
            scanner,
            event_loop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::RecordingRunner;
    use crate::docker::MockInspector;
    use harbormaster_core::types::{ContainerSnapshot, EventAction, LifecycleEvent, RestartPolicy};

    fn snapshot(id: &str, app: &str, address: &str) -> ContainerSnapshot {
        ContainerSnapshot {
            id: id.to_owned(),
            app_name: Some(app.to_owned()),
            network_address: Some(address.to_owned()),
            restart_policy: RestartPolicy::default(),
            restart_count: 0,
        }
    }

    #[test]
    fn build_requires_inspector() {
        let result = ReconcilerBuilder::<MockInspector, RecordingRunner>::new()
            .command_runner(Arc::new(RecordingRunner::new()))
            .build();
        assert!(matches!(
            result,
            Err(ReconcilerError::Config { ref field, .. }) if field == "inspector"
        ));
    }

    #[test]
    fn build_requires_runner() {
        let result = ReconcilerBuilder::<MockInspector, RecordingRunner>::new()
            .inspector(Arc::new(MockInspector::new()))
            .build();
        assert!(matches!(
            result,
            Err(ReconcilerError::Config { ref field, .. }) if field == "command_runner"
        ));
    }

    #[test]
    fn build_validates_config() {
        let mut config = ReconcilerConfig::default();
        config.dispatch.cli = String::new();
        let result = ReconcilerBuilder::new()
            .config(config)
            .inspector(Arc::new(MockInspector::new()))
            .command_runner(Arc::new(RecordingRunner::new()))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_subscribes_from_bootstrap_start() {
        let inspector = Arc::new(
            MockInspector::new()
                .with_snapshot(snapshot("c1", "blog", "10.0.0.5"))
                .with_listed_id("c1")
                .with_events(vec![Ok(LifecycleEvent::new("c1", EventAction::Start))]),
        );
        let runner = Arc::new(RecordingRunner::new());
        let mut reconciler = ReconcilerBuilder::new()
            .inspector(Arc::clone(&inspector))
            .command_runner(Arc::clone(&runner))
            .build()
            .unwrap();

        let before = crate::bootstrap::unix_now();
        let err = reconciler.run().await.unwrap_err();

        assert!(matches!(err, ReconcilerError::EventStream(_)));
        assert!(inspector.subscribed_since().unwrap() >= before);
        assert!(reconciler.registry().contains("c1"));
        assert_eq!(reconciler.stats().events_processed, 1);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_failure_prevents_subscription() {
        let inspector = Arc::new(MockInspector::new().with_listed_id("missing"));
        let mut reconciler = ReconcilerBuilder::new()
            .inspector(Arc::clone(&inspector))
            .command_runner(Arc::new(RecordingRunner::new()))
            .build()
            .unwrap();

        let err = reconciler.run().await.unwrap_err();
        assert!(matches!(err, ReconcilerError::Bootstrap { .. }));
        assert!(inspector.subscribed_since().is_none());
    }
}
