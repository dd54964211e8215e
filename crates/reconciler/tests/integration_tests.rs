//! 통합 테스트 -- 부트스트랩부터 이벤트 처리까지 전체 플로우 검증
//!
//! 스크립트된 이벤트 스트림과 명령 기록기를 사용하여
//! 레지스트리 변화와 디스패치된 명령줄을 확인합니다.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use harbormaster_core::config::HarbormasterConfig;
use harbormaster_core::types::{
    ContainerSnapshot, EventAction, LifecycleEvent, RestartPolicy, RestartPolicyName,
};
use harbormaster_reconciler::{
    CommandRunner, ContainerInspector, EventStream, PlatformSelector, Reconciler,
    ReconcilerBuilder, ReconcilerConfig, ReconcilerError,
};

mod mock {
    use super::*;

    /// 스트림 단계: 이벤트를 내보내기 직전에 적용할 스냅샷 갱신
    pub struct Step {
        pub update: Option<ContainerSnapshot>,
        pub item: Result<LifecycleEvent, ReconcilerError>,
    }

    #[derive(Default)]
    pub struct ScriptedInspector {
        snapshots: Arc<Mutex<BTreeMap<String, ContainerSnapshot>>>,
        listed: Vec<String>,
        steps: Mutex<Vec<Step>>,
        since: Mutex<Option<i64>>,
    }

    impl ScriptedInspector {
        pub fn new() -> Self {
            Self::default()
        }

        /// 부트스트랩 목록에 포함되는 컨테이너
        pub fn running(mut self, snapshot: ContainerSnapshot) -> Self {
            self.listed.push(snapshot.id.clone());
            self.known(snapshot)
        }

        /// inspect만 가능한 컨테이너
        pub fn known(self, snapshot: ContainerSnapshot) -> Self {
            self.snapshots
                .lock()
                .unwrap()
                .insert(snapshot.id.clone(), snapshot);
            self
        }

        pub fn event(self, id: &str, action: EventAction) -> Self {
            self.push(None, Ok(LifecycleEvent::new(id, action)))
        }

        pub fn event_after(
            self,
            update: ContainerSnapshot,
            id: &str,
            action: EventAction,
        ) -> Self {
            self.push(Some(update), Ok(LifecycleEvent::new(id, action)))
        }

        pub fn stream_error(self, reason: &str) -> Self {
            self.push(None, Err(ReconcilerError::EventStream(reason.to_owned())))
        }

        fn push(self, update: Option<ContainerSnapshot>, item: Result<LifecycleEvent, ReconcilerError>) -> Self {
            self.steps.lock().unwrap().push(Step { update, item });
            self
        }

        pub fn since(&self) -> Option<i64> {
            *self.since.lock().unwrap()
        }
    }

    impl ContainerInspector for ScriptedInspector {
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
            self.snapshots
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| ReconcilerError::ContainerNotFound(id.to_owned()))
        }

        fn subscribe_events(&self, since: i64, _selector: &PlatformSelector) -> EventStream {
            *self.since.lock().unwrap() = Some(since);
            let steps = std::mem::take(&mut *self.steps.lock().unwrap());
            let snapshots = Arc::clone(&self.snapshots);
            futures::stream::iter(steps)
                .map(move |step| {
                    if let Some(snapshot) = step.update {
                        snapshots
                            .lock()
                            .unwrap()
                            .insert(snapshot.id.clone(), snapshot);
                    }
                    step.item
                })
                .boxed()
        }

        async fn ping(&self) -> Result<(), ReconcilerError> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<String>>,
        fail_all: bool,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail_all: true,
                ..Self::default()
            }
        }

        pub fn commands(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        async fn run(&self, argv: &[String], _quiet: bool) -> Result<(), ReconcilerError> {
            let command = argv.join(" ");
            self.calls.lock().unwrap().push(command.clone());
            if self.fail_all {
                return Err(ReconcilerError::DispatchFailed {
                    command,
                    reason: "exit status: 1".to_owned(),
                });
            }
            Ok(())
        }
    }
}

use mock::{RecordingRunner, ScriptedInspector};

fn web(id: &str, app: &str, address: Option<&str>) -> ContainerSnapshot {
    ContainerSnapshot {
        id: id.to_owned(),
        app_name: Some(app.to_owned()),
        network_address: address.map(str::to_owned),
        restart_policy: RestartPolicy::new(RestartPolicyName::OnFailure, 3),
        restart_count: 0,
    }
}

fn with_restarts(mut snapshot: ContainerSnapshot, policy: RestartPolicy, count: u64) -> ContainerSnapshot {
    snapshot.restart_policy = policy;
    snapshot.restart_count = count;
    snapshot
}

fn reconciler(
    config: ReconcilerConfig,
    inspector: &Arc<ScriptedInspector>,
    runner: &Arc<RecordingRunner>,
) -> Reconciler<ScriptedInspector, RecordingRunner> {
    ReconcilerBuilder::new()
        .config(config)
        .inspector(Arc::clone(inspector))
        .command_runner(Arc::clone(runner))
        .build()
        .expect("reconciler should build")
}

// =============================================================================
// 주소 변경 → 프록시 재생성
// =============================================================================

#[tokio::test]
async fn address_change_reloads_proxy_then_destroy_deregisters() {
    let inspector = Arc::new(
        ScriptedInspector::new()
            .running(web("c1", "blog", Some("10.0.0.5")))
            .event_after(web("c1", "blog", Some("10.0.0.6")), "c1", EventAction::Restart)
            .event("c1", EventAction::Destroy),
    );
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let err = reconciler.run().await.unwrap_err();

    assert!(matches!(err, ReconcilerError::EventStream(_)));
    assert_eq!(runner.commands(), vec!["dokku --quiet proxy:build-config blog"]);
    assert!(!reconciler.registry().contains("c1"));
    assert_eq!(reconciler.stats().reloads, 1);
}

#[tokio::test]
async fn reload_subcommand_is_configurable() {
    let inspector = Arc::new(
        ScriptedInspector::new()
            .running(web("c1", "blog", Some("10.0.0.5")))
            .event_after(web("c1", "blog", Some("10.0.0.6")), "c1", EventAction::Start),
    );
    let runner = Arc::new(RecordingRunner::new());
    let mut core = HarbormasterConfig::default();
    core.dispatch.reload_subcommand = "nginx:build-config".to_owned();
    let mut reconciler = reconciler(ReconcilerConfig::from_core(&core), &inspector, &runner);

    let _ = reconciler.run().await;
    assert_eq!(runner.commands(), vec!["dokku --quiet nginx:build-config blog"]);
}

#[tokio::test]
async fn duplicate_start_does_not_dispatch() {
    let inspector = Arc::new(
        ScriptedInspector::new()
            .running(web("c1", "blog", Some("10.0.0.5")))
            .event("c1", EventAction::Start)
            .event("c1", EventAction::Start),
    );
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let _ = reconciler.run().await;
    assert!(runner.commands().is_empty());
    assert_eq!(reconciler.registry().len(), 1);
    assert_eq!(
        reconciler
            .registry()
            .get("c1")
            .and_then(|s| s.network_address.as_deref()),
        Some("10.0.0.5")
    );
}

// =============================================================================
// 재시작 예산 소진 → 앱 재빌드
// =============================================================================

#[tokio::test]
async fn exhausted_budget_rebuilds_on_every_death() {
    let dead = with_restarts(
        web("c2", "api", None),
        RestartPolicy::new(RestartPolicyName::OnFailure, 3),
        3,
    );
    let inspector = Arc::new(
        ScriptedInspector::new()
            .known(dead)
            .event("c2", EventAction::Die)
            .event("c2", EventAction::Die),
    );
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let _ = reconciler.run().await;
    assert_eq!(
        runner.commands(),
        vec!["dokku --quiet ps:rebuild api", "dokku --quiet ps:rebuild api"]
    );
}

#[tokio::test]
async fn death_below_budget_waits_for_runtime_restart() {
    let dying = with_restarts(
        web("c2", "api", Some("10.0.0.7")),
        RestartPolicy::new(RestartPolicyName::OnFailure, 3),
        1,
    );
    let inspector = Arc::new(ScriptedInspector::new().known(dying).event("c2", EventAction::Die));
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let _ = reconciler.run().await;
    assert!(runner.commands().is_empty());
}

#[tokio::test]
async fn death_keeps_bootstrapped_entry() {
    let policy = RestartPolicy::new(RestartPolicyName::OnFailure, 3);
    let inspector = Arc::new(
        ScriptedInspector::new()
            .running(web("c1", "blog", Some("10.0.0.5")))
            .event_after(with_restarts(web("c1", "blog", None), policy, 1), "c1", EventAction::Die)
            .event_after(with_restarts(web("c1", "blog", None), policy, 3), "c1", EventAction::Die),
    );
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let _ = reconciler.run().await;
    assert_eq!(runner.commands(), vec!["dokku --quiet ps:rebuild blog"]);
    assert!(reconciler.registry().contains("c1"));
    assert_eq!(
        reconciler
            .registry()
            .get("c1")
            .and_then(|s| s.network_address.as_deref()),
        Some("10.0.0.5")
    );
}

#[tokio::test]
async fn policy_no_never_rebuilds() {
    let policy = RestartPolicy::new(RestartPolicyName::No, 0);
    let mut builder = ScriptedInspector::new().known(with_restarts(web("c5", "cron", None), policy, 0));
    for count in 1..4 {
        builder = builder.event_after(
            with_restarts(web("c5", "cron", None), policy, count),
            "c5",
            EventAction::Die,
        );
    }
    let inspector = Arc::new(builder.event("c5", EventAction::Die));
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let _ = reconciler.run().await;
    assert!(runner.commands().is_empty());
}

#[tokio::test]
async fn dispatch_failures_do_not_stop_the_loop() {
    let dead = with_restarts(
        web("c2", "api", None),
        RestartPolicy::new(RestartPolicyName::Always, 0),
        0,
    );
    let inspector = Arc::new(
        ScriptedInspector::new()
            .known(dead)
            .known(web("c1", "blog", Some("10.0.0.5")))
            .event("c2", EventAction::Die)
            .event("c1", EventAction::Start),
    );
    let runner = Arc::new(RecordingRunner::failing());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let err = reconciler.run().await.unwrap_err();
    assert!(matches!(err, ReconcilerError::EventStream(_)));
    assert!(reconciler.registry().contains("c1"));
    assert_eq!(reconciler.stats().dispatch_failures, 1);
}

// =============================================================================
// 제거 후 재시작 → 신규 등록
// =============================================================================

#[tokio::test]
async fn delete_then_start_registers_as_new() {
    let inspector = Arc::new(
        ScriptedInspector::new()
            .running(web("c1", "blog", Some("10.0.0.5")))
            .event("c1", EventAction::Delete)
            .event_after(web("c1", "blog", Some("10.0.0.9")), "c1", EventAction::Start),
    );
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let _ = reconciler.run().await;
    assert!(runner.commands().is_empty());
    assert_eq!(
        reconciler
            .registry()
            .get("c1")
            .and_then(|s| s.network_address.as_deref()),
        Some("10.0.0.9")
    );
}

#[tokio::test]
async fn start_before_network_attach_is_ignored() {
    let inspector = Arc::new(
        ScriptedInspector::new()
            .known(web("c3", "worker", None))
            .event("c3", EventAction::Start),
    );
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let _ = reconciler.run().await;
    assert!(reconciler.registry().is_empty());
}

// =============================================================================
// 치명적 에러
// =============================================================================

#[tokio::test]
async fn stream_error_is_fatal() {
    let inspector = Arc::new(
        ScriptedInspector::new()
            .known(web("c1", "blog", Some("10.0.0.5")))
            .stream_error("daemon went away")
            .event("c1", EventAction::Start),
    );
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let err = reconciler.run().await.unwrap_err();
    assert!(err.to_string().contains("daemon went away"));
    assert!(reconciler.registry().is_empty());
}

#[tokio::test]
async fn strict_network_bootstrap_is_fatal() {
    let inspector = Arc::new(ScriptedInspector::new().running(web("c3", "worker", None)));
    let runner = Arc::new(RecordingRunner::new());
    let mut core = HarbormasterConfig::default();
    core.platform.strict_network = true;
    let mut reconciler = reconciler(ReconcilerConfig::from_core(&core), &inspector, &runner);

    let err = reconciler.run().await.unwrap_err();
    assert!(matches!(err, ReconcilerError::Bootstrap { .. }));
    assert!(inspector.since().is_none());
}

#[tokio::test]
async fn lenient_bootstrap_skips_and_continues() {
    let inspector = Arc::new(
        ScriptedInspector::new()
            .running(web("c3", "worker", None))
            .running(web("c1", "blog", Some("10.0.0.5"))),
    );
    let runner = Arc::new(RecordingRunner::new());
    let mut reconciler = reconciler(ReconcilerConfig::default(), &inspector, &runner);

    let report = reconciler.bootstrap().await.unwrap();
    assert_eq!(report.registered, 1);
    assert_eq!(report.skipped, 1);
    assert!(reconciler.registry().contains("c1"));
}
