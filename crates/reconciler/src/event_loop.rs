//! 이벤트 루프 -- 이벤트 스트림을 도착 순서대로 하나씩 처리
//!
//! ```text
//! EventStream ──> EventLoop.process_event()
//!                      |
//!                 EventClassifier.classify()  (레지스트리 갱신, 디스패치 완료까지 대기)
//!                      |
//!                   Outcome ──> metrics
//! ```
//!
//! 스트림의 `Err` 항목이나 스트림 종료는 루프를 끝내는 치명적 에러입니다.

use std::convert::Infallible;
use std::sync::Arc;

use futures::StreamExt;
use harbormaster_core::metrics as m;
use harbormaster_core::types::LifecycleEvent;
use tracing::{debug, error, info};

use crate::classifier::{EventClassifier, Outcome};
use crate::config::PlatformSelector;
use crate::dispatcher::CommandRunner;
use crate::docker::ContainerInspector;
use crate::error::ReconcilerError;
use crate::registry::ContainerRegistry;

/// 처리 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventLoopStats {
    /// 처리한 이벤트 수
    pub events_processed: u64,
    /// 디스패치한 재빌드 수
    pub rebuilds: u64,
    /// 디스패치한 프록시 재생성 수
    pub reloads: u64,
    /// 실패한 디스패치 수
    pub dispatch_failures: u64,
}

/// 이벤트 루프
///
/// 레지스트리를 단독 소유합니다.
pub struct EventLoop<I: ContainerInspector, R: CommandRunner> {
    registry: ContainerRegistry,
    classifier: EventClassifier<I, R>,
    inspector: Arc<I>,
    selector: PlatformSelector,
    stats: EventLoopStats,
}

impl<I: ContainerInspector, R: CommandRunner> EventLoop<I, R> {
    pub fn new(
        registry: ContainerRegistry,
        classifier: EventClassifier<I, R>,
        inspector: Arc<I>,
        selector: PlatformSelector,
    ) -> Self {
        Self {
            registry,
            classifier,
            inspector,
            selector,
            stats: EventLoopStats::default(),
        }
    }

    /// 이벤트 하나를 처리하고 결과를 반환합니다.
    pub async fn process_event(&mut self, event: &LifecycleEvent) -> Outcome {
        metrics::counter!(m::EVENTS_RECEIVED_TOTAL, m::LABEL_ACTION => event.action.label())
            .increment(1);
        debug!(container_id = event.short_id(), action = %event.action, "received event");

        let outcome = self.classifier.classify(&mut self.registry, event).await;
        self.stats.events_processed += 1;

        match &outcome {
            Outcome::Ignored(reason) => {
                metrics::counter!(m::EVENTS_IGNORED_TOTAL, m::LABEL_REASON => reason.as_str())
                    .increment(1);
            }
            Outcome::RebuildDispatched { succeeded } => {
                self.stats.rebuilds += 1;
                if !succeeded {
                    self.stats.dispatch_failures += 1;
                }
            }
            Outcome::ReloadDispatched { succeeded, .. } => {
                self.stats.reloads += 1;
                if !succeeded {
                    self.stats.dispatch_failures += 1;
                }
            }
            Outcome::Registered | Outcome::Refreshed | Outcome::Deregistered => {}
        }

        outcome
    }

    /// `since` 이후의 이벤트를 구독하여 처리합니다.
    ///
    /// 정상적으로는 반환하지 않습니다.
    ///
    /// # Errors
    ///
    /// 이벤트 스트림이 에러를 보내거나 끝나면 `ReconcilerError::EventStream`을 반환합니다.
    pub async fn run(&mut self, since: i64) -> Result<Infallible, ReconcilerError> {
        let mut stream = self.inspector.subscribe_events(since, &self.selector);
        info!(since, registered = self.registry.len(), "watching container events");

        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    self.process_event(&event).await;
                }
                Err(e) => {
                    error!(error = %e, "events_failure");
                    return Err(e);
                }
            }
        }

        error!("events_failure: event stream ended");
        Err(ReconcilerError::EventStream("event stream ended".to_owned()))
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ContainerRegistry {
        &mut self.registry
    }

    pub fn stats(&self) -> EventLoopStats {
        self.stats
    }
}
