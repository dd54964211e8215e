//! 시작 시 컨테이너 스캔
//!
//! 이벤트 구독 전에 실행 중인 플랫폼 컨테이너를 나열하고 inspect하여
//! 레지스트리를 채웁니다. 스캔 시작 시각은 이벤트 구독의 `since` 값으로 사용되어
//! 스캔 도중 발생한 이벤트가 누락되지 않습니다.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use harbormaster_core::metrics as m;
use tracing::{info, warn};

use crate::config::PlatformSelector;
use crate::docker::ContainerInspector;
use crate::error::ReconcilerError;
use crate::registry::ContainerRegistry;

/// 부트스트랩 스캔 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// 스캔 시작 시각 (Unix 초)
    pub started_at: i64,
    /// 등록된 컨테이너 수
    pub registered: usize,
    /// 건너뛴 컨테이너 수
    pub skipped: usize,
}

/// 현재 시각을 Unix 초로 반환합니다.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// 부트스트랩 스캐너
pub struct BootstrapScanner<I: ContainerInspector> {
    inspector: Arc<I>,
    selector: PlatformSelector,
    strict_network: bool,
}

impl<I: ContainerInspector> BootstrapScanner<I> {
    pub fn new(inspector: Arc<I>, selector: PlatformSelector, strict_network: bool) -> Self {
        Self {
            inspector,
            selector,
            strict_network,
        }
    }

    /// 레지스트리를 비우고 실행 중인 컨테이너로 다시 채웁니다.
    ///
    /// # Errors
    ///
    /// 목록 조회 또는 개별 inspect가 실패하면 에러를 반환합니다. 호출자는 이를
    /// 치명적 에러로 처리해야 합니다. `strict_network`가 켜져 있으면 네트워크에
    /// 연결되지 않은 컨테이너도 에러입니다.
    pub async fn scan(
        &self,
        registry: &mut ContainerRegistry,
    ) -> Result<BootstrapReport, ReconcilerError> {
        let timer = Instant::now();
        let started_at = unix_now();

        for id in registry.ids() {
            registry.remove(&id);
        }

        let ids = self.inspector.list_containers(&self.selector).await?;
        let mut report = BootstrapReport {
            started_at,
            registered: 0,
            skipped: 0,
        };

        for id in ids {
            let snapshot = self
                .inspector
                .inspect_container(&id, &self.selector)
                .await
                .map_err(|e| ReconcilerError::Bootstrap {
                    container_id: id.clone(),
                    reason: e.to_string(),
                })?;

            if !snapshot.is_platform_managed() {
                report.skipped += 1;
                continue;
            }

            let Some(address) = snapshot.network_address.clone() else {
                if self.strict_network {
                    return Err(ReconcilerError::Bootstrap {
                        container_id: id,
                        reason: format!("not attached to network '{}'", self.selector.network),
                    });
                }
                warn!(
                    container_id = snapshot.short_id(),
                    app = snapshot.app(),
                    network = %self.selector.network,
                    "register_skip:non-attached-network"
                );
                report.skipped += 1;
                continue;
            };

            info!(
                container_id = snapshot.short_id(),
                app = snapshot.app(),
                ip_address = %address,
                "register_container"
            );
            registry.put(snapshot);
            report.registered += 1;
        }

        metrics::histogram!(m::BOOTSTRAP_DURATION_SECONDS).record(timer.elapsed().as_secs_f64());
        info!(
            registered = report.registered,
            skipped = report.skipped,
            since = report.started_at,
            "bootstrap_complete"
        );

        Ok(report)
    }
}
