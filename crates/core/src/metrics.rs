//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! reconciler는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `harbormaster_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 이벤트 액션 레이블 키 (start, restart, die, delete, destroy, other)
pub const LABEL_ACTION: &str = "action";

/// 무시 사유 레이블 키
pub const LABEL_REASON: &str = "reason";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Reconciler 메트릭 ──────────────────────────────────────────────

/// 수신한 라이프사이클 이벤트 수 (counter, label: action)
pub const EVENTS_RECEIVED_TOTAL: &str = "harbormaster_events_received_total";

/// 무시된 이벤트 수 (counter, label: reason)
pub const EVENTS_IGNORED_TOTAL: &str = "harbormaster_events_ignored_total";

/// 레지스트리에 등록된 컨테이너 수 (gauge)
pub const REGISTERED_CONTAINERS: &str = "harbormaster_registered_containers";

/// 앱 재빌드 디스패치 수 (counter, label: result)
pub const REBUILDS_TOTAL: &str = "harbormaster_rebuilds_total";

/// 프록시 설정 재생성 디스패치 수 (counter, label: result)
pub const PROXY_RELOADS_TOTAL: &str = "harbormaster_proxy_reloads_total";

/// 부트스트랩 스캔 소요 시간 (histogram, 초)
pub const BOOTSTRAP_DURATION_SECONDS: &str = "harbormaster_bootstrap_duration_seconds";

/// 결과 레이블 값 헬퍼
pub fn result_label(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        EVENTS_RECEIVED_TOTAL,
        "Container lifecycle events received from the runtime"
    );
    describe_counter!(
        EVENTS_IGNORED_TOTAL,
        "Events dropped without registry change or dispatch"
    );
    describe_gauge!(
        REGISTERED_CONTAINERS,
        "Running platform-managed containers currently registered"
    );
    describe_counter!(REBUILDS_TOTAL, "Application rebuild dispatches");
    describe_counter!(PROXY_RELOADS_TOTAL, "Proxy configuration rebuild dispatches");
    describe_histogram!(
        BOOTSTRAP_DURATION_SECONDS,
        "Duration of the initial container scan in seconds"
    );
}
