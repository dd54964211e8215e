//! 도메인 타입 -- 컨테이너 스냅샷, 재시작 정책, 라이프사이클 이벤트
//!
//! 라벨/네트워크 조회는 inspect 시점에 한 번만 수행되어
//! [`ContainerSnapshot`]의 타입 필드로 채워집니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 로그에 사용하는 짧은 컨테이너 ID 길이
pub const SHORT_ID_LEN: usize = 9;

/// 컨테이너 ID의 앞 9자를 반환합니다. 더 짧으면 전체를 반환합니다.
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// 컨테이너 재시작 정책 이름
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestartPolicyName {
    /// 자동 재시작 없음 (`"no"`)
    No,
    /// 항상 재시작 (`"always"`)
    Always,
    /// 실패 시 재시작 (`"on-failure"`)
    OnFailure,
    /// 명시적 정지 전까지 재시작 (`"unless-stopped"`)
    UnlessStopped,
    /// 빈 값 또는 알 수 없는 값
    Unspecified,
}

impl RestartPolicyName {
    /// 런타임이 보고하는 문자열 형식에서 변환합니다.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "no" => Self::No,
            "always" => Self::Always,
            "on-failure" => Self::OnFailure,
            "unless-stopped" => Self::UnlessStopped,
            _ => Self::Unspecified,
        }
    }

    /// 런타임 문자열 형식을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Always => "always",
            Self::OnFailure => "on-failure",
            Self::UnlessStopped => "unless-stopped",
            Self::Unspecified => "",
        }
    }
}

impl fmt::Display for RestartPolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 컨테이너 재시작 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartPolicy {
    /// 정책 이름
    pub name: RestartPolicyName,
    /// 최대 재시도 횟수 (0 = 제한 없음 또는 미지정)
    pub max_retries: u64,
}

impl RestartPolicy {
    /// 새 재시작 정책을 생성합니다.
    pub fn new(name: RestartPolicyName, max_retries: u64) -> Self {
        Self { name, max_retries }
    }

    /// 런타임의 재시작 예산이 소진되었는지 판단합니다.
    ///
    /// 정책이 `no`가 아니고 재시작 횟수가 최대 재시도 횟수와 정확히 같을 때만 참입니다.
    pub fn budget_exhausted(&self, restart_count: u64) -> bool {
        self.name != RestartPolicyName::No && restart_count == self.max_retries
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::new(RestartPolicyName::No, 0)
    }
}

/// 특정 시점의 플랫폼 관련 컨테이너 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    /// 런타임이 부여한 컨테이너 ID
    pub id: String,
    /// 앱 라벨 값 (없으면 플랫폼 관리 대상이 아님)
    pub app_name: Option<String>,
    /// 데이터 플레인 네트워크 주소 (네트워크에 연결되지 않았으면 None)
    pub network_address: Option<String>,
    /// 재시작 정책
    pub restart_policy: RestartPolicy,
    /// 현재 재시작 횟수
    pub restart_count: u64,
}

impl ContainerSnapshot {
    /// 앱 라벨이 있는 플랫폼 관리 컨테이너인지 확인합니다.
    pub fn is_platform_managed(&self) -> bool {
        self.app_name.is_some()
    }

    /// 앱 이름을 반환합니다. 라벨이 없으면 빈 문자열입니다.
    pub fn app(&self) -> &str {
        self.app_name.as_deref().unwrap_or_default()
    }

    /// 로그용 짧은 ID
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// 라이프사이클 이벤트 액션
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventAction {
    /// 컨테이너 시작
    Start,
    /// 컨테이너 재시작
    Restart,
    /// 컨테이너 프로세스 종료
    Die,
    /// 컨테이너 삭제 (`delete`)
    Delete,
    /// 컨테이너 제거 (`destroy`)
    Destroy,
    /// 그 외 액션 (무시됨)
    Other(String),
}

impl EventAction {
    /// 런타임 액션 태그에서 변환합니다.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "start" => Self::Start,
            "restart" => Self::Restart,
            "die" => Self::Die,
            "delete" => Self::Delete,
            "destroy" => Self::Destroy,
            other => Self::Other(other.to_owned()),
        }
    }

    /// 레지스트리에서 제거해야 하는 액션인지 확인합니다.
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Delete | Self::Destroy)
    }

    /// 등록/변경 감지 대상 액션인지 확인합니다.
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start | Self::Restart)
    }

    /// 메트릭 레이블용 고정된 이름을 반환합니다.
    ///
    /// `Other`는 원본 태그 대신 `"other"`를 반환합니다.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Restart => "restart",
            Self::Die => "die",
            Self::Delete => "delete",
            Self::Destroy => "destroy",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(raw) => f.write_str(raw),
            known => f.write_str(known.label()),
        }
    }
}

/// 컨테이너 라이프사이클 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// 대상 컨테이너 ID
    pub container_id: String,
    /// 이벤트 액션
    pub action: EventAction,
    /// 이벤트 발생 시각 (Unix 초)
    pub time: Option<i64>,
}

impl LifecycleEvent {
    /// 새 이벤트를 생성합니다.
    pub fn new(container_id: impl Into<String>, action: EventAction) -> Self {
        Self {
            container_id: container_id.into(),
            action,
            time: None,
        }
    }

    /// 로그용 짧은 ID
    pub fn short_id(&self) -> &str {
        short_id(&self.container_id)
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LifecycleEvent[{}] action={}", self.short_id(), self.action)
    }
}
