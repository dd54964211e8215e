//! 설정 관리 -- harbormaster.toml 파싱 및 런타임 설정
//!
//! [`HarbormasterConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`HARBORMASTER_PLATFORM_NETWORK=bridge` 형식)
//! 3. 설정 파일 (`harbormaster.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), harbormaster_core::error::HarbormasterError> {
//! use harbormaster_core::config::HarbormasterConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = HarbormasterConfig::load("harbormaster.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = HarbormasterConfig::parse("[dispatch]\nreload_subcommand = \"nginx:build-config\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HarbormasterError};

/// Docker 요청 타임아웃 상한 (초)
const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Harbormaster 통합 설정
///
/// `harbormaster.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarbormasterConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Docker 연결 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// 플랫폼 라벨/네트워크 설정
    #[serde(default)]
    pub platform: PlatformConfig,
    /// 외부 명령 디스패치 설정
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl HarbormasterConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HarbormasterError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HarbormasterError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HarbormasterError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HarbormasterError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// 기본값에 환경변수 오버라이드만 적용한 설정을 생성합니다.
    ///
    /// 설정 파일 없이 실행할 때 사용합니다.
    pub fn from_env() -> Result<Self, HarbormasterError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HarbormasterError> {
        toml::from_str(toml_str).map_err(|e| {
            HarbormasterError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `HARBORMASTER_{SECTION}_{FIELD}`
    /// 예: `HARBORMASTER_DISPATCH_RELOAD_SUBCOMMAND=nginx:build-config`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "HARBORMASTER_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "HARBORMASTER_GENERAL_LOG_FORMAT",
        );

        // Docker
        override_string(&mut self.docker.socket, "HARBORMASTER_DOCKER_SOCKET");
        override_u64(
            &mut self.docker.request_timeout_secs,
            "HARBORMASTER_DOCKER_REQUEST_TIMEOUT_SECS",
        );

        // Platform
        override_string(&mut self.platform.app_label, "HARBORMASTER_PLATFORM_APP_LABEL");
        override_string(
            &mut self.platform.process_type_label,
            "HARBORMASTER_PLATFORM_PROCESS_TYPE_LABEL",
        );
        override_string(
            &mut self.platform.process_type,
            "HARBORMASTER_PLATFORM_PROCESS_TYPE",
        );
        override_string(&mut self.platform.network, "HARBORMASTER_PLATFORM_NETWORK");
        override_bool(
            &mut self.platform.strict_network,
            "HARBORMASTER_PLATFORM_STRICT_NETWORK",
        );

        // Dispatch
        override_string(&mut self.dispatch.cli, "HARBORMASTER_DISPATCH_CLI");
        override_bool(&mut self.dispatch.quiet, "HARBORMASTER_DISPATCH_QUIET");
        override_string(
            &mut self.dispatch.rebuild_subcommand,
            "HARBORMASTER_DISPATCH_REBUILD_SUBCOMMAND",
        );
        override_string(
            &mut self.dispatch.reload_subcommand,
            "HARBORMASTER_DISPATCH_RELOAD_SUBCOMMAND",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "HARBORMASTER_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "HARBORMASTER_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "HARBORMASTER_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HarbormasterError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.docker.request_timeout_secs == 0
            || self.docker.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS
        {
            return Err(invalid(
                "docker.request_timeout_secs",
                format!("must be 1-{MAX_REQUEST_TIMEOUT_SECS}"),
            ));
        }

        require_non_empty("platform.app_label", &self.platform.app_label)?;
        require_non_empty("platform.network", &self.platform.network)?;
        if !self.platform.process_type.is_empty() {
            require_non_empty(
                "platform.process_type_label",
                &self.platform.process_type_label,
            )?;
        }

        require_non_empty("dispatch.cli", &self.dispatch.cli)?;
        require_non_empty(
            "dispatch.rebuild_subcommand",
            &self.dispatch.rebuild_subcommand,
        )?;
        require_non_empty(
            "dispatch.reload_subcommand",
            &self.dispatch.reload_subcommand,
        )?;
        for subcommand in [
            &self.dispatch.rebuild_subcommand,
            &self.dispatch.reload_subcommand,
        ] {
            if subcommand.contains(char::is_whitespace) {
                return Err(invalid(
                    "dispatch",
                    format!("subcommand '{subcommand}' must be a single word"),
                ));
            }
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(invalid("metrics.port", "must be 1-65535".to_owned()));
            }
            if self.metrics.endpoint != "/metrics" {
                return Err(invalid(
                    "metrics.endpoint",
                    "only '/metrics' is supported".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Docker 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로 (빈 값이면 플랫폼 기본값 사용)
    pub socket: String,
    /// API 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: "/var/run/docker.sock".to_owned(),
            request_timeout_secs: 120,
        }
    }
}

/// 플랫폼 라벨 및 데이터 플레인 네트워크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// 앱 이름 라벨 키
    pub app_label: String,
    /// 프로세스 역할 라벨 키
    pub process_type_label: String,
    /// 필터링할 프로세스 역할 (빈 값이면 역할 필터 비활성화)
    pub process_type: String,
    /// 프록시 라우팅에 사용하는 네트워크 이름
    pub network: String,
    /// 부트스트랩 시 네트워크 미연결 컨테이너를 에러로 처리할지 여부
    pub strict_network: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            app_label: "com.dokku.app-name".to_owned(),
            process_type_label: "com.dokku.process-type".to_owned(),
            process_type: "web".to_owned(),
            network: "bridge".to_owned(),
            strict_network: false,
        }
    }
}

/// 외부 명령 디스패치 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// 플랫폼 CLI 실행 파일
    pub cli: String,
    /// `--quiet` 플래그 전달 및 출력 억제 여부
    pub quiet: bool,
    /// 앱 재빌드 서브커맨드
    pub rebuild_subcommand: String,
    /// 프록시 설정 재생성 서브커맨드
    pub reload_subcommand: String,
    /// 명령 실행 시 추가할 환경변수
    pub env: BTreeMap<String, String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cli: "dokku".to_owned(),
            quiet: true,
            rebuild_subcommand: "ps:rebuild".to_owned(),
            reload_subcommand: "proxy:build-config".to_owned(),
            env: BTreeMap::new(),
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

fn invalid(field: &str, reason: String) -> HarbormasterError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn require_non_empty(field: &str, value: &str) -> Result<(), HarbormasterError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty".to_owned()));
    }
    Ok(())
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
