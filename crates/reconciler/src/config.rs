//! 리컨실러 설정
//!
//! [`ReconcilerConfig`]는 core의 [`HarbormasterConfig`]에서
//! 엔진이 사용하는 플랫폼 선택 조건과 디스패치 설정만 추려냅니다.
//!
//! # 사용 예시
//! ```ignore
//! use harbormaster_core::config::HarbormasterConfig;
//! use harbormaster_reconciler::config::ReconcilerConfig;
//!
//! let core_config = HarbormasterConfig::default();
//! let config = ReconcilerConfig::from_core(&core_config);
//! ```

use harbormaster_core::config::{DispatchConfig, HarbormasterConfig};
use serde::{Deserialize, Serialize};

use crate::error::ReconcilerError;

/// 플랫폼 관리 컨테이너 선택 조건
///
/// 목록 조회와 이벤트 구독의 서버 측 라벨 필터, 그리고 inspect 결과에서
/// 앱 이름과 네트워크 주소를 추출하는 데 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSelector {
    /// 앱 이름 라벨 키
    pub app_label: String,
    /// 프로세스 역할 라벨 키
    pub process_type_label: String,
    /// 필터링할 프로세스 역할 (None이면 역할 필터 없음)
    pub process_type: Option<String>,
    /// 데이터 플레인 네트워크 이름
    pub network: String,
}

impl Default for PlatformSelector {
    fn default() -> Self {
        Self {
            app_label: "com.dokku.app-name".to_owned(),
            process_type_label: "com.dokku.process-type".to_owned(),
            process_type: Some("web".to_owned()),
            network: "bridge".to_owned(),
        }
    }
}

impl PlatformSelector {
    /// Docker `label` 필터 값 목록을 반환합니다.
    ///
    /// 예: `["com.dokku.app-name", "com.dokku.process-type=web"]`
    pub fn label_filters(&self) -> Vec<String> {
        let mut filters = vec![self.app_label.clone()];
        if let Some(process_type) = &self.process_type {
            filters.push(format!("{}={}", self.process_type_label, process_type));
        }
        filters
    }
}

/// 리컨실러 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// 컨테이너 선택 조건
    pub selector: PlatformSelector,
    /// 부트스트랩 시 네트워크 미연결 컨테이너를 치명적 에러로 처리할지 여부
    pub strict_network: bool,
    /// 외부 명령 디스패치 설정
    pub dispatch: DispatchConfig,
}

impl ReconcilerConfig {
    /// core의 `HarbormasterConfig`에서 리컨실러 설정을 생성합니다.
    pub fn from_core(core: &HarbormasterConfig) -> Self {
        let process_type = Some(core.platform.process_type.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        Self {
            selector: PlatformSelector {
                app_label: core.platform.app_label.clone(),
                process_type_label: core.platform.process_type_label.clone(),
                process_type,
                network: core.platform.network.clone(),
            },
            strict_network: core.platform.strict_network,
            dispatch: core.dispatch.clone(),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ReconcilerError> {
        require_non_empty("app_label", &self.selector.app_label)?;
        require_non_empty("network", &self.selector.network)?;
        if self.selector.process_type.is_some() {
            require_non_empty("process_type_label", &self.selector.process_type_label)?;
        }
        require_non_empty("cli", &self.dispatch.cli)?;
        require_non_empty("rebuild_subcommand", &self.dispatch.rebuild_subcommand)?;
        require_non_empty("reload_subcommand", &self.dispatch.reload_subcommand)?;
        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ReconcilerError> {
    if value.trim().is_empty() {
        return Err(ReconcilerError::Config {
            field: field.to_owned(),
            reason: "must not be empty".to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ReconcilerConfig::default().validate().unwrap();
    }

    #[test]
    fn label_filters_include_process_type() {
        let selector = PlatformSelector::default();
        assert_eq!(
            selector.label_filters(),
            vec![
                "com.dokku.app-name".to_owned(),
                "com.dokku.process-type=web".to_owned()
            ]
        );
    }

    #[test]
    fn label_filters_without_process_type() {
        let selector = PlatformSelector {
            process_type: None,
            ..Default::default()
        };
        assert_eq!(selector.label_filters(), vec!["com.dokku.app-name".to_owned()]);
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = HarbormasterConfig::default();
        core.platform.network = "dokku-net".to_owned();
        core.platform.strict_network = true;
        core.dispatch.reload_subcommand = "nginx:build-config".to_owned();

        let config = ReconcilerConfig::from_core(&core);
        assert_eq!(config.selector.network, "dokku-net");
        assert!(config.strict_network);
        assert_eq!(config.selector.process_type.as_deref(), Some("web"));
        assert_eq!(config.dispatch.reload_subcommand, "nginx:build-config");
    }

    #[test]
    fn from_core_blank_process_type_disables_filter() {
        let mut core = HarbormasterConfig::default();
        core.platform.process_type = "  ".to_owned();
        let config = ReconcilerConfig::from_core(&core);
        assert!(config.selector.process_type.is_none());
    }

    #[test]
    fn validate_rejects_empty_network() {
        let mut config = ReconcilerConfig::default();
        config.selector.network = String::new();
        assert!(matches!(
            config.validate(),
            Err(ReconcilerError::Config { ref field, .. }) if field == "network"
        ));
    }

    #[test]
    fn validate_rejects_blank_cli() {
        let mut config = ReconcilerConfig::default();
        config.dispatch.cli = " ".to_owned();
        assert!(config.validate().is_err());
    }
}
