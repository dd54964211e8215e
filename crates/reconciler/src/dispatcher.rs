//! 외부 교정 명령 디스패처
//!
//! [`RemediationAction`]을 플랫폼 CLI 명령줄로 변환하고 [`CommandRunner`]로 실행합니다.
//! 디스패치 결과는 호출자에게 반환될 뿐 이벤트 루프를 멈추지 않습니다.
//!
//! # 명령 형식
//!
//! ```text
//! <cli> [--quiet] <rebuild_subcommand> <app>
//! <cli> [--quiet] <reload_subcommand> <app>
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;

use harbormaster_core::config::DispatchConfig;
use harbormaster_core::metrics as m;
use tokio::process::Command;
use tracing::debug;

use crate::error::ReconcilerError;

/// 외부 명령 실행 트레이트
///
/// 실행은 완료될 때까지 기다립니다. 타임아웃은 없습니다.
pub trait CommandRunner: Send + Sync + 'static {
    /// `argv[0]`을 실행 파일로, 나머지를 인자로 실행합니다.
    ///
    /// `quiet`이면 표준 출력과 표준 에러를 버립니다.
    fn run(
        &self,
        argv: &[String],
        quiet: bool,
    ) -> impl Future<Output = Result<(), ReconcilerError>> + Send;
}

/// `tokio::process` 기반 실행기
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner {
    env: BTreeMap<String, String>,
}

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 상속된 환경 위에 추가할 환경변수를 설정합니다.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

impl CommandRunner for ShellCommandRunner {
    async fn run(&self, argv: &[String], quiet: bool) -> Result<(), ReconcilerError> {
        let command_line = argv.join(" ");
        let Some((program, args)) = argv.split_first() else {
            return Err(ReconcilerError::DispatchFailed {
                command: command_line,
                reason: "empty command".to_owned(),
            });
        };

        let mut cmd = Command::new(program);
        cmd.args(args).envs(&self.env).stdin(Stdio::null());
        if quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        debug!(command = %command_line, "executing command");
        let status = cmd
            .status()
            .await
            .map_err(|e| ReconcilerError::DispatchFailed {
                command: command_line.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(ReconcilerError::DispatchFailed {
                command: command_line,
                reason: status.to_string(),
            });
        }
        Ok(())
    }
}

/// 교정 액션
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationAction {
    /// 앱 전체 재빌드
    RebuildApp { app: String },
    /// 앱 프록시 설정 재생성
    ReloadProxy { app: String },
}

impl RemediationAction {
    /// 대상 앱 이름
    pub fn app(&self) -> &str {
        match self {
            Self::RebuildApp { app } | Self::ReloadProxy { app } => app,
        }
    }

    /// 로그/메트릭용 액션 타입 이름
    pub fn action_type_name(&self) -> &'static str {
        match self {
            Self::RebuildApp { .. } => "rebuild_app",
            Self::ReloadProxy { .. } => "reload_proxy",
        }
    }

    /// 설정에 따라 실행할 명령줄을 생성합니다.
    pub fn argv(&self, config: &DispatchConfig) -> Vec<String> {
        let subcommand = match self {
            Self::RebuildApp { .. } => &config.rebuild_subcommand,
            Self::ReloadProxy { .. } => &config.reload_subcommand,
        };
        let mut argv = vec![config.cli.clone()];
        if config.quiet {
            argv.push("--quiet".to_owned());
        }
        argv.push(subcommand.clone());
        argv.push(self.app().to_owned());
        argv
    }
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.action_type_name(), self.app())
    }
}

/// 교정 액션 디스패처
pub struct ActionDispatcher<R: CommandRunner> {
    runner: Arc<R>,
    config: DispatchConfig,
}

impl<R: CommandRunner> ActionDispatcher<R> {
    pub fn new(runner: Arc<R>, config: DispatchConfig) -> Self {
        Self { runner, config }
    }

    /// 액션을 실행하고 완료될 때까지 기다립니다.
    ///
    /// # Errors
    ///
    /// 명령을 시작할 수 없거나 0이 아닌 종료 코드로 끝나면
    /// `ReconcilerError::DispatchFailed`를 반환합니다.
    pub async fn dispatch(&self, action: &RemediationAction) -> Result<(), ReconcilerError> {
        let argv = action.argv(&self.config);
        let result = self.runner.run(&argv, self.config.quiet).await;

        let metric = match action {
            RemediationAction::RebuildApp { .. } => m::REBUILDS_TOTAL,
            RemediationAction::ReloadProxy { .. } => m::PROXY_RELOADS_TOTAL,
        };
        metrics::counter!(metric, m::LABEL_RESULT => m::result_label(result.is_ok())).increment(1);

        result
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

/// 테스트용 명령 기록기
///
/// 실행된 명령줄을 기록하고, 지정된 서브커맨드는 실패시킵니다.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingRunner {
    calls: std::sync::Mutex<Vec<Vec<String>>>,
    failing: Vec<String>,
}

#[cfg(test)]
impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이 서브커맨드를 포함한 명령은 실패합니다.
    pub fn failing_on(mut self, subcommand: &str) -> Self {
        self.failing.push(subcommand.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl CommandRunner for RecordingRunner {
    async fn run(&self, argv: &[String], _quiet: bool) -> Result<(), ReconcilerError> {
        self.calls.lock().unwrap().push(argv.to_vec());
        if argv.iter().any(|arg| self.failing.contains(arg)) {
            return Err(ReconcilerError::DispatchFailed {
                command: argv.join(" "),
                reason: "exit status: 1".to_owned(),
            });
        }
        Ok(())
    }
}
