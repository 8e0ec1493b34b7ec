//! Decision whether a connection is delegated to an alternate console

use std::sync::Arc;

use consrv_protocol::{ConnectInfo, ShowWindow};
use tracing::debug;
use uuid::Uuid;

use super::platform::HostPlatform;
use crate::config::{AppConfig, LaunchConfig};

/// First condition that ruled a handoff out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disqualified {
    FeatureDisabled,
    NonInteractiveSession,
    ForceNoHandoff,
    CreateServerHandle,
    AlreadyInitialized,
    AttachOnly,
    Headless,
    NoTarget,
    AlreadyHandoffTarget,
    NoVisibleWindow,
    HiddenOrMinimized(ShowWindow),
}

/// Evaluates the handoff conditions for one connection attempt
///
/// Conditions are checked in a fixed order and evaluation stops at the
/// first one that fails.
pub struct HandoffGate {
    feature_enabled: bool,
    launch: LaunchConfig,
    target: Option<Uuid>,
    platform: Arc<dyn HostPlatform>,
}

impl HandoffGate {
    pub fn new(config: &AppConfig, platform: Arc<dyn HostPlatform>) -> Self {
        Self {
            feature_enabled: cfg!(feature = "handoff"),
            launch: config.launch.clone(),
            target: config.handoff.target,
            platform,
        }
    }

    /// Override the compiled-in handoff capability
    pub fn with_feature_enabled(mut self, enabled: bool) -> Self {
        self.feature_enabled = enabled;
        self
    }

    /// Decide whether to delegate; yields the handoff target on success
    pub fn evaluate(&self, initialized: bool, info: &ConnectInfo) -> Result<Uuid, Disqualified> {
        if !self.feature_enabled {
            return Err(Disqualified::FeatureDisabled);
        }
        if !self.platform.is_interactive_session() {
            return Err(Disqualified::NonInteractiveSession);
        }
        if self.launch.force_no_handoff {
            return Err(Disqualified::ForceNoHandoff);
        }
        if self.launch.create_server_handle {
            return Err(Disqualified::CreateServerHandle);
        }
        if initialized {
            return Err(Disqualified::AlreadyInitialized);
        }
        if !info.console_app {
            return Err(Disqualified::AttachOnly);
        }
        if self.launch.headless {
            return Err(Disqualified::Headless);
        }
        let target = self.target.ok_or(Disqualified::NoTarget)?;
        if self.launch.handoff_target {
            return Err(Disqualified::AlreadyHandoffTarget);
        }
        if !deserves_visible_window(info, self.launch.headless) {
            return Err(Disqualified::NoVisibleWindow);
        }
        if let Some(show) = info.startup.requested_show_window() {
            if show.is_hidden_or_minimized() {
                return Err(Disqualified::HiddenOrMinimized(show));
            }
        }

        Ok(target)
    }

    pub fn should_attempt(&self, initialized: bool, info: &ConnectInfo) -> bool {
        match self.evaluate(initialized, info) {
            Ok(_) => true,
            Err(reason) => {
                debug!(pid = info.process_id, ?reason, "Handoff not attempted");
                false
            }
        }
    }
}

/// Whether a connecting client should get a visible console window
pub fn deserves_visible_window(info: &ConnectInfo, headless: bool) -> bool {
    info.window_visible && !headless
}

#[cfg(test)]
mod tests {
    use super::*;
    use consrv_protocol::StartupInfo;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;

    struct StubPlatform {
        interactive: bool,
    }

    impl HostPlatform for StubPlatform {
        fn is_interactive_session(&self) -> bool {
            self.interactive
        }

        fn duplicate_current_process(&self) -> consrv_utils::Result<OwnedFd> {
            Err(consrv_utils::ConsoleError::handoff("stub"))
        }

        fn create_signal_channel(&self) -> consrv_utils::Result<(UnixStream, UnixStream)> {
            Ok(UnixStream::pair()?)
        }

        fn exit_process(&self, _code: i32) {}
    }

    fn eligible_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.handoff.target = Some(Uuid::from_u128(0xfeed));
        config
    }

    fn eligible_info() -> ConnectInfo {
        ConnectInfo {
            process_id: 40,
            thread_id: 41,
            process_group_id: 0,
            console_app: true,
            window_visible: true,
            startup: StartupInfo::default(),
            title: String::new(),
            app_name: "pwsh".into(),
            current_directory: "/".into(),
        }
    }

    fn gate(config: &AppConfig, interactive: bool) -> HandoffGate {
        HandoffGate::new(config, Arc::new(StubPlatform { interactive })).with_feature_enabled(true)
    }

    #[test]
    fn test_all_conditions_pass() {
        let config = eligible_config();
        assert_eq!(
            gate(&config, true).evaluate(false, &eligible_info()),
            Ok(Uuid::from_u128(0xfeed))
        );
    }

    #[test]
    fn test_feature_disabled_checked_first() {
        // Everything else disqualifies too; the feature flag wins
        let mut config = AppConfig::default();
        config.launch.force_no_handoff = true;
        let gate = HandoffGate::new(&config, Arc::new(StubPlatform { interactive: false }))
            .with_feature_enabled(false);
        assert_eq!(
            gate.evaluate(true, &eligible_info()),
            Err(Disqualified::FeatureDisabled)
        );
    }

    #[test]
    fn test_launch_policy_conditions() {
        let mut config = eligible_config();
        config.launch.force_no_handoff = true;
        assert_eq!(
            gate(&config, true).evaluate(false, &eligible_info()),
            Err(Disqualified::ForceNoHandoff)
        );

        let mut config = eligible_config();
        config.launch.create_server_handle = true;
        assert_eq!(
            gate(&config, true).evaluate(false, &eligible_info()),
            Err(Disqualified::CreateServerHandle)
        );

        let mut config = eligible_config();
        config.launch.headless = true;
        assert_eq!(
            gate(&config, true).evaluate(false, &eligible_info()),
            Err(Disqualified::Headless)
        );

        let mut config = eligible_config();
        config.launch.handoff_target = true;
        assert_eq!(
            gate(&config, true).evaluate(false, &eligible_info()),
            Err(Disqualified::AlreadyHandoffTarget)
        );
    }

    #[test]
    fn test_session_and_request_conditions() {
        let config = eligible_config();
        let gate = gate(&config, true);

        assert_eq!(
            gate.evaluate(true, &eligible_info()),
            Err(Disqualified::AlreadyInitialized)
        );

        let mut info = eligible_info();
        info.console_app = false;
        assert_eq!(gate.evaluate(false, &info), Err(Disqualified::AttachOnly));

        let mut info = eligible_info();
        info.window_visible = false;
        assert_eq!(gate.evaluate(false, &info), Err(Disqualified::NoVisibleWindow));
    }

    #[test]
    fn test_no_target() {
        let config = AppConfig::default();
        assert_eq!(
            gate(&config, true).evaluate(false, &eligible_info()),
            Err(Disqualified::NoTarget)
        );
    }

    #[test]
    fn test_non_interactive_session() {
        let config = eligible_config();
        assert_eq!(
            gate(&config, false).evaluate(false, &eligible_info()),
            Err(Disqualified::NonInteractiveSession)
        );
    }

    #[test]
    fn test_minimized_show_state() {
        let config = eligible_config();
        let mut info = eligible_info();
        info.startup = info.startup.with_show_window(ShowWindow::ShowMinNoActive);
        assert_eq!(
            gate(&config, true).evaluate(false, &info),
            Err(Disqualified::HiddenOrMinimized(ShowWindow::ShowMinNoActive))
        );

        info.startup = StartupInfo::default().with_show_window(ShowWindow::Maximize);
        assert!(gate(&config, true).should_attempt(false, &info));
    }

    #[test]
    fn test_deserves_visible_window() {
        let info = eligible_info();
        assert!(deserves_visible_window(&info, false));
        assert!(!deserves_visible_window(&info, true));
    }
}
