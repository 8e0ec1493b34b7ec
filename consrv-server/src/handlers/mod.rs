//! Dispatcher entry points for transport requests
//!
//! Every request is handled synchronously on the caller's thread and takes
//! the console lock for its duration. Handlers never panic on collaborator
//! failure; the first failing status becomes the reply.

mod connection;
mod object;

use std::sync::Arc;

use consrv_protocol::{ApiMessage, ApiReply, ApiRequest, StatusCode};
use consrv_utils::{ConsoleError, Result};
use tracing::{debug, warn};

use crate::config::{AppConfig, ConfigLoader};
use crate::console::{Console, ConsoleState};
use crate::handoff::{HandoffActivator, HandoffGate, HostPlatform, UnixPlatform};
use crate::host::{
    AccessibilityNotifier, ApiRouter, ConsoleControl, ConsoleLifecycle, DefaultLifecycle,
    DeviceComm,
};

/// Result of handling a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResult {
    /// Inline reply for the transport to deliver
    Reply(ApiReply),
    /// The message was completed through [`DeviceComm::complete_io`]
    Pending,
    /// The session was handed off and this process is terminating
    Terminated,
}

impl HandlerResult {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HandlerResult::Reply(reply) => Some(reply.status),
            _ => None,
        }
    }
}

/// The console server's connection and object lifecycle gateway
pub struct ConsoleServer {
    console: Console,
    config: Arc<AppConfig>,
    gate: HandoffGate,
    comm: Arc<dyn DeviceComm>,
    control: Arc<dyn ConsoleControl>,
    accessibility: Option<Arc<dyn AccessibilityNotifier>>,
    lifecycle: Arc<dyn ConsoleLifecycle>,
    router: Option<Arc<dyn ApiRouter>>,
    activator: Option<Arc<dyn HandoffActivator>>,
    platform: Arc<dyn HostPlatform>,
}

impl ConsoleServer {
    pub fn builder(
        config: AppConfig,
        comm: Arc<dyn DeviceComm>,
        control: Arc<dyn ConsoleControl>,
    ) -> ConsoleServerBuilder {
        ConsoleServerBuilder {
            config,
            comm,
            control,
            accessibility: None,
            lifecycle: Arc::new(DefaultLifecycle),
            router: None,
            activator: None,
            platform: Arc::new(UnixPlatform),
            handoff_feature: None,
        }
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Route a transport message to its handler
    pub fn dispatch(&self, message: &ApiMessage) -> HandlerResult {
        match &message.request {
            ApiRequest::CreateObject(info) => self.handle_create_object(message, *info),
            ApiRequest::CloseObject { handle } => self.handle_close_object(message, *handle),
            ApiRequest::Connect { input } => self.handle_connect(message, input),
            ApiRequest::Disconnect { process } => self.handle_disconnect(message, *process),
            ApiRequest::UserDefined { .. } => self.dispatch_request(message),
        }
    }

    /// Hand already connected traffic to the API router
    pub fn dispatch_request(&self, message: &ApiMessage) -> HandlerResult {
        let mut console = self.console.lock();
        match &self.router {
            Some(router) => router.dispatch(&mut console, message),
            None => {
                warn!(
                    identifier = message.descriptor.identifier,
                    "No API router installed, rejecting request"
                );
                Self::error(message, &ConsoleError::invalid_parameter("no API router"))
            }
        }
    }

    /// Inline reply carrying the status of `err`
    fn error(message: &ApiMessage, err: &ConsoleError) -> HandlerResult {
        debug!(
            identifier = message.descriptor.identifier,
            status = %err.status(),
            error = %err,
            "Replying with error"
        );
        HandlerResult::Reply(message.reply(err.status(), 0))
    }
}

/// Builder for [`ConsoleServer`]
pub struct ConsoleServerBuilder {
    config: AppConfig,
    comm: Arc<dyn DeviceComm>,
    control: Arc<dyn ConsoleControl>,
    accessibility: Option<Arc<dyn AccessibilityNotifier>>,
    lifecycle: Arc<dyn ConsoleLifecycle>,
    router: Option<Arc<dyn ApiRouter>>,
    activator: Option<Arc<dyn HandoffActivator>>,
    platform: Arc<dyn HostPlatform>,
    handoff_feature: Option<bool>,
}

impl ConsoleServerBuilder {
    pub fn accessibility(mut self, notifier: Arc<dyn AccessibilityNotifier>) -> Self {
        self.accessibility = Some(notifier);
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn ConsoleLifecycle>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn router(mut self, router: Arc<dyn ApiRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn activator(mut self, activator: Arc<dyn HandoffActivator>) -> Self {
        self.activator = Some(activator);
        self
    }

    pub fn platform(mut self, platform: Arc<dyn HostPlatform>) -> Self {
        self.platform = platform;
        self
    }

    /// Override the compiled-in handoff capability
    pub fn handoff_feature(mut self, enabled: bool) -> Self {
        self.handoff_feature = Some(enabled);
        self
    }

    pub fn build(self) -> Result<ConsoleServer> {
        ConfigLoader::validate(&self.config)?;

        let mut gate = HandoffGate::new(&self.config, self.platform.clone());
        if let Some(enabled) = self.handoff_feature {
            gate = gate.with_feature_enabled(enabled);
        }

        let state = ConsoleState::new(
            self.config.history.buffer_count,
            self.config.launch.headless,
        );

        Ok(ConsoleServer {
            console: Console::new(state),
            config: Arc::new(self.config),
            gate,
            comm: self.comm,
            control: self.control,
            accessibility: self.accessibility,
            lifecycle: self.lifecycle,
            router: self.router,
            activator: self.activator,
            platform: self.platform,
        })
    }
}
