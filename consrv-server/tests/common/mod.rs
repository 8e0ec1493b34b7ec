//! Test doubles for the gateway's collaborators

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::os::fd::{BorrowedFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use consrv_protocol::{
    ApiMessage, ApiRequest, ConnectInfo, ConnectPayload, ConnectionInformation, Descriptor,
    HandleId, IoCompletion, PortableAttachMessage, ProcessKey, StartupInfo,
};
use consrv_server::console::{ConsoleState, HandleObject, InputEvent};
use consrv_server::handoff::{
    ActivationContext, ClientProcess, HandoffActivator, HandoffHandler, HostPlatform,
};
use consrv_server::host::{
    AccessibilityNotifier, ConsoleControl, ConsoleLifecycle, DefaultLifecycle, DeviceComm,
};
use consrv_server::{AppConfig, ConsoleServer};
use consrv_utils::{ConsoleError, Result};
use parking_lot::Mutex;
use uuid::Uuid;

static NEXT_IDENTIFIER: AtomicU64 = AtomicU64::new(1);

pub const HANDOFF_TARGET: Uuid = Uuid::from_u128(0x5a1e_0000_0000_0000_0000_0000_0000_0001);

fn dev_null() -> Result<OwnedFd> {
    Ok(File::open("/dev/null")?.into())
}

/// Transport double that records completions and owns published handles
#[derive(Default)]
pub struct RecordingComm {
    pub completions: Mutex<Vec<IoCompletion>>,
    pub table: Mutex<HashMap<HandleId, HandleObject>>,
    pub fail_completion: AtomicBool,
    pub refuse_handles: AtomicBool,
}

impl RecordingComm {
    /// Connection information of the most recent successful completion
    pub fn last_connection(&self) -> Option<ConnectionInformation> {
        let completions = self.completions.lock();
        let write = completions.last()?.write.clone()?;
        ConnectionInformation::decode(&write)
    }
}

impl DeviceComm for RecordingComm {
    fn complete_io(&self, completion: IoCompletion) -> Result<()> {
        if self.fail_completion.load(Ordering::SeqCst) {
            return Err(ConsoleError::transport("device closed"));
        }
        self.completions.lock().push(completion);
        Ok(())
    }

    fn adopt_handle(
        &self,
        handle: HandleObject,
    ) -> std::result::Result<HandleId, (ConsoleError, HandleObject)> {
        if self.refuse_handles.load(Ordering::SeqCst) {
            return Err((ConsoleError::transport("handle table full"), handle));
        }
        let id = handle.id();
        self.table.lock().insert(id, handle);
        Ok(id)
    }

    fn take_handle(&self, id: HandleId) -> Option<HandleObject> {
        self.table.lock().remove(&id)
    }

    fn server_handle(&self) -> Result<OwnedFd> {
        dev_null()
    }
}

#[derive(Default)]
pub struct RecordingControl {
    pub console_apps: Mutex<Vec<u32>>,
    pub foreground: Mutex<Vec<(u32, bool)>>,
}

impl ConsoleControl for RecordingControl {
    fn notify_console_application(&self, process_id: u32) -> Result<()> {
        self.console_apps.lock().push(process_id);
        Ok(())
    }

    fn set_foreground(&self, process_id: u32, foreground: bool) -> Result<()> {
        self.foreground.lock().push((process_id, foreground));
        Ok(())
    }

    fn end_task(&self, _process_id: u32, _event_type: u32, _ctrl_flags: u32) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAccessibility {
    pub started: Mutex<Vec<u32>>,
    pub ended: Mutex<Vec<u32>>,
}

impl AccessibilityNotifier for RecordingAccessibility {
    fn notify_start_application(&self, process_id: u32) {
        self.started.lock().push(process_id);
    }

    fn notify_end_application(&self, process_id: u32) {
        self.ended.lock().push(process_id);
    }
}

/// Lifecycle whose session allocation always fails
pub struct FailingLifecycle;

impl ConsoleLifecycle for FailingLifecycle {
    fn allocate(&self, _state: &mut ConsoleState, _info: &ConnectInfo) -> Result<()> {
        Err(ConsoleError::resource_allocation("out of screen buffers"))
    }

    fn remove(&self, state: &mut ConsoleState, process: ProcessKey) -> Result<()> {
        DefaultLifecycle.remove(state, process)
    }
}

/// Platform double; `exit_process` records instead of exiting
pub struct FakePlatform {
    pub interactive: bool,
    pub exits: Mutex<Vec<i32>>,
}

impl FakePlatform {
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            exits: Mutex::new(Vec::new()),
        }
    }
}

impl HostPlatform for FakePlatform {
    fn is_interactive_session(&self) -> bool {
        self.interactive
    }

    fn duplicate_current_process(&self) -> Result<OwnedFd> {
        dev_null()
    }

    fn create_signal_channel(&self) -> Result<(UnixStream, UnixStream)> {
        Ok(UnixStream::pair()?)
    }

    fn exit_process(&self, code: i32) {
        self.exits.lock().push(code);
    }
}

/// Where a scripted handoff attempt fails, if at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    FailInitialize,
    FailCreateHandler,
    FailEstablish,
    Succeed,
}

pub struct ScriptedActivator {
    pub script: Script,
    pub initialized: AtomicUsize,
    pub established: Arc<Mutex<Vec<PortableAttachMessage>>>,
}

impl ScriptedActivator {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            initialized: AtomicUsize::new(0),
            established: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl HandoffActivator for ScriptedActivator {
    fn initialize(&self) -> Result<Box<dyn ActivationContext>> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        if self.script == Script::FailInitialize {
            return Err(ConsoleError::handoff("activation unavailable"));
        }
        Ok(Box::new(ScriptedContext {
            script: self.script,
            established: self.established.clone(),
        }))
    }
}

struct ScriptedContext {
    script: Script,
    established: Arc<Mutex<Vec<PortableAttachMessage>>>,
}

impl ActivationContext for ScriptedContext {
    fn create_handler(&self, target: Uuid) -> Result<Box<dyn HandoffHandler>> {
        if self.script == Script::FailCreateHandler || target != HANDOFF_TARGET {
            return Err(ConsoleError::handoff(format!("{target} is not registered")));
        }
        Ok(Box::new(ScriptedHandler {
            script: self.script,
            established: self.established.clone(),
        }))
    }
}

struct ScriptedHandler {
    script: Script,
    established: Arc<Mutex<Vec<PortableAttachMessage>>>,
}

impl HandoffHandler for ScriptedHandler {
    fn establish_handoff(
        &self,
        _server: BorrowedFd<'_>,
        _input_event: &InputEvent,
        attach: &PortableAttachMessage,
        _signal_pipe: BorrowedFd<'_>,
        _owner_process: BorrowedFd<'_>,
    ) -> Result<Box<dyn ClientProcess>> {
        if self.script == Script::FailEstablish {
            return Err(ConsoleError::handoff("handler rejected connection"));
        }
        self.established.lock().push(*attach);
        Ok(Box::new(ExitedClient))
    }
}

/// A delegated client that has already exited
struct ExitedClient;

impl ClientProcess for ExitedClient {
    fn wait(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Everything a test needs to drive and inspect a server
pub struct Harness {
    pub server: ConsoleServer,
    pub comm: Arc<RecordingComm>,
    pub control: Arc<RecordingControl>,
    pub accessibility: Arc<RecordingAccessibility>,
    pub platform: Arc<FakePlatform>,
}

pub struct HarnessBuilder {
    config: AppConfig,
    activator: Option<Arc<ScriptedActivator>>,
    lifecycle: Option<Arc<dyn ConsoleLifecycle>>,
    handoff_feature: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            activator: None,
            lifecycle: None,
            handoff_feature: false,
        }
    }

    /// Make every connection eligible for handoff to [`HANDOFF_TARGET`]
    pub fn handoff(mut self, activator: Arc<ScriptedActivator>) -> Self {
        self.config.handoff.target = Some(HANDOFF_TARGET);
        self.activator = Some(activator);
        self.handoff_feature = true;
        self
    }

    /// Eligible for handoff, but nothing can be activated
    pub fn handoff_without_activator(mut self) -> Self {
        self.config.handoff.target = Some(HANDOFF_TARGET);
        self.handoff_feature = true;
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn ConsoleLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn config(mut self, f: impl FnOnce(&mut AppConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn build(self) -> Harness {
        let comm = Arc::new(RecordingComm::default());
        let control = Arc::new(RecordingControl::default());
        let accessibility = Arc::new(RecordingAccessibility::default());
        let platform = Arc::new(FakePlatform::interactive());

        let mut builder = ConsoleServer::builder(self.config, comm.clone(), control.clone())
            .accessibility(accessibility.clone())
            .platform(platform.clone())
            .handoff_feature(self.handoff_feature);
        if let Some(activator) = self.activator {
            builder = builder.activator(activator);
        }
        if let Some(lifecycle) = self.lifecycle {
            builder = builder.lifecycle(lifecycle);
        }

        Harness {
            server: builder.build().unwrap(),
            comm,
            control,
            accessibility,
            platform,
        }
    }
}

pub fn descriptor(process: u64, object: u64, input_size: u32) -> Descriptor {
    Descriptor {
        identifier: NEXT_IDENTIFIER.fetch_add(1, Ordering::Relaxed) | (7 << 32),
        function: 1,
        process,
        object,
        input_size,
        output_size: 64,
    }
}

pub fn payload(app_name: &str) -> ConnectPayload {
    ConnectPayload {
        process_group_id: 0,
        console_app: true,
        window_visible: true,
        startup: StartupInfo::default(),
        title: "Console".into(),
        app_name: app_name.into(),
        current_directory: "/home/user".into(),
    }
}

pub fn connect_with(pid: u32, payload: &ConnectPayload) -> ApiMessage {
    let input = payload.encode().unwrap();
    ApiMessage::new(
        descriptor(pid as u64, pid as u64 + 1, input.len() as u32),
        ApiRequest::Connect { input },
    )
}

pub fn connect(pid: u32) -> ApiMessage {
    connect_with(pid, &payload("sh"))
}

pub fn request(request: ApiRequest) -> ApiMessage {
    ApiMessage::new(descriptor(0, 0, 0), request)
}
