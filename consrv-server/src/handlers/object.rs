//! Object-related message handlers
//!
//! Handles: CreateObject, CloseObject

use std::sync::Arc;

use consrv_protocol::{
    ApiMessage, CreateObjectInformation, CreateScreenBufferInfo, HandleId, ObjectType, StatusCode,
};
use consrv_utils::{ConsoleError, Result};
use tracing::{debug, warn};

use super::{ConsoleServer, HandlerResult};
use crate::console::{allocate_io_handle, ConsoleState, HandleObject, HandleType};
use crate::observability::Metrics;

impl ConsoleServer {
    /// Handle CreateObject - open a handle and publish it to the transport
    pub fn handle_create_object(
        &self,
        message: &ApiMessage,
        mut info: CreateObjectInformation,
    ) -> HandlerResult {
        let mut console = self.console.lock();
        info.resolve_generic();

        let handle = match create_handle(&mut console, &info) {
            Ok(handle) => handle,
            Err(e) => return Self::error(message, &e),
        };
        let handle_type = handle.handle_type();

        match handle.publish(self.comm.as_ref()) {
            Ok(id) => {
                debug!(handle = %id, ?handle_type, "Object created");
                Metrics::global().record_object_created();
                HandlerResult::Reply(message.reply(StatusCode::Success, id.value()))
            }
            Err(e) => {
                warn!(error = %e, "Failed to publish handle, released locally");
                console.prune_screen_buffers();
                Self::error(message, &e)
            }
        }
    }

    /// Handle CloseObject - destroy a published handle
    pub fn handle_close_object(&self, message: &ApiMessage, id: HandleId) -> HandlerResult {
        let mut console = self.console.lock();

        let Some(handle) = self.comm.take_handle(id) else {
            return Self::error(message, &ConsoleError::not_found(format!("{id} is not open")));
        };
        drop(handle);
        console.prune_screen_buffers();

        debug!(handle = %id, "Object closed");
        Metrics::global().record_object_closed();
        HandlerResult::Reply(message.reply(StatusCode::Success, 0))
    }
}

/// Resolve a create request to a new handle
///
/// Nothing is left allocated when this fails.
fn create_handle(
    console: &mut ConsoleState,
    info: &CreateObjectInformation,
) -> Result<HandleObject> {
    let access = info.desired_access;
    let share = info.share_mode;

    match info.object_type {
        ObjectType::CurrentInput => {
            allocate_io_handle(console.input_buffer()?, HandleType::Input, access, share)
        }
        ObjectType::CurrentOutput => allocate_io_handle(
            console.active_output_buffer()?,
            HandleType::Output,
            access,
            share,
        ),
        ObjectType::NewOutput => {
            let params = info
                .screen_buffer
                .unwrap_or_else(CreateScreenBufferInfo::text_mode);
            if params.flags != CreateScreenBufferInfo::TEXTMODE_BUFFER {
                return Err(ConsoleError::invalid_parameter(format!(
                    "unsupported screen buffer flags {:#x}",
                    params.flags
                )));
            }

            let active = console.active_output_buffer()?;
            let screen = Arc::new(active.new_like());
            let handle = allocate_io_handle(screen.clone(), HandleType::Output, access, share)?;
            console.add_screen_buffer(screen);
            Ok(handle)
        }
        ObjectType::Generic => Err(ConsoleError::invalid_parameter(format!(
            "generic access {:?} is neither read-only nor write-only",
            access
        ))),
    }
}
