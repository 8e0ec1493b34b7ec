//! Trace events for attach, detach and handoff
//!
//! Emitted on their own target so a subscriber can route them to a
//! telemetry sink separately from diagnostic logging.

use consrv_protocol::{ProcessKey, StatusCode};
use tracing::info;
use uuid::Uuid;

/// Target all trace events are emitted on
pub const TRACE_TARGET: &str = "consrv::trace";

pub fn console_attach(process_id: u32, key: ProcessKey, root: bool) {
    info!(
        target: TRACE_TARGET,
        event = "console_attach",
        pid = process_id,
        process = %key,
        root,
        "console attached"
    );
}

pub fn console_attach_failed(process_id: u32, status: StatusCode) {
    info!(
        target: TRACE_TARGET,
        event = "console_attach_failed",
        pid = process_id,
        %status,
        "console attach failed"
    );
}

pub fn console_detach(process_id: u32) {
    info!(
        target: TRACE_TARGET,
        event = "console_detach",
        pid = process_id,
        "console detached"
    );
}

pub fn console_handoff_succeeded(target: Uuid) {
    info!(
        target: TRACE_TARGET,
        event = "console_handoff_succeeded",
        handoff_target = %target,
        "console handed off"
    );
}

pub fn console_handoff_failed(target: Option<Uuid>, status: StatusCode) {
    info!(
        target: TRACE_TARGET,
        event = "console_handoff_failed",
        handoff_target = ?target,
        %status,
        "console handoff failed"
    );
}
