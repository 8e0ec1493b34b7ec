//! Attached client process accounting

use std::collections::HashMap;

use consrv_protocol::{ConnectionInformation, HandleId, ProcessKey};
use consrv_utils::{ConsoleError, Result};
use tracing::debug;

use super::object::HandleObject;

/// Accounting entry for one attached client process
#[derive(Debug)]
pub struct ProcessRecord {
    key: ProcessKey,
    process_id: u32,
    thread_id: u32,
    process_group_id: u32,
    root: bool,
    foreground: bool,
    input_handle: Option<HandleObject>,
    output_handle: Option<HandleObject>,
}

impl ProcessRecord {
    pub fn key(&self) -> ProcessKey {
        self.key
    }

    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    pub fn process_group_id(&self) -> u32 {
        self.process_group_id
    }

    /// True only for the process whose attach initialized the session
    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn set_root(&mut self, root: bool) {
        self.root = root;
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    pub fn input_handle(&self) -> Option<&HandleObject> {
        self.input_handle.as_ref()
    }

    pub fn output_handle(&self) -> Option<&HandleObject> {
        self.output_handle.as_ref()
    }

    pub fn set_input_handle(&mut self, handle: HandleObject) {
        self.input_handle = Some(handle);
    }

    pub fn set_output_handle(&mut self, handle: HandleObject) {
        self.output_handle = Some(handle);
    }

    /// Connect reply payload for this process
    pub fn connection_information(&self) -> ConnectionInformation {
        ConnectionInformation {
            process: self.key,
            input: self
                .input_handle
                .as_ref()
                .map(HandleObject::id)
                .unwrap_or(HandleId::NULL),
            output: self
                .output_handle
                .as_ref()
                .map(HandleObject::id)
                .unwrap_or(HandleId::NULL),
            process_group_id: self.process_group_id,
        }
    }
}

/// All processes attached to the console
#[derive(Debug)]
pub struct ProcessList {
    records: HashMap<ProcessKey, ProcessRecord>,
    by_pid: HashMap<u32, ProcessKey>,
    next_key: u64,
}

impl Default for ProcessList {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessList {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            by_pid: HashMap::new(),
            next_key: 1,
        }
    }

    /// Allocate a record for a connecting process
    ///
    /// A process connects once; a second record for the same process id is
    /// refused.
    pub fn alloc(
        &mut self,
        process_id: u32,
        thread_id: u32,
        process_group_id: u32,
    ) -> Result<ProcessKey> {
        if self.by_pid.contains_key(&process_id) {
            return Err(ConsoleError::resource_allocation(format!(
                "process {} is already attached",
                process_id
            )));
        }

        let key = ProcessKey(self.next_key);
        self.next_key += 1;

        self.records.insert(
            key,
            ProcessRecord {
                key,
                process_id,
                thread_id,
                process_group_id,
                root: false,
                foreground: false,
                input_handle: None,
                output_handle: None,
            },
        );
        self.by_pid.insert(process_id, key);

        debug!(pid = process_id, key = %key, "Process record allocated");
        Ok(key)
    }

    /// Remove a record, returning it if it was still present
    ///
    /// Freeing an already freed key is a no-op. Dropping the returned record
    /// closes its connection handles.
    pub fn free(&mut self, key: ProcessKey) -> Option<ProcessRecord> {
        let record = self.records.remove(&key)?;
        self.by_pid.remove(&record.process_id);
        debug!(pid = record.process_id, key = %key, "Process record freed");
        Some(record)
    }

    pub fn get(&self, key: ProcessKey) -> Option<&ProcessRecord> {
        self.records.get(&key)
    }

    pub fn get_mut(&mut self, key: ProcessKey) -> Option<&mut ProcessRecord> {
        self.records.get_mut(&key)
    }

    pub fn find_by_pid(&self, process_id: u32) -> Option<&ProcessRecord> {
        self.by_pid
            .get(&process_id)
            .and_then(|key| self.records.get(key))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values()
    }

    /// Set the foreground eligibility of every attached process
    ///
    /// Returns the affected process ids.
    pub fn modify_console_process_focus(&mut self, grant: bool) -> Vec<u32> {
        self.records
            .values_mut()
            .map(|record| {
                record.foreground = grant;
                record.process_id
            })
            .collect()
    }
}
