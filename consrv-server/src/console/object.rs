//! Handle objects and per-object share accounting

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use consrv_protocol::{Access, HandleId, ShareMode};
use consrv_utils::{ConsoleError, Result};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::host::DeviceComm;

/// Source of handle identifiers; zero is reserved for "no handle"
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Which side of the console a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleType {
    Input,
    Output,
}

/// Open and share counts of one console object
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShareCounts {
    pub open: u32,
    pub readers: u32,
    pub writers: u32,
    pub read_shares: u32,
    pub write_shares: u32,
}

/// Share accounting embedded in every object a handle can refer to
#[derive(Debug, Default)]
pub struct ObjectHeader {
    counts: Mutex<ShareCounts>,
}

impl ObjectHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> ShareCounts {
        *self.counts.lock()
    }

    /// Number of handles currently open on the object
    pub fn open_count(&self) -> u32 {
        self.counts.lock().open
    }

    /// Record a new handle, failing if it conflicts with existing share modes
    fn acquire(&self, access: Access, share: ShareMode) -> Result<()> {
        let read_requested = access.contains(Access::GENERIC_READ);
        let write_requested = access.contains(Access::GENERIC_WRITE);
        let read_shared = share.contains(ShareMode::READ);
        let write_shared = share.contains(ShareMode::WRITE);

        let mut counts = self.counts.lock();
        if (read_requested && counts.read_shares != counts.open)
            || (write_requested && counts.write_shares != counts.open)
            || (!read_shared && counts.readers > 0)
            || (!write_shared && counts.writers > 0)
        {
            return Err(ConsoleError::sharing_violation(format!(
                "access {:?} with share {:?} conflicts with {} open handle(s)",
                access, share, counts.open
            )));
        }

        counts.open += 1;
        if read_requested {
            counts.readers += 1;
        }
        if write_requested {
            counts.writers += 1;
        }
        if read_shared {
            counts.read_shares += 1;
        }
        if write_shared {
            counts.write_shares += 1;
        }
        Ok(())
    }

    fn release(&self, access: Access, share: ShareMode) {
        let mut counts = self.counts.lock();
        counts.open = counts.open.saturating_sub(1);
        if access.contains(Access::GENERIC_READ) {
            counts.readers = counts.readers.saturating_sub(1);
        }
        if access.contains(Access::GENERIC_WRITE) {
            counts.writers = counts.writers.saturating_sub(1);
        }
        if share.contains(ShareMode::READ) {
            counts.read_shares = counts.read_shares.saturating_sub(1);
        }
        if share.contains(ShareMode::WRITE) {
            counts.write_shares = counts.write_shares.saturating_sub(1);
        }
    }
}

/// A console resource that handles can be opened against
pub trait ConsoleObject: Send + Sync + fmt::Debug {
    fn header(&self) -> &ObjectHeader;
}

/// An owned capability bound to one console object
///
/// Exactly one owner holds a handle at any time: the gateway while it is
/// being set up, a process record for connection handles, or the
/// transport's handle table once published. Dropping the handle releases
/// its share accounting on the object.
pub struct HandleObject {
    id: HandleId,
    handle_type: HandleType,
    access: Access,
    share: ShareMode,
    object: Arc<dyn ConsoleObject>,
}

impl HandleObject {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn handle_type(&self) -> HandleType {
        self.handle_type
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn share_mode(&self) -> ShareMode {
        self.share
    }

    pub fn object(&self) -> &Arc<dyn ConsoleObject> {
        &self.object
    }

    /// Hand the handle over to the transport's handle table
    ///
    /// If the transport refuses it, the handle is released here instead.
    pub fn publish(self, comm: &dyn DeviceComm) -> Result<HandleId> {
        match comm.adopt_handle(self) {
            Ok(id) => {
                trace!(handle = %id, "Handle published");
                Ok(id)
            }
            Err((err, handle)) => {
                debug!(handle = %handle.id(), error = %err, "Transport refused handle");
                drop(handle);
                Err(err)
            }
        }
    }
}

impl fmt::Debug for HandleObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleObject")
            .field("id", &self.id)
            .field("handle_type", &self.handle_type)
            .field("access", &self.access)
            .field("share", &self.share)
            .finish()
    }
}

impl Drop for HandleObject {
    fn drop(&mut self) {
        self.object.header().release(self.access, self.share);
        trace!(handle = %self.id, "Handle released");
    }
}

/// Open a new handle of the given type on a console object
///
/// Nothing is left allocated when this fails.
pub fn allocate_io_handle(
    object: Arc<dyn ConsoleObject>,
    handle_type: HandleType,
    access: Access,
    share: ShareMode,
) -> Result<HandleObject> {
    object.header().acquire(access, share)?;

    let id = HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed));
    trace!(handle = %id, ?handle_type, "Handle allocated");

    Ok(HandleObject {
        id,
        handle_type,
        access,
        share,
        object,
    })
}
