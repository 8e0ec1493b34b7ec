//! Input and screen buffer objects
//!
//! Only the handle-bearing shell of each buffer lives here; buffer contents
//! belong to the rendering and input layers.

use super::object::{ConsoleObject, ObjectHeader};

/// Default screen buffer size in cells (columns, rows)
pub const DEFAULT_SCREEN_BUFFER_SIZE: (u16, u16) = (120, 9001);

/// Default fill attribute (light grey on black)
pub const DEFAULT_FILL_ATTRIBUTE: u16 = 0x07;

/// The console's single input buffer
#[derive(Debug, Default)]
pub struct InputBuffer {
    header: ObjectHeader,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsoleObject for InputBuffer {
    fn header(&self) -> &ObjectHeader {
        &self.header
    }
}

/// An output (screen) buffer
#[derive(Debug)]
pub struct ScreenBuffer {
    header: ObjectHeader,
    size: (u16, u16),
    fill_attribute: u16,
}

impl ScreenBuffer {
    pub fn new(size: (u16, u16), fill_attribute: u16) -> Self {
        Self {
            header: ObjectHeader::new(),
            size,
            fill_attribute,
        }
    }

    /// A fresh buffer with this buffer's dimensions and attributes
    pub fn new_like(&self) -> Self {
        Self::new(self.size, self.fill_attribute)
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn fill_attribute(&self) -> u16 {
        self.fill_attribute
    }
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SCREEN_BUFFER_SIZE, DEFAULT_FILL_ATTRIBUTE)
    }
}

impl ConsoleObject for ScreenBuffer {
    fn header(&self) -> &ObjectHeader {
        &self.header
    }
}
