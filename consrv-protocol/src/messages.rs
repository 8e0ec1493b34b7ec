//! Transport messages, replies and completions

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Size in bytes of an encoded [`ConnectionInformation`]
pub const CONNECTION_INFORMATION_SIZE: usize = 28;

/// Header the transport attaches to every inbound message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Transport-assigned message identifier, echoed in the reply
    pub identifier: u64,
    pub function: u32,
    /// Client process id for connect messages
    pub process: u64,
    /// Client thread id for connect messages
    pub object: u64,
    /// Size of the request body in bytes
    pub input_size: u32,
    /// Size of the buffer available for reply data
    pub output_size: u32,
}

impl Descriptor {
    pub fn id_high_part(&self) -> u32 {
        (self.identifier >> 32) as u32
    }

    pub fn id_low_part(&self) -> u32 {
        self.identifier as u32
    }
}

/// Object type of a create request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
    /// Resolved to input or output from the desired access
    Generic,
    CurrentInput,
    CurrentOutput,
    NewOutput,
}

/// Parameters of a new screen buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateScreenBufferInfo {
    pub flags: u32,
}

impl CreateScreenBufferInfo {
    pub const TEXTMODE_BUFFER: u32 = 0x1;
    pub const GRAPHICS_BUFFER: u32 = 0x2;

    pub fn text_mode() -> Self {
        Self {
            flags: Self::TEXTMODE_BUFFER,
        }
    }
}

/// Body of a CreateObject request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateObjectInformation {
    pub object_type: ObjectType,
    pub desired_access: Access,
    pub share_mode: ShareMode,
    /// Present only for [`ObjectType::NewOutput`]
    pub screen_buffer: Option<CreateScreenBufferInfo>,
}

impl CreateObjectInformation {
    pub fn new(object_type: ObjectType, desired_access: Access, share_mode: ShareMode) -> Self {
        Self {
            object_type,
            desired_access,
            share_mode,
            screen_buffer: None,
        }
    }

    /// Resolve a generic request to input or output from its desired access
    ///
    /// Read-only access selects the current input, write-only the current
    /// output. Any other combination leaves the request generic, which the
    /// dispatcher rejects.
    pub fn resolve_generic(&mut self) {
        if self.object_type != ObjectType::Generic {
            return;
        }

        let generic = self.desired_access.generic();
        if generic == Access::GENERIC_READ {
            self.object_type = ObjectType::CurrentInput;
        } else if generic == Access::GENERIC_WRITE {
            self.object_type = ObjectType::CurrentOutput;
        }
    }
}

/// Tagged request delivered by the transport layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ApiRequest {
    CreateObject(CreateObjectInformation),
    CloseObject {
        handle: HandleId,
    },
    /// Connect body is decoded lazily so malformed input can be reported
    Connect {
        input: Vec<u8>,
    },
    Disconnect {
        process: ProcessKey,
    },
    /// Ordinary API traffic from an already connected client
    UserDefined {
        process: ProcessKey,
        api_number: u32,
        input: Vec<u8>,
    },
}

/// An inbound message: descriptor plus request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub descriptor: Descriptor,
    pub request: ApiRequest,
}

impl ApiMessage {
    pub fn new(descriptor: Descriptor, request: ApiRequest) -> Self {
        Self {
            descriptor,
            request,
        }
    }

    /// Build an inline reply for this message
    pub fn reply(&self, status: StatusCode, information: u64) -> ApiReply {
        ApiReply {
            identifier: self.descriptor.identifier,
            status,
            information,
        }
    }

    /// Build an asynchronous completion for this message
    pub fn completion(&self, status: StatusCode, information: u64) -> IoCompletion {
        IoCompletion {
            identifier: self.descriptor.identifier,
            status,
            information,
            write: None,
        }
    }
}

/// Inline reply returned to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiReply {
    pub identifier: u64,
    pub status: StatusCode,
    pub information: u64,
}

/// Completion the gateway hands to the transport for pended messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoCompletion {
    pub identifier: u64,
    pub status: StatusCode,
    pub information: u64,
    /// Reply data written back to the client
    pub write: Option<Bytes>,
}

/// Reply payload of a successful connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInformation {
    pub process: ProcessKey,
    pub input: HandleId,
    pub output: HandleId,
    pub process_group_id: u32,
}

impl ConnectionInformation {
    /// Fixed-size little-endian encoding
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(CONNECTION_INFORMATION_SIZE);
        buf.put_u64_le(self.process.value());
        buf.put_u64_le(self.input.value());
        buf.put_u64_le(self.output.value());
        buf.put_u32_le(self.process_group_id);
        buf.freeze()
    }

    pub fn decode(mut data: &[u8]) -> Option<Self> {
        if data.len() != CONNECTION_INFORMATION_SIZE {
            return None;
        }
        Some(Self {
            process: ProcessKey(data.get_u64_le()),
            input: HandleId(data.get_u64_le()),
            output: HandleId(data.get_u64_le()),
            process_group_id: data.get_u32_le(),
        })
    }
}

/// The slice of a connect message forwarded to an alternate console
///
/// Carries identifiers and sizes only; the receiver re-reads the body from
/// the transport itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableAttachMessage {
    pub id_high_part: u32,
    pub id_low_part: u32,
    pub process: u64,
    pub object: u64,
    pub function: u32,
    pub input_size: u32,
    pub output_size: u32,
}

impl From<&Descriptor> for PortableAttachMessage {
    fn from(descriptor: &Descriptor) -> Self {
        Self {
            id_high_part: descriptor.id_high_part(),
            id_low_part: descriptor.id_low_part(),
            process: descriptor.process,
            object: descriptor.object,
            function: descriptor.function,
            input_size: descriptor.input_size,
            output_size: descriptor.output_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic(access: Access) -> CreateObjectInformation {
        let mut info = CreateObjectInformation::new(ObjectType::Generic, access, ShareMode::all());
        info.resolve_generic();
        info
    }

    #[test]
    fn test_resolve_generic_read_only_is_input() {
        assert_eq!(generic(Access::GENERIC_READ).object_type, ObjectType::CurrentInput);
    }

    #[test]
    fn test_resolve_generic_write_only_is_output() {
        assert_eq!(generic(Access::GENERIC_WRITE).object_type, ObjectType::CurrentOutput);
    }

    #[test]
    fn test_resolve_generic_read_write_stays_generic() {
        assert_eq!(generic(Access::read_write()).object_type, ObjectType::Generic);
        assert_eq!(generic(Access::empty()).object_type, ObjectType::Generic);
    }

    #[test]
    fn test_resolve_leaves_explicit_types_alone() {
        let mut info = CreateObjectInformation::new(
            ObjectType::CurrentOutput,
            Access::GENERIC_READ,
            ShareMode::empty(),
        );
        info.resolve_generic();
        assert_eq!(info.object_type, ObjectType::CurrentOutput);
    }

    #[test]
    fn test_descriptor_id_parts() {
        let descriptor = Descriptor {
            identifier: 0x0000_0001_0000_0002,
            ..Default::default()
        };
        assert_eq!(descriptor.id_high_part(), 1);
        assert_eq!(descriptor.id_low_part(), 2);
    }

    #[test]
    fn test_portable_attach_from_descriptor() {
        let descriptor = Descriptor {
            identifier: 0xAAAA_BBBB_CCCC_DDDD,
            function: 3,
            process: 4242,
            object: 17,
            input_size: 120,
            output_size: 28,
        };
        let msg = PortableAttachMessage::from(&descriptor);
        assert_eq!(msg.id_high_part, 0xAAAA_BBBB);
        assert_eq!(msg.id_low_part, 0xCCCC_DDDD);
        assert_eq!(msg.process, 4242);
        assert_eq!(msg.object, 17);
        assert_eq!(msg.input_size, 120);
        assert_eq!(msg.output_size, 28);
    }

    #[test]
    fn test_connection_information_is_fixed_size() {
        let info = ConnectionInformation {
            process: ProcessKey(1),
            input: HandleId(2),
            output: HandleId(3),
            process_group_id: 99,
        };
        let bytes = info.encode();
        assert_eq!(bytes.len(), CONNECTION_INFORMATION_SIZE);
        assert_eq!(ConnectionInformation::decode(&bytes), Some(info));
        assert_eq!(ConnectionInformation::decode(&bytes[..10]), None);
    }

    #[test]
    fn test_reply_echoes_identifier() {
        let msg = ApiMessage::new(
            Descriptor {
                identifier: 77,
                ..Default::default()
            },
            ApiRequest::CloseObject {
                handle: HandleId(5),
            },
        );
        let reply = msg.reply(StatusCode::Success, 0);
        assert_eq!(reply.identifier, 77);
        assert_eq!(msg.completion(StatusCode::Success, 9).identifier, 77);
    }
}
