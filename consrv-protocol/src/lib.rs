//! consrv-protocol: Transport-facing definitions for the console server
//!
//! This crate defines the messages the transport layer delivers to the
//! connection gateway, the replies and completions it receives back, the
//! connect payload, the portable attach descriptor handed to an alternate
//! console, and the host-signal packets relayed after a handoff.

pub mod codec;
pub mod connect;
pub mod messages;
pub mod types;

pub use codec::{CodecError, HostSignal, HostSignalCodec};
pub use connect::{
    ConnectInfo, ConnectPayload, ProtocolError, ShowWindow, StartupFlags, StartupInfo,
    MAX_APP_NAME_LENGTH, MAX_CURRENT_DIRECTORY_LENGTH, MAX_TITLE_LENGTH,
};
pub use messages::{
    ApiMessage, ApiReply, ApiRequest, ConnectionInformation, CreateObjectInformation,
    CreateScreenBufferInfo, Descriptor, IoCompletion, ObjectType, PortableAttachMessage,
    CONNECTION_INFORMATION_SIZE,
};
pub use types::{Access, HandleId, ProcessKey, ShareMode, StatusCode};
