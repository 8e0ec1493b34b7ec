//! Host-signal packets and their framing
//!
//! After a handoff the alternate console cannot perform some privileged
//! operations itself, so it writes them as packets on the signal channel and
//! this process relays them.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

/// Maximum packet size (4 KB)
const MAX_PACKET_SIZE: usize = 4 * 1024;

/// Codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Packet too large: {size} bytes (max {max})")]
    PacketTooLarge { size: usize, max: usize },
}

/// A request from the alternate console to be carried out by this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostSignal {
    /// A console application started in the delegated session
    NotifyApp { process_id: u32 },
    /// Grant or revoke foreground rights for a client process
    SetForeground { process_id: u32, foreground: bool },
    /// Ask the system to end a client process
    EndTask {
        process_id: u32,
        event_type: u32,
        ctrl_flags: u32,
    },
}

/// Length-prefixed bincode codec for [`HostSignal`]
#[derive(Debug, Default)]
pub struct HostSignalCodec;

impl HostSignalCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for HostSignalCodec {
    type Item = HostSignal;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }

        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > MAX_PACKET_SIZE {
            return Err(CodecError::PacketTooLarge {
                size: len,
                max: MAX_PACKET_SIZE,
            });
        }

        if src.len() < 4 + len {
            src.reserve(4 + len - src.len());
            return Ok(None);
        }

        src.advance(4);
        let data = src.split_to(len);
        Ok(Some(bincode::deserialize(&data)?))
    }
}

impl Encoder<HostSignal> for HostSignalCodec {
    type Error = CodecError;

    fn encode(&mut self, item: HostSignal, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let data = bincode::serialize(&item)?;

        dst.reserve(4 + data.len());
        dst.put_u32(data.len() as u32);
        dst.put_slice(&data);
        Ok(())
    }
}
