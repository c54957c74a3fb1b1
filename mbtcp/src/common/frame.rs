use crate::common::buffer::ReadBuffer;
use crate::common::phys::PhysLayer;
use crate::decode::DecodeLevel;
use crate::error::RequestError;
use crate::tcp::frame::{constants, MbapParser};
use crate::types::UnitId;

/// Transaction identifier used to correlate responses with requests on a
/// single connection
///
/// Each channel task owns its own counter, so there is no process-wide
/// shared state. The counter is monotonic and wraps at 65536; zero is a
/// valid id.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) struct TxId {
    value: u16,
}

impl TxId {
    pub(crate) fn new(value: u16) -> Self {
        TxId { value }
    }

    pub(crate) fn to_u16(self) -> u16 {
        self.value
    }

    /// return the current id and advance the counter
    pub(crate) fn next(&mut self) -> TxId {
        let ret = TxId::new(self.value);
        self.value = self.value.wrapping_add(1);
        ret
    }
}

impl Default for TxId {
    fn default() -> Self {
        TxId::new(0)
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

/// Fields of the MBAP envelope other than the length, which is derived
/// from the payload during serialization
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub(crate) unit_id: UnitId,
    pub(crate) tx_id: TxId,
}

impl FrameHeader {
    pub(crate) fn new(unit_id: UnitId, tx_id: TxId) -> Self {
        FrameHeader { unit_id, tx_id }
    }
}

/// A complete frame received from the server: the decoded header plus the
/// raw PDU bytes
pub(crate) struct Frame {
    pub(crate) header: FrameHeader,
    length: usize,
    pdu: [u8; constants::MAX_ADU_LENGTH],
}

impl Frame {
    pub(crate) fn new(header: FrameHeader) -> Frame {
        Frame {
            header,
            length: 0,
            pdu: [0; constants::MAX_ADU_LENGTH],
        }
    }

    pub(crate) fn set(&mut self, src: &[u8]) -> bool {
        if src.len() > self.pdu.len() {
            return false;
        }

        self.pdu[0..src.len()].copy_from_slice(src);
        self.length = src.len();
        true
    }

    pub(crate) fn payload(&self) -> &[u8] {
        &self.pdu[0..self.length]
    }
}

/// Reads complete frames off the physical layer, buffering partial reads
/// until the parser can produce a frame
pub(crate) struct FramedReader {
    parser: MbapParser,
    buffer: ReadBuffer,
}

impl FramedReader {
    pub(crate) fn new() -> Self {
        Self {
            parser: MbapParser::new(),
            buffer: ReadBuffer::new(constants::MAX_FRAME_LENGTH),
        }
    }

    pub(crate) async fn next_frame(
        &mut self,
        io: &mut PhysLayer,
        decode: DecodeLevel,
    ) -> Result<Frame, RequestError> {
        loop {
            match self.parser.parse(&mut self.buffer, decode.frame)? {
                Some(frame) => return Ok(frame),
                None => {
                    self.buffer.read_some(io, decode.physical).await?;
                }
            }
        }
    }
}
