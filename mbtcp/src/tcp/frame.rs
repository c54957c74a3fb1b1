use crate::common::buffer::ReadBuffer;
use crate::common::cursor::WriteCursor;
use crate::common::frame::{Frame, FrameHeader, TxId};
use crate::common::function::FunctionCode;
use crate::common::phys::format_bytes;
use crate::common::traits::{Loggable, LoggableDisplay, Serialize};
use crate::decode::{DecodeLevel, FrameDecodeLevel};
use crate::error::{FrameParseError, InternalError, RequestError};
use crate::types::UnitId;

pub(crate) mod constants {
    /// the maximum size of a PDU
    pub(crate) const MAX_ADU_LENGTH: usize = 253;
    /// the fixed size of the MBAP header
    pub(crate) const HEADER_LENGTH: usize = 7;
    /// the maximum size of a complete frame
    pub(crate) const MAX_FRAME_LENGTH: usize = HEADER_LENGTH + MAX_ADU_LENGTH;
    /// the maximum value of the MBAP length field, which counts the unit id
    /// in addition to the PDU bytes
    pub(crate) const MAX_LENGTH_FIELD: usize = MAX_ADU_LENGTH + 1;
}

#[derive(Clone, Copy)]
struct MbapHeader {
    tx_id: TxId,
    adu_length: usize,
    unit_id: UnitId,
}

#[derive(Clone, Copy)]
enum ParseState {
    Begin,
    Header(MbapHeader),
}

/// Incremental MBAP parser
///
/// The header is consumed as soon as 7 bytes are buffered; the body is
/// delivered only once exactly `length - 1` PDU bytes follow it, which is
/// how the length invariant is enforced on a stream.
pub(crate) struct MbapParser {
    state: ParseState,
}

impl MbapParser {
    pub(crate) fn new() -> Self {
        Self {
            state: ParseState::Begin,
        }
    }

    fn parse_header(cursor: &mut ReadBuffer) -> Result<MbapHeader, RequestError> {
        let tx_id = TxId::new(cursor.read_u16_be()?);
        let protocol_id = cursor.read_u16_be()?;
        let length = cursor.read_u16_be()? as usize;
        let unit_id = UnitId::new(cursor.read_u8()?);

        if protocol_id != 0 {
            return Err(FrameParseError::UnknownProtocolId(protocol_id).into());
        }

        if length > constants::MAX_LENGTH_FIELD {
            return Err(
                FrameParseError::MbapLengthTooBig(length, constants::MAX_LENGTH_FIELD).into(),
            );
        }

        // must be > 0 b/c the 1-byte unit identifier counts towards the length
        if length == 0 {
            return Err(FrameParseError::MbapLengthZero.into());
        }

        Ok(MbapHeader {
            tx_id,
            adu_length: length - 1,
            unit_id,
        })
    }

    fn parse_body(header: &MbapHeader, cursor: &mut ReadBuffer) -> Result<Frame, RequestError> {
        let mut frame = Frame::new(FrameHeader::new(header.unit_id, header.tx_id));
        frame.set(cursor.read(header.adu_length)?);
        Ok(frame)
    }

    pub(crate) fn parse(
        &mut self,
        cursor: &mut ReadBuffer,
        decode: FrameDecodeLevel,
    ) -> Result<Option<Frame>, RequestError> {
        match self.state {
            ParseState::Header(header) => {
                if cursor.len() < header.adu_length {
                    return Ok(None);
                }

                let frame = Self::parse_body(&header, cursor)?;
                self.state = ParseState::Begin;

                if decode.enabled() {
                    tracing::info!(
                        "MBAP RX - {}",
                        MbapDisplay::new(decode, frame.header, frame.payload())
                    );
                }

                Ok(Some(frame))
            }
            ParseState::Begin => {
                if cursor.len() < constants::HEADER_LENGTH {
                    return Ok(None);
                }

                self.state = ParseState::Header(Self::parse_header(cursor)?);
                self.parse(cursor, decode)
            }
        }
    }
}

/// Serializes requests into a fixed internal buffer, writing the MBAP
/// length field once the payload size is known
pub(crate) struct MbapFormatter {
    buffer: [u8; constants::MAX_FRAME_LENGTH],
}

impl MbapFormatter {
    pub(crate) fn new() -> Self {
        Self {
            buffer: [0; constants::MAX_FRAME_LENGTH],
        }
    }

    pub(crate) fn format<T>(
        &mut self,
        header: FrameHeader,
        function: FunctionCode,
        msg: &T,
        decode: DecodeLevel,
    ) -> Result<&[u8], RequestError>
    where
        T: Serialize + Loggable,
    {
        let mut cursor = WriteCursor::new(self.buffer.as_mut());
        cursor.write_u16_be(header.tx_id.to_u16())?;
        cursor.write_u16_be(0)?; // protocol id
        cursor.seek_from_current(2)?; // write the length later
        cursor.write_u8(header.unit_id.value)?;

        let adu_length: usize = {
            let start = cursor.position();
            cursor.write_u8(function.get_value())?;
            msg.serialize(&mut cursor)?;
            cursor.position() - start
        };

        // write the resulting length, which also counts the unit id
        let length_field = u16::try_from(adu_length + 1)
            .map_err(|_| InternalError::AduTooBig(adu_length))?;
        cursor.seek_from_start(4)?;
        cursor.write_u16_be(length_field)?;

        let total_length = constants::HEADER_LENGTH + adu_length;

        if decode.frame.enabled() {
            tracing::info!(
                "MBAP TX - {}",
                MbapDisplay::new(
                    decode.frame,
                    header,
                    &self.buffer[constants::HEADER_LENGTH..total_length]
                )
            );
        }
        if decode.app.enabled() {
            tracing::info!(
                "PDU TX - {} {}",
                function,
                LoggableDisplay::new(msg, decode.app)
            );
        }

        Ok(&self.buffer[..total_length])
    }
}

struct MbapDisplay<'a> {
    level: FrameDecodeLevel,
    header: FrameHeader,
    payload: &'a [u8],
}

impl<'a> MbapDisplay<'a> {
    fn new(level: FrameDecodeLevel, header: FrameHeader, payload: &'a [u8]) -> Self {
        MbapDisplay {
            level,
            header,
            payload,
        }
    }
}

impl std::fmt::Display for MbapDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "tx_id: {} unit: {} (len = {})",
            self.header.tx_id,
            self.header.unit_id,
            self.payload.len()
        )?;
        if self.level.payload_enabled() {
            format_bytes(f, self.payload)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::block_on;
    use tokio_test::io::Builder;

    use crate::common::frame::FramedReader;
    use crate::common::phys::PhysLayer;
    use crate::error::RequestError;

    use super::*;

    //                            |   tx id  |  proto id |  length  | unit |  payload   |
    const SIMPLE_FRAME: &[u8] = &[0x00, 0x07, 0x00, 0x00, 0x00, 0x03, 0x2A, 0x03, 0x04];

    struct MockMessage {
        a: u8,
    }

    impl Serialize for MockMessage {
        fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
            cursor.write_u8(self.a)?;
            Ok(())
        }
    }

    impl Loggable for MockMessage {
        fn log(
            &self,
            _level: crate::decode::AppDecodeLevel,
            _f: &mut std::fmt::Formatter,
        ) -> std::fmt::Result {
            Ok(())
        }
    }

    fn assert_equals_simple_frame(frame: &Frame) {
        assert_eq!(frame.header.tx_id, TxId::new(0x0007));
        assert_eq!(frame.header.unit_id, UnitId::new(0x2A));
        assert_eq!(frame.payload(), &[0x03, 0x04]);
    }

    fn test_segmented_parse(split_at: usize) {
        let (f1, f2) = SIMPLE_FRAME.split_at(split_at);
        let mut io = PhysLayer::new_mock(Builder::new().read(f1).read(f2).build());
        let mut reader = FramedReader::new();
        let frame = block_on(reader.next_frame(&mut io, DecodeLevel::nothing())).unwrap();

        assert_equals_simple_frame(&frame);
    }

    fn test_error(input: &[u8]) -> RequestError {
        let mut io = PhysLayer::new_mock(Builder::new().read(input).build());
        let mut reader = FramedReader::new();
        block_on(reader.next_frame(&mut io, DecodeLevel::nothing()))
            .err()
            .unwrap()
    }

    #[test]
    fn correctly_formats_frame() {
        let mut formatter = MbapFormatter::new();
        let msg = MockMessage { a: 0x04 };
        let header = FrameHeader::new(UnitId::new(42), TxId::new(7));
        let output = formatter
            .format(
                header,
                FunctionCode::ReadHoldingRegisters,
                &msg,
                DecodeLevel::nothing(),
            )
            .unwrap();

        assert_eq!(output, SIMPLE_FRAME)
    }

    #[test]
    fn can_parse_frame_from_stream() {
        let mut io = PhysLayer::new_mock(Builder::new().read(SIMPLE_FRAME).build());
        let mut reader = FramedReader::new();
        let frame = block_on(reader.next_frame(&mut io, DecodeLevel::nothing())).unwrap();

        assert_equals_simple_frame(&frame);
    }

    #[test]
    fn can_parse_maximum_size_frame() {
        // maximum ADU length is 253, so the max MBAP length value is 254 == 0xFE
        let header = &[0x00, 0x07, 0x00, 0x00, 0x00, 0xFE, 0x2A];
        let payload = &[0xCC; 253];

        let mut io = PhysLayer::new_mock(Builder::new().read(header).read(payload).build());
        let mut reader = FramedReader::new();
        let frame = block_on(reader.next_frame(&mut io, DecodeLevel::nothing())).unwrap();

        assert_eq!(frame.payload(), payload.as_ref());
    }

    #[test]
    fn can_parse_frame_if_segmented_in_header() {
        test_segmented_parse(4);
    }

    #[test]
    fn can_parse_frame_if_segmented_in_payload() {
        test_segmented_parse(8);
    }

    #[test]
    fn errors_on_bad_protocol_id() {
        let frame = &[0x00, 0x07, 0xCA, 0xFE, 0x00, 0x01, 0x2A];
        assert_eq!(
            test_error(frame),
            RequestError::BadFrame(FrameParseError::UnknownProtocolId(0xCAFE))
        );
    }

    #[test]
    fn errors_on_length_of_zero() {
        let frame = &[0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0x2A];
        assert_eq!(
            test_error(frame),
            RequestError::BadFrame(FrameParseError::MbapLengthZero)
        );
    }

    #[test]
    fn errors_when_mbap_length_too_big() {
        let frame = &[0x00, 0x07, 0x00, 0x00, 0x00, 0xFF, 0x2A];
        assert_eq!(
            test_error(frame),
            RequestError::BadFrame(FrameParseError::MbapLengthTooBig(
                0xFF,
                constants::MAX_LENGTH_FIELD
            ))
        );
    }

    #[test]
    fn round_trip_preserves_header_fields_and_payload() {
        let mut formatter = MbapFormatter::new();
        let msg = MockMessage { a: 0xBE };
        let header = FrameHeader::new(UnitId::new(3), TxId::new(0xABCD));
        let bytes = formatter
            .format(header, FunctionCode::ReadCoils, &msg, DecodeLevel::nothing())
            .unwrap()
            .to_vec();

        let mut io = PhysLayer::new_mock(Builder::new().read(&bytes).build());
        let mut reader = FramedReader::new();
        let frame = block_on(reader.next_frame(&mut io, DecodeLevel::nothing())).unwrap();

        assert_eq!(frame.header, header);
        assert_eq!(frame.payload(), &[0x01, 0xBE]);
    }
}
