use crate::exception::ExceptionCode;

/// The request/response task has been shut down and can no longer be reached
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Shutdown;

impl std::error::Error for Shutdown {}

impl std::fmt::Display for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("the channel task has been shut down")
    }
}

/// Errors that can occur while making a request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestError {
    /// An I/O error occurred on the underlying stream
    Io(std::io::ErrorKind),
    /// A frame could not be parsed off the stream
    BadFrame(FrameParseError),
    /// The response payload could not be interpreted
    BadResponse(AduParseError),
    /// The requested range was rejected before any I/O was performed
    BadRange(InvalidRange),
    /// A logic error occurred while formatting a request
    Internal(InternalError),
    /// The server rejected the request with a Modbus exception response
    Exception(ExceptionCode),
    /// No response was received within the timeout
    ResponseTimeout,
    /// No connection exists to the server
    NoConnection,
    /// The task processing requests has been shut down
    Shutdown,
}

impl std::error::Error for RequestError {}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RequestError::Io(kind) => write!(f, "I/O error: {kind:?}"),
            RequestError::BadFrame(err) => write!(f, "framing error: {err}"),
            RequestError::BadResponse(err) => write!(f, "bad response: {err}"),
            RequestError::BadRange(err) => write!(f, "invalid range: {err}"),
            RequestError::Internal(err) => write!(f, "internal error: {err}"),
            RequestError::Exception(ex) => write!(f, "Modbus exception: {ex}"),
            RequestError::ResponseTimeout => {
                f.write_str("timeout occurred before receiving a response from the server")
            }
            RequestError::NoConnection => f.write_str("no connection exists to the Modbus server"),
            RequestError::Shutdown => f.write_str("the task processing requests has been shut down"),
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err.kind())
    }
}

impl From<FrameParseError> for RequestError {
    fn from(err: FrameParseError) -> Self {
        RequestError::BadFrame(err)
    }
}

impl From<AduParseError> for RequestError {
    fn from(err: AduParseError) -> Self {
        RequestError::BadResponse(err)
    }
}

impl From<InvalidRange> for RequestError {
    fn from(err: InvalidRange) -> Self {
        RequestError::BadRange(err)
    }
}

impl From<InternalError> for RequestError {
    fn from(err: InternalError) -> Self {
        RequestError::Internal(err)
    }
}

impl From<ExceptionCode> for RequestError {
    fn from(ex: ExceptionCode) -> Self {
        RequestError::Exception(ex)
    }
}

impl From<Shutdown> for RequestError {
    fn from(_: Shutdown) -> Self {
        RequestError::Shutdown
    }
}

/// Errors that occur while parsing a frame off a stream
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameParseError {
    /// Received a frame with the MBAP length field set to zero
    MbapLengthZero,
    /// Received a frame with an MBAP length that exceeds the maximum allowed size (actual, max)
    MbapLengthTooBig(usize, usize),
    /// Received a frame with a non-Modbus protocol id
    UnknownProtocolId(u16),
}

impl std::error::Error for FrameParseError {}

impl std::fmt::Display for FrameParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FrameParseError::MbapLengthZero => {
                f.write_str("received frame with the MBAP length field set to zero")
            }
            FrameParseError::MbapLengthTooBig(size, max) => write!(
                f,
                "received frame with MBAP length ({size}) that exceeds the maximum allowed length ({max})"
            ),
            FrameParseError::UnknownProtocolId(id) => {
                write!(f, "received frame with non-Modbus protocol id: {id:#06X}")
            }
        }
    }
}

/// Errors that occur while interpreting a response PDU
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AduParseError {
    /// The response is too short to be valid
    InsufficientBytes,
    /// The response contains extra trailing bytes
    TrailingBytes(usize),
    /// The byte count does not match what is expected based on the request (expected, actual)
    ByteCountMismatch(usize, usize),
    /// A parameter expected to be echoed in the reply did not match
    ReplyEchoMismatch,
    /// An unknown response function code was received (actual, expected, expected error)
    UnknownResponseFunction(u8, u8, u8),
    /// Bad value for the coil state
    UnknownCoilState(u16),
}

impl std::error::Error for AduParseError {}

impl std::fmt::Display for AduParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AduParseError::InsufficientBytes => f.write_str("response is too short to be valid"),
            AduParseError::TrailingBytes(count) => {
                write!(f, "response contains {count} extra trailing bytes")
            }
            AduParseError::ByteCountMismatch(expected, actual) => write!(
                f,
                "byte count ({actual}) does not match what is expected based on the request ({expected})"
            ),
            AduParseError::ReplyEchoMismatch => {
                f.write_str("a parameter expected to be echoed in the reply did not match")
            }
            AduParseError::UnknownResponseFunction(actual, expected, error) => write!(
                f,
                "received unknown response function code: {actual}. Expected {expected} or {error}"
            ),
            AduParseError::UnknownCoilState(value) => write!(
                f,
                "received coil state with unspecified value: {value:#06X}"
            ),
        }
    }
}

/// Errors that result from bad request parameters
///
/// These are always detected before any I/O is performed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InvalidRange {
    /// Request contains a count of zero
    CountOfZero,
    /// Start and count would overflow the u16 address space (start, count)
    AddressOverflow(u16, u16),
    /// The count exceeds the maximum allowed for this request type (count, max)
    CountTooLargeForType(u16, u16),
}

impl std::error::Error for InvalidRange {}

impl std::fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidRange::CountOfZero => f.write_str("request contains a count of zero"),
            InvalidRange::AddressOverflow(start, count) => write!(
                f,
                "start == {start} and count == {count} would overflow the representation of u16"
            ),
            InvalidRange::CountTooLargeForType(count, max) => write!(
                f,
                "the request count of {count} exceeds the maximum allowed count of {max} for this type"
            ),
        }
    }
}

/// Errors that should only occur if there is a logic error in the library
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InternalError {
    /// Attempted to write beyond the remaining buffer space (requested, remaining)
    InsufficientWriteSpace(usize, usize),
    /// The serialized ADU size exceeds what the protocol allows
    AduTooBig(usize),
    /// A cursor seek exceeded the bounds of the underlying buffer
    BadSeekOperation,
    /// Attempted to read more bytes than present (requested, remaining)
    InsufficientBytesForRead(usize, usize),
}

impl std::error::Error for InternalError {}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InternalError::InsufficientWriteSpace(write_size, remaining) => write!(
                f,
                "attempted to write {write_size} bytes with {remaining} bytes remaining"
            ),
            InternalError::AduTooBig(size) => write!(
                f,
                "ADU length of {size} exceeds the maximum allowed length"
            ),
            InternalError::BadSeekOperation => {
                f.write_str("cursor seek operation exceeded the bounds of the underlying buffer")
            }
            InternalError::InsufficientBytesForRead(requested, remaining) => write!(
                f,
                "attempted to read {requested} bytes with only {remaining} remaining"
            ),
        }
    }
}
