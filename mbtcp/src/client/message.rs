use std::time::Duration;

use tokio::sync::oneshot;

use crate::client::channel::RequestParam;
use crate::client::requests::read_bits::ReadBits;
use crate::client::requests::read_registers::ReadRegisters;
use crate::client::requests::write_single::SingleWrite;
use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::function::FunctionCode;
use crate::common::traits::{Loggable, Serialize};
use crate::decode::AppDecodeLevel;
use crate::error::{AduParseError, RequestError};
use crate::exception::ExceptionCode;
use crate::types::{Indexed, UnitId};

/// Completion handle for a single transaction
///
/// The caller side holds the matching oneshot receiver. A promise completes
/// at most once; dropping it unfulfilled surfaces as `Shutdown` on the
/// caller side.
pub(crate) struct Promise<T> {
    inner: Option<oneshot::Sender<Result<T, RequestError>>>,
}

impl<T> Promise<T> {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Result<T, RequestError>>) {
        let (tx, rx) = oneshot::channel();
        (Self { inner: Some(tx) }, rx)
    }

    pub(crate) fn failure(&mut self, err: RequestError) {
        self.complete(Err(err))
    }

    pub(crate) fn complete(&mut self, result: Result<T, RequestError>) {
        if let Some(tx) = self.inner.take() {
            tx.send(result).ok();
        }
    }
}

/// All of the information the channel task needs to execute one transaction
pub(crate) struct Request {
    pub(crate) id: UnitId,
    pub(crate) timeout: Duration,
    pub(crate) details: RequestDetails,
}

pub(crate) enum RequestDetails {
    ReadCoils(ReadBits),
    ReadHoldingRegisters(ReadRegisters),
    WriteSingleCoil(SingleWrite<Indexed<bool>>),
    WriteSingleRegister(SingleWrite<Indexed<u16>>),
}

impl Request {
    pub(crate) fn new(param: RequestParam, details: RequestDetails) -> Self {
        Self {
            id: param.id,
            timeout: param.response_timeout,
            details,
        }
    }

    /// interpret a response PDU, completing the promise on success or on a
    /// device exception
    ///
    /// Parse failures are returned without completing the promise so that
    /// the task can fail it in one place.
    pub(crate) fn handle_response(
        &mut self,
        payload: &[u8],
        decode: AppDecodeLevel,
    ) -> Result<(), RequestError> {
        let expected = self.details.function();
        let mut cursor = ReadCursor::new(payload);
        let function = cursor.read_u8()?;

        if function == expected.get_value() {
            return self.details.process_response(cursor, decode);
        }

        if function == expected.as_error() {
            let exception = ExceptionCode::from(cursor.read_u8()?);
            if decode.enabled() {
                tracing::warn!(
                    "PDU RX - Modbus exception {:?} ({:#04X})",
                    exception,
                    u8::from(exception)
                );
            }
            // an exception is a normal protocol-level reply, not a transport
            // failure, so it completes the call rather than ending the session
            self.details.fail(RequestError::Exception(exception));
            return Ok(());
        }

        Err(AduParseError::UnknownResponseFunction(
            function,
            expected.get_value(),
            expected.as_error(),
        )
        .into())
    }
}

impl RequestDetails {
    pub(crate) fn function(&self) -> FunctionCode {
        match self {
            RequestDetails::ReadCoils(_) => FunctionCode::ReadCoils,
            RequestDetails::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            RequestDetails::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil,
            RequestDetails::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
        }
    }

    pub(crate) fn fail(&mut self, err: RequestError) {
        match self {
            RequestDetails::ReadCoils(x) => x.failure(err),
            RequestDetails::ReadHoldingRegisters(x) => x.failure(err),
            RequestDetails::WriteSingleCoil(x) => x.failure(err),
            RequestDetails::WriteSingleRegister(x) => x.failure(err),
        }
    }

    fn process_response(
        &mut self,
        cursor: ReadCursor,
        decode: AppDecodeLevel,
    ) -> Result<(), RequestError> {
        let function = self.function();
        match self {
            RequestDetails::ReadCoils(x) => x.handle_response(cursor, function, decode),
            RequestDetails::ReadHoldingRegisters(x) => x.handle_response(cursor, function, decode),
            RequestDetails::WriteSingleCoil(x) => x.handle_response(cursor, function, decode),
            RequestDetails::WriteSingleRegister(x) => x.handle_response(cursor, function, decode),
        }
    }
}

impl Serialize for RequestDetails {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        match self {
            RequestDetails::ReadCoils(x) => x.serialize(cursor),
            RequestDetails::ReadHoldingRegisters(x) => x.serialize(cursor),
            RequestDetails::WriteSingleCoil(x) => x.serialize(cursor),
            RequestDetails::WriteSingleRegister(x) => x.serialize(cursor),
        }
    }
}

impl Loggable for RequestDetails {
    fn log(&self, level: AppDecodeLevel, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RequestDetails::ReadCoils(x) => x.request.get().log(level, f),
            RequestDetails::ReadHoldingRegisters(x) => x.request.get().log(level, f),
            RequestDetails::WriteSingleCoil(x) => x.request.log(level, f),
            RequestDetails::WriteSingleRegister(x) => x.request.log(level, f),
        }
    }
}
