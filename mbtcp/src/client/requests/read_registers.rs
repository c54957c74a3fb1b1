use crate::client::message::Promise;
use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::function::FunctionCode;
use crate::common::traits::Serialize;
use crate::decode::AppDecodeLevel;
use crate::error::RequestError;
use crate::types::{Indexed, ReadRegistersRange, RegisterIterator, RegisterIteratorDisplay};

pub(crate) struct ReadRegisters {
    pub(crate) request: ReadRegistersRange,
    promise: Promise<Vec<Indexed<u16>>>,
}

impl ReadRegisters {
    pub(crate) fn new(request: ReadRegistersRange, promise: Promise<Vec<Indexed<u16>>>) -> Self {
        Self { request, promise }
    }

    pub(crate) fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        self.request.get().serialize(cursor)
    }

    pub(crate) fn failure(&mut self, err: RequestError) {
        self.promise.failure(err)
    }

    pub(crate) fn handle_response(
        &mut self,
        mut cursor: ReadCursor,
        function: FunctionCode,
        decode: AppDecodeLevel,
    ) -> Result<(), RequestError> {
        let registers = RegisterIterator::parse_all(self.request.get(), &mut cursor)?;

        if decode.enabled() {
            tracing::info!(
                "PDU RX - {} {}",
                function,
                RegisterIteratorDisplay::new(decode, registers)
            );
        }

        self.promise.complete(Ok(registers.collect()));
        Ok(())
    }
}
