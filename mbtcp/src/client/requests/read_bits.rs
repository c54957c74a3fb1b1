use crate::client::message::Promise;
use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::function::FunctionCode;
use crate::common::traits::Serialize;
use crate::decode::AppDecodeLevel;
use crate::error::RequestError;
use crate::types::{BitIterator, BitIteratorDisplay, Indexed, ReadCoilsRange};

pub(crate) struct ReadBits {
    pub(crate) request: ReadCoilsRange,
    promise: Promise<Vec<Indexed<bool>>>,
}

impl ReadBits {
    pub(crate) fn new(request: ReadCoilsRange, promise: Promise<Vec<Indexed<bool>>>) -> Self {
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
        let bits = BitIterator::parse_all(self.request.get(), &mut cursor)?;

        if decode.enabled() {
            tracing::info!(
                "PDU RX - {} {}",
                function,
                BitIteratorDisplay::new(decode, bits)
            );
        }

        self.promise.complete(Ok(bits.collect()));
        Ok(())
    }
}
