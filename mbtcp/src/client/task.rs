use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;

use crate::client::message::Request;
use crate::common::frame::{FrameHeader, FramedReader, TxId};
use crate::common::phys::PhysLayer;
use crate::decode::DecodeLevel;
use crate::error::{RequestError, Shutdown};
use crate::tcp::frame::MbapFormatter;

/// Reasons the session over one established connection ends
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SessionError {
    /// the stream errored
    IoError(std::io::ErrorKind),
    /// unrecoverable framing issue
    BadFrame,
    /// the request sender side was dropped
    Shutdown,
}

impl From<Shutdown> for SessionError {
    fn from(_: Shutdown) -> Self {
        SessionError::Shutdown
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SessionError::IoError(err) => write!(f, "I/O error: {err}"),
            SessionError::BadFrame => write!(f, "parser encountered a bad frame"),
            SessionError::Shutdown => write!(f, "shutdown was requested"),
        }
    }
}

impl SessionError {
    pub(crate) fn from_request_err(err: RequestError) -> Option<Self> {
        match err {
            RequestError::Io(x) => Some(SessionError::IoError(x)),
            RequestError::BadFrame(_) => Some(SessionError::BadFrame),
            // no other error ends the session
            _ => None,
        }
    }
}

/// Executes transactions over one established connection, strictly one at
/// a time
///
/// Requests queue in the mpsc channel while a transaction is in flight, so
/// at most one transaction is ever pending on the wire and the response
/// correlation below is a sanity check rather than a routing table.
pub(crate) struct ClientLoop {
    rx: crate::channel::Receiver<Request>,
    writer: MbapFormatter,
    reader: FramedReader,
    tx_id: TxId,
    decode: DecodeLevel,
}

impl ClientLoop {
    pub(crate) fn new(rx: crate::channel::Receiver<Request>, decode: DecodeLevel) -> Self {
        Self {
            rx,
            writer: MbapFormatter::new(),
            reader: FramedReader::new(),
            tx_id: TxId::default(),
            decode,
        }
    }

    pub(crate) async fn run(&mut self, io: &mut PhysLayer) -> SessionError {
        loop {
            if let Err(err) = self.poll(io).await {
                tracing::warn!("ending session: {}", err);
                return err;
            }
        }
    }

    async fn poll(&mut self, io: &mut PhysLayer) -> Result<(), SessionError> {
        tokio::select! {
            frame = self.reader.next_frame(io, self.decode) => {
                // frames arriving while no transaction is pending are
                // stale responses to requests that have already timed out
                match frame {
                    Ok(frame) => {
                        tracing::warn!("discarding frame received while idle: tx_id: {}", frame.header.tx_id);
                        Ok(())
                    }
                    Err(err) => match SessionError::from_request_err(err) {
                        Some(err) => Err(err),
                        None => Ok(()),
                    }
                }
            }
            request = self.rx.recv() => {
                let mut request = request?;
                self.run_one_request(io, &mut request).await
            }
        }
    }

    async fn run_one_request(
        &mut self,
        io: &mut PhysLayer,
        request: &mut Request,
    ) -> Result<(), SessionError> {
        let tx_id = self.tx_id.next();
        let result = self
            .execute_request(io, request, tx_id)
            .instrument(tracing::info_span!("transaction", tx_id = %tx_id))
            .await;

        if let Err(err) = result {
            // fail the request in one place. If the whole future is dropped
            // instead, the promise is dropped unfulfilled and the caller
            // observes Shutdown
            tracing::warn!("request error: {}", err);
            request.details.fail(err);

            // io and framing errors also end the session
            if let Some(err) = SessionError::from_request_err(err) {
                return Err(err);
            }
        }

        Ok(())
    }

    async fn execute_request(
        &mut self,
        io: &mut PhysLayer,
        request: &mut Request,
        tx_id: TxId,
    ) -> Result<(), RequestError> {
        let bytes = self.writer.format(
            FrameHeader::new(request.id, tx_id),
            request.details.function(),
            &request.details,
            self.decode,
        )?;

        io.write(bytes, self.decode.physical).await?;

        let deadline = Instant::now() + request.timeout;

        // loop until a response with the matching tx id arrives or the
        // deadline passes. Non-matching frames never fail the waiting call.
        let frame = loop {
            let frame = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(RequestError::ResponseTimeout);
                }
                frame = self.reader.next_frame(io, self.decode) => {
                    frame?
                }
            };

            if frame.header.tx_id != tx_id {
                tracing::warn!(
                    "discarding frame with tx_id: {} while expecting: {}",
                    frame.header.tx_id,
                    tx_id
                );
                continue;
            }

            break frame;
        };

        request.handle_response(frame.payload(), self.decode.app)
    }

    /// while disconnected, fail incoming requests immediately for the
    /// duration of the reconnect delay
    pub(crate) async fn fail_requests_for(&mut self, duration: Duration) -> Result<(), Shutdown> {
        let deadline = Instant::now() + duration;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Ok(());
                }
                request = self.rx.recv() => {
                    let mut request = request?;
                    request.details.fail(RequestError::NoConnection);
                }
            }
        }
    }
}
