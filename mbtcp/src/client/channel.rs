use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::client::listener::{ClientState, Listener, NullListener};
use crate::client::message::{Promise, Request, RequestDetails};
use crate::client::requests::read_bits::ReadBits;
use crate::client::requests::read_registers::ReadRegisters;
use crate::client::requests::write_single::SingleWrite;
use crate::decode::DecodeLevel;
use crate::error::RequestError;
use crate::retry::RetryStrategy;
use crate::tcp::client::TcpChannelTask;
use crate::types::{AddressRange, Indexed, UnitId};

/// Parameters common to every request: which unit id to address and how
/// long to wait for the response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestParam {
    /// unit id of the remote device
    pub id: UnitId,
    /// response timeout for this request
    pub response_timeout: Duration,
}

impl RequestParam {
    /// create a `RequestParam` from its fields
    pub fn new(id: UnitId, response_timeout: Duration) -> Self {
        Self {
            id,
            response_timeout,
        }
    }
}

/// Handle used to make requests against the channel task that owns the
/// connection
///
/// The handle is cheap to clone. The task executes requests strictly one at
/// a time; concurrent callers queue behind each other rather than
/// interleaving on the wire. The task shuts down when every handle is
/// dropped.
#[derive(Clone, Debug)]
pub struct Channel {
    tx: mpsc::Sender<Request>,
}

impl Channel {
    pub(crate) fn spawn(
        addr: SocketAddr,
        max_queued_requests: usize,
        connect_timeout: Duration,
        retry: Box<dyn RetryStrategy>,
        decode: DecodeLevel,
        listener: Option<Box<dyn Listener<ClientState>>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(max_queued_requests);
        let listener = listener.unwrap_or_else(NullListener::create);
        let mut task = TcpChannelTask::new(
            addr,
            rx.into(),
            connect_timeout,
            retry,
            decode,
            listener,
        );
        tokio::spawn(async move { task.run().await });
        Channel { tx }
    }

    /// read a range of coils from the server
    ///
    /// The returned values are in request order, one per address.
    pub async fn read_coils(
        &mut self,
        param: RequestParam,
        range: AddressRange,
    ) -> Result<Vec<Indexed<bool>>, RequestError> {
        let range = range.of_read_coils()?;
        let (promise, rx) = Promise::channel();
        let details = RequestDetails::ReadCoils(ReadBits::new(range, promise));
        self.send(Request::new(param, details)).await?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    /// read a range of holding registers from the server
    ///
    /// The returned values are in request order, one per address.
    pub async fn read_holding_registers(
        &mut self,
        param: RequestParam,
        range: AddressRange,
    ) -> Result<Vec<Indexed<u16>>, RequestError> {
        let range = range.of_read_registers()?;
        let (promise, rx) = Promise::channel();
        let details = RequestDetails::ReadHoldingRegisters(ReadRegisters::new(range, promise));
        self.send(Request::new(param, details)).await?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    /// write a single coil, verifying the echoed reply
    pub async fn write_single_coil(
        &mut self,
        param: RequestParam,
        value: Indexed<bool>,
    ) -> Result<Indexed<bool>, RequestError> {
        let (promise, rx) = Promise::channel();
        let details = RequestDetails::WriteSingleCoil(SingleWrite::new(value, promise));
        self.send(Request::new(param, details)).await?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    /// write a single holding register, verifying the echoed reply
    pub async fn write_single_register(
        &mut self,
        param: RequestParam,
        value: Indexed<u16>,
    ) -> Result<Indexed<u16>, RequestError> {
        let (promise, rx) = Promise::channel();
        let details = RequestDetails::WriteSingleRegister(SingleWrite::new(value, promise));
        self.send(Request::new(param, details)).await?;
        rx.await.map_err(|_| RequestError::Shutdown)?
    }

    async fn send(&mut self, request: Request) -> Result<(), RequestError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| RequestError::Shutdown)
    }
}
