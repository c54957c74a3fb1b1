use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::channel::Receiver;
use crate::client::listener::{ClientState, Listener};
use crate::client::message::Request;
use crate::client::task::{ClientLoop, SessionError};
use crate::common::phys::PhysLayer;
use crate::decode::DecodeLevel;
use crate::retry::RetryStrategy;

/// Maintains a TCP connection to one device and executes queued requests
/// over it
///
/// The task connects, runs the client loop until the session ends, and then
/// either reconnects after a delay or exits when all request handles are
/// dropped. Requests that arrive while disconnected fail fast with
/// `NoConnection`.
pub(crate) struct TcpChannelTask {
    addr: SocketAddr,
    connect_timeout: Duration,
    retry: Box<dyn RetryStrategy>,
    listener: Box<dyn Listener<ClientState>>,
    client_loop: ClientLoop,
}

impl TcpChannelTask {
    pub(crate) fn new(
        addr: SocketAddr,
        rx: Receiver<Request>,
        connect_timeout: Duration,
        retry: Box<dyn RetryStrategy>,
        decode: DecodeLevel,
        listener: Box<dyn Listener<ClientState>>,
    ) -> Self {
        Self {
            addr,
            connect_timeout,
            retry,
            listener,
            client_loop: ClientLoop::new(rx, decode),
        }
    }

    pub(crate) async fn run(&mut self) {
        loop {
            self.listener.update(ClientState::Connecting);
            match self.connect().await {
                Ok(socket) => {
                    tracing::info!("connected to: {}", self.addr);
                    self.retry.reset();
                    self.listener.update(ClientState::Connected);
                    let mut phys = PhysLayer::new_tcp(socket);
                    match self.client_loop.run(&mut phys).await {
                        SessionError::Shutdown => {
                            self.listener.update(ClientState::Shutdown);
                            return;
                        }
                        SessionError::IoError(_) | SessionError::BadFrame => {
                            let delay = self.retry.after_disconnect();
                            tracing::warn!(
                                "waiting {} ms to reconnect",
                                delay.as_millis()
                            );
                            self.listener.update(ClientState::WaitAfterDisconnect(delay));
                            if self.client_loop.fail_requests_for(delay).await.is_err() {
                                self.listener.update(ClientState::Shutdown);
                                return;
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("error connecting: {}", err);
                    let delay = self.retry.after_failed_connect();
                    self.listener
                        .update(ClientState::WaitAfterFailedConnect(delay));
                    if self.client_loop.fail_requests_for(delay).await.is_err() {
                        self.listener.update(ClientState::Shutdown);
                        return;
                    }
                }
            }
        }
    }

    async fn connect(&self) -> Result<TcpStream, std::io::Error> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.addr)).await {
            Ok(result) => result,
            Err(_) => Err(std::io::ErrorKind::TimedOut.into()),
        }
    }
}
