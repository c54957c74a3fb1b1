use std::net::SocketAddr;
use std::time::Duration;

pub use channel::{Channel, RequestParam};
pub use listener::{ClientState, Listener};

use crate::decode::DecodeLevel;
use crate::retry::RetryStrategy;

mod channel;
pub(crate) mod listener;
pub(crate) mod message;
pub(crate) mod requests;
pub(crate) mod task;

/// Spawns a channel task onto the runtime that maintains a TCP connection
/// to one device and executes requests from an internal queue, one at a
/// time. The task exits when the returned [`Channel`] and all of its clones
/// are dropped.
///
/// * `addr` - socket address of the remote device
/// * `max_queued_requests` - size of the request queue
/// * `connect_timeout` - maximum time to wait for a single connect attempt
/// * `retry` - controls the delay between connection attempts
/// * `decode` - decode logging configuration
/// * `listener` - optional observer of the connection state
pub fn spawn_tcp_client_task(
    addr: SocketAddr,
    max_queued_requests: usize,
    connect_timeout: Duration,
    retry: Box<dyn RetryStrategy>,
    decode: DecodeLevel,
    listener: Option<Box<dyn Listener<ClientState>>>,
) -> Channel {
    Channel::spawn(
        addr,
        max_queued_requests,
        connect_timeout,
        retry,
        decode,
        listener,
    )
}
