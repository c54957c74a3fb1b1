//! An async implementation of the Modbus TCP client protocol using
//! [Tokio](https://docs.rs/tokio) and Rust's `async/await` syntax.
//!
//! # Features
//!
//! * Panic-free parsing
//! * Automatic connection management with a configurable retry strategy
//! * Strict one-transaction-at-a-time dispatch, matching what simple field
//!   devices can reliably handle
//! * Structured decode logging of the application, frame, and physical layers
//!
//! # Supported functions
//!
//! * Read Coils (0x01)
//! * Read Holding Registers (0x03)
//! * Write Single Coil (0x05)
//! * Write Single Register (0x06)
//!
//! # Example
//!
//! A client that reads some coils:
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use std::str::FromStr;
//! use std::time::Duration;
//!
//! use mbtcp::client::*;
//! use mbtcp::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut channel = spawn_tcp_client_task(
//!         SocketAddr::from_str("127.0.0.1:502")?,
//!         1,
//!         Duration::from_secs(5),
//!         default_retry_strategy(),
//!         DecodeLevel::nothing(),
//!         None,
//!     );
//!
//!     let param = RequestParam::new(UnitId::new(0x02), Duration::from_secs(1));
//!
//!     for x in channel
//!         .read_coils(param, AddressRange::try_from(0, 5)?)
//!         .await?
//!     {
//!         println!("index: {} value: {}", x.index, x.value);
//!     }
//!
//!     Ok(())
//! }
//! ```

/// client API
pub mod client;
/// limits and wire constants defined by the protocol
pub mod constants;

pub use crate::decode::*;
pub use crate::error::*;
pub use crate::exception::*;
pub use crate::retry::*;
pub use crate::types::*;

// internal modules
mod channel;
mod common;
mod decode;
mod error;
mod exception;
mod retry;
mod tcp;
mod types;
