//! Command-line Modbus TCP client

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use mbtcp::client::*;
use mbtcp::*;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("{0}")]
    BadRange(#[from] InvalidRange),
    #[error("{0}")]
    Request(#[from] RequestError),
    #[error("unable to connect to {0}")]
    Connect(SocketAddr),
}

#[derive(Parser)]
#[command(name = "mbtcp-client")]
#[command(about = "A command line program for making Modbus TCP client requests")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:502", help = "A socket address")]
    host: SocketAddr,

    #[arg(short = 'i', long, default_value = "1", help = "The unit id of the Modbus server")]
    id: u8,

    #[arg(
        short = 't',
        long,
        default_value = "1000",
        help = "Response timeout in milliseconds"
    )]
    timeout: u64,

    #[arg(short = 'p', long, help = "Optional polling period in milliseconds")]
    period: Option<u64>,

    #[arg(short = 'v', long, action = clap::ArgAction::Count, help = "Increase decode verbosity (-v, -vv, -vvv)")]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(name = "rc", about = "read coils")]
    ReadCoils(ReadArgs),

    #[command(name = "rhr", about = "read holding registers")]
    ReadHoldingRegisters(ReadArgs),

    #[command(name = "wsc", about = "write single coil")]
    WriteSingleCoil(WriteSingleCoilArgs),

    #[command(name = "wsr", about = "write single register")]
    WriteSingleRegister(WriteSingleRegisterArgs),
}

#[derive(Args)]
struct ReadArgs {
    #[arg(short = 's', long, help = "the starting address")]
    start: u16,

    #[arg(short = 'q', long, help = "quantity of values")]
    quantity: u16,
}

#[derive(Args)]
struct WriteSingleCoilArgs {
    #[arg(short = 'a', long, help = "the address of the coil")]
    address: u16,

    #[arg(
        short = 'V',
        long,
        action = clap::ArgAction::Set,
        help = "the value of the coil (true or false)"
    )]
    value: bool,
}

#[derive(Args)]
struct WriteSingleRegisterArgs {
    #[arg(short = 'a', long, help = "the address of the register")]
    address: u16,

    #[arg(short = 'V', long, help = "the value of the register")]
    value: u16,
}

struct ConnectionListener {
    tx: tokio::sync::mpsc::UnboundedSender<ClientState>,
}

impl ConnectionListener {
    fn create() -> (Self, tokio::sync::mpsc::UnboundedReceiver<ClientState>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Listener<ClientState> for ConnectionListener {
    fn update(&mut self, state: ClientState) {
        self.tx.send(state).ok();
    }
}

fn decode_level(verbose: u8) -> DecodeLevel {
    match verbose {
        0 => DecodeLevel::nothing(),
        1 => DecodeLevel::nothing().application(AppDecodeLevel::DataValues),
        2 => DecodeLevel::nothing()
            .application(AppDecodeLevel::DataValues)
            .frame(FrameDecodeLevel::Header),
        _ => DecodeLevel::new(
            AppDecodeLevel::DataValues,
            FrameDecodeLevel::Payload,
            PhysDecodeLevel::Data,
        ),
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    if let Err(ref e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    let (listener, mut rx) = ConnectionListener::create();

    let mut channel = spawn_tcp_client_task(
        cli.host,
        1,
        Duration::from_secs(5),
        default_retry_strategy(),
        decode_level(cli.verbose),
        Some(Box::new(listener)),
    );

    'connect: loop {
        let state = rx.recv().await;
        tracing::info!("client state: {state:?}");
        match state {
            Some(ClientState::Connecting) => {}
            Some(ClientState::Connected) => break 'connect,
            _ => return Err(Error::Connect(cli.host)),
        }
    }

    let param = RequestParam::new(UnitId::new(cli.id), Duration::from_millis(cli.timeout));

    match cli.period {
        None => run_command(&cli.command, &mut channel, param).await,
        Some(period_ms) => {
            let period = Duration::from_millis(period_ms);
            loop {
                run_command(&cli.command, &mut channel, param).await?;
                tokio::time::sleep(period).await
            }
        }
    }
}

async fn run_command(
    command: &Command,
    channel: &mut Channel,
    param: RequestParam,
) -> Result<(), Error> {
    match command {
        Command::ReadCoils(args) => {
            let range = AddressRange::try_from(args.start, args.quantity)?;
            for x in channel.read_coils(param, range).await? {
                println!("index: {} value: {}", x.index, x.value)
            }
        }
        Command::ReadHoldingRegisters(args) => {
            let range = AddressRange::try_from(args.start, args.quantity)?;
            for x in channel.read_holding_registers(param, range).await? {
                println!("index: {} value: {}", x.index, x.value)
            }
        }
        Command::WriteSingleCoil(args) => {
            let written = channel
                .write_single_coil(param, Indexed::new(args.address, args.value))
                .await?;
            println!("success: index: {} value: {}", written.index, written.value)
        }
        Command::WriteSingleRegister(args) => {
            let written = channel
                .write_single_register(param, Indexed::new(args.address, args.value))
                .await?;
            println!("success: index: {} value: {}", written.index, written.value)
        }
    }
    Ok(())
}
