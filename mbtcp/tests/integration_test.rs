use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use mbtcp::client::*;
use mbtcp::*;

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

fn spawn_channel(addr: SocketAddr) -> Channel {
    spawn_tcp_client_task(
        addr,
        8,
        Duration::from_secs(1),
        default_retry_strategy(),
        DecodeLevel::nothing(),
        None,
    )
}

fn param() -> RequestParam {
    RequestParam::new(UnitId::new(1), Duration::from_secs(1))
}

/// read one complete frame, returning the raw MBAP header and the PDU
async fn read_frame(stream: &mut TcpStream) -> ([u8; 7], Vec<u8>) {
    let mut header = [0u8; 7];
    stream.read_exact(&mut header).await.unwrap();
    let length = u16::from_be_bytes([header[4], header[5]]) as usize;
    assert!(length >= 1, "length must count the unit id");
    let mut pdu = vec![0u8; length - 1];
    stream.read_exact(&mut pdu).await.unwrap();
    (header, pdu)
}

/// build a response frame echoing the tx and unit id of the request header
fn response_frame(request_header: &[u8; 7], pdu: &[u8]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&request_header[0..2]);
    frame.extend_from_slice(&[0x00, 0x00]);
    frame.extend_from_slice(&u16::to_be_bytes((pdu.len() + 1) as u16));
    frame.push(request_header[6]);
    frame.extend_from_slice(pdu);
    frame
}

#[tokio::test]
async fn reads_coils_from_server() {
    let (listener, addr) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (header, pdu) = read_frame(&mut stream).await;
        assert_eq!(pdu, &[0x01, 0x00, 0x07, 0x00, 0x03]);
        assert_eq!(header[6], 0x01);
        // 0b0000_0101 -> ON, OFF, ON
        let response = response_frame(&header, &[0x01, 0x01, 0x05]);
        stream.write_all(&response).await.unwrap();
    });

    let mut channel = spawn_channel(addr);
    let coils = channel
        .read_coils(param(), AddressRange::try_from(7, 3).unwrap())
        .await
        .unwrap();

    assert_eq!(
        coils,
        vec![
            Indexed::new(7, true),
            Indexed::new(8, false),
            Indexed::new(9, true)
        ]
    );
    server.await.unwrap();
}

#[tokio::test]
async fn reads_holding_registers_from_server() {
    let (listener, addr) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (header, pdu) = read_frame(&mut stream).await;
        assert_eq!(pdu, &[0x03, 0x00, 0x01, 0x00, 0x02]);
        let response = response_frame(&header, &[0x03, 0x04, 0xCA, 0xFE, 0x12, 0x34]);
        stream.write_all(&response).await.unwrap();
    });

    let mut channel = spawn_channel(addr);
    let registers = channel
        .read_holding_registers(param(), AddressRange::try_from(1, 2).unwrap())
        .await
        .unwrap();

    assert_eq!(
        registers,
        vec![Indexed::new(1, 0xCAFE), Indexed::new(2, 0x1234)]
    );
    server.await.unwrap();
}

#[tokio::test]
async fn surfaces_device_exception_as_distinct_variant() {
    let (listener, addr) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (header, _pdu) = read_frame(&mut stream).await;
        // 0x83 == 0x03 | 0x80, exception code 0x02
        let response = response_frame(&header, &[0x83, 0x02]);
        stream.write_all(&response).await.unwrap();
    });

    let mut channel = spawn_channel(addr);
    let result = channel
        .read_holding_registers(param(), AddressRange::try_from(0, 1).unwrap())
        .await;

    assert_eq!(
        result,
        Err(RequestError::Exception(ExceptionCode::IllegalDataAddress))
    );
    server.await.unwrap();
}

#[tokio::test]
async fn writes_single_coil_and_checks_echo() {
    let (listener, addr) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (header, pdu) = read_frame(&mut stream).await;
        assert_eq!(pdu, &[0x05, 0x00, 0x07, 0xFF, 0x00]);
        // echo the request verbatim
        let response = response_frame(&header, &pdu);
        stream.write_all(&response).await.unwrap();
    });

    let mut channel = spawn_channel(addr);
    let written = channel
        .write_single_coil(param(), Indexed::new(7, true))
        .await
        .unwrap();

    assert_eq!(written, Indexed::new(7, true));
    server.await.unwrap();
}

#[tokio::test]
async fn write_with_bad_echo_fails() {
    let (listener, addr) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (header, _pdu) = read_frame(&mut stream).await;
        // echo a different register address than was requested
        let response = response_frame(&header, &[0x06, 0x00, 0x08, 0x12, 0x34]);
        stream.write_all(&response).await.unwrap();
    });

    let mut channel = spawn_channel(addr);
    let result = channel
        .write_single_register(param(), Indexed::new(7, 0x1234))
        .await;

    assert_eq!(
        result,
        Err(RequestError::BadResponse(AduParseError::ReplyEchoMismatch))
    );
    server.await.unwrap();
}

#[tokio::test]
async fn validates_range_before_any_io() {
    // no server ever accepts, yet validation errors return immediately
    let (_listener, addr) = bind().await;
    let mut channel = spawn_channel(addr);

    let result = channel
        .read_holding_registers(param(), AddressRange::try_from(0, 126).unwrap())
        .await;
    assert_eq!(
        result,
        Err(RequestError::BadRange(InvalidRange::CountTooLargeForType(
            126, 125
        )))
    );

    let result = channel
        .read_coils(param(), AddressRange::try_from(0, 2001).unwrap())
        .await;
    assert_eq!(
        result,
        Err(RequestError::BadRange(InvalidRange::CountTooLargeForType(
            2001, 2000
        )))
    );

    // address overflow is rejected when the range itself is constructed
    assert_eq!(
        AddressRange::try_from(65530, 10),
        Err(InvalidRange::AddressOverflow(65530, 10))
    );
}

#[tokio::test]
async fn times_out_and_discards_the_late_response() {
    let (listener, addr) = bind().await;
    let (sync_tx, sync_rx) = tokio::sync::oneshot::channel();

    let server = tokio::spawn(async move {
        let (mut stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .unwrap()
            .unwrap();

        // swallow the first request and let it expire
        let (first_header, _pdu) = read_frame(&mut stream).await;
        sync_rx.await.unwrap();

        // deliver the response for the expired transaction late, then serve
        // the second request normally
        let stale = response_frame(&first_header, &[0x03, 0x02, 0xAA, 0xBB]);
        stream.write_all(&stale).await.unwrap();

        let (second_header, pdu) = read_frame(&mut stream).await;
        assert_ne!(first_header[0..2], second_header[0..2]);
        assert_eq!(pdu, &[0x03, 0x00, 0x05, 0x00, 0x01]);
        let response = response_frame(&second_header, &[0x03, 0x02, 0xCA, 0xFE]);
        stream.write_all(&response).await.unwrap();
    });

    let mut channel = spawn_channel(addr);
    let short_timeout = RequestParam::new(UnitId::new(1), Duration::from_millis(100));

    let result = channel
        .read_holding_registers(short_timeout, AddressRange::try_from(5, 1).unwrap())
        .await;
    assert_eq!(result, Err(RequestError::ResponseTimeout));
    sync_tx.send(()).unwrap();

    let registers = channel
        .read_holding_registers(param(), AddressRange::try_from(5, 1).unwrap())
        .await
        .unwrap();
    assert_eq!(registers, vec![Indexed::new(5, 0xCAFE)]);

    server.await.unwrap();
}

#[tokio::test]
async fn serializes_concurrent_requests_on_one_channel() {
    let (listener, addr) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        // requests are handled strictly one at a time in arrival order,
        // each response reporting the requested start address back
        for _ in 0..2 {
            let (header, pdu) = read_frame(&mut stream).await;
            assert_eq!(pdu[0], 0x03);
            let start = [pdu[1], pdu[2]];
            let response = response_frame(&header, &[0x03, 0x02, start[0], start[1]]);
            stream.write_all(&response).await.unwrap();
        }
    });

    let channel = spawn_channel(addr);

    let mut first = channel.clone();
    let first = tokio::spawn(async move {
        first
            .read_holding_registers(param(), AddressRange::try_from(0x0102, 1).unwrap())
            .await
    });
    let mut second = channel.clone();
    let second = tokio::spawn(async move {
        second
            .read_holding_registers(param(), AddressRange::try_from(0x0304, 1).unwrap())
            .await
    });

    assert_eq!(
        first.await.unwrap().unwrap(),
        vec![Indexed::new(0x0102, 0x0102)]
    );
    assert_eq!(
        second.await.unwrap().unwrap(),
        vec![Indexed::new(0x0304, 0x0304)]
    );

    server.await.unwrap();
}

#[tokio::test]
async fn fails_fast_with_no_connection() {
    // bind to learn a free port, then close it so connects are refused
    let addr = {
        let (listener, addr) = bind().await;
        drop(listener);
        addr
    };

    let mut channel = spawn_channel(addr);
    let result = channel
        .read_coils(param(), AddressRange::try_from(0, 1).unwrap())
        .await;
    assert_eq!(result, Err(RequestError::NoConnection));
}

struct StateRecorder {
    tx: tokio::sync::mpsc::UnboundedSender<ClientState>,
}

impl Listener<ClientState> for StateRecorder {
    fn update(&mut self, value: ClientState) {
        self.tx.send(value).ok();
    }
}

#[tokio::test]
async fn publishes_connection_state_to_the_listener() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    // nothing is listening on the target address
    let addr = {
        let (listener, addr) = bind().await;
        drop(listener);
        addr
    };

    let _channel = spawn_tcp_client_task(
        addr,
        1,
        Duration::from_secs(1),
        default_retry_strategy(),
        DecodeLevel::nothing(),
        Some(Box::new(StateRecorder { tx })),
    );

    assert_eq!(rx.recv().await.unwrap(), ClientState::Connecting);
    match rx.recv().await.unwrap() {
        ClientState::WaitAfterFailedConnect(_) => {}
        state => panic!("unexpected state: {state:?}"),
    }
}
