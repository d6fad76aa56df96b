use std::thread;
use std::time::Duration;

use cbor_host_frame::encode;
use cbor_host_rpc::payload;
use cbor_host_rpc::{
    exchange, DeviceServer, Exchange, ExchangeState, ProtocolError, Request, ResponseBody,
    SessionConfig, SessionOutcome, SimulatedDevice, TestReply, Value,
};
use cbor_host_transport::{ByteTransport, ReadStep, ScriptedTransport, TcpSerial};

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn framed_value(value: &Value) -> Vec<u8> {
    encode(&payload::encode(value).unwrap()).unwrap().to_vec()
}

#[test]
fn echo_request_decodes_to_success() {
    let reply = Value::Map(vec![
        (text("status"), text("success")),
        (text("received_message"), text("hello")),
    ]);
    let mut transport = ScriptedTransport::from_bytes(framed_value(&reply));

    let request = Request::test("hello");
    let outcome = exchange(&mut transport, &request, &SessionConfig::default());

    let response = match outcome {
        SessionOutcome::Success(response) => response,
        other => panic!("expected success, got {other:?}"),
    };
    assert_eq!(response.raw(), &reply);
    assert_eq!(
        response.body(),
        &ResponseBody::Test(TestReply {
            status: "success".to_string(),
            message: None,
            received_message: Some("hello".to_string()),
        })
    );

    let sent = payload::decode_value(&transport.written()[4..]).unwrap();
    assert_eq!(sent, request.to_value());
}

#[test]
fn oversized_length_prefix_consumes_no_payload() {
    // Declared length 2000 followed by bytes that must stay unread.
    let mut wire = 2000u32.to_be_bytes().to_vec();
    wire.extend_from_slice(&[0x55; 64]);
    let mut transport = ScriptedTransport::from_bytes(wire);
    let config = SessionConfig {
        max_response_payload: 1024,
        ..SessionConfig::default()
    };

    let outcome = exchange(&mut transport, &Request::test("big"), &config);

    assert!(matches!(
        outcome,
        SessionOutcome::ProtocolError(ProtocolError::PayloadTooLarge {
            size: 2000,
            max: 1024
        })
    ));
    assert_eq!(transport.consumed(), 4);
    assert_eq!(transport.remaining_data(), 64);
}

#[test]
fn silent_transport_times_out() {
    let mut transport = ScriptedTransport::new(vec![ReadStep::TimedOut]);
    let report = Exchange::new(&mut transport, &SessionConfig::default()).run(&Request::test("anyone?"));

    assert!(matches!(report.outcome, SessionOutcome::Timeout));
    assert_eq!(report.phase, ExchangeState::AwaitingResponse);
    assert_eq!(report.bytes_received, 0);
    assert!(report.bytes_sent > 0);
}

#[test]
fn partial_header_is_protocol_error_not_timeout() {
    let mut transport = ScriptedTransport::new(vec![ReadStep::Data(vec![0x00, 0x00]), ReadStep::TimedOut]);
    let outcome = exchange(&mut transport, &Request::test("x"), &SessionConfig::default());
    assert!(matches!(
        outcome,
        SessionOutcome::ProtocolError(ProtocolError::ShortHeader { received: 2 })
    ));
}

#[test]
fn corrupt_payload_is_malformed() {
    let valid = payload::encode(&Value::Map(vec![(text("status"), text("success"))])).unwrap();
    let truncated = &valid[..valid.len() - 2];
    let mut transport = ScriptedTransport::from_bytes(encode(truncated).unwrap().to_vec());

    let report = Exchange::new(&mut transport, &SessionConfig::default()).run(&Request::clear_display());

    assert!(matches!(
        report.outcome,
        SessionOutcome::ProtocolError(ProtocolError::MalformedPayload(_))
    ));
    assert_eq!(report.phase, ExchangeState::Decoding);
}

#[test]
fn device_error_is_still_success() {
    let reply = Value::Map(vec![
        (text("status"), text("error")),
        (text("message"), text("Unknown method")),
    ]);
    let mut transport = ScriptedTransport::from_bytes(framed_value(&reply));

    let response = exchange(&mut transport, &Request::new("reboot"), &SessionConfig::default())
        .into_result()
        .unwrap();

    assert!(!response.is_success());
    assert_eq!(response.message(), Some("Unknown method"));
    assert!(matches!(response.body(), ResponseBody::Generic(_)));
}

#[test]
fn exchanges_are_independent() {
    let ok = framed_value(&Value::Map(vec![(text("status"), text("success"))]));
    let mut transport = ScriptedTransport::new(vec![ReadStep::TimedOut, ReadStep::Data(ok)]);
    let config = SessionConfig::default();

    assert!(matches!(
        exchange(&mut transport, &Request::clear_display(), &config),
        SessionOutcome::Timeout
    ));
    assert!(exchange(&mut transport, &Request::clear_display(), &config).is_success());
    assert_eq!(transport.input_resets(), 2);
}

#[test]
fn full_image_round_trip_against_simulator() {
    let mut server = DeviceServer::bind("127.0.0.1:0", SimulatedDevice::new()).unwrap();
    let addr = server.local_addr().unwrap();
    let handle = thread::spawn(move || {
        server.serve_one().unwrap();
        server
    });

    let mut transport = TcpSerial::connect(&addr.to_string(), Some(Duration::from_secs(2))).unwrap();
    transport.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let image: Vec<u8> = (0..cbor_host_rpc::IMAGE_DATA_SIZE)
        .map(|i| (i % 251) as u8)
        .collect();
    let config = SessionConfig::default();

    let response = exchange(&mut transport, &Request::display_image(image.clone()), &config)
        .into_result()
        .unwrap();
    assert!(response.is_success());
    assert_eq!(response.message(), Some("Image displayed successfully"));

    let response = exchange(&mut transport, &Request::test("still aligned"), &config)
        .into_result()
        .unwrap();
    assert_eq!(
        response.field("received_message"),
        Some(&text("still aligned"))
    );

    drop(transport);
    let server = handle.join().unwrap();
    assert_eq!(server.device().framebuffer(), image.as_slice());
}

#[test]
fn trickling_device_cannot_outlast_read_timeout() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let reply = framed_value(&Value::Map(vec![
        (text("status"), text("success")),
        (text("received_message"), text("hi")),
    ]));
    let device = thread::spawn(move || {
        use std::io::{Read, Write};

        let (mut stream, _) = listener.accept().unwrap();
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).unwrap();
        let mut request = vec![0u8; u32::from_be_bytes(header) as usize];
        stream.read_exact(&mut request).unwrap();
        for byte in reply {
            if stream.write_all(&[byte]).is_err() {
                return;
            }
            thread::sleep(Duration::from_millis(150));
        }
    });

    let mut transport = TcpSerial::connect(&addr, Some(Duration::from_secs(2))).unwrap();
    let config = SessionConfig {
        read_timeout: Some(Duration::from_millis(200)),
        ..SessionConfig::default()
    };
    let report = Exchange::new(&mut transport, &config).run(&Request::test("hi"));

    assert!(matches!(
        report.outcome,
        SessionOutcome::ProtocolError(ProtocolError::ShortHeader { .. })
    ));
    assert_eq!(report.phase, ExchangeState::AwaitingResponse);
    assert!(report.elapsed < Duration::from_millis(600));
    assert_eq!(transport.read_timeout(), Some(Duration::from_millis(200)));

    drop(transport);
    device.join().unwrap();
}
