//! In-process model of the display firmware's RPC handler.
//!
//! [`SimulatedDevice`] accepts raw bytes as they would arrive on the device's
//! UART, reassembles frames, and produces the response frames the firmware
//! would transmit. Replies reuse the firmware's exact status and message
//! strings so host tooling can be exercised without hardware.

use cbor_host_frame::{decode_length_prefix, encode, HEADER_SIZE};
use ciborium::value::Value;
use tracing::{debug, warn};

use crate::payload::{self, map_get};

pub const IMAGE_WIDTH: usize = 480;
pub const IMAGE_HEIGHT: usize = 272;
pub const IMAGE_PIXEL_COUNT: usize = IMAGE_WIDTH * IMAGE_HEIGHT;
/// Bytes in one RGB565 framebuffer.
pub const IMAGE_DATA_SIZE: usize = IMAGE_PIXEL_COUNT * 2;
/// Largest payload the device accepts: a full framebuffer plus room for the
/// surrounding request map.
pub const DEVICE_RX_BUFFER_SIZE: usize = IMAGE_DATA_SIZE + 256;
/// Size of the device's test message buffer, terminator included.
pub const TEST_MESSAGE_CAPACITY: usize = 128;

const BAR_COLORS: [u16; 8] = [
    0xFFFF, // white
    0xFFE0, // yellow
    0x07FF, // cyan
    0x07E0, // green
    0xF81F, // magenta
    0xF800, // red
    0x001F, // blue
    0x0000, // black
];

type Handled = Result<Value, &'static str>;

/// Simulated display device.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    framebuffer: Vec<u8>,
    default_image: Vec<u8>,
    rx: Vec<u8>,
    expected: Option<usize>,
    handled: u64,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::with_default_image(color_bars())
    }
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device whose `display_default` paints `image` (RGB565 little-endian).
    /// The image is truncated or zero-padded to [`IMAGE_DATA_SIZE`].
    pub fn with_default_image(mut image: Vec<u8>) -> Self {
        image.resize(IMAGE_DATA_SIZE, 0);
        Self {
            framebuffer: vec![0; IMAGE_DATA_SIZE],
            default_image: image,
            rx: Vec::new(),
            expected: None,
            handled: 0,
        }
    }

    /// Current framebuffer contents.
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// RGB565 value of the pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u16> {
        if x >= IMAGE_WIDTH || y >= IMAGE_HEIGHT {
            return None;
        }
        let offset = (y * IMAGE_WIDTH + x) * 2;
        Some(u16::from_le_bytes([
            self.framebuffer[offset],
            self.framebuffer[offset + 1],
        ]))
    }

    /// Number of complete requests processed.
    pub fn requests_handled(&self) -> u64 {
        self.handled
    }

    /// Drop any partially received frame.
    pub fn discard_partial(&mut self) {
        self.rx.clear();
        self.expected = None;
    }

    /// Feed received bytes. Returns the response frames to transmit, in order.
    pub fn receive(&mut self, mut bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut replies = Vec::new();

        while !bytes.is_empty() {
            match self.expected {
                None => {
                    let take = (HEADER_SIZE - self.rx.len()).min(bytes.len());
                    self.rx.extend_from_slice(&bytes[..take]);
                    bytes = &bytes[take..];
                    if self.rx.len() < HEADER_SIZE {
                        continue;
                    }

                    let len = match decode_length_prefix(&self.rx) {
                        Ok(len) => len as usize,
                        Err(_) => {
                            self.rx.clear();
                            continue;
                        }
                    };
                    self.rx.clear();
                    if len > DEVICE_RX_BUFFER_SIZE {
                        warn!(len, max = DEVICE_RX_BUFFER_SIZE, "request too large, flushing input");
                        replies.extend(frame_reply(status_reply("error", "Message too large")));
                        return replies;
                    }
                    if len == 0 {
                        replies.extend(self.complete(&[]));
                        continue;
                    }
                    self.expected = Some(len);
                }
                Some(expected) => {
                    let take = (expected - self.rx.len()).min(bytes.len());
                    self.rx.extend_from_slice(&bytes[..take]);
                    bytes = &bytes[take..];
                    if self.rx.len() == expected {
                        let request = std::mem::take(&mut self.rx);
                        self.expected = None;
                        replies.extend(self.complete(&request));
                    }
                }
            }
        }

        replies
    }

    /// Handle one complete request payload and return the response value.
    pub fn handle_payload(&mut self, payload: &[u8]) -> Value {
        self.handled += 1;
        match self.dispatch(payload) {
            Ok(reply) => reply,
            Err(message) => {
                debug!(reason = message, "request rejected");
                status_reply("error", message)
            }
        }
    }

    fn complete(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let reply = self.handle_payload(payload);
        frame_reply(reply)
    }

    fn dispatch(&mut self, payload: &[u8]) -> Handled {
        let root = payload::decode_value(payload).map_err(|_| "Failed to parse CBOR message")?;
        if !matches!(root, Value::Map(_)) {
            return Err("Expected RPC message format");
        }

        let method = match map_get(&root, "method") {
            None => return Err("Method field not found in RPC message"),
            Some(Value::Text(method)) => method.as_str(),
            Some(_) => return Err("Method must be a string"),
        };
        debug!(method, "request received");

        match method {
            "display_image" => self.display_image(&root),
            "clear_display" => {
                self.framebuffer.fill(0);
                Ok(status_reply("success", "Display cleared successfully"))
            }
            "display_default" => {
                self.framebuffer.copy_from_slice(&self.default_image);
                Ok(status_reply("success", "Default image displayed successfully"))
            }
            "test" => test_reply(&root),
            _ => Err("Unknown method"),
        }
    }

    fn display_image(&mut self, root: &Value) -> Handled {
        let params = match map_get(root, "params") {
            None => return Err("Params not found in method call"),
            Some(params @ Value::Map(_)) => params,
            Some(_) => return Err("Params must be a map"),
        };
        let image = match map_get(params, "image_data") {
            None => return Err("No valid parameters found (expected image_data)"),
            Some(Value::Bytes(image)) => image,
            Some(_) => return Err("Image data must be byte string"),
        };
        if image.len() > IMAGE_DATA_SIZE {
            return Err("Image data too large");
        }

        self.framebuffer[..image.len()].copy_from_slice(image);
        debug!(bytes = image.len(), "framebuffer updated");
        Ok(status_reply("success", "Image displayed successfully"))
    }
}

fn test_reply(root: &Value) -> Handled {
    let params = match map_get(root, "params") {
        None => return Err("Params not found in test method call"),
        Some(params @ Value::Map(_)) => params,
        Some(_) => return Err("Test params must be a map"),
    };
    let message = match map_get(params, "test_message") {
        None => return Err("No test_message parameter found"),
        Some(Value::Text(message)) => message,
        Some(_) => return Err("Test message must be a string"),
    };
    if message.len() >= TEST_MESSAGE_CAPACITY {
        return Err("Failed to read test message");
    }

    Ok(Value::Map(vec![
        text_pair("status", "success"),
        text_pair("message", "Test RPC call processed successfully"),
        text_pair("received_message", message),
    ]))
}

fn status_reply(status: &str, message: &str) -> Value {
    Value::Map(vec![text_pair("status", status), text_pair("message", message)])
}

fn text_pair(key: &str, value: &str) -> (Value, Value) {
    (Value::Text(key.to_string()), Value::Text(value.to_string()))
}

fn frame_reply(reply: Value) -> Option<Vec<u8>> {
    let body = match payload::encode(&reply) {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, "failed to encode reply");
            return None;
        }
    };
    match encode(&body) {
        Ok(frame) => Some(frame.to_vec()),
        Err(err) => {
            warn!(error = %err, "failed to frame reply");
            None
        }
    }
}

/// Eight vertical colour bars, RGB565 little-endian.
fn color_bars() -> Vec<u8> {
    let bar_width = IMAGE_WIDTH / BAR_COLORS.len();
    let mut image = Vec::with_capacity(IMAGE_DATA_SIZE);
    for _ in 0..IMAGE_HEIGHT {
        for x in 0..IMAGE_WIDTH {
            let color = BAR_COLORS[(x / bar_width).min(BAR_COLORS.len() - 1)];
            image.extend_from_slice(&color.to_le_bytes());
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::map_get_text;
    use crate::request::Request;

    fn frame(payload: &[u8]) -> Vec<u8> {
        encode(payload).unwrap().to_vec()
    }

    fn request_frame(request: &Request) -> Vec<u8> {
        frame(&request.encode().unwrap())
    }

    fn single_reply(device: &mut SimulatedDevice, wire: &[u8]) -> Value {
        let replies = device.receive(wire);
        assert_eq!(replies.len(), 1, "expected exactly one reply");
        let len = decode_length_prefix(&replies[0]).unwrap() as usize;
        assert_eq!(len, replies[0].len() - HEADER_SIZE);
        payload::decode_value(&replies[0][HEADER_SIZE..]).unwrap()
    }

    fn message_for(request: &Request) -> String {
        let mut device = SimulatedDevice::new();
        let reply = single_reply(&mut device, &request_frame(request));
        map_get_text(&reply, "message").unwrap().to_string()
    }

    #[test]
    fn sizes_match_panel() {
        assert_eq!(IMAGE_DATA_SIZE, 261_120);
        assert_eq!(DEVICE_RX_BUFFER_SIZE, 261_376);
    }

    #[test]
    fn test_method_echoes_message() {
        let mut device = SimulatedDevice::new();
        let reply = single_reply(&mut device, &request_frame(&Request::test("hello")));

        assert_eq!(map_get_text(&reply, "status"), Some("success"));
        assert_eq!(
            map_get_text(&reply, "message"),
            Some("Test RPC call processed successfully")
        );
        assert_eq!(map_get_text(&reply, "received_message"), Some("hello"));
        assert_eq!(device.requests_handled(), 1);
    }

    #[test]
    fn test_method_parameter_errors() {
        assert_eq!(
            message_for(&Request::new("test")),
            "No test_message parameter found"
        );
        assert_eq!(
            message_for(&Request::new("test").with_param("test_message", Value::Integer(1.into()))),
            "Test message must be a string"
        );
        assert_eq!(
            message_for(&Request::test("x".repeat(TEST_MESSAGE_CAPACITY))),
            "Failed to read test message"
        );
    }

    #[test]
    fn message_envelope_errors() {
        let mut device = SimulatedDevice::new();
        let cases: Vec<(Vec<u8>, &str)> = vec![
            (vec![0xFC], "Failed to parse CBOR message"),
            (
                payload::encode(&Value::Text("hi".into())).unwrap(),
                "Expected RPC message format",
            ),
            (
                payload::encode(&Value::Map(vec![])).unwrap(),
                "Method field not found in RPC message",
            ),
            (
                payload::encode(&Value::Map(vec![(
                    Value::Text("method".into()),
                    Value::Integer(3.into()),
                )]))
                .unwrap(),
                "Method must be a string",
            ),
            (Request::new("reboot").encode().unwrap(), "Unknown method"),
        ];

        for (body, expected) in cases {
            let reply = single_reply(&mut device, &frame(&body));
            assert_eq!(map_get_text(&reply, "status"), Some("error"));
            assert_eq!(map_get_text(&reply, "message"), Some(expected));
        }
    }

    #[test]
    fn params_must_be_present_and_a_map() {
        let no_params = payload::encode(&Value::Map(vec![(
            Value::Text("method".into()),
            Value::Text("test".into()),
        )]))
        .unwrap();
        let mut device = SimulatedDevice::new();
        let reply = single_reply(&mut device, &frame(&no_params));
        assert_eq!(
            map_get_text(&reply, "message"),
            Some("Params not found in test method call")
        );

        let bad_params = payload::encode(&Value::Map(vec![
            (Value::Text("method".into()), Value::Text("display_image".into())),
            (Value::Text("params".into()), Value::Array(vec![])),
        ]))
        .unwrap();
        let reply = single_reply(&mut device, &frame(&bad_params));
        assert_eq!(map_get_text(&reply, "message"), Some("Params must be a map"));
    }

    #[test]
    fn display_image_writes_framebuffer() {
        let mut device = SimulatedDevice::new();
        let reply = single_reply(
            &mut device,
            &request_frame(&Request::display_image(vec![0x1F, 0x00, 0x00, 0xF8])),
        );

        assert_eq!(
            map_get_text(&reply, "message"),
            Some("Image displayed successfully")
        );
        assert_eq!(device.pixel(0, 0), Some(0x001F));
        assert_eq!(device.pixel(1, 0), Some(0xF800));
        assert_eq!(device.pixel(2, 0), Some(0x0000));
    }

    #[test]
    fn display_image_validation() {
        assert_eq!(
            message_for(&Request::new("display_image")),
            "No valid parameters found (expected image_data)"
        );
        assert_eq!(
            message_for(
                &Request::new("display_image")
                    .with_param("image_data", Value::Text("pixels".into()))
            ),
            "Image data must be byte string"
        );
        assert_eq!(
            message_for(&Request::display_image(vec![0u8; IMAGE_DATA_SIZE + 2])),
            "Image data too large"
        );
    }

    #[test]
    fn clear_and_default() {
        let mut device = SimulatedDevice::new();
        let reply = single_reply(&mut device, &request_frame(&Request::display_default()));
        assert_eq!(
            map_get_text(&reply, "message"),
            Some("Default image displayed successfully")
        );
        assert_eq!(device.pixel(0, 0), Some(0xFFFF));
        assert_eq!(device.pixel(IMAGE_WIDTH - 1, IMAGE_HEIGHT - 1), Some(0x0000));
        assert_eq!(device.pixel(IMAGE_WIDTH / 8 * 5, 10), Some(0xF800));

        let reply = single_reply(&mut device, &request_frame(&Request::clear_display()));
        assert_eq!(
            map_get_text(&reply, "message"),
            Some("Display cleared successfully")
        );
        assert!(device.framebuffer().iter().all(|b| *b == 0));
    }

    #[test]
    fn custom_default_image_is_padded() {
        let mut device = SimulatedDevice::with_default_image(vec![0x34, 0x12]);
        device.handle_payload(&Request::display_default().encode().unwrap());
        assert_eq!(device.pixel(0, 0), Some(0x1234));
        assert_eq!(device.pixel(1, 0), Some(0x0000));
        assert_eq!(device.pixel(IMAGE_WIDTH, 0), None);
    }

    #[test]
    fn reassembles_frames_split_across_reads() {
        let mut device = SimulatedDevice::new();
        let wire = request_frame(&Request::test("split"));

        for byte in &wire[..wire.len() - 1] {
            assert!(device.receive(std::slice::from_ref(byte)).is_empty());
        }
        let replies = device.receive(&wire[wire.len() - 1..]);
        assert_eq!(replies.len(), 1);
    }

    #[test]
    fn handles_back_to_back_frames() {
        let mut device = SimulatedDevice::new();
        let mut wire = request_frame(&Request::test("one"));
        wire.extend(request_frame(&Request::clear_display()));
        assert_eq!(device.receive(&wire).len(), 2);
        assert_eq!(device.requests_handled(), 2);
    }

    #[test]
    fn oversized_request_flushes_input() {
        let mut device = SimulatedDevice::new();
        let mut wire = ((DEVICE_RX_BUFFER_SIZE + 1) as u32).to_be_bytes().to_vec();
        wire.extend_from_slice(&[0xAB; 32]);

        let reply = single_reply(&mut device, &wire);
        assert_eq!(map_get_text(&reply, "message"), Some("Message too large"));

        // The rest of that chunk was discarded; the next frame parses cleanly.
        let reply = single_reply(&mut device, &request_frame(&Request::test("again")));
        assert_eq!(map_get_text(&reply, "received_message"), Some("again"));
    }

    #[test]
    fn discard_partial_realigns() {
        let mut device = SimulatedDevice::new();
        assert!(device.receive(&[0, 0, 0, 9, 0xA2]).is_empty());
        device.discard_partial();

        let reply = single_reply(&mut device, &request_frame(&Request::test("fresh")));
        assert_eq!(map_get_text(&reply, "received_message"), Some("fresh"));
    }

    #[test]
    fn empty_payload_is_parse_failure() {
        let mut device = SimulatedDevice::new();
        let reply = single_reply(&mut device, &[0, 0, 0, 0]);
        assert_eq!(
            map_get_text(&reply, "message"),
            Some("Failed to parse CBOR message")
        );
    }
}
