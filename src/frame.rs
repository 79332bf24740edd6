//! Modbus ASCII frame codec.
//!
//! One protocol unit is wire-encoded as
//! `':' <hex(address)> <hex(function)> <hex(data)...> <hex(lrc)> CR LF`,
//! every binary byte spelled as two ASCII hex digits. Transmitted
//! frames use upper-case digits; received frames may use either case.
//! The checksum is wire-format state: it is verified during decode and
//! recomputed during encode, never stored on the frame.

use std::fmt;

use crate::error::DecodeError;
use crate::lrc::lrc;

/// Start-of-frame delimiter.
const FRAME_START: u8 = b':';

/// Line ending terminating every frame.
const FRAME_END: &[u8] = b"\r\n";

/// High bit of the function code, set on exception responses.
const EXCEPTION_BIT: u8 = 0x80;

/// Standard Modbus exception codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Exception {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    ServerDeviceFailure = 0x04,
    Acknowledge = 0x05,
    ServerDeviceBusy = 0x06,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0A,
    GatewayTargetDeviceFailedToRespond = 0x0B,
}

impl Exception {
    /// Convert from the wire byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Exception::IllegalFunction),
            0x02 => Some(Exception::IllegalDataAddress),
            0x03 => Some(Exception::IllegalDataValue),
            0x04 => Some(Exception::ServerDeviceFailure),
            0x05 => Some(Exception::Acknowledge),
            0x06 => Some(Exception::ServerDeviceBusy),
            0x08 => Some(Exception::MemoryParityError),
            0x0A => Some(Exception::GatewayPathUnavailable),
            0x0B => Some(Exception::GatewayTargetDeviceFailedToRespond),
            _ => None,
        }
    }

    /// Convert to the wire byte.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub fn description(self) -> &'static str {
        match self {
            Exception::IllegalFunction => "Illegal Function",
            Exception::IllegalDataAddress => "Illegal Data Address",
            Exception::IllegalDataValue => "Illegal Data Value",
            Exception::ServerDeviceFailure => "Server Device Failure",
            Exception::Acknowledge => "Acknowledge",
            Exception::ServerDeviceBusy => "Server Device Busy",
            Exception::MemoryParityError => "Memory Parity Error",
            Exception::GatewayPathUnavailable => "Gateway Path Unavailable",
            Exception::GatewayTargetDeviceFailedToRespond => {
                "Gateway Target Device Failed to Respond"
            }
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.to_u8())
    }
}

/// One decoded Modbus ASCII protocol unit.
///
/// `data` is the function-specific payload; for exception responses it
/// is exactly one byte, the exception code. Decoding copies the payload
/// out of the receive buffer, so a frame never borrows from the I/O
/// buffer it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiFrame {
    /// Slave/unit identifier.
    pub address: u8,
    /// Function code; high bit set signals an exception response.
    pub function: u8,
    /// Function-specific payload.
    pub data: Vec<u8>,
}

impl AsciiFrame {
    /// Create a frame from its fields.
    pub fn new(address: u8, function: u8, data: Vec<u8>) -> Self {
        Self {
            address,
            function,
            data,
        }
    }

    /// Parse a raw packet received from the serial line.
    ///
    /// The packet is expected to be a complete wire frame: delimiter,
    /// hex span, CR LF. Parsing is all-or-nothing and never mutates the
    /// input. The delimiter and line ending are positional; only the
    /// hex span between them is interpreted.
    pub fn decode(packet: &[u8]) -> Result<Self, DecodeError> {
        if packet.len() < crate::MIN_ASCII_PACKET_SIZE {
            return Err(DecodeError::FrameTooShort { len: packet.len() });
        }

        let span = &packet[1..packet.len() - 2];
        let decoded = hex::decode(span)?;

        // Address, function and LRC are the minimum decoded content.
        if decoded.len() < 3 {
            return Err(DecodeError::FrameTooShort { len: packet.len() });
        }

        let (payload, checksum) = decoded.split_at(decoded.len() - 1);
        let expected = lrc(payload);
        if checksum[0] != expected {
            return Err(DecodeError::ChecksumMismatch {
                expected,
                got: checksum[0],
            });
        }

        Ok(Self {
            address: payload[0],
            function: payload[1],
            data: payload[2..].to_vec(),
        })
    }

    /// Serialize the frame to its wire byte sequence.
    ///
    /// Appends the LRC, hex-encodes with upper-case digits and wraps
    /// the result with the delimiter and line ending. Cannot fail.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(3 + self.data.len());
        payload.push(self.address);
        payload.push(self.function);
        payload.extend_from_slice(&self.data);

        let checksum = lrc(&payload);
        payload.push(checksum);

        let mut wire = Vec::with_capacity(payload.len() * 2 + 3);
        wire.push(FRAME_START);
        wire.extend_from_slice(hex::encode_upper(&payload).as_bytes());
        wire.extend_from_slice(FRAME_END);
        wire
    }

    /// Replace the function-specific payload.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Turn the frame into an exception response.
    ///
    /// Sets the function code's high bit and overwrites `data` with the
    /// single exception code byte; the original payload is not
    /// preserved.
    pub fn set_exception(&mut self, exception: Exception) {
        self.function |= EXCEPTION_BIT;
        self.data = vec![exception.to_u8()];
    }

    /// Whether the function code marks an exception response.
    pub fn is_exception(&self) -> bool {
        self.function & EXCEPTION_BIT != 0
    }

    /// The exception carried by an exception response, if recognized.
    pub fn exception_code(&self) -> Option<Exception> {
        if !self.is_exception() {
            return None;
        }
        self.data.first().and_then(|&code| Exception::from_u8(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Published Modbus ASCII example: read 4 holding registers at
    // 0x006B from unit 0x11; LRC over 11 03 00 6B 00 03 is 0x7E.
    const READ_REQUEST: &[u8] = b":1103006B00037E\r\n";

    fn read_request_frame() -> AsciiFrame {
        AsciiFrame::new(0x11, 0x03, vec![0x00, 0x6B, 0x00, 0x03])
    }

    #[test]
    fn encodes_known_frame() {
        assert_eq!(read_request_frame().to_bytes(), READ_REQUEST);
    }

    #[test]
    fn decodes_known_frame() {
        let frame = AsciiFrame::decode(READ_REQUEST).unwrap();
        assert_eq!(frame.address, 0x11);
        assert_eq!(frame.function, 0x03);
        assert_eq!(frame.data, vec![0x00, 0x6B, 0x00, 0x03]);
    }

    #[test]
    fn decode_accepts_lower_case_hex() {
        let frame = AsciiFrame::decode(b":1103006b00037e\r\n").unwrap();
        assert_eq!(frame, read_request_frame());
    }

    #[test]
    fn round_trips_across_payload_sizes() {
        for len in [0usize, 1, 2, 16, 127, crate::MAX_ASCII_DATA_SIZE] {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let frame = AsciiFrame::new(0xA5, 0x10, data);
            let decoded = AsciiFrame::decode(&frame.to_bytes()).unwrap();
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn rejects_short_packets() {
        for len in 0..crate::MIN_ASCII_PACKET_SIZE {
            let packet = vec![b'0'; len];
            assert_eq!(
                AsciiFrame::decode(&packet),
                Err(DecodeError::FrameTooShort { len })
            );
        }
    }

    #[test]
    fn rejects_packets_without_room_for_all_fields() {
        // ":00\r\n" carries one decoded byte, ":1103\r\n" two; neither
        // can hold address, function and checksum.
        assert!(matches!(
            AsciiFrame::decode(b":00\r\n"),
            Err(DecodeError::FrameTooShort { .. })
        ));
        assert!(matches!(
            AsciiFrame::decode(b":1103\r\n"),
            Err(DecodeError::FrameTooShort { .. })
        ));
    }

    #[test]
    fn rejects_odd_length_and_non_hex_spans() {
        assert!(matches!(
            AsciiFrame::decode(b":1103006B0003X\r\n"),
            Err(DecodeError::MalformedHex(_))
        ));
        assert!(matches!(
            AsciiFrame::decode(b":1103006B000\r\n"),
            Err(DecodeError::MalformedHex(_))
        ));
    }

    #[test]
    fn rejects_checksum_mismatch_with_both_values() {
        assert_eq!(
            AsciiFrame::decode(b":1103006B0003FF\r\n"),
            Err(DecodeError::ChecksumMismatch {
                expected: 0x7E,
                got: 0xFF,
            })
        );
    }

    #[test]
    fn corrupting_any_payload_byte_fails_decode() {
        let wire = read_request_frame().to_bytes();
        for index in 1..wire.len() - 2 {
            let mut corrupted = wire.clone();
            corrupted[index] ^= 0x04;
            assert!(
                AsciiFrame::decode(&corrupted).is_err(),
                "corruption at byte {index} went undetected"
            );
        }
    }

    #[test]
    fn decode_never_returns_partial_frames() {
        // A checksum failure must not leak the already-parsed fields.
        let result = AsciiFrame::decode(b":1103006B0003FF\r\n");
        assert!(result.is_err());
    }

    #[test]
    fn exception_application_is_destructive() {
        let mut frame = read_request_frame();
        frame.set_exception(Exception::IllegalDataAddress);

        assert_eq!(frame.function, 0x83);
        assert_eq!(frame.data, vec![0x02]);
        assert!(frame.is_exception());
        assert_eq!(frame.exception_code(), Some(Exception::IllegalDataAddress));
    }

    #[test]
    fn exception_frames_round_trip() {
        let mut frame = read_request_frame();
        frame.set_exception(Exception::ServerDeviceBusy);

        let decoded = AsciiFrame::decode(&frame.to_bytes()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.exception_code(), Some(Exception::ServerDeviceBusy));
    }

    #[test]
    fn plain_frames_carry_no_exception() {
        let frame = read_request_frame();
        assert!(!frame.is_exception());
        assert_eq!(frame.exception_code(), None);
    }
}
