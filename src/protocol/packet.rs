use crate::protocol::properties::{ConnectProperties, WillProperties};
use anyhow::{bail, Result};
use tokio::io::AsyncWriteExt;

/// MQTT control packet types, as carried in the high nibble of the fixed
/// header's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
    Auth = 15,
}

impl PacketType {
    /// Classify a packet from the first byte of its fixed header.
    ///
    /// This is the hook the client's inbound reader uses to recognize a
    /// PINGRESP (`0xD0`) and forward it to the pinger's `ping_response()`.
    pub fn from_first_byte(byte: u8) -> Option<Self> {
        match byte >> 4 {
            1 => Some(Self::Connect),
            2 => Some(Self::ConnAck),
            3 => Some(Self::Publish),
            4 => Some(Self::PubAck),
            5 => Some(Self::PubRec),
            6 => Some(Self::PubRel),
            7 => Some(Self::PubComp),
            8 => Some(Self::Subscribe),
            9 => Some(Self::SubAck),
            10 => Some(Self::Unsubscribe),
            11 => Some(Self::UnsubAck),
            12 => Some(Self::PingReq),
            13 => Some(Self::PingResp),
            14 => Some(Self::Disconnect),
            15 => Some(Self::Auth),
            _ => None,
        }
    }
}

/// Largest value the 4-byte remaining-length varint can carry.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Encode a remaining-length value as the MQTT variable-byte integer.
pub fn encode_remaining_length(mut len: usize) -> Vec<u8> {
    debug_assert!(len <= MAX_REMAINING_LENGTH);
    let mut out = Vec::with_capacity(4);
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            return out;
        }
    }
}

/// Decode a remaining-length varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_remaining_length(buf: &[u8]) -> Result<(usize, usize)> {
    let mut value = 0usize;
    let mut shift = 0u32;
    for (idx, byte) in buf.iter().enumerate() {
        if idx == 4 {
            bail!("remaining length exceeds 4 bytes");
        }
        value |= usize::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, idx + 1));
        }
        shift += 7;
    }
    bail!("remaining length truncated");
}

/// Serialize a PINGREQ and write it to the stream.
///
/// Two bytes, no payload: packet type 12 in the high nibble, zero flags,
/// zero remaining length.
pub async fn write_pingreq<S: AsyncWriteExt + Unpin>(stream: &mut S) -> std::io::Result<()> {
    stream.write_all(&[0xC0, 0x00]).await
}

/// Quality-of-service levels for the will message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl Qos {
    fn bits(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

/// Last-will message carried inside CONNECT.
#[derive(Debug, Clone)]
pub struct Will {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
    pub retain: bool,
    pub properties: WillProperties,
}

/// Client-side representation of the MQTT v5 CONNECT packet.
#[derive(Debug, Clone)]
pub struct ConnectPacket {
    pub client_id: String,
    pub keep_alive: u16,
    pub clean_start: bool,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
    pub will: Option<Will>,
    pub properties: ConnectProperties,
}

impl ConnectPacket {
    pub fn new(client_id: &str, keep_alive: u16) -> Self {
        Self {
            client_id: client_id.to_string(),
            keep_alive,
            clean_start: true,
            username: None,
            password: None,
            will: None,
            properties: ConnectProperties::default(),
        }
    }

    pub fn with_clean_start(mut self, clean_start: bool) -> Self {
        self.clean_start = clean_start;
        self
    }

    pub fn with_credentials(mut self, username: &str, password: Option<&[u8]>) -> Self {
        self.username = Some(username.to_string());
        self.password = password.map(<[u8]>::to_vec);
        self
    }

    pub fn with_will(mut self, will: Will) -> Self {
        self.will = Some(will);
        self
    }

    pub fn with_properties(mut self, properties: ConnectProperties) -> Self {
        self.properties = properties;
        self
    }

    fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.clean_start {
            flags |= 0x02;
        }
        if let Some(will) = &self.will {
            flags |= 0x04;
            flags |= will.qos.bits() << 3;
            if will.retain {
                flags |= 0x20;
            }
        }
        if self.password.is_some() {
            flags |= 0x40;
        }
        if self.username.is_some() {
            flags |= 0x80;
        }
        flags
    }
}

fn put_string(buf: &mut Vec<u8>, value: &str, what: &str) -> Result<()> {
    if value.len() > 65535 {
        bail!("{what} exceeds 65535 bytes");
    }
    buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

fn put_binary(buf: &mut Vec<u8>, value: &[u8], what: &str) -> Result<()> {
    if value.len() > 65535 {
        bail!("{what} exceeds 65535 bytes");
    }
    buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
    buf.extend_from_slice(value);
    Ok(())
}

/// Serialize a v5 CONNECT packet and write it to the stream.
pub async fn write_connect<S: AsyncWriteExt + Unpin>(
    stream: &mut S,
    packet: &ConnectPacket,
) -> Result<()> {
    let mut payload = Vec::new();

    // Variable header: protocol name, level 5, flags, keepalive
    put_string(&mut payload, "MQTT", "protocol name")?;
    payload.push(0x05);
    payload.push(packet.flags());
    payload.extend_from_slice(&packet.keep_alive.to_be_bytes());

    let props = packet.properties.encode();
    payload.extend(encode_remaining_length(props.len()));
    payload.extend_from_slice(&props);

    // Payload: client id, then will, then credentials
    put_string(&mut payload, &packet.client_id, "client_id")?;
    if let Some(will) = &packet.will {
        let will_props = will.properties.encode();
        payload.extend(encode_remaining_length(will_props.len()));
        payload.extend_from_slice(&will_props);
        put_string(&mut payload, &will.topic, "will topic")?;
        put_binary(&mut payload, &will.payload, "will payload")?;
    }
    if let Some(username) = &packet.username {
        put_string(&mut payload, username, "username")?;
    }
    if let Some(password) = &packet.password {
        put_binary(&mut payload, password, "password")?;
    }

    if payload.len() > MAX_REMAINING_LENGTH {
        bail!("CONNECT packet exceeds maximum packet size");
    }
    let mut frame = vec![0x10];
    frame.extend(encode_remaining_length(payload.len()));
    frame.append(&mut payload);
    stream.write_all(&frame).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_recognition() {
        assert_eq!(PacketType::from_first_byte(0xC0), Some(PacketType::PingReq));
        assert_eq!(
            PacketType::from_first_byte(0xD0),
            Some(PacketType::PingResp)
        );
        // Flag bits in the low nibble don't affect classification
        assert_eq!(
            PacketType::from_first_byte(0x3D),
            Some(PacketType::Publish)
        );
        assert_eq!(PacketType::from_first_byte(0x00), None);
    }

    #[test]
    fn test_remaining_length_round_trip() {
        for len in [0usize, 1, 127, 128, 16383, 16384, 2_097_151, 2_097_152, MAX_REMAINING_LENGTH]
        {
            let encoded = encode_remaining_length(len);
            let (decoded, consumed) = decode_remaining_length(&encoded).unwrap();
            assert_eq!(decoded, len);
            assert_eq!(consumed, encoded.len());
        }
        assert_eq!(encode_remaining_length(127).len(), 1);
        assert_eq!(encode_remaining_length(128).len(), 2);
    }

    #[test]
    fn test_remaining_length_rejects_overlong() {
        assert!(decode_remaining_length(&[0x80, 0x80, 0x80, 0x80, 0x01]).is_err());
        assert!(decode_remaining_length(&[0x80]).is_err());
    }

    #[test]
    fn test_connect_flags() {
        let packet = ConnectPacket::new("c", 30);
        assert_eq!(packet.flags(), 0x02);

        let packet = ConnectPacket::new("c", 30)
            .with_clean_start(false)
            .with_credentials("user", Some(b"pw"))
            .with_will(Will {
                topic: "status/c".to_string(),
                payload: b"gone".to_vec(),
                qos: Qos::AtLeastOnce,
                retain: true,
                properties: WillProperties::default(),
            });
        // username | password | will retain | will qos1 | will flag
        assert_eq!(packet.flags(), 0x80 | 0x40 | 0x20 | 0x08 | 0x04);
    }
}
