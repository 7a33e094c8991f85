use anyhow::{bail, Result};

/// Property identifiers used by CONNECT and Will property blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PropertyId {
    PayloadFormatIndicator = 0x01,
    MessageExpiryInterval = 0x02,
    ContentType = 0x03,
    ResponseTopic = 0x08,
    CorrelationData = 0x09,
    SessionExpiryInterval = 0x11,
    AuthenticationMethod = 0x15,
    AuthenticationData = 0x16,
    RequestProblemInformation = 0x17,
    WillDelayInterval = 0x18,
    RequestResponseInformation = 0x19,
    ReceiveMaximum = 0x21,
    TopicAliasMaximum = 0x22,
    UserProperty = 0x26,
    MaximumPacketSize = 0x27,
}

impl PropertyId {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::PayloadFormatIndicator),
            0x02 => Some(Self::MessageExpiryInterval),
            0x03 => Some(Self::ContentType),
            0x08 => Some(Self::ResponseTopic),
            0x09 => Some(Self::CorrelationData),
            0x11 => Some(Self::SessionExpiryInterval),
            0x15 => Some(Self::AuthenticationMethod),
            0x16 => Some(Self::AuthenticationData),
            0x17 => Some(Self::RequestProblemInformation),
            0x18 => Some(Self::WillDelayInterval),
            0x19 => Some(Self::RequestResponseInformation),
            0x21 => Some(Self::ReceiveMaximum),
            0x22 => Some(Self::TopicAliasMaximum),
            0x26 => Some(Self::UserProperty),
            0x27 => Some(Self::MaximumPacketSize),
            _ => None,
        }
    }
}

fn default_request_problem_info() -> bool {
    true
}

/// Properties carried in the CONNECT variable header.
///
/// `request_response_info` and `request_problem_info` are independent
/// flags with protocol defaults of `false` and `true` respectively; each
/// is driven solely by its own property id (0x19 and 0x17) on the wire.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConnectProperties {
    #[serde(default)]
    pub session_expiry_interval: Option<u32>,
    #[serde(default)]
    pub receive_maximum: Option<u16>,
    #[serde(default)]
    pub maximum_packet_size: Option<u32>,
    #[serde(default)]
    pub topic_alias_maximum: Option<u16>,
    #[serde(default)]
    pub request_response_info: bool,
    #[serde(default = "default_request_problem_info")]
    pub request_problem_info: bool,
    #[serde(default)]
    pub user_properties: Vec<(String, String)>,
    #[serde(default)]
    pub auth_method: Option<String>,
    #[serde(default)]
    pub auth_data: Option<Vec<u8>>,
}

impl Default for ConnectProperties {
    fn default() -> Self {
        Self {
            session_expiry_interval: None,
            receive_maximum: None,
            maximum_packet_size: None,
            topic_alias_maximum: None,
            request_response_info: false,
            request_problem_info: true,
            user_properties: Vec::new(),
            auth_method: None,
            auth_data: None,
        }
    }
}

impl ConnectProperties {
    /// Encode the property block, without its length prefix.
    ///
    /// Flags at their protocol default are omitted from the wire.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(expiry) = self.session_expiry_interval {
            buf.push(PropertyId::SessionExpiryInterval as u8);
            buf.extend_from_slice(&expiry.to_be_bytes());
        }
        if let Some(max) = self.receive_maximum {
            buf.push(PropertyId::ReceiveMaximum as u8);
            buf.extend_from_slice(&max.to_be_bytes());
        }
        if let Some(size) = self.maximum_packet_size {
            buf.push(PropertyId::MaximumPacketSize as u8);
            buf.extend_from_slice(&size.to_be_bytes());
        }
        if let Some(max) = self.topic_alias_maximum {
            buf.push(PropertyId::TopicAliasMaximum as u8);
            buf.extend_from_slice(&max.to_be_bytes());
        }
        if self.request_response_info {
            buf.push(PropertyId::RequestResponseInformation as u8);
            buf.push(0x01);
        }
        if !self.request_problem_info {
            buf.push(PropertyId::RequestProblemInformation as u8);
            buf.push(0x00);
        }
        for (key, value) in &self.user_properties {
            buf.push(PropertyId::UserProperty as u8);
            buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
            buf.extend_from_slice(key.as_bytes());
            buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
            buf.extend_from_slice(value.as_bytes());
        }
        if let Some(method) = &self.auth_method {
            buf.push(PropertyId::AuthenticationMethod as u8);
            buf.extend_from_slice(&(method.len() as u16).to_be_bytes());
            buf.extend_from_slice(method.as_bytes());
        }
        if let Some(data) = &self.auth_data {
            buf.push(PropertyId::AuthenticationData as u8);
            buf.extend_from_slice(&(data.len() as u16).to_be_bytes());
            buf.extend_from_slice(data);
        }
        buf
    }
}

fn take_u16(buf: &[u8], at: usize, what: &str) -> Result<u16> {
    if buf.len() < at + 2 {
        bail!("truncated {what}");
    }
    Ok(u16::from_be_bytes([buf[at], buf[at + 1]]))
}

fn take_u32(buf: &[u8], at: usize, what: &str) -> Result<u32> {
    if buf.len() < at + 4 {
        bail!("truncated {what}");
    }
    Ok(u32::from_be_bytes([
        buf[at],
        buf[at + 1],
        buf[at + 2],
        buf[at + 3],
    ]))
}

fn take_string(buf: &[u8], at: usize, what: &str) -> Result<(String, usize)> {
    let len = usize::from(take_u16(buf, at, what)?);
    if buf.len() < at + 2 + len {
        bail!("truncated {what}");
    }
    let value = std::str::from_utf8(&buf[at + 2..at + 2 + len])
        .map_err(|_| anyhow::anyhow!("{what} is not valid utf8"))?;
    Ok((value.to_string(), 2 + len))
}

fn take_binary(buf: &[u8], at: usize, what: &str) -> Result<(Vec<u8>, usize)> {
    let len = usize::from(take_u16(buf, at, what)?);
    if buf.len() < at + 2 + len {
        bail!("truncated {what}");
    }
    Ok((buf[at + 2..at + 2 + len].to_vec(), 2 + len))
}

/// Parse a CONNECT property block (without its length prefix).
///
/// Absent flags keep their protocol defaults; a present flag is read from
/// its own property byte, never a neighbor's.
pub fn parse_connect_properties(buf: &[u8]) -> Result<ConnectProperties> {
    let mut props = ConnectProperties::default();
    let mut at = 0usize;
    while at < buf.len() {
        let Some(id) = PropertyId::from_u8(buf[at]) else {
            bail!("unknown CONNECT property id 0x{:02X}", buf[at]);
        };
        at += 1;
        match id {
            PropertyId::SessionExpiryInterval => {
                props.session_expiry_interval = Some(take_u32(buf, at, "session expiry")?);
                at += 4;
            }
            PropertyId::ReceiveMaximum => {
                props.receive_maximum = Some(take_u16(buf, at, "receive maximum")?);
                at += 2;
            }
            PropertyId::MaximumPacketSize => {
                props.maximum_packet_size = Some(take_u32(buf, at, "maximum packet size")?);
                at += 4;
            }
            PropertyId::TopicAliasMaximum => {
                props.topic_alias_maximum = Some(take_u16(buf, at, "topic alias maximum")?);
                at += 2;
            }
            PropertyId::RequestResponseInformation => {
                if at >= buf.len() {
                    bail!("truncated request response information");
                }
                props.request_response_info = buf[at] == 1;
                at += 1;
            }
            PropertyId::RequestProblemInformation => {
                if at >= buf.len() {
                    bail!("truncated request problem information");
                }
                props.request_problem_info = buf[at] == 1;
                at += 1;
            }
            PropertyId::UserProperty => {
                let (key, used) = take_string(buf, at, "user property key")?;
                at += used;
                let (value, used) = take_string(buf, at, "user property value")?;
                at += used;
                props.user_properties.push((key, value));
            }
            PropertyId::AuthenticationMethod => {
                let (method, used) = take_string(buf, at, "auth method")?;
                at += used;
                props.auth_method = Some(method);
            }
            PropertyId::AuthenticationData => {
                let (data, used) = take_binary(buf, at, "auth data")?;
                at += used;
                props.auth_data = Some(data);
            }
            other => bail!("property 0x{:02X} not allowed in CONNECT", other as u8),
        }
    }
    Ok(props)
}

/// Properties carried with the will message inside CONNECT.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WillProperties {
    pub delay_interval: Option<u32>,
    pub payload_format_indicator: Option<u8>,
    pub message_expiry_interval: Option<u32>,
    pub content_type: Option<String>,
    pub response_topic: Option<String>,
    pub correlation_data: Option<Vec<u8>>,
    pub user_properties: Vec<(String, String)>,
}

impl WillProperties {
    /// Encode the will property block, without its length prefix.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(delay) = self.delay_interval {
            buf.push(PropertyId::WillDelayInterval as u8);
            buf.extend_from_slice(&delay.to_be_bytes());
        }
        if let Some(indicator) = self.payload_format_indicator {
            buf.push(PropertyId::PayloadFormatIndicator as u8);
            buf.push(indicator);
        }
        if let Some(expiry) = self.message_expiry_interval {
            buf.push(PropertyId::MessageExpiryInterval as u8);
            buf.extend_from_slice(&expiry.to_be_bytes());
        }
        if let Some(content_type) = &self.content_type {
            buf.push(PropertyId::ContentType as u8);
            buf.extend_from_slice(&(content_type.len() as u16).to_be_bytes());
            buf.extend_from_slice(content_type.as_bytes());
        }
        if let Some(topic) = &self.response_topic {
            buf.push(PropertyId::ResponseTopic as u8);
            buf.extend_from_slice(&(topic.len() as u16).to_be_bytes());
            buf.extend_from_slice(topic.as_bytes());
        }
        if let Some(data) = &self.correlation_data {
            buf.push(PropertyId::CorrelationData as u8);
            buf.extend_from_slice(&(data.len() as u16).to_be_bytes());
            buf.extend_from_slice(data);
        }
        for (key, value) in &self.user_properties {
            buf.push(PropertyId::UserProperty as u8);
            buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
            buf.extend_from_slice(key.as_bytes());
            buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
            buf.extend_from_slice(value.as_bytes());
        }
        buf
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_false_true() {
        let props = ConnectProperties::default();
        assert!(!props.request_response_info);
        assert!(props.request_problem_info);
    }

    #[test]
    fn test_default_flags_are_omitted_from_wire() {
        let encoded = ConnectProperties::default().encode();
        assert!(encoded.is_empty());
    }

    #[test]
    fn test_each_flag_encodes_under_its_own_id() {
        let props = ConnectProperties {
            request_response_info: true,
            ..ConnectProperties::default()
        };
        assert_eq!(props.encode(), vec![0x19, 0x01]);

        let props = ConnectProperties {
            request_problem_info: false,
            ..ConnectProperties::default()
        };
        assert_eq!(props.encode(), vec![0x17, 0x00]);
    }

    #[test]
    fn test_flags_parse_independently() {
        // Only 0x19 present: problem info keeps its default
        let props = parse_connect_properties(&[0x19, 0x01]).unwrap();
        assert!(props.request_response_info);
        assert!(props.request_problem_info);

        // Only 0x17 present: response info keeps its default
        let props = parse_connect_properties(&[0x17, 0x00]).unwrap();
        assert!(!props.request_response_info);
        assert!(!props.request_problem_info);
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let props = ConnectProperties {
            session_expiry_interval: Some(300),
            receive_maximum: Some(20),
            request_response_info: true,
            request_problem_info: false,
            user_properties: vec![("k".to_string(), "v".to_string())],
            ..ConnectProperties::default()
        };
        let parsed = parse_connect_properties(&props.encode()).unwrap();
        assert_eq!(parsed, props);
    }

    #[test]
    fn test_parse_rejects_truncated_property() {
        assert!(parse_connect_properties(&[0x11, 0x00]).is_err());
        assert!(parse_connect_properties(&[0x19]).is_err());
    }
}
