//! MQTT v5 protocol surface.
//!
//! Only the slice of the codec the connection core needs: packet type
//! recognition for the inbound reader, the 2-byte PINGREQ the keepalive
//! engine emits, and CONNECT construction with its 5.0 properties.

pub mod packet;
pub mod properties;

pub use packet::{write_connect, write_pingreq, ConnectPacket, PacketType, Qos, Will};
pub use properties::{ConnectProperties, PropertyId, WillProperties};
