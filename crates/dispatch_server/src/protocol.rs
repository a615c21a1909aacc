//! JSON framing: `{"event": "<NAME>", "data": <payload>}` in both directions.

use dispatch_core::events::{InboundEvent, OutboundEvent};

use crate::error::ProtocolError;

pub fn decode_frame(bytes: &[u8]) -> Result<InboundEvent, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode_frame(event: &OutboundEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::ParticipantId;
    use serde_json::{json, Value};

    #[test]
    fn decodes_search_with_string_coordinates() {
        let frame = json!({
            "event": "SEARCH_DRIVER",
            "data": { "rideStart": { "coords": { "latitude": "52.52", "longitude": "13.405" } } }
        })
        .to_string();

        match decode_frame(frame.as_bytes()).expect("decode") {
            InboundEvent::SearchDriver(request) => {
                assert!((request.ride_start.coords.latitude - 52.52).abs() < 1e-9);
                assert!((request.ride_start.coords.longitude - 13.405).abs() < 1e-9);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_relay_target() {
        let frame = br#"{"event":"CONFIRM_PICKUP","data":"rider-1"}"#;
        match decode_frame(frame).expect("decode") {
            InboundEvent::ConfirmPickup(to) => assert_eq!(to, ParticipantId::from("rider-1")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_event_and_garbage() {
        assert!(matches!(
            decode_frame(br#"{"event":"TELEPORT","data":{}}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(decode_frame(b"not json"), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn encodes_outbound_envelope() {
        let frame = encode_frame(&OutboundEvent::PeerUnreachable {
            peer: ParticipantId::from("rider-1"),
        })
        .expect("encode");
        let value: Value = serde_json::from_str(&frame).expect("json");
        assert_eq!(
            value,
            json!({ "event": "PEER_UNREACHABLE", "data": { "peer": "rider-1" } })
        );
    }
}
