use crate::protocol::{now_nanos, Message, ProtocolResult, RttRequest};

/// Build and serialize the response echoing `request`.
///
/// `processing_ts` is sampled by the caller immediately after decode. The
/// send timestamp is re-sampled here, right before serialization, so time the
/// response spent queued inside the server is not attributed to the network.
pub fn encode_response(request: RttRequest, processing_ts: i64) -> ProtocolResult<String> {
    let mut response = crate::protocol::RttResponse::from_request(
        request,
        processing_ts,
        now_nanos(),
    );
    response.server_send_time = now_nanos();
    Message::Response(response).encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::generate_payload;

    #[test]
    fn test_response_echoes_request_fields() {
        let request = RttRequest::new(1_000, 42, generate_payload(10));
        let processing_ts = now_nanos();

        let frame = encode_response(request.clone(), processing_ts).unwrap();
        let response = match Message::decode(frame.as_bytes()).unwrap() {
            Message::Response(response) => response,
            other => panic!("expected response, got {:?}", other),
        };

        assert_eq!(response.sequence, request.sequence);
        assert_eq!(response.client_timestamp, request.client_timestamp);
        assert_eq!(response.payload, request.payload);
        assert_eq!(response.server_timestamp, processing_ts);
    }

    #[test]
    fn test_send_time_sampled_after_processing_time() {
        let request = RttRequest::new(1_000, 1, String::new());
        let processing_ts = now_nanos();

        let frame = encode_response(request, processing_ts).unwrap();
        let response = match Message::decode(frame.as_bytes()).unwrap() {
            Message::Response(response) => response,
            other => panic!("expected response, got {:?}", other),
        };

        assert!(response.server_send_time >= response.server_timestamp);
        assert!(response.timestamp >= response.server_timestamp);
    }
}
