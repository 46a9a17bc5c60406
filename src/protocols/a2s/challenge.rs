//! Challenge handshake for A2S_PLAYER and A2S_RULES.

use super::{decode_challenge, decode_frame_header, encode_request};
use crate::{
    errors::{QueryError, Result},
    models::{Challenge, QueryKind},
    transport::Transport,
};

use tracing::debug;

/// Round trips allowed before the server is considered broken.
pub const MAX_ATTEMPTS: usize = 10;

/// Sends one request datagram and returns the body of the reply.
pub fn round_trip<'b, T: Transport + ?Sized>(
    transport: &mut T,
    request: &[u8],
    buf: &'b mut [u8],
) -> Result<&'b [u8]> {
    transport.send(request)?;
    let len = transport.recv(buf)?;
    decode_frame_header(&buf[..len])
}

/// Repeats `kind` with each newly issued challenge until the server answers
/// with something other than a challenge, and returns that answer's body.
pub fn challenged_request<T: Transport + ?Sized>(
    transport: &mut T,
    kind: QueryKind,
    buf: &mut [u8],
) -> Result<Vec<u8>> {
    let mut challenge = Challenge::REQUEST;

    for attempt in 1..=MAX_ATTEMPTS {
        let request = encode_request(kind, Some(challenge));
        let body = round_trip(transport, &request, buf)?;

        match decode_challenge(body)? {
            Some(next) => {
                debug!(attempt, challenge = %hex::encode(next.as_bytes()), "Server issued challenge");
                challenge = next;
            }
            None => return Ok(body.to_vec()),
        }
    }

    Err(QueryError::ChallengeLoopExceeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        protocols::a2s::tests::{frame, player_body},
        transport::{mock::ScriptedConnector, Connector},
    };
    use std::{io, time::Duration};

    fn connect(c: &ScriptedConnector) -> <ScriptedConnector as Connector>::Transport {
        c.connect("127.0.0.1:27015".parse().unwrap(), Duration::from_secs(1))
            .unwrap()
    }

    #[test]
    fn echoes_issued_challenge() {
        let answer = player_body(0, &[]);
        let c = ScriptedConnector::default()
            .reply(frame(b"A\x0a\x0b\x0c\x0d"))
            .reply(frame(&answer));
        let mut transport = connect(&c);
        let mut buf = vec![0; 1400];

        let result = challenged_request(&mut transport, QueryKind::Player, &mut buf).unwrap();

        assert_eq!(result, answer);
        assert_eq!(
            *c.0.sent.borrow(),
            vec![
                b"\xFF\xFF\xFF\xFFU\xFF\xFF\xFF\xFF".to_vec(),
                b"\xFF\xFF\xFF\xFFU\x0a\x0b\x0c\x0d".to_vec(),
            ]
        );
    }

    #[test]
    fn immediate_answer_needs_one_round_trip() {
        let c = ScriptedConnector::default().reply(frame(b"E\x00\x00"));
        let mut transport = connect(&c);
        let mut buf = vec![0; 1400];

        let result = challenged_request(&mut transport, QueryKind::Rules, &mut buf).unwrap();

        assert_eq!(result, b"E\x00\x00".to_vec());
        assert_eq!(c.0.sent.borrow().len(), 1);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut c = ScriptedConnector::default();
        for i in 0..=MAX_ATTEMPTS as u8 {
            c = c.reply(frame(&[b'A', i, i, i, i]));
        }
        let mut transport = connect(&c);
        let mut buf = vec![0; 1400];

        let result = challenged_request(&mut transport, QueryKind::Player, &mut buf);

        assert_eq!(result, Err(QueryError::ChallengeLoopExceeded));
        assert_eq!(c.0.sent.borrow().len(), MAX_ATTEMPTS);
        assert_eq!(c.0.replies.borrow().len(), 1);
    }

    #[test]
    fn split_reply_stops_handshake() {
        let c = ScriptedConnector::default()
            .reply(b"\xFF\xFF\xFF\xFEpart".to_vec())
            .reply(frame(b"E\x00\x00"));
        let mut transport = connect(&c);
        let mut buf = vec![0; 1400];

        let result = challenged_request(&mut transport, QueryKind::Rules, &mut buf);

        assert_eq!(result, Err(QueryError::UnsupportedSplitResponse));
        assert_eq!(c.0.sent.borrow().len(), 1);
    }

    #[test]
    fn timeout_mid_handshake() {
        let c = ScriptedConnector::default()
            .reply(frame(b"A\x01\x02\x03\x04"))
            .fail(io::ErrorKind::TimedOut);
        let mut transport = connect(&c);
        let mut buf = vec![0; 1400];

        let result = challenged_request(&mut transport, QueryKind::Rules, &mut buf);

        assert_eq!(result, Err(QueryError::Timeout));
    }
}
