//! A2S wire codec: request framing and response decoding, no I/O.

pub mod challenge;

use crate::{
    errors::{QueryError, Result},
    models::{Challenge, Os, Player, QueryKind, Rules, ServerInfo, ServerType},
    protocols::helpers::{cstring, expect_code, finish},
};

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use nom::{
    combinator::all_consuming,
    multi::{count, many0},
    number::complete::{le_f32, le_i32, le_u16, u8 as byte},
    sequence::tuple,
    IResult,
};
use std::net::SocketAddr;
use tracing::warn;

pub const HEADER_SINGLE: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
pub const HEADER_SPLIT: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFE];

pub const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

pub const CHALLENGE_RESPONSE: u8 = b'A';
pub const PLAYER_RESPONSE: u8 = b'D';
pub const RULES_RESPONSE: u8 = b'E';

/// Response code and protocol version precede the info strings.
const INFO_PREFIX_LEN: usize = 2;

/// A fixed-width field inside a byte block.
#[derive(Clone, Copy, Debug)]
struct Span {
    offset: usize,
    width: usize,
}

impl Span {
    const fn new(offset: usize, width: usize) -> Self {
        Self { offset, width }
    }

    const fn end(self) -> usize {
        self.offset + self.width
    }

    fn of(self, block: &[u8]) -> &[u8] {
        &block[self.offset..self.end()]
    }
}

/// Layout of the binary block that follows the four info strings.
struct InfoTail {
    app_id: Span,
    players: Span,
    max_players: Span,
    bots: Span,
    server_type: Span,
    os: Span,
    password: Span,
    vac: Span,
}

const INFO_TAIL: InfoTail = InfoTail {
    app_id: Span::new(0, 2),
    players: Span::new(2, 1),
    max_players: Span::new(3, 1),
    bots: Span::new(4, 1),
    server_type: Span::new(5, 1),
    os: Span::new(6, 1),
    password: Span::new(7, 1),
    vac: Span::new(8, 1),
};

impl InfoTail {
    fn min_len(&self) -> usize {
        [
            self.app_id,
            self.players,
            self.max_players,
            self.bots,
            self.server_type,
            self.os,
            self.password,
            self.vac,
        ]
        .iter()
        .map(|s| s.end())
        .max()
        .unwrap_or(0)
    }
}

/// Builds a complete single-packet request datagram.
///
/// Info requests carry no challenge; player and rules requests carry the
/// given token, or the request sentinel when none has been issued yet.
pub fn encode_request(kind: QueryKind, challenge: Option<Challenge>) -> Bytes {
    let mut out = BytesMut::with_capacity(HEADER_SINGLE.len() + 1 + INFO_PAYLOAD.len());
    out.put_slice(&HEADER_SINGLE);
    out.put_u8(kind.request_code());
    match kind {
        QueryKind::Info => out.put_slice(INFO_PAYLOAD),
        QueryKind::Player | QueryKind::Rules => {
            out.put_slice(challenge.unwrap_or_default().as_bytes())
        }
    }
    out.freeze()
}

/// Strips the frame marker from a received datagram.
pub fn decode_frame_header(data: &[u8]) -> Result<&[u8]> {
    if data.len() < HEADER_SINGLE.len() {
        return Err(QueryError::ProtocolViolation);
    }
    let (header, body) = data.split_at(HEADER_SINGLE.len());
    if header == HEADER_SPLIT {
        Err(QueryError::UnsupportedSplitResponse)
    } else if header == HEADER_SINGLE {
        Ok(body)
    } else {
        Err(QueryError::ProtocolViolation)
    }
}

/// Returns the new token if `body` is a challenge response.
pub fn decode_challenge(body: &[u8]) -> Result<Option<Challenge>> {
    match body.split_first() {
        Some((&CHALLENGE_RESPONSE, rest)) => {
            if rest.len() < 4 {
                return Err(QueryError::malformed("challenge response shorter than 4 bytes"));
            }
            let mut token = [0; 4];
            token.copy_from_slice(&rest[..4]);
            Ok(Some(Challenge(token)))
        }
        _ => Ok(None),
    }
}

pub fn decode_info(body: &[u8], addr: SocketAddr) -> Result<ServerInfo> {
    if body.len() < INFO_PREFIX_LEN {
        return Err(QueryError::malformed("info response shorter than its prefix"));
    }
    let (tail, strings) = finish(count(cstring, 4)(&body[INFO_PREFIX_LEN..]), "info strings")?;

    if tail.len() < INFO_TAIL.min_len() {
        return Err(QueryError::malformed(format!(
            "info tail is {} bytes, need at least {}",
            tail.len(),
            INFO_TAIL.min_len()
        )));
    }

    let mut srv = ServerInfo::new(addr);
    let mut strings = strings.into_iter();
    srv.name = strings.next().unwrap_or_default();
    srv.map = strings.next().unwrap_or_default();
    srv.game = strings.next().unwrap_or_default();
    srv.description = strings.next().unwrap_or_default();

    srv.app_id = LittleEndian::read_u16(INFO_TAIL.app_id.of(tail));
    srv.players = INFO_TAIL.players.of(tail)[0];
    srv.max_players = INFO_TAIL.max_players.of(tail)[0];
    srv.bots = INFO_TAIL.bots.of(tail)[0];
    srv.server_type = ServerType::from_code(INFO_TAIL.server_type.of(tail)[0]);
    srv.os = Os::from_code(INFO_TAIL.os.of(tail)[0]);
    srv.password_required = INFO_TAIL.password.of(tail)[0] != 0;
    srv.vac_secure = INFO_TAIL.vac.of(tail)[0] != 0;

    Ok(srv)
}

fn player_entry(input: &[u8]) -> IResult<&[u8], Player> {
    let (rest, (index, name, score, duration)) = tuple((byte, cstring, le_i32, le_f32))(input)?;
    Ok((
        rest,
        Player {
            index,
            name,
            score,
            duration,
        },
    ))
}

/// Decodes an A2S_PLAYER response.
///
/// The declared count is a single byte and overflows on large servers, so
/// entries are parsed until the body is exhausted instead.
pub fn decode_player_response(body: &[u8]) -> Result<Vec<Player>> {
    let rest = expect_code(body, PLAYER_RESPONSE)?;
    let (rest, declared) = finish(byte(rest), "player count")?;
    let (_, players) = finish(all_consuming(many0(player_entry))(rest), "player entries")?;

    if usize::from(declared) != players.len() {
        warn!(
            declared,
            parsed = players.len(),
            "Declared player count does not match entries"
        );
    }

    Ok(players)
}

/// Decodes an A2S_RULES response into a name to value mapping.
pub fn decode_rules_response(body: &[u8]) -> Result<Rules> {
    let rest = expect_code(body, RULES_RESPONSE)?;
    let (rest, declared) = finish(le_u16(rest), "rule count")?;
    let (_, fields) = finish(all_consuming(many0(cstring))(rest), "rule strings")?;

    if fields.len() % 2 != 0 {
        return Err(QueryError::malformed(format!(
            "odd number of rule strings: {}",
            fields.len()
        )));
    }
    if fields.len() / 2 != usize::from(declared) {
        return Err(QueryError::malformed(format!(
            "declared {} rules, found {}",
            declared,
            fields.len() / 2
        )));
    }

    let mut rules = Rules::new();
    let mut fields = fields.into_iter();
    while let (Some(k), Some(v)) = (fields.next(), fields.next()) {
        if rules.insert(k, v).is_some() {
            return Err(QueryError::malformed("duplicate rule name"));
        }
    }

    Ok(rules)
}
