use crate::errors::{QueryError, Result};

use nom::{
    bytes::complete::{tag, take_until},
    combinator::map,
    sequence::terminated,
    IResult,
};

/// Null-terminated string, decoded lossily.
pub fn cstring(input: &[u8]) -> IResult<&[u8], String> {
    map(
        terminated(take_until(&b"\0"[..]), tag(&b"\0"[..])),
        |v: &[u8]| String::from_utf8_lossy(v).into_owned(),
    )(input)
}

/// Turns a nom failure into `Malformed`, naming what was being parsed.
pub fn finish<'a, T>(res: IResult<&'a [u8], T>, what: &str) -> Result<(&'a [u8], T)> {
    res.map_err(|e| match e {
        nom::Err::Incomplete(_) => QueryError::malformed(format!("{}: early EOF", what)),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let left = e.input.len();
            QueryError::malformed(format!("{}: {:?} with {} bytes left", what, e.code, left))
        }
    })
}

/// Checks the leading response code byte and returns what follows it.
pub fn expect_code(body: &[u8], code: u8) -> Result<&[u8]> {
    match body.split_first() {
        Some((&c, rest)) if c == code => Ok(rest),
        Some((&c, _)) => Err(QueryError::malformed(format!(
            "expected response code {:#04x}, got {:#04x}",
            code, c
        ))),
        None => Err(QueryError::malformed("empty response body")),
    }
}
