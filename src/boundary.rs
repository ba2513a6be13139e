//! Multipart boundary tokens.

use std::fmt;

use bytes::Bytes;
use rand::Rng;

use crate::error::MultipartError;

/// Characters a generated boundary is drawn from.
const BOUNDARY_CHARS: &[u8] = b"-_1234567890abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Shortest generated boundary
const MIN_GENERATED_LEN: usize = 30;
/// Longest generated boundary
const MAX_GENERATED_LEN: usize = 40;
/// RFC 2046 limits a boundary to 70 characters.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// The delimiter token separating parts of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    /// Creates a boundary from a caller-supplied token.
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::InvalidBoundary`] if the token is empty or longer
    /// than [`MAX_BOUNDARY_LEN`] characters.
    pub fn new(token: impl Into<String>) -> Result<Self, MultipartError> {
        let token = token.into();
        if token.is_empty() {
            return Err(MultipartError::InvalidBoundary(
                "boundary must not be empty".to_string(),
            ));
        }
        if token.len() > MAX_BOUNDARY_LEN {
            return Err(MultipartError::InvalidBoundary(format!(
                "boundary is {} characters long, at most {} are allowed",
                token.len(),
                MAX_BOUNDARY_LEN
            )));
        }
        if let Some(c) = token.chars().find(|&c| !is_bchar(c)) {
            return Err(MultipartError::InvalidBoundary(format!(
                "boundary contains the disallowed character {:?}",
                c
            )));
        }
        if token.ends_with(' ') {
            return Err(MultipartError::InvalidBoundary(
                "boundary must not end with a space".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Generates a random boundary of 30 to 40 characters.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let len = rng.gen_range(MIN_GENERATED_LEN..=MAX_GENERATED_LEN);
        let token = (0..len)
            .map(|_| BOUNDARY_CHARS[rng.gen_range(0..BOUNDARY_CHARS.len())] as char)
            .collect();
        Self(token)
    }

    /// Extracts the `boundary` parameter from a `Content-Type` header value.
    ///
    /// Returns `Ok(None)` when the header carries no boundary parameter.
    pub fn from_content_type(content_type: &str) -> Result<Option<Self>, MultipartError> {
        for param in split_params(content_type).into_iter().skip(1) {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if key.trim().eq_ignore_ascii_case("boundary") {
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                return Self::new(value).map(Some);
            }
        }
        Ok(None)
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The delimiter line opening each part: `--<boundary>\r\n`.
    pub fn delimiter(&self) -> String {
        format!("--{}\r\n", self.0)
    }

    /// The closing delimiter ending the body: `--<boundary>--\r\n`.
    pub fn closing(&self) -> Bytes {
        Bytes::from(format!("--{}--\r\n", self.0))
    }
}

/// Characters RFC 2046 allows in a boundary (`bchars`).
fn is_bchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c)
}

/// Splits a header value on `;`, leaving separators inside quoted strings alone.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
