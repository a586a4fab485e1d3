use derive_more::Display;
use nanoid::nanoid;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::str::FromStr;

pub const NOTE_ID_LEN: usize = 21;

// everything but RFC 3986 unreserved characters, so a browser never rewrites it
const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// URL-safe, 21 characters from nanoid's default alphabet.
pub fn new_note_id() -> String {
    nanoid!(NOTE_ID_LEN)
}

/// `<base>/<id>#<secret>`. Browsers never send the fragment, so the server
/// only ever sees `<base>/<id>`. The secret is percent-encoded in the
/// fragment and decoded back byte for byte.
#[derive(Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub base: String,
    pub id: String,
    pub secret: String,
}

impl ShareLink {
    pub fn new(base: &str, id: &str, secret: &str) -> Self {
        ShareLink {
            base: base.trim_end_matches('/').to_string(),
            id: id.to_string(),
            secret: secret.to_string(),
        }
    }
}

impl std::fmt::Display for ShareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}#{}",
            self.base,
            self.id,
            utf8_percent_encode(&self.secret, FRAGMENT)
        )
    }
}

impl std::fmt::Debug for ShareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareLink")
            .field("base", &self.base)
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[display(fmt = "Invalid link: Missing encryption key")]
    MissingSecret,
    #[display(fmt = "Invalid link: Missing note id")]
    MissingId,
    #[display(fmt = "Invalid link: Malformed encryption key")]
    MalformedSecret,
}

impl std::error::Error for LinkError {}

impl FromStr for ShareLink {
    type Err = LinkError;

    fn from_str(link: &str) -> Result<Self, Self::Err> {
        // only the location is trimmed; whitespace in a secret is encoded
        let (location, fragment) = link.split_once('#').ok_or(LinkError::MissingSecret)?;
        if fragment.is_empty() {
            return Err(LinkError::MissingSecret);
        }
        let secret = percent_decode_str(fragment)
            .decode_utf8()
            .map_err(|_| LinkError::MalformedSecret)?;

        let (base, id) = location
            .trim()
            .trim_end_matches('/')
            .rsplit_once('/')
            .ok_or(LinkError::MissingId)?;
        if id.is_empty() {
            return Err(LinkError::MissingId);
        }

        Ok(ShareLink::new(base, id, &secret))
    }
}
