use std::fmt::{self, Display, Formatter};

use super::{Header, HeaderName};
use crate::BoxError;

/// Message format version, defined in [RFC2045](https://tools.ietf.org/html/rfc2045#section-4)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MimeVersion {
    major: u8,
    minor: u8,
}

/// `MIME-Version: 1.0`, written on every message
pub const MIME_VERSION_1_0: MimeVersion = MimeVersion::new(1, 0);

impl MimeVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        MimeVersion { major, minor }
    }

    #[inline]
    pub const fn major(self) -> u8 {
        self.major
    }

    #[inline]
    pub const fn minor(self) -> u8 {
        self.minor
    }
}

impl Header for MimeVersion {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("MIME-Version")
    }

    fn parse(s: &str) -> Result<Self, BoxError> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or("MIME-Version header doesn't contain '.'")?;
        Ok(MimeVersion::new(major.parse()?, minor.parse()?))
    }

    fn display(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl Default for MimeVersion {
    fn default() -> Self {
        MIME_VERSION_1_0
    }
}

/// Delivery priority of the message
///
/// Written as the non-standard but widely understood `X-Priority`,
/// `Priority` and `Importance` trio.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    fn x_priority(self) -> &'static str {
        match self {
            Priority::High => "1",
            Priority::Normal => "3",
            Priority::Low => "5",
        }
    }

    fn priority(self) -> &'static str {
        match self {
            Priority::High => "urgent",
            Priority::Normal => "normal",
            Priority::Low => "non-urgent",
        }
    }

    fn importance(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// Sets the three priority headers
    pub(crate) fn apply(self, headers: &mut super::Headers) {
        headers.set_raw(
            HeaderName::new_from_ascii_str("X-Priority"),
            self.x_priority().into(),
        );
        headers.set_raw(
            HeaderName::new_from_ascii_str("Priority"),
            self.priority().into(),
        );
        headers.set_raw(
            HeaderName::new_from_ascii_str("Importance"),
            self.importance().into(),
        );
    }
}

impl Header for Priority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, BoxError> {
        // `1 (Highest)` is common
        match s.trim().chars().next() {
            Some('1' | '2') => Ok(Priority::High),
            Some('3') => Ok(Priority::Normal),
            Some('4' | '5') => Ok(Priority::Low),
            _ => Err(format!("invalid X-Priority {s:?}").into()),
        }
    }

    fn display(&self) -> String {
        self.x_priority().into()
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.priority())
    }
}
