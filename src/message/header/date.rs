use std::time::SystemTime;

use httpdate::HttpDate;

use super::{Header, HeaderName};
use crate::BoxError;

/// Message `Date` header
///
/// Defined in [RFC5322](https://tools.ietf.org/html/rfc5322#section-3.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date(HttpDate);

impl Date {
    pub fn new(st: SystemTime) -> Self {
        Self(st.into())
    }

    pub fn now() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Header for Date {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Date")
    }

    fn parse(s: &str) -> Result<Self, BoxError> {
        // httpdate only knows the ` GMT` zone, mail uses `-0000` or `+0000`
        let s = match s.strip_suffix("-0000").or_else(|| s.strip_suffix("+0000")) {
            Some(prefix) => format!("{prefix}GMT"),
            None => s.to_owned(),
        };
        Ok(Self(s.parse()?))
    }

    fn display(&self) -> String {
        let s = self.0.to_string();
        // ` GMT` is obsolete syntax for mail
        match s.strip_suffix("GMT") {
            Some(prefix) => format!("{prefix}-0000"),
            None => s,
        }
    }
}

impl From<SystemTime> for Date {
    fn from(st: SystemTime) -> Self {
        Self::new(st)
    }
}

impl From<Date> for SystemTime {
    fn from(this: Date) -> SystemTime {
        this.0.into()
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::header::Headers;

    #[test]
    fn format_date() {
        let mut headers = Headers::new();
        headers.set(Date::from(
            SystemTime::UNIX_EPOCH + Duration::from_secs(784887151),
        ));
        assert_eq!(headers.to_string(), "Date: Tue, 15 Nov 1994 08:12:31 -0000\r\n");
    }

    #[test]
    fn parse_date() {
        let mut headers = Headers::new();
        headers.set_raw(Date::name(), "Tue, 15 Nov 1994 08:12:31 -0000".into());
        assert_eq!(
            headers.get::<Date>(),
            Some(Date::from(
                SystemTime::UNIX_EPOCH + Duration::from_secs(784887151)
            ))
        );
    }
}
