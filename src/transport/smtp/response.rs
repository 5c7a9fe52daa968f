//! SMTP response, containing a mandatory return code and an optional text
//! message

use std::{
    fmt::{Display, Formatter, Result},
    result,
    str::FromStr,
};

use crate::transport::smtp::{error, Error};

/// Longest reply line accepted, [RFC 5321](https://tools.ietf.org/html/rfc5321#section-4.5.3.1.5)
/// allows 512 bytes but some servers go over
const MAX_LINE_LEN: usize = 4096;

/// The first digit indicates severity
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// 2yx
    PositiveCompletion = 2,
    /// 3yz
    PositiveIntermediate = 3,
    /// 4yz
    TransientNegativeCompletion = 4,
    /// 5yz
    PermanentNegativeCompletion = 5,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

/// Second digit
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// x0z
    Syntax = 0,
    /// x1z
    Information = 1,
    /// x2z
    Connections = 2,
    /// x3z
    Unspecified3 = 3,
    /// x4z
    Unspecified4 = 4,
    /// x5z
    MailSystem = 5,
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

/// The detail digit of a response code (third digit)
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Detail {
    Zero = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
}

impl Display for Detail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

impl Severity {
    fn from_digit(d: u8) -> Option<Self> {
        Some(match d {
            2 => Self::PositiveCompletion,
            3 => Self::PositiveIntermediate,
            4 => Self::TransientNegativeCompletion,
            5 => Self::PermanentNegativeCompletion,
            _ => return None,
        })
    }
}

impl Category {
    fn from_digit(d: u8) -> Option<Self> {
        Some(match d {
            0 => Self::Syntax,
            1 => Self::Information,
            2 => Self::Connections,
            3 => Self::Unspecified3,
            4 => Self::Unspecified4,
            5 => Self::MailSystem,
            _ => return None,
        })
    }
}

impl Detail {
    fn from_digit(d: u8) -> Option<Self> {
        const DETAILS: [Detail; 10] = [
            Detail::Zero,
            Detail::One,
            Detail::Two,
            Detail::Three,
            Detail::Four,
            Detail::Five,
            Detail::Six,
            Detail::Seven,
            Detail::Eight,
            Detail::Nine,
        ];
        DETAILS.get(usize::from(d)).copied()
    }
}

/// Represents a 3 digit SMTP response code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Code {
    /// First digit of the response code
    pub severity: Severity,
    /// Second digit of the response code
    pub category: Category,
    /// Third digit
    pub detail: Detail,
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}{}{}", self.severity, self.category, self.detail)
    }
}

impl Code {
    /// Creates a new `Code` structure
    pub fn new(severity: Severity, category: Category, detail: Detail) -> Code {
        Code {
            severity,
            category,
            detail,
        }
    }

    fn from_digits(digits: [u8; 3]) -> Option<Code> {
        Some(Code {
            severity: Severity::from_digit(digits[0])?,
            category: Category::from_digit(digits[1])?,
            detail: Detail::from_digit(digits[2])?,
        })
    }

    /// Tells if the response is positive
    pub fn is_positive(self) -> bool {
        matches!(
            self.severity,
            Severity::PositiveCompletion | Severity::PositiveIntermediate
        )
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> Self {
        code.detail as u16 + 10 * code.category as u16 + 100 * code.severity as u16
    }
}

impl TryFrom<u16> for Code {
    type Error = Error;

    fn try_from(n: u16) -> result::Result<Self, Self::Error> {
        let digits = [(n / 100) as u8, (n / 10 % 10) as u8, (n % 10) as u8];
        match Code::from_digits(digits) {
            Some(code) if n < 1000 => Ok(code),
            _ => Err(error::response(format!("invalid reply code {n}"))),
        }
    }
}

/// Contains an SMTP reply, with separated code and message
///
/// The text message is optional, only the code is mandatory
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Response {
    /// Response code
    code: Code,
    /// Server response string (optional)
    /// Handle multiline responses
    message: Vec<String>,
}

impl FromStr for Response {
    type Err = Error;

    /// Parses one complete reply, trailing bytes are ignored
    fn from_str(s: &str) -> result::Result<Response, Error> {
        let mut reader = ReplyReader::new(ReadMode::AllLines);
        reader.feed(s.as_bytes())?;
        reader.finish()
    }
}

impl Response {
    /// Creates a new `Response`
    pub fn new(code: Code, message: Vec<String>) -> Response {
        Response { code, message }
    }

    /// Tells if the response is positive
    pub fn is_positive(&self) -> bool {
        self.code.is_positive()
    }

    /// Tests code equality
    pub fn has_code(&self, code: u16) -> bool {
        u16::from(self.code) == code
    }

    /// Returns only the first word of the message if possible
    pub fn first_word(&self) -> Option<&str> {
        self.message
            .first()
            .and_then(|line| line.split_whitespace().next())
    }

    /// Returns only the line of the message if possible
    pub fn first_line(&self) -> Option<&str> {
        self.message.first().map(String::as_str)
    }

    /// Response code
    pub fn code(&self) -> Code {
        self.code
    }

    /// Server response string (array of lines)
    pub fn message(&self) -> impl Iterator<Item = &str> {
        self.message.iter().map(String::as_str)
    }
}

/// Which lines of a multi-line reply to keep
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadMode {
    /// Keep the first text line, the others are read and dropped
    FirstLine,
    /// Keep every line, needed for `EHLO` replies
    AllLines,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ReadState {
    /// Reading the digit at this index
    Status(usize),
    Separator,
    Text { last: bool },
    Done,
}

/// Incremental reply parser
///
/// Bytes can be fed in chunks of any size, the state carries over. The
/// reader stops right after the final line of a reply, so bytes belonging
/// to a following reply are left to the caller.
///
/// ```
/// use relaymail::transport::smtp::response::{ReadMode, ReplyReader};
///
/// # fn main() -> Result<(), relaymail::transport::smtp::Error> {
/// let mut reader = ReplyReader::new(ReadMode::AllLines);
/// assert_eq!(reader.feed(b"250-SIZE 1000\r\n250-AU")?, 22);
/// assert!(!reader.is_done());
/// assert_eq!(reader.feed(b"TH LOGIN\r\n250 STARTTLS\r\n")?, 24);
/// let response = reader.finish()?;
/// assert_eq!(response.message().count(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReplyReader {
    mode: ReadMode,
    state: ReadState,
    digits: [u8; 3],
    code: Option<Code>,
    line: Vec<u8>,
    lines: Vec<String>,
}

impl ReplyReader {
    pub fn new(mode: ReadMode) -> Self {
        Self {
            mode,
            state: ReadState::Status(0),
            digits: [0; 3],
            code: None,
            line: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Whether a complete reply was read
    pub fn is_done(&self) -> bool {
        self.state == ReadState::Done
    }

    /// Consumes bytes of `input`, returning how many were used
    ///
    /// Less than `input.len()` is only returned when the reply is complete.
    pub fn feed(&mut self, input: &[u8]) -> result::Result<usize, Error> {
        for (i, &byte) in input.iter().enumerate() {
            match self.state {
                ReadState::Done => return Ok(i),
                ReadState::Status(n) => {
                    if !byte.is_ascii_digit() {
                        return Err(error::response(format!(
                            "invalid reply code byte {:?}",
                            char::from(byte)
                        )));
                    }
                    self.digits[n] = byte - b'0';
                    self.state = if n == 2 {
                        self.check_code()?;
                        ReadState::Separator
                    } else {
                        ReadState::Status(n + 1)
                    };
                }
                ReadState::Separator => {
                    self.state = match byte {
                        b'-' => ReadState::Text { last: false },
                        b' ' => ReadState::Text { last: true },
                        // a bare code is a valid last line
                        b'\r' | b'\n' => {
                            self.end_line(byte == b'\n', true);
                            self.state
                        }
                        _ => {
                            return Err(error::response(format!(
                                "invalid reply separator {:?}",
                                char::from(byte)
                            )))
                        }
                    };
                }
                ReadState::Text { last } => {
                    if byte == b'\n' {
                        self.end_line(true, last);
                    } else if self.line.len() >= MAX_LINE_LEN {
                        return Err(error::response("reply line too long"));
                    } else {
                        self.line.push(byte);
                    }
                }
            }
        }
        Ok(input.len())
    }

    /// The parsed reply
    pub fn finish(self) -> result::Result<Response, Error> {
        match (self.state, self.code) {
            (ReadState::Done, Some(code)) => Ok(Response::new(code, self.lines)),
            _ => Err(error::response("incomplete response")),
        }
    }

    fn check_code(&mut self) -> result::Result<(), Error> {
        let code = Code::from_digits(self.digits).ok_or_else(|| {
            error::response(format!(
                "invalid reply code {}{}{}",
                self.digits[0], self.digits[1], self.digits[2]
            ))
        })?;
        match self.code {
            Some(first) if first != code => Err(error::response(format!(
                "reply code changed from {first} to {code}"
            ))),
            _ => {
                self.code = Some(code);
                Ok(())
            }
        }
    }

    /// Stores the current line; a bare code line ending in CR waits for its LF
    fn end_line(&mut self, complete: bool, last: bool) {
        if !complete {
            self.state = ReadState::Text { last };
            return;
        }
        if self.line.last() == Some(&b'\r') {
            let _ = self.line.pop();
        }
        let text = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        if self.mode == ReadMode::AllLines || self.lines.is_empty() {
            self.lines.push(text);
        }
        self.state = if last {
            ReadState::Done
        } else {
            ReadState::Status(0)
        };
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn code(n: u16) -> Code {
        Code::try_from(n).unwrap()
    }

    #[test]
    fn test_severity_fmt() {
        assert_eq!(format!("{}", Severity::PositiveCompletion), "2");
    }

    #[test]
    fn test_category_fmt() {
        assert_eq!(format!("{}", Category::Unspecified4), "4");
    }

    #[test]
    fn test_code_new() {
        assert_eq!(
            Code::new(
                Severity::TransientNegativeCompletion,
                Category::Connections,
                Detail::Zero,
            ),
            Code {
                severity: Severity::TransientNegativeCompletion,
                category: Category::Connections,
                detail: Detail::Zero,
            }
        );
    }

    #[test]
    fn test_code_conversions() {
        let code = Code {
            severity: Severity::TransientNegativeCompletion,
            category: Category::Connections,
            detail: Detail::One,
        };
        assert_eq!(code.to_string(), "421");
        assert_eq!(u16::from(code), 421);
        assert_eq!(Code::try_from(421).unwrap(), code);
        assert!(Code::try_from(170).is_err());
        assert!(Code::try_from(260).is_err());
        assert!(Code::try_from(2500).is_err());
    }

    #[test]
    fn test_response_from_str() {
        let raw_response = "250-me\r\n250-8BITMIME\r\n250-SIZE 42\r\n250 AUTH PLAIN CRAM-MD5\r\n";
        assert_eq!(
            raw_response.parse::<Response>().unwrap(),
            Response {
                code: code(250),
                message: vec![
                    "me".to_owned(),
                    "8BITMIME".to_owned(),
                    "SIZE 42".to_owned(),
                    "AUTH PLAIN CRAM-MD5".to_owned(),
                ],
            }
        );

        let wrong_code = "2506-me\r\n250-8BITMIME\r\n250-SIZE 42\r\n250 AUTH PLAIN CRAM-MD5\r\n";
        assert!(wrong_code.parse::<Response>().unwrap_err().is_response());

        let wrong_end = "250-me\r\n250-8BITMIME\r\n250-SIZE 42\r\n250-AUTH PLAIN CRAM-MD5\r\n";
        assert!(wrong_end.parse::<Response>().is_err());

        let mixed_codes = "250-me\r\n251 other\r\n";
        assert!(mixed_codes.parse::<Response>().unwrap_err().is_response());

        let not_digits = "2x0 hello\r\n";
        assert!(not_digits.parse::<Response>().is_err());
    }

    #[test]
    fn multi_line_reply() {
        let response: Response = "250-SIZE 1000\r\n250-AUTH LOGIN\r\n250 STARTTLS\r\n"
            .parse()
            .unwrap();
        assert!(response.has_code(250));
        assert_eq!(
            response.message().collect::<Vec<_>>(),
            ["SIZE 1000", "AUTH LOGIN", "STARTTLS"]
        );
    }

    #[test]
    fn bare_lf_and_bare_code() {
        let response: Response = "220 ready\n".parse().unwrap();
        assert_eq!(response.first_line(), Some("ready"));

        let response: Response = "250\r\n".parse().unwrap();
        assert_eq!(response.first_line(), Some(""));
    }

    #[test]
    fn first_line_mode() {
        let mut reader = ReplyReader::new(ReadMode::FirstLine);
        let input = b"250-first\r\n250-second\r\n250 third\r\n";
        assert_eq!(reader.feed(input).unwrap(), input.len());
        let response = reader.finish().unwrap();
        assert_eq!(response.message().collect::<Vec<_>>(), ["first"]);
    }

    #[test]
    fn stops_after_reply() {
        let mut reader = ReplyReader::new(ReadMode::AllLines);
        let input = b"220 go ahead\r\n250 pipelined\r\n";
        assert_eq!(reader.feed(input).unwrap(), 14);
        assert!(reader.is_done());
        assert_eq!(reader.feed(b"more").unwrap(), 0);
    }

    #[test]
    fn resumable_byte_by_byte() {
        let input = b"250-SIZE 1000\r\n250-AUTH LOGIN\r\n250 STARTTLS\r\n";
        let mut reader = ReplyReader::new(ReadMode::AllLines);
        for byte in input.chunks(1) {
            assert!(!reader.is_done());
            assert_eq!(reader.feed(byte).unwrap(), 1);
        }
        let response = reader.finish().unwrap();
        assert_eq!(response.code(), code(250));
        assert_eq!(response.message().count(), 3);
    }

    #[test]
    fn test_response_incomplete() {
        let mut reader = ReplyReader::new(ReadMode::AllLines);
        let _ = reader.feed(b"250-smtp.example.org\r\n").unwrap();
        assert!(!reader.is_done());
        assert!(reader.finish().is_err());
    }

    #[test]
    fn test_response_first_word() {
        let response = |lines: &[&str]| {
            Response::new(code(451), lines.iter().map(|l| (*l).to_owned()).collect())
        };
        assert_eq!(response(&["me", "8BITMIME", "SIZE 42"]).first_word(), Some("me"));
        assert_eq!(response(&["me mo", "8BITMIME"]).first_word(), Some("me"));
        assert_eq!(response(&[]).first_word(), None);
        assert_eq!(response(&[" "]).first_word(), None);
        assert_eq!(response(&[""]).first_word(), None);
        assert_eq!(response(&["me mo"]).first_line(), Some("me mo"));
        assert_eq!(response(&["  "]).first_line(), Some("  "));
        assert!(!response(&[]).is_positive());
        assert!(response(&[]).has_code(451));
        assert!(!response(&[]).has_code(251));
    }
}
