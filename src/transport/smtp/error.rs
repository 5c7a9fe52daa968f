//! Error and result type for SMTP clients

use std::{error::Error as StdError, fmt, io};

use crate::{
    address::Address,
    transport::smtp::response::{Code, Response, Severity},
    BoxError,
};

/// The Errors that may occur when sending an email over SMTP
///
/// Every error but a partial recipient rejection aborts the session. Use
/// [`Error::is_fatal`] to tell them apart: when only some recipients were
/// rejected the message was still delivered to the others, and
/// [`Error::failed_recipients`] lists the rejected ones.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    failed_recipients: Vec<FailedRecipient>,
}

/// A recipient the server refused, with the refusal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecipient {
    address: Address,
    response: Response,
}

impl FailedRecipient {
    pub(crate) fn new(address: Address, response: Response) -> Self {
        Self { address, response }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn status(&self) -> Code {
        self.response.code()
    }
}

impl fmt::Display for FailedRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.response.code())?;
        if let Some(line) = self.response.first_line() {
            write!(f, ": {line}")?;
        }
        Ok(())
    }
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                failed_recipients: Vec::new(),
            }),
        }
    }

    /// Returns true if the error is from response
    ///
    /// The reply didn't follow the SMTP reply syntax.
    pub fn is_response(&self) -> bool {
        matches!(self.inner.kind, Kind::Response)
    }

    /// Returns true if the server answered with a code it shouldn't have
    pub fn is_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::Protocol(_))
    }

    /// Returns true if the error is from client
    pub fn is_client(&self) -> bool {
        matches!(self.inner.kind, Kind::Client)
    }

    /// Returns true if the error is a transient SMTP error
    pub fn is_transient(&self) -> bool {
        matches!(self.inner.kind, Kind::Transient(_))
    }

    /// Returns true if the error is a permanent SMTP error
    pub fn is_permanent(&self) -> bool {
        matches!(self.inner.kind, Kind::Permanent(_))
    }

    /// Returns true if the error is caused by a timeout
    ///
    /// Once a session timed out, all its later errors report a timeout.
    pub fn is_timeout(&self) -> bool {
        if matches!(self.inner.kind, Kind::Timeout) {
            return true;
        }

        let mut source = self.source();
        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                return io_err.kind() == io::ErrorKind::TimedOut;
            }
            source = err.source();
        }

        false
    }

    /// Returns true if the error is from TLS
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if no authentication mechanism succeeded
    pub fn is_authentication(&self) -> bool {
        matches!(self.inner.kind, Kind::Authentication)
    }

    /// Returns true if recipients were rejected
    pub fn is_recipients(&self) -> bool {
        matches!(self.inner.kind, Kind::Recipients { .. })
    }

    /// Returns false only when the message was delivered to some recipients
    pub fn is_fatal(&self) -> bool {
        !matches!(self.inner.kind, Kind::Recipients { fatal: false })
    }

    /// Returns the status code, if the error was generated from a response.
    pub fn status(&self) -> Option<Code> {
        match self.inner.kind {
            Kind::Transient(code) | Kind::Permanent(code) => Some(code),
            Kind::Protocol(code) => code,
            Kind::Recipients { .. } => self.inner.failed_recipients.first().map(FailedRecipient::status),
            _ => None,
        }
    }

    /// Recipients refused by the server
    pub fn failed_recipients(&self) -> &[FailedRecipient] {
        &self.inner.failed_recipients
    }

    /// Wraps the error in a timeout error, keeping it as the source
    pub(crate) fn into_timeout(self) -> Error {
        if self.is_timeout() {
            self
        } else {
            Error::new(Kind::Timeout, Some(self))
        }
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// Transient SMTP error, 4xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    Transient(Code),
    /// Permanent SMTP error, 5xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    Permanent(Code),
    /// Error parsing a response
    Response,
    /// Unexpected reply code
    Protocol(Option<Code>),
    /// Internal client error
    Client,
    /// Connection error
    Connection,
    /// Underlying network i/o error
    Network,
    /// Read or write timeout
    Timeout,
    /// TLS error
    Tls,
    /// All authentication attempts failed
    Authentication,
    /// Recipients were rejected, `fatal` when all of them were
    Recipients { fatal: bool },
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("relaymail::transport::smtp::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }
        if !self.inner.failed_recipients.is_empty() {
            builder.field("failed_recipients", &self.inner.failed_recipients);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Response => f.write_str("response error")?,
            Kind::Protocol(Some(ref code)) => write!(f, "unexpected reply ({code})")?,
            Kind::Protocol(None) => f.write_str("protocol error")?,
            Kind::Client => f.write_str("internal client error")?,
            Kind::Network => f.write_str("network error")?,
            Kind::Connection => f.write_str("connection error")?,
            Kind::Timeout => f.write_str("timed out")?,
            Kind::Tls => f.write_str("tls error")?,
            Kind::Authentication => f.write_str("authentication failed")?,
            Kind::Transient(ref code) => {
                write!(f, "transient error ({code})")?;
            }
            Kind::Permanent(ref code) => {
                write!(f, "permanent error ({code})")?;
            }
            Kind::Recipients { fatal } => {
                let failed = &self.inner.failed_recipients;
                if fatal {
                    f.write_str("all recipients were rejected")?;
                } else {
                    write!(f, "{} recipient(s) rejected", failed.len())?;
                }
                for (i, recipient) in failed.iter().enumerate() {
                    f.write_str(if i == 0 { ": " } else { ", " })?;
                    write!(f, "{recipient}")?;
                }
            }
        };

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn std::error::Error + 'static) = &**e;
            r
        })
    }
}

/// Error for a negative reply, carrying the server text
pub(crate) fn code(response: &Response) -> Error {
    let c = response.code();
    let text = response.message().collect::<Vec<_>>().join(" ");
    let text = (!text.is_empty()).then_some(text);
    match c.severity {
        Severity::TransientNegativeCompletion => Error::new(Kind::Transient(c), text),
        Severity::PermanentNegativeCompletion => Error::new(Kind::Permanent(c), text),
        Severity::PositiveCompletion | Severity::PositiveIntermediate => {
            Error::new(Kind::Protocol(Some(c)), text)
        }
    }
}

pub(crate) fn response<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Response, Some(e))
}

pub(crate) fn protocol<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Protocol(None), Some(e))
}

pub(crate) fn client<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Client, Some(e))
}

/// Maps timeouts to a timeout error
pub(crate) fn network(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::new(Kind::Timeout, Some(e)),
        _ => Error::new(Kind::Network, Some(e)),
    }
}

pub(crate) fn connection<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connection, Some(e))
}

pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tls, Some(e))
}

pub(crate) fn authentication<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Authentication, Some(e))
}

pub(crate) fn recipients(failed: Vec<FailedRecipient>, fatal: bool) -> Error {
    let mut error = Error::new(Kind::Recipients { fatal }, None::<BoxError>);
    error.inner.failed_recipients = failed;
    error
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn reply(s: &str) -> Response {
        s.parse().unwrap()
    }

    #[test]
    fn negative_replies() {
        let transient = code(&reply("451 try again\r\n"));
        assert!(transient.is_transient() && transient.is_fatal());
        assert_eq!(transient.status().map(u16::from), Some(451));
        assert_eq!(transient.to_string(), "transient error (451): try again");

        let permanent = code(&reply("554 no\r\n"));
        assert!(permanent.is_permanent());

        let unexpected = code(&reply("250 ok\r\n"));
        assert!(unexpected.is_protocol());
        assert_eq!(unexpected.status().map(u16::from), Some(250));
    }

    #[test]
    fn partial_recipients() {
        let failed = vec![FailedRecipient::new(
            "b@example.com".parse().unwrap(),
            reply("550 5.1.1 unknown user\r\n"),
        )];
        let error = recipients(failed, false);
        assert!(error.is_recipients());
        assert!(!error.is_fatal());
        assert_eq!(error.failed_recipients().len(), 1);
        assert_eq!(error.status().map(u16::from), Some(550));
        assert_eq!(
            error.to_string(),
            "1 recipient(s) rejected: b@example.com (550): 5.1.1 unknown user"
        );
    }

    #[test]
    fn sticky_timeout() {
        let error = network(io::Error::new(io::ErrorKind::TimedOut, "read"));
        assert!(error.is_timeout());

        let later = client("session aborted").into_timeout();
        assert!(later.is_timeout());
        assert!(later.source().is_some());
    }
}
