//! The SMTP transport sends emails using the SMTP protocol.
//!
//! This SMTP client follows [RFC
//! 5321](https://tools.ietf.org/html/rfc5321), and is designed to send emails from an
//! application to a relay email server, as it relies as much as possible on the relay server
//! for sanity and RFC compliance checks.
//!
//! It implements the following extensions:
//!
//! * 8BITMIME ([RFC 6152](https://tools.ietf.org/html/rfc6152))
//! * SMTPUTF8 ([RFC 6531](https://tools.ietf.org/html/rfc6531))
//! * SIZE ([RFC 1870](https://tools.ietf.org/html/rfc1870))
//! * DSN ([RFC 3461](https://tools.ietf.org/html/rfc3461))
//! * AUTH ([RFC 4954](http://tools.ietf.org/html/rfc4954)) with PLAIN, LOGIN and XOAUTH2
//!   mechanisms, and custom [`Authenticator`](authentication::Authenticator)s
//! * STARTTLS ([RFC 2487](http://tools.ietf.org/html/rfc2487))
//!
//! #### SMTP Transport
//!
//! Each send opens a new session: greeting, `EHLO` (or `HELO` for old
//! servers), TLS, authentication, then the `MAIL`/`RCPT`/`DATA` transaction
//! and `QUIT`. Recipients refused by the server don't stop the transaction as
//! long as one of them was accepted, they are reported afterwards with a
//! non-fatal [`Error`].
//!
//! This client is designed to send emails to a relay server, and should *not* be used to send
//! emails directly to the destination.
//!
//! #### Simple example
//!
//! ```rust,no_run
//! # #[cfg(all(feature = "builder", feature = "native-tls"))]
//! # fn test() -> Result<(), Box<dyn std::error::Error>> {
//! use relaymail::{
//!     message::header::ContentType, transport::smtp::authentication::Credentials, Message,
//!     SmtpTransport, Transport,
//! };
//!
//! let email = Message::builder()
//!     .from("NoBody <nobody@domain.tld>".parse()?)
//!     .to("Hei <hei@domain.tld>".parse()?)
//!     .subject("Happy new year")
//!     .header(ContentType::TEXT_PLAIN)
//!     .body(String::from("Be happy!"))?;
//!
//! let creds = Credentials::new("smtp_username".to_owned(), "smtp_password".to_owned());
//!
//! // Open a remote connection to the relay on the submissions port
//! let mailer = SmtpTransport::relay("smtp.domain.tld")?
//!     .credentials(creds)
//!     .build();
//!
//! mailer.send(&email)?;
//! # Ok(())
//! # }
//! ```
//!
//! #### Custom TLS settings
//!
//! ```rust,no_run
//! # #[cfg(feature = "native-tls")]
//! # fn test() -> Result<(), Box<dyn std::error::Error>> {
//! use relaymail::transport::smtp::client::{Tls, TlsParameters, TlsVersion};
//! use relaymail::SmtpTransport;
//!
//! let tls = TlsParameters::builder("smtp.domain.tld".to_owned())
//!     .set_min_tls_version(TlsVersion::Tlsv12)
//!     .build()?;
//!
//! let mailer = SmtpTransport::builder_dangerous("smtp.domain.tld")
//!     .port(2525)
//!     .tls(Tls::Required(tls))
//!     .build();
//! # Ok(())
//! # }
//! ```

use std::{fmt, time::Duration};

#[cfg(feature = "native-tls")]
pub use self::client::{Certificate, TlsParameters, TlsParametersBuilder, TlsVersion};
pub use self::{
    client::{SmtpConnection, Tls},
    error::Error,
    transport::{SmtpClient, SmtpTransport, SmtpTransportBuilder},
};
use self::{
    authentication::{authenticators, Authenticators, Credentials, Mechanism, DEFAULT_MECHANISMS},
    extension::{ClientId, DsnOptions},
    response::Response,
};

pub mod authentication;
pub mod client;
pub mod commands;
mod connection_url;
mod error;
pub mod extension;
pub mod response;
mod transport;

pub use self::error::FailedRecipient;

// Registered port numbers:
// https://www.iana.org/assignments/service-names-port-numbers/service-names-port-numbers.xhtml

/// Default smtp port
pub const SMTP_PORT: u16 = 25;
/// Default submission port
pub const SUBMISSION_PORT: u16 = 587;
/// Default submission over TLS port
///
/// Defined in [RFC8314](https://tools.ietf.org/html/rfc8314)
pub const SUBMISSIONS_PORT: u16 = 465;

/// Default timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct SmtpInfo {
    /// Name sent during EHLO
    hello_name: ClientId,
    /// Server we are connecting to
    server: String,
    /// Port to connect to
    port: u16,
    /// TLS security configuration
    tls: Tls,
    /// Authentication modules, tried in order
    authenticators: Authenticators,
    /// Credentials
    credentials: Option<Credentials>,
    /// Define network timeout
    /// It can be changed later for specific needs (like a different timeout for each SMTP command)
    timeout: Option<Duration>,
    /// Delivery status notifications requested from servers supporting them
    dsn: Option<DsnOptions>,
}

impl fmt::Debug for SmtpInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mechanisms = self
            .authenticators
            .iter()
            .map(|authenticator| authenticator.mechanism())
            .collect::<Vec<Mechanism>>();
        f.debug_struct("SmtpInfo")
            .field("hello_name", &self.hello_name)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("authenticators", &mechanisms)
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .field("dsn", &self.dsn)
            .finish()
    }
}

impl Default for SmtpInfo {
    fn default() -> Self {
        Self {
            server: "localhost".to_owned(),
            port: SMTP_PORT,
            hello_name: ClientId::default(),
            credentials: None,
            authenticators: authenticators(DEFAULT_MECHANISMS),
            timeout: Some(DEFAULT_TIMEOUT),
            tls: Tls::None,
            dsn: None,
        }
    }
}
