//! SMTP client
//!
//! `SmtpConnection` allows manually sending SMTP commands.
//!
//! ```rust,no_run
//! # use std::error::Error;
//! #
//! # #[cfg(feature = "smtp-transport")]
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use relaymail::transport::smtp::{
//!     client::SmtpConnection, commands::*, extension::ClientId, response::ReadMode, SMTP_PORT,
//! };
//!
//! let hello = ClientId::Domain("my_hostname".to_owned());
//! let mut client = SmtpConnection::connect(&("localhost", SMTP_PORT), None, &hello)?;
//! client.command(
//!     Mail::new(Some("user@example.com".parse()?), vec![]),
//!     ReadMode::FirstLine,
//! )?;
//! client.command(
//!     Rcpt::new("user@example.org".parse()?, vec![]),
//!     ReadMode::FirstLine,
//! )?;
//! client.command(Data, ReadMode::FirstLine)?;
//! client.message("Test email".as_bytes())?;
//! client.quit()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "smtp-transport"))]
//! # fn main() {}
//! ```

pub use self::{
    connection::SmtpConnection,
    data::DataStream,
    net::NetworkStream,
    tls::Tls,
};
#[cfg(feature = "native-tls")]
pub use self::tls::{Certificate, TlsParameters, TlsParametersBuilder, TlsVersion};

mod connection;
mod data;
#[cfg(test)]
mod mock;
mod net;
mod tls;

/// Where a session stands
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, waiting for the greeting
    Connected,
    /// The server greeted with 220
    Greeted,
    /// `EHLO` or `HELO` went through
    Hello,
    TlsUpgrading,
    Authenticating,
    /// Ready for a mail transaction
    Ready,
    /// Inside a `MAIL`, `RCPT`, `DATA` transaction
    Sending,
    /// Torn down after a fatal error, without `QUIT`
    Aborted,
    /// Closed with `QUIT`
    Closed,
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
/// Used for debug displays
#[cfg(feature = "tracing")]
pub(super) fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}
