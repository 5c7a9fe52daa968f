//! ### Sending Messages
//!
//! A [`Transport`] delivers a message or raw message bytes to the
//! recipients of an [`Envelope`].
//!
//! The [`SmtpTransport`](smtp::SmtpTransport) speaks the SMTP protocol to a
//! relay server. Each send opens a session, negotiates extensions, TLS and
//! authentication, submits the message and closes the session.

#[cfg(feature = "builder")]
use crate::Message;
use crate::Envelope;

#[cfg(feature = "smtp-transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "smtp-transport")))]
pub mod smtp;

/// Blocking Transport method for emails
pub trait Transport {
    /// Response produced by the Transport
    type Ok;
    /// Error produced by the Transport
    type Error;

    /// Sends the email
    #[cfg(feature = "builder")]
    #[cfg_attr(docsrs, doc(cfg(feature = "builder")))]
    fn send(&self, message: &Message) -> Result<Self::Ok, Self::Error> {
        let raw = message.formatted();
        self.send_raw(message.envelope(), &raw)
    }

    /// Sends already formatted message bytes
    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error>;
}
