//! Provides a strongly typed way to build emails
//!
//! ## Usage
//!
//! This section demonstrates how to build messages.
//!
//! ### Plain body
//!
//! The easiest way of creating a message, which uses a plain text body.
//!
//! ```rust
//! use relaymail::message::Message;
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let m = Message::builder()
//!     .from("NoBody <nobody@domain.tld>".parse()?)
//!     .reply_to("Yuin <yuin@domain.tld>".parse()?)
//!     .to("Hei <hei@domain.tld>".parse()?)
//!     .subject("Happy new year")
//!     .body(String::from("Be happy!"))?;
//! # Ok(())
//! # }
//! ```
//!
//! Which produces:
//!
//! ```sh
//! From: NoBody <nobody@domain.tld>
//! Reply-To: Yuin <yuin@domain.tld>
//! To: Hei <hei@domain.tld>
//! Subject: Happy new year
//! Date: Sat, 12 Dec 2020 16:33:19 -0000
//! Content-Transfer-Encoding: 7bit
//!
//! Be happy!
//! ```
//!
//! Non-ASCII header text is written as RFC 2047 encoded words, `base64` by
//! default, see [`MimeWriter::word_scheme`].
//!
//! The `Content-Transfer-Encoding` is chosen based on the best encoding
//! available for the given body, between `7bit`, `quoted-printable` and `base64`.
//!
//! ### Complex MIME body
//!
//! [`MessageContent`] assembles a body, alternate views with their linked
//! resources, and attachments into the matching multipart tree. The tree can
//! also be built by hand with [`MultiPart`] and [`SinglePart`].
//!
//! ```rust
//! # use std::error::Error;
//! use relaymail::message::{
//!     header::ContentType, AlternateView, Attachment, Message, MessageContent,
//! };
//!
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let image = vec![0x89, b'P', b'N', b'G'];
//!
//! let m = Message::builder()
//!     .from("NoBody <nobody@domain.tld>".parse()?)
//!     .to("Hei <hei@domain.tld>".parse()?)
//!     .subject("Happy new year")
//!     .content(
//!         MessageContent::new()
//!             .plain("Hello, world! :)")
//!             .alternate_view(
//!                 AlternateView::html("<p><b>Hello</b>, <i>world</i>! <img src=cid:123></p>")
//!                     .linked_resource(
//!                         Attachment::new_inline(String::from("123"))
//!                             .body(image, ContentType::parse("image/png")?),
//!                     ),
//!             )
//!             .attachment(Attachment::new(String::from("example.rs")).body(
//!                 String::from("fn main() { println!(\"Hello, World!\") }"),
//!                 ContentType::parse("text/plain")?,
//!             )),
//!     )?;
//! # Ok(())
//! # }
//! ```
//!
//! Which produces:
//!
//! ```sh
//! From: NoBody <nobody@domain.tld>
//! To: Hei <hei@domain.tld>
//! Subject: Happy new year
//! MIME-Version: 1.0
//! Date: Sat, 12 Dec 2020 16:30:45 -0000
//! Content-Type: multipart/mixed; boundary="=_0oVZ2r6AoLAhLlb0gPNSKy6B.0"
//!
//! --=_0oVZ2r6AoLAhLlb0gPNSKy6B.0
//! Content-Type: multipart/alternative; boundary="=_EyXdAZIgZuyUjAounq4Aj44a.1"
//!
//! --=_EyXdAZIgZuyUjAounq4Aj44a.1
//! Content-Type: text/plain; charset=utf-8
//! Content-Transfer-Encoding: 7bit
//!
//! Hello, world! :)
//! --=_EyXdAZIgZuyUjAounq4Aj44a.1
//! Content-Type: multipart/related; boundary="=_eM5Z18WZVOQsqi5GQ71XGAXk.2"
//!
//! --=_eM5Z18WZVOQsqi5GQ71XGAXk.2
//! Content-Type: text/html; charset=utf-8
//! Content-Transfer-Encoding: 7bit
//!
//! <p><b>Hello</b>, <i>world</i>! <img src=cid:123></p>
//! --=_eM5Z18WZVOQsqi5GQ71XGAXk.2
//! Content-Type: image/png
//! Content-ID: <123>
//! Content-Disposition: inline
//! Content-Transfer-Encoding: base64
//!
//! iVBORw==
//! --=_eM5Z18WZVOQsqi5GQ71XGAXk.2--
//!
//! --=_EyXdAZIgZuyUjAounq4Aj44a.1--
//!
//! --=_0oVZ2r6AoLAhLlb0gPNSKy6B.0
//! Content-Type: text/plain
//! Content-Disposition: attachment; filename="example.rs"
//! Content-Transfer-Encoding: 7bit
//!
//! fn main() { println!("Hello, World!") }
//! --=_0oVZ2r6AoLAhLlb0gPNSKy6B.0--
//! ```

pub use attachment::Attachment;
pub use body::{Body, IntoBody, MaybeString};
pub use mailbox::*;
pub use mimebody::*;
pub use view::{AlternateView, MessageContent};
pub use writer::{MimeWriter, CHUNK_SIZE};

pub use mime;

mod attachment;
mod body;
pub mod header;
mod mailbox;
mod mimebody;
mod view;
mod writer;

use std::{io, iter, time::SystemTime};

use crate::{
    address::Envelope,
    message::header::{ContentTransferEncoding, Header, Headers, MailboxesHeader, Priority},
    Error as EmailError,
};

const DEFAULT_MESSAGE_ID_DOMAIN: &str = "localhost";
const MESSAGE_ID_TOKEN_LEN: usize = 32;

/// A builder for messages
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    headers: Headers,
    envelope: Option<Envelope>,
}

impl MessageBuilder {
    /// Creates a new default message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom header to message
    pub fn header<H: Header>(mut self, header: H) -> Self {
        self.headers.set(header);
        self
    }

    /// Adds a raw header, keeping previous ones with the same name
    ///
    /// Useful for headers which can be repeated, like `Received`.
    pub fn raw_header(mut self, name: header::HeaderName, value: String) -> Self {
        self.headers.insert_raw(name, value);
        self
    }

    /// Add mailbox to header
    pub fn mailbox<H: Header + MailboxesHeader>(self, header: H) -> Self {
        match self.headers.get::<H>() {
            Some(mut existing) => {
                existing.join_mailboxes(header);
                self.header(existing)
            }
            None => self.header(header),
        }
    }

    /// Add `Date` header to message
    ///
    /// Shortcut for `self.header(header::Date::new(st))`.
    pub fn date(self, st: SystemTime) -> Self {
        self.header(header::Date::new(st))
    }

    /// Set `Date` header using current date/time
    ///
    /// Shortcut for `self.date(SystemTime::now())`, it is automatically inserted
    /// if no date has been provided.
    pub fn date_now(self) -> Self {
        self.date(SystemTime::now())
    }

    /// Set `Subject` header to message
    ///
    /// Shortcut for `self.header(header::Subject::from(subject))`.
    pub fn subject<S: Into<String>>(self, subject: S) -> Self {
        let s: String = subject.into();
        self.header(header::Subject::from(s))
    }

    /// Set `MIME-Version` header to 1.0
    ///
    /// Not exposed as it is set by body methods
    fn mime_1_0(self) -> Self {
        self.header(header::MIME_VERSION_1_0)
    }

    /// Set `Sender` header. Should be used when providing several `From` mailboxes.
    ///
    /// Defined in [RFC5322](https://tools.ietf.org/html/rfc5322#section-3.6.2).
    pub fn sender(self, mbox: Mailbox) -> Self {
        self.header(header::Sender::from(mbox))
    }

    /// Set or add mailbox to `From` header
    ///
    /// Defined in [RFC5322](https://tools.ietf.org/html/rfc5322#section-3.6.2).
    pub fn from(self, mbox: Mailbox) -> Self {
        self.mailbox(header::From(mbox.into()))
    }

    /// Set or add mailbox to `Reply-To` header
    pub fn reply_to(self, mbox: Mailbox) -> Self {
        self.mailbox(header::ReplyTo(mbox.into()))
    }

    /// Set or add mailbox to `To` header
    pub fn to(self, mbox: Mailbox) -> Self {
        self.mailbox(header::To(mbox.into()))
    }

    /// Set or add mailbox to `Cc` header
    pub fn cc(self, mbox: Mailbox) -> Self {
        self.mailbox(header::Cc(mbox.into()))
    }

    /// Set or add mailbox to `Bcc` header
    ///
    /// Bcc recipients are part of the envelope but the header itself is
    /// never written out.
    pub fn bcc(self, mbox: Mailbox) -> Self {
        self.mailbox(header::Bcc(mbox.into()))
    }

    /// Set or add message id to [`In-Reply-To`
    /// header](https://tools.ietf.org/html/rfc5322#section-3.6.4)
    pub fn in_reply_to(self, id: String) -> Self {
        self.header(header::InReplyTo::from(id))
    }

    /// Set or add message id to [`References`
    /// header](https://tools.ietf.org/html/rfc5322#section-3.6.4)
    pub fn references(self, id: String) -> Self {
        self.header(header::References::from(id))
    }

    /// Set [Message-ID
    /// header](https://tools.ietf.org/html/rfc5322#section-3.6.4)
    ///
    /// If `None` is provided, an id will be generated in the
    /// `<random@HOSTNAME>` form.
    pub fn message_id(self, id: Option<String>) -> Self {
        match id {
            Some(i) => self.header(header::MessageId::from(i)),
            None => {
                #[cfg(feature = "hostname")]
                let hostname = hostname::get()
                    .ok()
                    .and_then(|s| s.into_string().ok())
                    .unwrap_or_else(|| DEFAULT_MESSAGE_ID_DOMAIN.to_owned());
                #[cfg(not(feature = "hostname"))]
                let hostname = DEFAULT_MESSAGE_ID_DOMAIN.to_owned();

                let token: String = iter::repeat_with(fastrand::alphanumeric)
                    .take(MESSAGE_ID_TOKEN_LEN)
                    .collect();
                self.header(header::MessageId::from(format!("<{token}@{hostname}>")))
            }
        }
    }

    /// Set [User-Agent
    /// header](https://tools.ietf.org/html/draft-melnikov-email-user-agent-004)
    pub fn user_agent(self, id: String) -> Self {
        self.header(header::UserAgent::from(id))
    }

    /// Sets `X-Priority`, `Priority` and `Importance`
    pub fn priority(mut self, priority: Priority) -> Self {
        priority.apply(&mut self.headers);
        self
    }

    /// Force specific envelope (by default it is derived from headers)
    pub fn envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    /// Create message from body
    fn build(self, body: MessageBody) -> Result<Message, EmailError> {
        // https://tools.ietf.org/html/rfc5322#section-3.6
        let mut res = if self.headers.has::<header::Date>() {
            self
        } else {
            self.date_now()
        };

        match res.headers.get::<header::From>() {
            Some(header::From(from)) => {
                if from.len() > 1 && !res.headers.has::<header::Sender>() {
                    return Err(EmailError::TooManyFrom);
                }
            }
            None => return Err(EmailError::MissingFrom),
        }

        let envelope = match res.envelope {
            Some(e) => e,
            None => Envelope::try_from(&res.headers)?,
        };
        res.headers.remove_raw(&header::Bcc::name());

        Ok(Message {
            headers: res.headers,
            body,
            envelope,
        })
    }

    /// Create [`Message`] using a [`Vec<u8>`], [`String`], or [`Body`] body
    ///
    /// Automatically gets encoded with `7bit`, `quoted-printable` or `base64`
    /// `Content-Transfer-Encoding`, based on the most efficient and valid encoding
    /// for `body`.
    pub fn body<T: IntoBody>(mut self, body: T) -> Result<Message, EmailError> {
        let maybe_encoding = self.headers.get::<ContentTransferEncoding>();
        let body = body.into_body(maybe_encoding);

        self.headers.set(body.encoding());
        self.build(MessageBody::Raw(body))
    }

    /// Create message using mime body ([`MultiPart`][self::MultiPart])
    pub fn multipart(self, part: MultiPart) -> Result<Message, EmailError> {
        self.mime_1_0().build(MessageBody::Mime(Part::Multi(part)))
    }

    /// Create message using mime body ([`SinglePart`][self::SinglePart])
    pub fn singlepart(self, part: SinglePart) -> Result<Message, EmailError> {
        self.mime_1_0().build(MessageBody::Mime(Part::Single(part)))
    }

    /// Create message from a body, alternate views and attachments
    pub fn content(self, content: MessageContent) -> Result<Message, EmailError> {
        self.mime_1_0().build(MessageBody::Mime(content.into_part()))
    }
}

/// Email message which can be formatted
#[cfg_attr(docsrs, doc(cfg(feature = "builder")))]
#[derive(Clone, Debug)]
pub struct Message {
    headers: Headers,
    body: MessageBody,
    envelope: Envelope,
}

#[derive(Clone, Debug)]
pub(crate) enum MessageBody {
    Mime(Part),
    Raw(Body),
}

impl Message {
    /// Create a new message builder without headers
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Get the headers from the Message
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a mutable reference to the headers
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Get `Message` envelope
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub(crate) fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Whether some content can only be sent with the `8BITMIME` extension
    pub fn is_eight_bit(&self) -> bool {
        match &self.body {
            MessageBody::Mime(part) => part.is_eight_bit(),
            MessageBody::Raw(body) => body.is_eight_bit(),
        }
    }

    /// Writes the message to `out`, encoding bodies on the fly
    pub fn write_to<W: io::Write>(&self, out: W) -> io::Result<()> {
        MimeWriter::new(out).write_message(self)
    }

    /// Get message content formatted for SMTP
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // writing into a `Vec` can't fail
        let _ = self.write_to(&mut out);
        out
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::header::HeaderName;

    fn date() -> SystemTime {
        // Tue, 15 Nov 1994 08:12:31 GMT
        SystemTime::UNIX_EPOCH + Duration::from_secs(784_887_151)
    }

    #[test]
    fn email_missing_originator() {
        assert!(matches!(
            Message::builder().body(String::from("Happy new year!")),
            Err(EmailError::MissingFrom)
        ));
    }

    #[test]
    fn email_minimal_message() {
        assert!(Message::builder()
            .from("NoBody <nobody@domain.tld>".parse().unwrap())
            .to("NoBody <nobody@domain.tld>".parse().unwrap())
            .body(String::from("Happy new year!"))
            .is_ok());
    }

    #[test]
    fn email_missing_sender() {
        assert!(matches!(
            Message::builder()
                .from("NoBody <nobody@domain.tld>".parse().unwrap())
                .from("AnyBody <anybody@domain.tld>".parse().unwrap())
                .to("NoBody <nobody@domain.tld>".parse().unwrap())
                .body(String::from("Happy new year!")),
            Err(EmailError::TooManyFrom)
        ));
    }

    #[test]
    fn email_message() {
        let email = Message::builder()
            .date(date())
            .header(header::From(
                vec![Mailbox::new(
                    Some("Каи".into()),
                    "kayo@example.com".parse().unwrap(),
                )]
                .into(),
            ))
            .header(header::To(
                vec!["Pony O.P. <pony@domain.tld>".parse().unwrap()].into(),
            ))
            .header(header::Subject::from(String::from("яңа ел белән!")))
            .body(String::from("Happy new year!"))
            .unwrap();

        assert_eq!(
            String::from_utf8(email.formatted()).unwrap(),
            concat!(
                "Date: Tue, 15 Nov 1994 08:12:31 -0000\r\n",
                "From: =?utf-8?B?0JrQsNC4?= <kayo@example.com>\r\n",
                "To: \"Pony O.P.\" <pony@domain.tld>\r\n",
                "Subject: =?utf-8?B?0Y/So9CwINC10Lsg0LHQtdC705nQvSE=?=\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Happy new year!"
            )
        );
    }

    #[test]
    fn bcc_is_not_written() {
        let email = Message::builder()
            .date(date())
            .from("a@example.com".parse().unwrap())
            .to("b@example.com".parse().unwrap())
            .bcc("c@example.com".parse().unwrap())
            .body(String::from("x"))
            .unwrap();

        assert_eq!(email.envelope().to().len(), 2);
        let formatted = String::from_utf8(email.formatted()).unwrap();
        assert!(!formatted.contains("c@example.com"));
    }

    #[test]
    fn mailboxes_are_joined() {
        let email = Message::builder()
            .from("a@example.com".parse().unwrap())
            .to("b@example.com".parse().unwrap())
            .to("Cé <c@example.com>".parse().unwrap())
            .body(String::from("x"))
            .unwrap();
        assert_eq!(
            email.headers().get_raw("To"),
            Some("b@example.com, Cé <c@example.com>")
        );
    }

    #[test]
    fn repeated_and_priority_headers() {
        let email = Message::builder()
            .date(date())
            .from("a@example.com".parse().unwrap())
            .to("b@example.com".parse().unwrap())
            .raw_header(HeaderName::new_from_ascii_str("X-Receiver"), "one@example.com".into())
            .raw_header(HeaderName::new_from_ascii_str("X-Receiver"), "two@example.com".into())
            .priority(Priority::High)
            .body(String::from("x"))
            .unwrap();

        let receivers: Vec<&str> = email.headers().get_all_raw("x-receiver").collect();
        assert_eq!(receivers, ["one@example.com", "two@example.com"]);
        assert_eq!(email.headers().get::<Priority>(), Some(Priority::High));
        assert_eq!(email.headers().get_raw("Importance"), Some("high"));
    }

    #[test]
    fn generated_message_id() {
        let email = Message::builder()
            .from("a@example.com".parse().unwrap())
            .to("b@example.com".parse().unwrap())
            .message_id(None)
            .body(String::from("x"))
            .unwrap();
        let id = email.headers().get_raw("Message-ID").unwrap();
        assert!(id.starts_with('<') && id.ends_with('>') && id.contains('@'));
        assert!(email.headers().has::<header::Date>());
    }

    #[test]
    fn multipart_message() {
        let email = Message::builder()
            .date(date())
            .from("a@example.com".parse().unwrap())
            .to("b@example.com".parse().unwrap())
            .multipart(
                MultiPart::alternative()
                    .boundary("alt")
                    .singlepart(SinglePart::plain("Hello"))
                    .singlepart(SinglePart::html("<b>Hello</b>")),
            )
            .unwrap();

        assert_eq!(
            String::from_utf8(email.formatted()).unwrap(),
            concat!(
                "Date: Tue, 15 Nov 1994 08:12:31 -0000\r\n",
                "From: a@example.com\r\n",
                "To: b@example.com\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: multipart/alternative; boundary=\"alt\"\r\n",
                "\r\n",
                "--alt\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Hello\r\n",
                "--alt\r\n",
                "Content-Type: text/html; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "<b>Hello</b>\r\n",
                "--alt--\r\n"
            )
        );
        assert!(!email.is_eight_bit());
    }
}
