use super::{
    writer::{decode_phrase, encode_phrase},
    Header, HeaderName,
};
use crate::{
    message::mailbox::{Mailbox, Mailboxes},
    BoxError,
};

/// Header holding several mailboxes, which can be merged
pub trait MailboxesHeader {
    fn join_mailboxes(&mut self, other: Self);
}

const ADDRESS_HEADERS: [&str; 6] = ["From", "Sender", "Reply-To", "To", "Cc", "Bcc"];

/// Re-encodes the display names of a raw address header holding non-ASCII
/// text, `None` when the value needs nothing or doesn't parse
pub(crate) fn encode_raw_addresses(name: &str, value: &str) -> Option<String> {
    if value.is_ascii() || !ADDRESS_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
        return None;
    }
    let mailboxes: Mailboxes = value.parse().ok()?;
    Some(
        mailboxes
            .recode_names(|name| encode_phrase(&decode_phrase(name)))
            .to_string(),
    )
}

macro_rules! mailbox_header {
    ($(#[$doc:meta])*($type_name: ident, $header_name: expr)) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $type_name(pub Mailbox);

        impl Header for $type_name {
            fn name() -> HeaderName {
                HeaderName::new_from_ascii_str($header_name)
            }

            fn parse(s: &str) -> Result<Self, BoxError> {
                let mailbox: Mailbox = s.parse()?;
                Ok(Self(mailbox.recode_name(decode_phrase)))
            }

            fn display(&self) -> String {
                self.0.recode_name(encode_phrase).to_string()
            }
        }

        impl std::convert::From<Mailbox> for $type_name {
            #[inline]
            fn from(mailbox: Mailbox) -> Self {
                Self(mailbox)
            }
        }
    };
}

macro_rules! mailboxes_header {
    ($(#[$doc:meta])*($type_name: ident, $header_name: expr)) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $type_name(pub Mailboxes);

        impl MailboxesHeader for $type_name {
            fn join_mailboxes(&mut self, other: Self) {
                self.0.extend(other.0);
            }
        }

        impl Header for $type_name {
            fn name() -> HeaderName {
                HeaderName::new_from_ascii_str($header_name)
            }

            fn parse(s: &str) -> Result<Self, BoxError> {
                let mailboxes: Mailboxes = s.parse()?;
                Ok(Self(mailboxes.recode_names(decode_phrase)))
            }

            fn display(&self) -> String {
                self.0.recode_names(encode_phrase).to_string()
            }
        }

        impl std::convert::From<Mailboxes> for $type_name {
            #[inline]
            fn from(mailboxes: Mailboxes) -> Self {
                Self(mailboxes)
            }
        }
    };
}

mailbox_header! {
    /// `Sender` header, the mailbox responsible for the transmission,
    /// defined in [RFC5322](https://tools.ietf.org/html/rfc5322#section-3.6.2)
    (Sender, "Sender")
}

mailboxes_header! {
    /// `From` header, the authors of the message
    (From, "From")
}

mailboxes_header! {
    /// `Reply-To` header
    (ReplyTo, "Reply-To")
}

mailboxes_header! {
    /// `To` header, primary recipients
    (To, "To")
}

mailboxes_header! {
    /// `Cc` header
    (Cc, "Cc")
}

mailboxes_header! {
    /// `Bcc` header
    ///
    /// Only used to build the envelope, never written out.
    (Bcc, "Bcc")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::header::Headers;

    #[test]
    fn format_mailboxes() {
        let mut headers = Headers::new();
        headers.set(From(
            Mailboxes::new()
                .with("K. <kayo@example.com>".parse().unwrap())
                .with("pony@domain.tld".parse().unwrap()),
        ));
        assert_eq!(
            headers.to_string(),
            "From: \"K.\" <kayo@example.com>, pony@domain.tld\r\n"
        );
    }

    #[test]
    fn format_utf8_name() {
        let mut headers = Headers::new();
        headers.set(Sender("Кайо <kayo@example.com>".parse().unwrap()));
        assert_eq!(
            headers.to_string(),
            "Sender: =?utf-8?B?0JrQsNC50L4=?= <kayo@example.com>\r\n"
        );
    }

    #[test]
    fn format_quoted_utf8_name() {
        let mut headers = Headers::new();
        headers.set(To(Mailboxes::new()
            .with(Mailbox::new(
                Some("Jöhn Dœ, Jr.".into()),
                "john@example.com".parse().unwrap(),
            ))
            .with(Mailbox::new(
                Some("Doe, Jane".into()),
                "jane@example.com".parse().unwrap(),
            ))));
        assert_eq!(
            headers.to_string(),
            concat!(
                "To: =?utf-8?B?SsO2aG4gRMWTLCBKci4=?= <john@example.com>, \"Doe, Jane\"\r\n",
                " <jane@example.com>\r\n",
            )
        );

        let to = headers.get::<To>().unwrap();
        let names: Vec<_> = to.0.iter().map(|m| m.name.as_deref()).collect();
        assert_eq!(names, [Some("Jöhn Dœ, Jr."), Some("Doe, Jane")]);
    }

    #[test]
    fn raw_utf8_name_is_encoded() {
        let mut headers = Headers::new();
        headers.insert_raw(
            HeaderName::new_from_ascii_str("cc"),
            "\"Кайо, K.\" <kayo@example.com>".into(),
        );
        assert_eq!(
            headers.to_string(),
            "cc: =?utf-8?B?0JrQsNC50L4sIEsu?= <kayo@example.com>\r\n"
        );
    }

    #[test]
    fn parse_and_join() {
        let mut headers = Headers::new();
        headers.insert_raw(
            HeaderName::new_from_ascii_str("To"),
            "K. <kayo@example.com>, pony@domain.tld".into(),
        );
        let mut to = headers.get::<To>().unwrap();
        assert_eq!(to.0.len(), 2);
        to.join_mailboxes(To("third@example.com".parse().unwrap()));
        assert_eq!(to.0.len(), 3);
    }
}
