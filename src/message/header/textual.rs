use super::{Header, HeaderName};
use crate::BoxError;

macro_rules! text_header {
    ($(#[$attr:meta])* Header($type: ident, $name: expr )) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $type(String);

        impl Header for $type {
            fn name() -> HeaderName {
                HeaderName::new_from_ascii_str($name)
            }

            fn parse(s: &str) -> Result<Self, BoxError> {
                Ok(Self(s.into()))
            }

            fn display(&self) -> String {
                self.0.clone()
            }
        }

        impl From<String> for $type {
            #[inline]
            fn from(text: String) -> Self {
                Self(text)
            }
        }

        impl AsRef<str> for $type {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

text_header!(
    /// `Subject` of the message, defined in [RFC5322](https://tools.ietf.org/html/rfc5322#section-3.6.5)
    Header(Subject, "Subject")
);
text_header!(
    /// `Comments` of the message
    Header(Comments, "Comments")
);
text_header!(
    /// `Keywords`, a comma separated list of words or quoted strings
    Header(Keywords, "Keywords")
);
text_header!(
    /// `In-Reply-To`, message identifiers of the parent messages
    Header(InReplyTo, "In-Reply-To")
);
text_header!(
    /// `References`, message identifiers of the thread
    Header(References, "References")
);
text_header!(
    /// `Message-ID`, defined in [RFC5322](https://tools.ietf.org/html/rfc5322#section-3.6.4)
    Header(MessageId, "Message-ID")
);
text_header!(
    /// `User-Agent`, the client that produced the message
    Header(UserAgent, "User-Agent")
);
text_header!(
    /// `Content-ID` of an entity, used by `cid:` references from a
    /// related HTML view, defined in [RFC2045](https://tools.ietf.org/html/rfc2045#section-7)
    Header(ContentId, "Content-ID")
);
text_header!(
    /// `Content-Location`, defined in [RFC2557](https://tools.ietf.org/html/rfc2557#section-4)
    Header(ContentLocation, "Content-Location")
);
text_header!(
    /// `Content-Description`, defined in [RFC2045](https://tools.ietf.org/html/rfc2045#section-8)
    Header(ContentDescription, "Content-Description")
);

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::header::Headers;

    #[test]
    fn format_ascii() {
        let mut headers = Headers::new();
        headers.set(Subject::from(String::from("Sample subject")));
        assert_eq!(headers.to_string(), "Subject: Sample subject\r\n");
    }

    #[test]
    fn parse_raw() {
        let mut headers = Headers::new();
        headers.set_raw(HeaderName::new_from_ascii_str("subject"), "Sample subject".into());
        assert_eq!(
            headers.get::<Subject>(),
            Some(Subject("Sample subject".into()))
        );
    }

    #[test]
    fn format_utf8_subject_with_ascii_words() {
        let mut headers = Headers::new();
        headers.set(Subject::from(String::from("Re: héllo wörld again")));
        assert_eq!(
            headers.to_string(),
            "Subject: Re: =?utf-8?B?aMOpbGxvIHfDtnJsZA==?= again\r\n"
        );
    }
}
