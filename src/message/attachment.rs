use crate::message::{
    header::{self, ContentType},
    IntoBody, SinglePart,
};

/// `SinglePart` builder for attachments
///
/// Allows building attachment parts easily.
#[derive(Debug, Clone)]
pub struct Attachment {
    disposition: Disposition,
    location: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Clone)]
enum Disposition {
    /// File name
    Attached(String),
    /// Content id, with an optional file name
    Inline(String, Option<String>),
}

impl Attachment {
    /// Create a new attachment
    ///
    /// This attachment will be displayed as a normal attachment,
    /// with the chosen `filename` appearing as the file name.
    ///
    /// ```rust
    /// # use std::error::Error;
    /// use relaymail::message::{header::ContentType, Attachment};
    ///
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// let filebody = b"hello".to_vec();
    /// let content_type = ContentType::parse("application/pdf")?;
    /// let attachment = Attachment::new(String::from("example.pdf")).body(filebody, content_type);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(filename: String) -> Self {
        Attachment {
            disposition: Disposition::Attached(filename),
            location: None,
            description: None,
        }
    }

    /// Create a new inline attachment
    ///
    /// This attachment should be displayed inline into the message
    /// body, referenced as `cid:{content_id}` from an HTML view.
    pub fn new_inline(content_id: String) -> Self {
        Attachment {
            disposition: Disposition::Inline(content_id, None),
            location: None,
            description: None,
        }
    }

    /// Inline attachment which also carries a file name
    pub fn new_inline_with_name(content_id: String, filename: String) -> Self {
        Attachment {
            disposition: Disposition::Inline(content_id, Some(filename)),
            location: None,
            description: None,
        }
    }

    /// Sets `Content-Location`, the URI the content was retrieved from
    pub fn location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets `Content-Description`
    pub fn description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// Build the attachment into a [`SinglePart`] which can then be used to build the rest of the email
    ///
    /// Look at the [Complex MIME body example](crate::message#complex-mime-body)
    /// to see how [`SinglePart`] can be put into the email.
    pub fn body<T: IntoBody>(self, content: T, content_type: ContentType) -> SinglePart {
        let mut builder = SinglePart::builder().content_type(content_type);
        builder = match self.disposition {
            Disposition::Attached(filename) => {
                builder.header(header::ContentDisposition::attachment(&filename))
            }
            Disposition::Inline(content_id, None) => builder
                .header(header::ContentId::from(format!("<{content_id}>")))
                .header(header::ContentDisposition::inline()),
            Disposition::Inline(content_id, Some(filename)) => builder
                .header(header::ContentId::from(format!("<{content_id}>")))
                .header(header::ContentDisposition::inline_with_name(&filename)),
        };
        if let Some(location) = self.location {
            builder = builder.header(header::ContentLocation::from(location));
        }
        if let Some(description) = self.description {
            builder = builder.header(header::ContentDescription::from(description));
        }
        builder.body(content)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn attachment() {
        let part = Attachment::new(String::from("test.txt")).body(
            String::from("Hello world!"),
            ContentType::parse("text/plain").unwrap(),
        );
        assert_eq!(
            &String::from_utf8_lossy(&part.formatted()),
            concat!(
                "Content-Type: text/plain\r\n",
                "Content-Disposition: attachment; filename=\"test.txt\"\r\n",
                "Content-Transfer-Encoding: 7bit\r\n\r\n",
                "Hello world!",
            )
        );
    }

    #[test]
    fn attachment_inline() {
        let part = Attachment::new_inline(String::from("id"))
            .description(String::from("A greeting"))
            .body(
                String::from("Hello world!"),
                ContentType::parse("text/plain").unwrap(),
            );
        assert_eq!(
            &String::from_utf8_lossy(&part.formatted()),
            concat!(
                "Content-Type: text/plain\r\n",
                "Content-ID: <id>\r\n",
                "Content-Disposition: inline\r\n",
                "Content-Description: A greeting\r\n",
                "Content-Transfer-Encoding: 7bit\r\n\r\n",
                "Hello world!"
            )
        );
    }

    #[test]
    fn non_ascii_file_name() {
        let part = Attachment::new_inline_with_name(String::from("logo"), String::from("логотип.png"))
            .body(vec![0x89, b'P', b'N', b'G'], ContentType::parse("image/png").unwrap());
        let formatted = String::from_utf8(part.formatted()).unwrap();
        assert!(formatted.contains(
            "Content-Disposition: inline;\r\n filename*=utf-8''%D0%BB%D0%BE%D0%B3%D0%BE%D1%82%D0%B8%D0%BF.png\r\n"
        ));
        assert!(formatted.ends_with("Content-Transfer-Encoding: base64\r\n\r\niVBORw=="));
    }
}
