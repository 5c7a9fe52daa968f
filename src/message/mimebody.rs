use std::{
    borrow::Cow,
    iter,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::message::{
    header::{ContentTransferEncoding, ContentType, EntityHeaders, Header, Headers},
    Body, IntoBody, MimeWriter,
};

/// Length of the random part of generated boundaries
const BOUNDARY_TOKEN_LEN: usize = 24;

static BOUNDARY_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// MIME part variants
#[derive(Debug, Clone)]
pub enum Part {
    /// Single part with content
    Single(SinglePart),

    /// Multiple parts of content
    Multi(MultiPart),
}

impl Part {
    /// Headers of the part, with typed state written back
    pub fn headers(&self) -> Cow<'_, Headers> {
        match self {
            Part::Single(part) => part.headers.materialized(),
            Part::Multi(part) => part.headers.materialized(),
        }
    }

    /// Whether any leaf needs the `8BITMIME` extension
    pub fn is_eight_bit(&self) -> bool {
        match self {
            Part::Single(part) => part.body.is_eight_bit(),
            Part::Multi(part) => part.parts.iter().any(Part::is_eight_bit),
        }
    }

    /// Get message content formatted for SMTP
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // writing into a `Vec` can't fail
        let _ = MimeWriter::new(&mut out).write_part(self);
        out
    }
}

impl From<SinglePart> for Part {
    fn from(part: SinglePart) -> Self {
        Part::Single(part)
    }
}

impl From<MultiPart> for Part {
    fn from(part: MultiPart) -> Self {
        Part::Multi(part)
    }
}

/// Creates builder for single part
#[derive(Debug, Clone, Default)]
pub struct SinglePartBuilder {
    headers: EntityHeaders,
}

impl SinglePartBuilder {
    /// Creates a default singlepart builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header to singlepart
    pub fn header<H: Header>(mut self, header: H) -> Self {
        self.headers.set(header);
        self
    }

    /// Set the Content-Type header of the singlepart
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.headers.set_content_type(content_type);
        self
    }

    /// Build singlepart using body
    ///
    /// A `Content-Transfer-Encoding` set on the builder is honored when it
    /// can represent the body.
    pub fn body<T: IntoBody>(mut self, body: T) -> SinglePart {
        let maybe_encoding = self.headers.get::<ContentTransferEncoding>();
        let body = body.into_body(maybe_encoding);

        self.headers.set(body.encoding());

        SinglePart {
            headers: self.headers,
            body,
        }
    }
}

/// Leaf entity: headers and content
///
/// # Example
///
/// ```
/// use relaymail::message::{header, SinglePart};
///
/// let part = SinglePart::builder()
///     .header(header::ContentType::TEXT_PLAIN)
///     .body(String::from("Текст письма в уникоде"));
/// ```
#[derive(Debug, Clone)]
pub struct SinglePart {
    headers: EntityHeaders,
    body: Body,
}

impl SinglePart {
    /// Creates a builder for singlepart
    #[inline]
    pub fn builder() -> SinglePartBuilder {
        SinglePartBuilder::new()
    }

    /// `text/plain; charset=utf-8` part
    pub fn plain<T: IntoBody>(body: T) -> Self {
        Self::builder()
            .content_type(ContentType::TEXT_PLAIN)
            .body(body)
    }

    /// `text/html; charset=utf-8` part
    pub fn html<T: IntoBody>(body: T) -> Self {
        Self::builder()
            .content_type(ContentType::TEXT_HTML)
            .body(body)
    }

    /// Get the headers, writing back pending typed changes first
    pub fn headers(&mut self) -> &Headers {
        self.headers.materialize()
    }

    pub fn headers_mut(&mut self) -> &mut EntityHeaders {
        &mut self.headers
    }

    pub(crate) fn entity_headers(&self) -> &EntityHeaders {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Get message content formatted for sending
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let _ = MimeWriter::new(&mut out).write_single(self);
        out
    }
}

/// The kind of multipart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiPartKind {
    /// Unrelated parts, typically a message and its attachments
    Mixed,

    /// Several renderings of the same content, the preferred one last
    ///
    /// Use it to send both a plain text and an HTML version.
    Alternative,

    /// Parts meant to be displayed at the same time
    Parallel,

    /// Content and the resources it refers to, like images of an HTML body
    Related,
}

impl MultiPartKind {
    fn subtype(self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::Alternative => "alternative",
            Self::Parallel => "parallel",
            Self::Related => "related",
        }
    }

    fn content_type(self, boundary: &str) -> String {
        format!("multipart/{}; boundary=\"{}\"", self.subtype(), boundary)
    }
}

/// Creates a boundary that no other multipart of this process uses
///
/// A process-wide counter guarantees uniqueness, the random token keeps
/// boundaries of different processes apart.
pub(crate) fn make_boundary() -> String {
    let count = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
    let token: String = iter::repeat_with(fastrand::alphanumeric)
        .take(BOUNDARY_TOKEN_LEN)
        .collect();
    format!("=_{token}.{count:x}")
}

/// Whether `boundary` can be used as is, see
/// [RFC2046](https://tools.ietf.org/html/rfc2046#section-5.1.1)
fn is_valid_boundary(boundary: &str) -> bool {
    (1..=70).contains(&boundary.len())
        && !boundary.ends_with(' ')
        && boundary
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"'()+_,-./:=? ".contains(&b))
}

/// Multipart builder
#[derive(Debug, Clone)]
pub struct MultiPartBuilder {
    headers: EntityHeaders,
    kind: MultiPartKind,
    boundary: Option<String>,
}

impl MultiPartBuilder {
    /// Creates a `multipart/mixed` builder
    pub fn new() -> Self {
        Self {
            headers: EntityHeaders::new(),
            kind: MultiPartKind::Mixed,
            boundary: None,
        }
    }

    /// Set a header
    pub fn header<H: Header>(mut self, header: H) -> Self {
        self.headers.set(header);
        self
    }

    pub fn kind(mut self, kind: MultiPartKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set custom boundary
    ///
    /// Boundaries with characters [RFC2046](https://tools.ietf.org/html/rfc2046#section-5.1.1)
    /// doesn't allow are ignored in favor of a generated one.
    pub fn boundary<S: Into<String>>(mut self, boundary: S) -> Self {
        let boundary = boundary.into();
        if is_valid_boundary(&boundary) {
            self.boundary = Some(boundary);
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(boundary = %boundary, "ignoring invalid multipart boundary");
        }
        self
    }

    /// Creates multipart without parts
    pub fn build(self) -> MultiPart {
        let boundary = self.boundary.unwrap_or_else(make_boundary);
        let mut headers = self.headers;
        headers.set_raw(ContentType::name(), self.kind.content_type(&boundary));
        MultiPart {
            headers,
            kind: self.kind,
            boundary,
            parts: Vec::new(),
        }
    }

    /// Creates multipart using part
    pub fn part(self, part: Part) -> MultiPart {
        self.build().part(part)
    }

    /// Creates multipart using singlepart
    pub fn singlepart(self, part: SinglePart) -> MultiPart {
        self.build().singlepart(part)
    }

    /// Creates multipart using multipart
    pub fn multipart(self, part: MultiPart) -> MultiPart {
        self.build().multipart(part)
    }
}

impl Default for MultiPartBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite entity: an ordered list of parts separated by a boundary
#[derive(Debug, Clone)]
pub struct MultiPart {
    headers: EntityHeaders,
    kind: MultiPartKind,
    boundary: String,
    parts: Vec<Part>,
}

impl MultiPart {
    /// Creates multipart builder
    pub fn builder() -> MultiPartBuilder {
        MultiPartBuilder::new()
    }

    /// Creates mixed multipart builder
    ///
    /// Shortcut for `MultiPart::builder().kind(MultiPartKind::Mixed)`
    pub fn mixed() -> MultiPartBuilder {
        MultiPart::builder().kind(MultiPartKind::Mixed)
    }

    /// Creates alternative multipart builder
    ///
    /// Shortcut for `MultiPart::builder().kind(MultiPartKind::Alternative)`
    pub fn alternative() -> MultiPartBuilder {
        MultiPart::builder().kind(MultiPartKind::Alternative)
    }

    /// Creates parallel multipart builder
    pub fn parallel() -> MultiPartBuilder {
        MultiPart::builder().kind(MultiPartKind::Parallel)
    }

    /// Creates related multipart builder
    ///
    /// Shortcut for `MultiPart::builder().kind(MultiPartKind::Related)`
    pub fn related() -> MultiPartBuilder {
        MultiPart::builder().kind(MultiPartKind::Related)
    }

    /// Plain text and HTML versions of the same content
    pub fn alternative_plain_html<T: IntoBody, V: IntoBody>(plain: T, html: V) -> Self {
        Self::alternative()
            .singlepart(SinglePart::plain(plain))
            .singlepart(SinglePart::html(html))
    }

    /// Add part to multipart
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add single part to multipart
    pub fn singlepart(mut self, part: SinglePart) -> Self {
        self.parts.push(Part::Single(part));
        self
    }

    /// Add multi part to multipart
    pub fn multipart(mut self, part: MultiPart) -> Self {
        self.parts.push(Part::Multi(part));
        self
    }

    pub fn kind(&self) -> MultiPartKind {
        self.kind
    }

    /// Get the boundary of multipart contents
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the headers, writing back pending typed changes first
    pub fn headers(&mut self) -> &Headers {
        self.headers.materialize()
    }

    pub(crate) fn entity_headers(&self) -> &EntityHeaders {
        &self.headers
    }

    /// Get the parts from the multipart
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Get a mutable reference to the parts
    pub fn parts_mut(&mut self) -> &mut Vec<Part> {
        &mut self.parts
    }

    /// Get message content formatted for SMTP
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let _ = MimeWriter::new(&mut out).write_multi(self);
        out
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::header;

    const BOUNDARY: &str = "F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT";

    fn plain_utf8() -> ContentType {
        ContentType::parse("text/plain; charset=utf8").unwrap()
    }

    #[test]
    fn single_part_binary() {
        let part = SinglePart::builder()
            .header(plain_utf8())
            .header(header::ContentTransferEncoding::Binary)
            .body(String::from("Текст письма в уникоде"));

        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: text/plain; charset=utf8\r\n",
                "Content-Transfer-Encoding: binary\r\n",
                "\r\n",
                "Текст письма в уникоде"
            )
        );
    }

    #[test]
    fn single_part_quoted_printable() {
        let part = SinglePart::builder()
            .header(plain_utf8())
            .header(header::ContentTransferEncoding::QuotedPrintable)
            .body(String::from("Текст письма в уникоде"));

        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: text/plain; charset=utf8\r\n",
                "Content-Transfer-Encoding: quoted-printable\r\n",
                "\r\n",
                "=D0=A2=D0=B5=D0=BA=D1=81=D1=82 =D0=BF=D0=B8=D1=81=D1=8C=D0=BC=D0=B0 =D0=B2 =\r\n",
                "=D1=83=D0=BD=D0=B8=D0=BA=D0=BE=D0=B4=D0=B5"
            )
        );
    }

    #[test]
    fn single_part_base64() {
        let part = SinglePart::builder()
            .header(plain_utf8())
            .header(header::ContentTransferEncoding::Base64)
            .body(String::from("Текст письма в уникоде"));

        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: text/plain; charset=utf8\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "\r\n",
                "0KLQtdC60YHRgiDQv9C40YHRjNC80LAg0LIg0YPQvdC40LrQvtC00LU="
            )
        );
    }

    #[test]
    fn multi_part_mixed() {
        let part = MultiPart::mixed()
            .boundary(BOUNDARY)
            .part(Part::Single(
                SinglePart::builder()
                    .header(plain_utf8())
                    .header(header::ContentTransferEncoding::Binary)
                    .body(String::from("Текст письма в уникоде")),
            ))
            .singlepart(
                SinglePart::builder()
                    .header(plain_utf8())
                    .header(header::ContentDisposition::attachment("example.c"))
                    .header(header::ContentTransferEncoding::Binary)
                    .body(String::from("int main() { return 0; }")),
            );

        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: multipart/mixed;\r\n",
                " boundary=\"F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT\"\r\n",
                "\r\n",
                "--F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT\r\n",
                "Content-Type: text/plain; charset=utf8\r\n",
                "Content-Transfer-Encoding: binary\r\n",
                "\r\n",
                "Текст письма в уникоде\r\n",
                "--F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT\r\n",
                "Content-Type: text/plain; charset=utf8\r\n",
                "Content-Disposition: attachment; filename=\"example.c\"\r\n",
                "Content-Transfer-Encoding: binary\r\n",
                "\r\n",
                "int main() { return 0; }\r\n",
                "--F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYSftse1GT--\r\n"
            )
        );
    }

    #[test]
    fn multi_part_nested() {
        let part = MultiPart::mixed()
            .boundary("outer")
            .multipart(
                MultiPart::related()
                    .boundary("inner")
                    .singlepart(SinglePart::html("<p>hi</p>"))
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::parse("image/png").unwrap())
                            .header(header::ContentLocation::from(String::from("/image.png")))
                            .body(b"1234567890".to_vec()),
                    ),
            )
            .singlepart(SinglePart::plain("bye"));

        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
                "\r\n",
                "--outer\r\n",
                "Content-Type: multipart/related; boundary=\"inner\"\r\n",
                "\r\n",
                "--inner\r\n",
                "Content-Type: text/html; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "<p>hi</p>\r\n",
                "--inner\r\n",
                "Content-Type: image/png\r\n",
                "Content-Location: /image.png\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "\r\n",
                "MTIzNDU2Nzg5MA==\r\n",
                "--inner--\r\n",
                "\r\n",
                "--outer\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "bye\r\n",
                "--outer--\r\n"
            )
        );
    }

    #[test]
    fn empty_multipart_and_empty_body() {
        let part = MultiPart::alternative().boundary("b").build();
        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: multipart/alternative; boundary=\"b\"\r\n",
                "\r\n",
                "--b\r\n",
                "\r\n",
                "--b--\r\n"
            )
        );

        let part = SinglePart::plain("");
        assert_eq!(
            String::from_utf8(part.formatted()).unwrap(),
            concat!(
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
            )
        );
    }

    #[test]
    fn invalid_boundary_is_replaced() {
        let part = MultiPart::mixed().boundary("not\r\nvalid").build();
        assert_ne!(part.boundary(), "not\r\nvalid");
        assert!(is_valid_boundary(part.boundary()));
    }

    #[test]
    fn typed_content_type_follows_boundary() {
        let mut part = MultiPart::parallel().boundary("xyz").build();
        assert_eq!(part.kind(), MultiPartKind::Parallel);
        let content_type = part.headers().get::<ContentType>().unwrap();
        assert!(content_type.is_multipart());
        assert_eq!(content_type.boundary(), Some("xyz"));
    }

    #[test]
    fn boundaries_are_unique() {
        let boundaries: HashSet<String> = (0..1000)
            .map(|_| MultiPart::mixed().build().boundary().to_owned())
            .collect();
        assert_eq!(boundaries.len(), 1000);
        for boundary in boundaries {
            assert!(is_valid_boundary(&boundary), "{boundary}");
        }
    }

    #[test]
    fn boundaries_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| (0..250).map(|_| make_boundary()).collect::<Vec<_>>())
            })
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for boundary in handle.join().unwrap() {
                assert!(all.insert(boundary));
            }
        }
        assert_eq!(all.len(), 1000);
    }
}
