use std::fmt::Write;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use super::{Header, HeaderName};
use crate::BoxError;

/// Characters escaped in an extended parameter value,
/// see [RFC5987](https://tools.ietf.org/html/rfc5987#section-3.2.1)
const EXT_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionKind {
    Inline,
    Attachment,
    Other(String),
}

/// `Content-Disposition` of an entity
///
/// Defined in [RFC2183](https://tools.ietf.org/html/rfc2183). Non-ASCII file
/// names are written with the [RFC2231](https://tools.ietf.org/html/rfc2231#section-4)
/// `filename*` syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    kind: DispositionKind,
    params: Vec<(String, String)>,
}

impl ContentDisposition {
    /// Displayed inline in the message
    pub fn inline() -> Self {
        Self {
            kind: DispositionKind::Inline,
            params: Vec::new(),
        }
    }

    /// Displayed inline, with a name to use when saved
    pub fn inline_with_name(file_name: &str) -> Self {
        Self::inline().with_param("filename", file_name)
    }

    /// Separate from the body, can be downloaded
    pub fn attachment(file_name: &str) -> Self {
        Self {
            kind: DispositionKind::Attachment,
            params: Vec::new(),
        }
        .with_param("filename", file_name)
    }

    /// Sets a parameter, replacing a previous one with the same name
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.params.push((name.to_ascii_lowercase(), value.to_owned()));
        self
    }

    pub fn kind(&self) -> &DispositionKind {
        &self.kind
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn filename(&self) -> Option<&str> {
        self.param("filename")
    }
}

/// Splits on `;` outside of quoted strings
fn split_params(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut quoted, mut escaped, mut start) = (false, false, 0);
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    out.extend(chars.next());
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => value.to_owned(),
    }
}

impl Header for ContentDisposition {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Content-Disposition")
    }

    fn parse(s: &str) -> Result<Self, BoxError> {
        let mut parts = split_params(s).into_iter();
        let kind = match parts.next().map(str::trim) {
            Some(k) if k.eq_ignore_ascii_case("inline") => DispositionKind::Inline,
            Some(k) if k.eq_ignore_ascii_case("attachment") => DispositionKind::Attachment,
            Some(k) if !k.is_empty() => DispositionKind::Other(k.to_ascii_lowercase()),
            _ => return Err("empty Content-Disposition".into()),
        };

        let mut disposition = Self {
            kind,
            params: Vec::new(),
        };
        for param in parts {
            let (name, value) = param
                .split_once('=')
                .ok_or_else(|| format!("invalid parameter {param:?}"))?;
            let (name, value) = (name.trim(), value.trim());
            if let Some(name) = name.strip_suffix('*') {
                let (_charset, encoded) = value
                    .split_once("''")
                    .ok_or_else(|| format!("invalid extended parameter {param:?}"))?;
                let decoded = percent_decode_str(encoded).decode_utf8()?;
                disposition = disposition.with_param(name, &decoded);
            } else {
                disposition = disposition.with_param(name, &unquote(value));
            }
        }
        Ok(disposition)
    }

    fn display(&self) -> String {
        let mut out = match &self.kind {
            DispositionKind::Inline => String::from("inline"),
            DispositionKind::Attachment => String::from("attachment"),
            DispositionKind::Other(kind) => kind.clone(),
        };
        for (name, value) in &self.params {
            if value.is_ascii() {
                let _ = write!(out, "; {name}=\"");
                for c in value.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            } else {
                let _ = write!(out, "; {name}*=utf-8''{}", utf8_percent_encode(value, EXT_VALUE));
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::header::Headers;

    #[test]
    fn format_content_disposition() {
        let mut headers = Headers::new();
        headers.set(ContentDisposition::inline());
        assert_eq!(headers.to_string(), "Content-Disposition: inline\r\n");
        headers.set(ContentDisposition::attachment("something.txt"));
        assert_eq!(
            headers.to_string(),
            "Content-Disposition: attachment; filename=\"something.txt\"\r\n"
        );
    }

    #[test]
    fn non_ascii_file_name() {
        let disposition = ContentDisposition::attachment("résumé 1.pdf");
        assert_eq!(
            disposition.display(),
            "attachment; filename*=utf-8''r%C3%A9sum%C3%A9%201.pdf"
        );
        let parsed = <ContentDisposition as Header>::parse(&disposition.display()).unwrap();
        assert_eq!(parsed.filename(), Some("résumé 1.pdf"));
    }

    #[test]
    fn parse_content_disposition() {
        let parsed =
            <ContentDisposition as Header>::parse("Attachment; filename=\"a; \\\"b\\\".txt\"; size=42")
                .unwrap();
        assert_eq!(parsed.kind(), &DispositionKind::Attachment);
        assert_eq!(parsed.filename(), Some("a; \"b\".txt"));
        assert_eq!(parsed.param("SIZE"), Some("42"));
        assert!(<ContentDisposition as Header>::parse("").is_err());
    }
}
