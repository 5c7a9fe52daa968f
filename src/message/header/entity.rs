use std::borrow::Cow;

use super::{ContentDisposition, ContentType, Header, HeaderName, Headers};

/// Headers of a MIME entity
///
/// `Content-Type` and `Content-Disposition` are derived headers: they also
/// live in typed form. Raw writes to them are parsed into the typed field,
/// and typed changes are only marked dirty. [`EntityHeaders::materialize`]
/// writes the changed typed fields back into the raw set, and every read
/// through this type goes through it first.
#[derive(Debug, Clone, Default)]
pub struct EntityHeaders {
    headers: Headers,
    content_type: Option<ContentType>,
    content_disposition: Option<ContentDisposition>,
    content_type_dirty: bool,
    content_disposition_dirty: bool,
}

fn is_content_type(name: &str) -> bool {
    name.eq_ignore_ascii_case(&ContentType::name())
}

fn is_content_disposition(name: &str) -> bool {
    name.eq_ignore_ascii_case(&ContentDisposition::name())
}

impl EntityHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    /// Mutable access to the typed `Content-Type`, marks the set dirty
    pub fn content_type_mut(&mut self) -> Option<&mut ContentType> {
        self.content_type_dirty = true;
        self.content_type.as_mut()
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.content_type = Some(content_type);
        self.content_type_dirty = true;
    }

    pub fn content_disposition(&self) -> Option<&ContentDisposition> {
        self.content_disposition.as_ref()
    }

    /// Mutable access to the typed `Content-Disposition`, marks the set dirty
    pub fn content_disposition_mut(&mut self) -> Option<&mut ContentDisposition> {
        self.content_disposition_dirty = true;
        self.content_disposition.as_mut()
    }

    pub fn set_content_disposition(&mut self, disposition: ContentDisposition) {
        self.content_disposition = Some(disposition);
        self.content_disposition_dirty = true;
    }

    pub fn clear_content_disposition(&mut self) {
        self.content_disposition = None;
        self.content_disposition_dirty = true;
    }

    /// Whether typed state has not been written back yet
    pub fn is_dirty(&self) -> bool {
        self.content_type_dirty || self.content_disposition_dirty
    }

    /// Sets a typed header
    pub fn set<H: Header>(&mut self, header: H) {
        self.set_raw(H::name(), header.display());
    }

    /// Parses a header from the materialized set
    pub fn get<H: Header>(&mut self) -> Option<H> {
        self.materialize().get::<H>()
    }

    /// Reads a raw value from the materialized set
    pub fn get_raw(&mut self, name: &str) -> Option<&str> {
        self.materialize().get_raw(name)
    }

    /// Sets a raw value, re-parsing derived headers
    ///
    /// A value that doesn't parse is kept as is and clears the typed field.
    pub fn set_raw(&mut self, name: HeaderName, value: String) {
        self.materialize();
        if is_content_type(&name) {
            self.content_type = ContentType::parse(&value).ok();
        } else if is_content_disposition(&name) {
            self.content_disposition = <ContentDisposition as Header>::parse(&value).ok();
        }
        self.headers.set_raw(name, value);
    }

    /// Appends a raw value, derived headers are replaced instead
    pub fn insert_raw(&mut self, name: HeaderName, value: String) {
        if is_content_type(&name) || is_content_disposition(&name) {
            self.set_raw(name, value);
        } else {
            self.headers.insert_raw(name, value);
        }
    }

    pub fn remove_raw(&mut self, name: &str) -> Option<String> {
        self.materialize();
        if is_content_type(name) {
            self.content_type = None;
        } else if is_content_disposition(name) {
            self.content_disposition = None;
        }
        self.headers.remove_raw(name)
    }

    /// Writes pending typed state into the raw headers and returns them
    pub fn materialize(&mut self) -> &Headers {
        if self.is_dirty() {
            let mut headers = std::mem::take(&mut self.headers);
            self.write_back(&mut headers);
            self.headers = headers;
            self.content_type_dirty = false;
            self.content_disposition_dirty = false;
        }
        &self.headers
    }

    /// Materialized view without touching `self`
    pub fn materialized(&self) -> Cow<'_, Headers> {
        if self.is_dirty() {
            let mut headers = self.headers.clone();
            self.write_back(&mut headers);
            Cow::Owned(headers)
        } else {
            Cow::Borrowed(&self.headers)
        }
    }

    /// Only fields changed through the typed API are written, raw values
    /// that never parsed stay untouched otherwise
    fn write_back(&self, headers: &mut Headers) {
        if self.content_type_dirty {
            match &self.content_type {
                Some(content_type) => headers.set(content_type.clone()),
                None => {
                    headers.remove_raw(&ContentType::name());
                }
            }
        }
        if self.content_disposition_dirty {
            match &self.content_disposition {
                Some(disposition) => headers.set(disposition.clone()),
                None => {
                    headers.remove_raw(&ContentDisposition::name());
                }
            }
        }
    }
}

impl From<Headers> for EntityHeaders {
    fn from(headers: Headers) -> Self {
        let content_type = headers.get::<ContentType>();
        let content_disposition = headers.get::<ContentDisposition>();
        Self {
            headers,
            content_type,
            content_disposition,
            content_type_dirty: false,
            content_disposition_dirty: false,
        }
    }
}
