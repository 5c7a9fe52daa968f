use crate::message::{IntoBody, MultiPart, Part, SinglePart};

/// One rendering of the message content, with the resources it refers to
///
/// An HTML view usually comes with images referenced by `cid:` URLs, added
/// as linked resources with [`Attachment::new_inline`](super::Attachment::new_inline).
#[derive(Debug, Clone)]
pub struct AlternateView {
    part: SinglePart,
    linked_resources: Vec<SinglePart>,
}

impl AlternateView {
    pub fn new(part: SinglePart) -> Self {
        Self {
            part,
            linked_resources: Vec::new(),
        }
    }

    /// `text/plain` view
    pub fn plain<T: IntoBody>(body: T) -> Self {
        Self::new(SinglePart::plain(body))
    }

    /// `text/html` view
    pub fn html<T: IntoBody>(body: T) -> Self {
        Self::new(SinglePart::html(body))
    }

    pub fn linked_resource(mut self, resource: SinglePart) -> Self {
        self.linked_resources.push(resource);
        self
    }

    /// The view alone, or `multipart/related` with its resources
    pub fn into_part(self) -> Part {
        if self.linked_resources.is_empty() {
            return Part::Single(self.part);
        }
        self.linked_resources
            .into_iter()
            .fold(MultiPart::related().singlepart(self.part), MultiPart::singlepart)
            .into()
    }
}

/// High level message content: a body, alternate views and attachments
///
/// Turned into the usual MIME structure: views share a `multipart/alternative`
/// with the body, which comes first as the least preferred rendering, and
/// attachments wrap everything in `multipart/mixed`.
///
/// ```
/// use relaymail::message::{header::ContentType, AlternateView, Attachment, MessageContent};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let content = MessageContent::new()
///     .plain("Hello!")
///     .alternate_view(AlternateView::html("<p>Hello!</p>"))
///     .attachment(
///         Attachment::new(String::from("notes.txt"))
///             .body(String::from("notes"), ContentType::parse("text/plain")?),
///     );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageContent {
    body: Option<SinglePart>,
    views: Vec<AlternateView>,
    attachments: Vec<SinglePart>,
}

impl MessageContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Main body, replacing a previous one
    pub fn body(mut self, part: SinglePart) -> Self {
        self.body = Some(part);
        self
    }

    pub fn plain<T: IntoBody>(self, body: T) -> Self {
        self.body(SinglePart::plain(body))
    }

    pub fn html<T: IntoBody>(self, body: T) -> Self {
        self.body(SinglePart::html(body))
    }

    pub fn alternate_view(mut self, view: AlternateView) -> Self {
        self.views.push(view);
        self
    }

    pub fn attachment(mut self, part: SinglePart) -> Self {
        self.attachments.push(part);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_none() && self.views.is_empty() && self.attachments.is_empty()
    }

    /// Builds the entity tree, an empty content becomes an empty text part
    pub fn into_part(self) -> Part {
        let mut renderings: Vec<Part> = self.body.map(Part::Single).into_iter().collect();
        renderings.extend(self.views.into_iter().map(AlternateView::into_part));

        let main = match renderings.len() {
            0 => None,
            1 => renderings.pop(),
            _ => Some(
                renderings
                    .into_iter()
                    .fold(MultiPart::alternative().build(), MultiPart::part)
                    .into(),
            ),
        };

        if self.attachments.is_empty() {
            return main.unwrap_or_else(|| Part::Single(SinglePart::plain("")));
        }
        let mixed = main
            .into_iter()
            .fold(MultiPart::mixed().build(), MultiPart::part);
        self.attachments
            .into_iter()
            .fold(mixed, MultiPart::singlepart)
            .into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::{header::ContentType, Attachment, MultiPartKind};

    fn multi(part: &Part) -> &MultiPart {
        match part {
            Part::Multi(multi) => multi,
            Part::Single(_) => panic!("expected a multipart"),
        }
    }

    #[test]
    fn body_only() {
        let part = MessageContent::new().plain("hello").into_part();
        assert!(matches!(part, Part::Single(_)));
        assert!(matches!(MessageContent::new().into_part(), Part::Single(_)));
    }

    #[test]
    fn views_and_attachments() {
        let logo = Attachment::new_inline(String::from("logo"))
            .body(vec![1, 2, 3], ContentType::parse("image/png").unwrap());
        let part = MessageContent::new()
            .plain("hello")
            .alternate_view(AlternateView::html("<img src=\"cid:logo\">").linked_resource(logo))
            .attachment(
                Attachment::new(String::from("a.txt"))
                    .body(String::from("a"), ContentType::parse("text/plain").unwrap()),
            )
            .into_part();

        let mixed = multi(&part);
        assert_eq!(mixed.kind(), MultiPartKind::Mixed);
        assert_eq!(mixed.parts().len(), 2);

        let alternative = multi(&mixed.parts()[0]);
        assert_eq!(alternative.kind(), MultiPartKind::Alternative);
        assert!(matches!(alternative.parts()[0], Part::Single(_)));

        let related = multi(&alternative.parts()[1]);
        assert_eq!(related.kind(), MultiPartKind::Related);
        assert_eq!(related.parts().len(), 2);
    }

    #[test]
    fn attachments_without_body() {
        let part = MessageContent::new()
            .attachment(SinglePart::plain("a"))
            .into_part();
        let mixed = multi(&part);
        assert_eq!(mixed.parts().len(), 1);
    }
}
