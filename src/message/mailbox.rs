use std::{
    fmt::{self, Display, Formatter, Write},
    slice::Iter,
    str::FromStr,
    vec::IntoIter,
};

use crate::address::{Address, AddressError};

/// An address with an optional display name, `Name <user@domain>`
///
/// ```
/// use relaymail::message::Mailbox;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mailbox: Mailbox = "\"Smith, John\" <john@example.com>".parse()?;
/// assert_eq!(mailbox.name.as_deref(), Some("Smith, John"));
/// assert_eq!(mailbox.to_string(), "\"Smith, John\" <john@example.com>");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mailbox {
    pub name: Option<String>,
    pub email: Address,
}

impl Mailbox {
    pub fn new(name: Option<String>, email: Address) -> Self {
        Mailbox { name, email }
    }

    /// Same mailbox with the display name passed through `f`
    pub(crate) fn recode_name<F: Fn(&str) -> String>(&self, f: F) -> Self {
        Mailbox::new(self.name.as_deref().map(f), self.email.clone())
    }
}

/// Characters that force a display name into a quoted string
fn needs_quoting(name: &str) -> bool {
    name.chars()
        .any(|c| matches!(c, '(' | ')' | '<' | '>' | '[' | ']' | ':' | ';' | '@' | '\\' | ',' | '.' | '"'))
        || name.starts_with(' ')
        || name.ends_with(' ')
}

impl Display for Mailbox {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => {
                if needs_quoting(name) {
                    f.write_char('"')?;
                    for c in name.chars() {
                        if c == '"' || c == '\\' {
                            f.write_char('\\')?;
                        }
                        f.write_char(c)?;
                    }
                    f.write_char('"')?;
                } else {
                    f.write_str(name)?;
                }
                write!(f, " <{}>", self.email)
            }
            _ => Display::fmt(&self.email, f),
        }
    }
}

fn unquote(name: &str) -> Result<String, AddressError> {
    let Some(inner) = name.strip_prefix('"') else {
        return Ok(name.to_owned());
    };
    let inner = inner.strip_suffix('"').ok_or(AddressError::InvalidInput)?;
    let mut unquoted = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            unquoted.extend(chars.next());
        } else {
            unquoted.push(c);
        }
    }
    Ok(unquoted)
}

impl FromStr for Mailbox {
    type Err = AddressError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let src = src.trim();
        match (src.rfind('<'), src.ends_with('>')) {
            (Some(open), true) => {
                let name = src[..open].trim();
                let email = src[open + 1..src.len() - 1].trim().parse()?;
                let name = if name.is_empty() {
                    None
                } else {
                    Some(unquote(name)?)
                };
                Ok(Mailbox::new(name, email))
            }
            (None, false) => Ok(Mailbox::new(None, src.parse()?)),
            _ => Err(AddressError::Unbalanced),
        }
    }
}

impl From<Address> for Mailbox {
    fn from(email: Address) -> Self {
        Mailbox::new(None, email)
    }
}

impl<S: Into<String>, T: Into<String>> TryFrom<(S, T)> for Mailbox {
    type Error = AddressError;

    fn try_from((name, email): (S, T)) -> Result<Self, Self::Error> {
        Ok(Mailbox::new(Some(name.into()), email.into().try_into()?))
    }
}

/// A comma separated list of [`Mailbox`]
#[derive(Debug, Clone, Default, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mailboxes(Vec<Mailbox>);

impl Mailboxes {
    pub fn new() -> Self {
        Mailboxes(Vec::new())
    }

    pub fn with(mut self, mailbox: Mailbox) -> Self {
        self.0.push(mailbox);
        self
    }

    pub fn push(&mut self, mailbox: Mailbox) {
        self.0.push(mailbox);
    }

    pub fn extend(&mut self, other: Mailboxes) {
        self.0.extend(other.0);
    }

    pub(crate) fn recode_names<F: Fn(&str) -> String>(&self, f: F) -> Self {
        Mailboxes(self.0.iter().map(|mailbox| mailbox.recode_name(&f)).collect())
    }

    pub fn iter(&self) -> Iter<'_, Mailbox> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The only mailbox of the list
    pub fn into_single(self) -> Option<Mailbox> {
        let mut iter = self.0.into_iter();
        match (iter.next(), iter.next()) {
            (Some(mailbox), None) => Some(mailbox),
            _ => None,
        }
    }
}

impl From<Mailbox> for Mailboxes {
    fn from(mailbox: Mailbox) -> Self {
        Mailboxes(vec![mailbox])
    }
}

impl From<Vec<Mailbox>> for Mailboxes {
    fn from(mailboxes: Vec<Mailbox>) -> Self {
        Mailboxes(mailboxes)
    }
}

impl From<Mailboxes> for Vec<Mailbox> {
    fn from(mailboxes: Mailboxes) -> Self {
        mailboxes.0
    }
}

impl IntoIterator for Mailboxes {
    type Item = Mailbox;
    type IntoIter = IntoIter<Mailbox>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Extend<Mailbox> for Mailboxes {
    fn extend<I: IntoIterator<Item = Mailbox>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl Display for Mailboxes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, mailbox) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            Display::fmt(mailbox, f)?;
        }
        Ok(())
    }
}

impl FromStr for Mailboxes {
    type Err = AddressError;

    /// Splits on commas outside of quoted strings and angle brackets
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let mut mailboxes = Vec::new();
        let (mut quoted, mut escaped, mut angle) = (false, false, false);
        let mut start = 0;
        for (i, c) in src.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' if quoted => escaped = true,
                '"' => quoted = !quoted,
                '<' if !quoted => angle = true,
                '>' if !quoted => angle = false,
                ',' if !quoted && !angle => {
                    mailboxes.push(src[start..i].parse()?);
                    start = i + 1;
                }
                _ => {}
            }
        }
        if quoted || angle {
            return Err(AddressError::Unbalanced);
        }
        let last = src[start..].trim();
        if !last.is_empty() || mailboxes.is_empty() {
            mailboxes.push(last.parse()?);
        }
        Ok(Mailboxes(mailboxes))
    }
}
