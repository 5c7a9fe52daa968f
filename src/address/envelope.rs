use super::Address;
#[cfg(feature = "builder")]
use crate::message::{
    header::{self, Headers},
    Mailboxes,
};
use crate::Error;

/// SMTP envelope: the reverse path given to `MAIL FROM` and the forward
/// paths given to `RCPT TO`
///
/// It is independent from the message headers. `Bcc` recipients only ever
/// appear here.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    /// Never empty
    forward_path: Vec<Address>,
    /// `None` sends a null reverse path, `MAIL FROM:<>`
    reverse_path: Option<Address>,
}

impl Envelope {
    /// Creates an envelope, failing when there is no recipient
    ///
    /// ```
    /// use relaymail::{address::Envelope, Address};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let envelope = Envelope::new(
    ///     Some("bounces@example.org".parse()?),
    ///     vec!["alice@example.com".parse()?, "bob@example.com".parse()?],
    /// )?;
    /// assert_eq!(envelope.to().len(), 2);
    /// assert!(Envelope::new(None, vec![]).is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(from: Option<Address>, to: Vec<Address>) -> Result<Envelope, Error> {
        if to.is_empty() {
            return Err(Error::MissingTo);
        }
        Ok(Envelope {
            forward_path: to,
            reverse_path: from,
        })
    }

    /// Recipients, in `RCPT TO` order
    pub fn to(&self) -> &[Address] {
        &self.forward_path
    }

    /// Sender, if any
    pub fn from(&self) -> Option<&Address> {
        self.reverse_path.as_ref()
    }

    /// Whether `MAIL FROM` needs the `SMTPUTF8` parameter
    pub fn has_non_ascii_addresses(&self) -> bool {
        self.reverse_path.iter().any(|a| !a.is_ascii())
            || self.forward_path.iter().any(|a| !a.is_ascii())
    }
}

#[cfg(feature = "builder")]
impl TryFrom<&Headers> for Envelope {
    type Error = Error;

    /// Collects the sender from `Sender`, falling back to a single `From`,
    /// and the recipients from `To`, `Cc` and `Bcc`
    fn try_from(headers: &Headers) -> Result<Self, Self::Error> {
        let from = match headers.get::<header::Sender>() {
            Some(header::Sender(mailbox)) => Some(mailbox.email),
            None => match headers.get::<header::From>() {
                Some(header::From(mailboxes)) => {
                    let mut mailboxes = mailboxes.into_iter();
                    match (mailboxes.next(), mailboxes.next()) {
                        (Some(mailbox), None) => Some(mailbox.email),
                        (Some(_), Some(_)) => return Err(Error::TooManyFrom),
                        (None, _) => None,
                    }
                }
                None => None,
            },
        };

        let recipients: [Option<Mailboxes>; 3] = [
            headers.get::<header::To>().map(|h| h.0),
            headers.get::<header::Cc>().map(|h| h.0),
            headers.get::<header::Bcc>().map(|h| h.0),
        ];
        let to = recipients
            .into_iter()
            .flatten()
            .flat_map(|mailboxes| mailboxes.into_iter().map(|mailbox| mailbox.email))
            .collect();

        Self::new(from, to)
    }
}
