//! Mailbox addresses as used in the SMTP envelope

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    net::IpAddr,
    str::FromStr,
};

use email_address::EmailAddress;
use idna::domain_to_ascii;

/// An address of the form `user@domain`
///
/// The domain may be internationalized or an IP literal in brackets. Only the
/// `local@domain` shape is checked, display names and comments belong to
/// [`Mailbox`](crate::message::Mailbox).
///
/// ```
/// use relaymail::Address;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let address: Address = "postmaster@example.org".parse()?;
/// assert_eq!(address.user(), "postmaster");
/// assert_eq!(address.domain(), "example.org");
/// assert_eq!(address, Address::new("postmaster", "example.org")?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Address {
    serialized: String,
    /// Position of the separating `@`
    at: usize,
}

impl Address {
    /// Builds an address from its two halves, checking both
    pub fn new(user: impl AsRef<str>, domain: impl AsRef<str>) -> Result<Self, AddressError> {
        let (user, domain) = (user.as_ref(), domain.as_ref());
        check_user(user)?;
        check_domain(domain)?;
        Ok(Self {
            serialized: format!("{user}@{domain}"),
            at: user.len(),
        })
    }

    /// The part before the `@`
    pub fn user(&self) -> &str {
        &self.serialized[..self.at]
    }

    /// The part after the `@`
    pub fn domain(&self) -> &str {
        &self.serialized[self.at + 1..]
    }

    /// Whether the address can be sent without the `SMTPUTF8` extension
    pub fn is_ascii(&self) -> bool {
        self.serialized.is_ascii()
    }
}

fn check_user(user: &str) -> Result<(), AddressError> {
    if EmailAddress::is_valid_local_part(user) {
        Ok(())
    } else {
        Err(AddressError::InvalidUser)
    }
}

fn check_domain(domain: &str) -> Result<(), AddressError> {
    if is_valid_ascii_domain(domain) {
        return Ok(());
    }
    match domain_to_ascii(domain) {
        Ok(ascii) if is_valid_ascii_domain(&ascii) => Ok(()),
        _ => Err(AddressError::InvalidDomain),
    }
}

fn is_valid_ascii_domain(domain: &str) -> bool {
    if EmailAddress::is_valid_domain(domain) {
        return true;
    }
    let literal = domain
        .strip_prefix('[')
        .and_then(|ip| ip.strip_suffix(']'))
        .unwrap_or(domain);
    literal.parse::<IpAddr>().is_ok()
}

fn split_address(val: &str) -> Result<usize, AddressError> {
    let (user, domain) = val.rsplit_once('@').ok_or(AddressError::MissingParts)?;
    if user.is_empty() || domain.is_empty() {
        return Err(AddressError::MissingParts);
    }
    check_user(user)?;
    check_domain(domain)?;
    Ok(user.len())
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(val: &str) -> Result<Self, Self::Err> {
        val.to_owned().try_into()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(serialized: String) -> Result<Self, Self::Error> {
        let at = split_address(&serialized)?;
        Ok(Self { serialized, at })
    }
}

impl From<Address> for String {
    fn from(address: Address) -> String {
        address.serialized
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.serialized
    }
}

/// Invalid address
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum AddressError {
    /// No `@`, or nothing on one side of it
    MissingParts,
    /// Unbalanced angle bracket in a mailbox
    Unbalanced,
    /// Invalid local part
    InvalidUser,
    /// Invalid domain or address literal
    InvalidDomain,
    /// Unparsable mailbox
    InvalidInput,
}

impl Error for AddressError {}

impl Display for AddressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressError::MissingParts => "missing domain or user",
            AddressError::Unbalanced => "unbalanced angle bracket",
            AddressError::InvalidUser => "invalid email user",
            AddressError::InvalidDomain => "invalid email domain",
            AddressError::InvalidInput => "invalid input",
        })
    }
}
