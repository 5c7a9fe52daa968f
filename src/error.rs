//! Errors building or formatting a message

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    io,
};

use crate::address::AddressError;

/// Error building a message or its envelope
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// No sender for the envelope
    MissingFrom,
    /// No recipient for the envelope
    MissingTo,
    /// More than one `From` mailbox and no `Sender`
    TooManyFrom,
    /// Invalid address
    Address(AddressError),
    /// Writing the message failed
    Io(io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingFrom => f.write_str("missing source address, invalid envelope"),
            Error::MissingTo => f.write_str("missing destination address, invalid envelope"),
            Error::TooManyFrom => f.write_str("there can only be one source address"),
            Error::Address(e) => write!(f, "invalid address: {e}"),
            Error::Io(e) => Display::fmt(e, f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Address(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AddressError> for Error {
    fn from(err: AddressError) -> Error {
        Error::Address(err)
    }
}
