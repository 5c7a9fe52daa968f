//! SMTP commands
//!
//! Every command knows which reply codes mean success, which ones are an
//! expected refusal the session can recover from, and treats anything else
//! as fatal.

use std::fmt::{self, Display, Formatter};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    address::Address,
    transport::smtp::{
        authentication::Mechanism,
        error::{self, Error},
        extension::{ClientId, MailParameter, RcptParameter},
        response::Response,
    },
};

/// How a reply to a command is handled
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// A refusal the session handles, like a rejected recipient
    Rejected,
    Fatal,
}

/// Reply codes expected for a command
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReplyTable {
    pub success: &'static [u16],
    pub rejected: &'static [u16],
}

impl ReplyTable {
    pub fn classify(&self, response: &Response) -> Outcome {
        let code = u16::from(response.code());
        if self.success.contains(&code) {
            Outcome::Success
        } else if self.rejected.contains(&code) {
            Outcome::Rejected
        } else {
            Outcome::Fatal
        }
    }

    /// Turns a fatal reply into an error, other replies are returned
    pub fn check(&self, response: Response) -> Result<(Outcome, Response), Error> {
        match self.classify(&response) {
            Outcome::Fatal => Err(error::code(&response)),
            outcome => Ok((outcome, response)),
        }
    }
}

/// A request with its reply table
pub trait SmtpCommand {
    const REPLY: ReplyTable;
    /// Kept out of logs
    const SENSITIVE: bool = false;
}

/// Server greeting, read before anything is sent
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Greeting;

impl SmtpCommand for Greeting {
    const REPLY: ReplyTable = ReplyTable {
        success: &[220],
        rejected: &[],
    };
}

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ehlo {
    client_id: ClientId,
}

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EHLO {}\r\n", self.client_id)
    }
}

impl Ehlo {
    /// Creates a EHLO command
    pub fn new(client_id: ClientId) -> Ehlo {
        Ehlo { client_id }
    }
}

impl SmtpCommand for Ehlo {
    // "command unrecognized" and "not implemented" trigger the HELO fallback
    const REPLY: ReplyTable = ReplyTable {
        success: &[250],
        rejected: &[500, 502],
    };
}

/// HELO command
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Helo {
    client_id: ClientId,
}

impl Display for Helo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HELO {}\r\n", self.client_id)
    }
}

impl Helo {
    /// Creates a HELO command
    pub fn new(client_id: ClientId) -> Helo {
        Helo { client_id }
    }
}

impl SmtpCommand for Helo {
    const REPLY: ReplyTable = ReplyTable {
        success: &[250],
        rejected: &[],
    };
}

/// STARTTLS command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Starttls;

impl Display for Starttls {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("STARTTLS\r\n")
    }
}

impl SmtpCommand for Starttls {
    const REPLY: ReplyTable = ReplyTable {
        success: &[220],
        rejected: &[],
    };
}

/// AUTH command, with its optional initial response
#[derive(PartialEq, Eq, Clone)]
pub struct Auth {
    mechanism: Mechanism,
    response: Option<Vec<u8>>,
}

impl Display for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AUTH {}", self.mechanism)?;
        match self.response.as_deref() {
            // an empty initial response is sent as `=`, RFC 4954
            Some([]) => f.write_str(" =")?,
            Some(response) => write!(f, " {}", STANDARD.encode(response))?,
            None => {}
        }
        f.write_str("\r\n")
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("mechanism", &self.mechanism)
            .finish_non_exhaustive()
    }
}

impl Auth {
    /// Creates an AUTH command
    pub fn new(mechanism: Mechanism, initial_response: Option<Vec<u8>>) -> Auth {
        Auth {
            mechanism,
            response: initial_response,
        }
    }

    /// Decodes the challenge of a 334 reply, which can be binary
    pub fn decode_challenge(response: &Response) -> Result<Vec<u8>, Error> {
        if !response.has_code(334) {
            return Err(error::response("Expecting a challenge"));
        }

        // an empty challenge has no text at all
        let encoded_challenge = response.first_word().unwrap_or("");
        #[cfg(feature = "tracing")]
        tracing::debug!("auth encoded challenge: {}", encoded_challenge);

        STANDARD.decode(encoded_challenge).map_err(error::response)
    }
}

impl SmtpCommand for Auth {
    // 504: mechanism not implemented, the next one is tried
    const REPLY: ReplyTable = ReplyTable {
        success: &[235, 334],
        rejected: &[504],
    };
    const SENSITIVE: bool = true;
}

/// Answer to an authentication challenge
#[derive(PartialEq, Eq, Clone)]
pub struct AuthResponse {
    response: Vec<u8>,
}

impl Display for AuthResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", STANDARD.encode(&self.response))
    }
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse").finish_non_exhaustive()
    }
}

impl AuthResponse {
    pub fn new(response: Vec<u8>) -> AuthResponse {
        AuthResponse { response }
    }
}

impl SmtpCommand for AuthResponse {
    const REPLY: ReplyTable = Auth::REPLY;
    const SENSITIVE: bool = true;
}

/// MAIL command
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mail {
    sender: Option<Address>,
    parameters: Vec<MailParameter>,
}

impl Display for Mail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAIL FROM:<{}>",
            self.sender.as_ref().map_or("", |s| s.as_ref())
        )?;
        for parameter in &self.parameters {
            write!(f, " {parameter}")?;
        }
        f.write_str("\r\n")
    }
}

impl Mail {
    /// Creates a MAIL command
    pub fn new(sender: Option<Address>, parameters: Vec<MailParameter>) -> Mail {
        Mail { sender, parameters }
    }
}

impl SmtpCommand for Mail {
    const REPLY: ReplyTable = ReplyTable {
        success: &[250],
        rejected: &[],
    };
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rcpt {
    recipient: Address,
    parameters: Vec<RcptParameter>,
}

impl Display for Rcpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RCPT TO:<{}>", self.recipient)?;
        for parameter in &self.parameters {
            write!(f, " {parameter}")?;
        }
        f.write_str("\r\n")
    }
}

impl Rcpt {
    /// Creates an RCPT command
    pub fn new(recipient: Address, parameters: Vec<RcptParameter>) -> Rcpt {
        Rcpt {
            recipient,
            parameters,
        }
    }

    pub fn recipient(&self) -> &Address {
        &self.recipient
    }
}

impl SmtpCommand for Rcpt {
    // mailbox busy or unavailable, storage exceeded, bad mailbox name
    const REPLY: ReplyTable = ReplyTable {
        success: &[250, 251],
        rejected: &[450, 452, 550, 551, 552, 553],
    };
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Data;

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

impl SmtpCommand for Data {
    const REPLY: ReplyTable = ReplyTable {
        success: &[354],
        rejected: &[],
    };
}

/// End of the message content, a line with a single dot
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct DataEnd;

impl Display for DataEnd {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(".\r\n")
    }
}

impl SmtpCommand for DataEnd {
    const REPLY: ReplyTable = ReplyTable {
        success: &[250],
        rejected: &[],
    };
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quit;

impl Display for Quit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}

impl SmtpCommand for Quit {
    const REPLY: ReplyTable = ReplyTable {
        success: &[221],
        rejected: &[],
    };
}

/// NOOP command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Noop;

impl Display for Noop {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("NOOP\r\n")
    }
}

impl SmtpCommand for Noop {
    const REPLY: ReplyTable = ReplyTable {
        success: &[250],
        rejected: &[],
    };
}

/// RSET command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rset;

impl Display for Rset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("RSET\r\n")
    }
}

impl SmtpCommand for Rset {
    const REPLY: ReplyTable = ReplyTable {
        success: &[250],
        rejected: &[],
    };
}
