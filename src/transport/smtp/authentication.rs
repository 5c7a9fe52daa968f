//! Provides limited SASL authentication mechanisms
//!
//! Authentication goes through a list of [`Authenticator`]s, tried in order
//! against the mechanisms the server advertises. `PLAIN`, `LOGIN` and `XOAUTH2`
//! are built in through [`Mechanism`]; other mechanisms plug in by
//! implementing the trait.

use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use crate::transport::smtp::error::{self, Error};

/// Accepted authentication mechanisms
///
/// Trying LOGIN last as it is deprecated.
pub const DEFAULT_MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// Contains user credentials
#[derive(PartialEq, Eq, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Credentials {
    authentication_identity: String,
    secret: String,
}

impl Credentials {
    /// Create a `Credentials` struct from username and password
    pub fn new(username: String, password: String) -> Credentials {
        Credentials {
            authentication_identity: username,
            secret: password,
        }
    }

    pub fn username(&self) -> &str {
        &self.authentication_identity
    }

    pub fn password(&self) -> &str {
        &self.secret
    }
}

impl<S, T> From<(S, T)> for Credentials
where
    S: Into<String>,
    T: Into<String>,
{
    fn from((username, password): (S, T)) -> Self {
        Credentials::new(username.into(), password.into())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish()
    }
}

/// Represents authentication mechanisms
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Mechanism {
    /// PLAIN authentication mechanism, defined in
    /// [RFC 4616](https://tools.ietf.org/html/rfc4616)
    Plain,
    /// LOGIN authentication mechanism
    /// Obsolete but needed for some providers (like office365)
    ///
    /// Defined in [draft-murchison-sasl-login-00](https://www.ietf.org/archive/id/draft-murchison-sasl-login-00.txt).
    Login,
    /// Non-standard XOAUTH2 mechanism, defined in
    /// [xoauth2-protocol](https://developers.google.com/gmail/imap/xoauth2-protocol)
    Xoauth2,
    /// Kerberos, [RFC 4752](https://tools.ietf.org/html/rfc4752)
    ///
    /// Needs a custom [`Authenticator`].
    Gssapi,
    /// Windows challenge/response authentication
    ///
    /// Needs a custom [`Authenticator`]. Never tried after `GSSAPI`.
    Ntlm,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mechanism::Plain => "PLAIN",
            Mechanism::Login => "LOGIN",
            Mechanism::Xoauth2 => "XOAUTH2",
            Mechanism::Gssapi => "GSSAPI",
            Mechanism::Ntlm => "NTLM",
        })
    }
}

impl Mechanism {
    /// Parses an advertised mechanism name
    pub fn from_name(name: &str) -> Option<Mechanism> {
        [
            Mechanism::Plain,
            Mechanism::Login,
            Mechanism::Xoauth2,
            Mechanism::Gssapi,
            Mechanism::Ntlm,
        ]
        .into_iter()
        .find(|mechanism| name.eq_ignore_ascii_case(&mechanism.to_string()))
    }

    /// Does the mechanism supports initial response
    pub fn supports_initial_response(self) -> bool {
        match self {
            Mechanism::Plain | Mechanism::Xoauth2 => true,
            Mechanism::Login | Mechanism::Gssapi | Mechanism::Ntlm => false,
        }
    }

    /// Returns the string to send to the server, using the provided username, password and
    /// challenge in some cases
    pub fn response(
        self,
        credentials: &Credentials,
        challenge: Option<&str>,
    ) -> Result<String, Error> {
        match self {
            Mechanism::Plain => match challenge {
                Some(_) => Err(error::client("This mechanism does not expect a challenge")),
                None => Ok(format!(
                    "\u{0}{}\u{0}{}",
                    credentials.authentication_identity, credentials.secret
                )),
            },
            Mechanism::Login => {
                let decoded_challenge = challenge
                    .ok_or_else(|| error::client("This mechanism does expect a challenge"))?;

                if ["User Name", "Username:", "Username"].contains(&decoded_challenge) {
                    return Ok(credentials.authentication_identity.clone());
                }

                if ["Password", "Password:"].contains(&decoded_challenge) {
                    return Ok(credentials.secret.clone());
                }

                Err(error::client("Unrecognized challenge"))
            }
            Mechanism::Xoauth2 => match challenge {
                Some(_) => Err(error::client("This mechanism does not expect a challenge")),
                None => Ok(format!(
                    "user={}\x01auth=Bearer {}\x01\x01",
                    credentials.authentication_identity, credentials.secret
                )),
            },
            Mechanism::Gssapi | Mechanism::Ntlm => Err(error::client(format!(
                "{self} needs a custom authenticator"
            ))),
        }
    }
}

/// One authentication module, run as a challenge/response exchange
///
/// Challenges and responses are raw bytes, binary for mechanisms such as
/// `GSSAPI` or `NTLM`. The connection takes care of the base64 framing.
pub trait Authenticator: Send + Sync {
    /// Mechanism name sent with `AUTH`
    fn mechanism(&self) -> Mechanism;

    /// Whether the module is skipped when no credentials are configured
    fn requires_credentials(&self) -> bool {
        true
    }

    /// Response sent along with the `AUTH` command, `None` to wait for a challenge
    fn initial_response(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<Option<Vec<u8>>, Error>;

    /// Answers a decoded server challenge
    fn respond(
        &self,
        credentials: Option<&Credentials>,
        challenge: &[u8],
    ) -> Result<Vec<u8>, Error>;
}

fn required(credentials: Option<&Credentials>) -> Result<&Credentials, Error> {
    credentials.ok_or_else(|| error::client("Missing credentials"))
}

impl Authenticator for Mechanism {
    fn mechanism(&self) -> Mechanism {
        *self
    }

    fn initial_response(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<Option<Vec<u8>>, Error> {
        if self.supports_initial_response() {
            self.response(required(credentials)?, None)
                .map(|response| Some(response.into_bytes()))
        } else {
            Ok(None)
        }
    }

    fn respond(
        &self,
        credentials: Option<&Credentials>,
        challenge: &[u8],
    ) -> Result<Vec<u8>, Error> {
        // the built-in mechanisms only exchange text
        let challenge = std::str::from_utf8(challenge).map_err(error::response)?;
        self.response(required(credentials)?, Some(challenge))
            .map(String::into_bytes)
    }
}

/// Shared, ordered list of authentication modules
pub type Authenticators = Vec<Arc<dyn Authenticator>>;

/// Authenticators for the given built-in mechanisms, in order
pub fn authenticators(mechanisms: &[Mechanism]) -> Authenticators {
    mechanisms
        .iter()
        .map(|mechanism| Arc::new(*mechanism) as Arc<dyn Authenticator>)
        .collect()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_plain() {
        let mechanism = Mechanism::Plain;

        let credentials = Credentials::new("username".to_owned(), "password".to_owned());

        assert_eq!(
            mechanism.response(&credentials, None).unwrap(),
            "\u{0}username\u{0}password"
        );
        assert!(mechanism.response(&credentials, Some("test")).is_err());
    }

    #[test]
    fn test_login() {
        let mechanism = Mechanism::Login;

        let credentials = Credentials::new("alice".to_owned(), "wonderland".to_owned());

        assert_eq!(
            mechanism.response(&credentials, Some("Username")).unwrap(),
            "alice"
        );
        assert_eq!(
            mechanism.response(&credentials, Some("Password")).unwrap(),
            "wonderland"
        );
        assert!(mechanism.response(&credentials, None).is_err());
    }

    #[test]
    fn test_xoauth2() {
        let mechanism = Mechanism::Xoauth2;

        let credentials = Credentials::new(
            "username".to_owned(),
            "vF9dft4qmTc2Nvb3RlckBhdHRhdmlzdGEuY29tCg==".to_owned(),
        );

        assert_eq!(
            mechanism.response(&credentials, None).unwrap(),
            "user=username\x01auth=Bearer vF9dft4qmTc2Nvb3RlckBhdHRhdmlzdGEuY29tCg==\x01\x01"
        );
        assert!(mechanism.response(&credentials, Some("test")).is_err());
    }

    #[test]
    fn test_from_user_pass_for_credentials() {
        assert_eq!(
            Credentials::new("alice".to_owned(), "wonderland".to_owned()),
            Credentials::from(("alice", "wonderland"))
        );
    }

    #[test]
    fn mechanism_names() {
        assert_eq!(Mechanism::from_name("plain"), Some(Mechanism::Plain));
        assert_eq!(Mechanism::from_name("NTLM"), Some(Mechanism::Ntlm));
        assert_eq!(Mechanism::from_name("CRAM-MD5"), None);
    }

    #[test]
    fn builtin_authenticators() {
        let credentials = Credentials::from(("alice", "wonderland"));
        let list = authenticators(DEFAULT_MECHANISMS);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].mechanism(), Mechanism::Plain);
        assert_eq!(
            list[0].initial_response(Some(&credentials)).unwrap().as_deref(),
            Some(&b"\0alice\0wonderland"[..])
        );
        assert_eq!(list[1].initial_response(Some(&credentials)).unwrap(), None);
        assert!(list[0].initial_response(None).is_err());
        assert!(Mechanism::Gssapi.initial_response(Some(&credentials)).is_ok());
        assert!(Mechanism::Gssapi.respond(Some(&credentials), b"").is_err());
        assert_eq!(
            list[1].respond(Some(&credentials), b"Password:").unwrap(),
            b"wonderland"
        );
        assert!(list[1].respond(Some(&credentials), &[0xff, 0x00]).is_err());
    }
}
