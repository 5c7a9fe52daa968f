//! ESMTP features

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    net::{Ipv4Addr, Ipv6Addr},
    result::Result,
};

use crate::{
    address::Address,
    transport::smtp::{
        authentication::Mechanism,
        error::{self, Error},
        response::Response,
    },
};

/// Client identifier, the parameter to `EHLO`
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ClientId {
    /// A fully-qualified domain name
    Domain(String),
    /// An IPv4 address
    Ipv4(Ipv4Addr),
    /// An IPv6 address
    Ipv6(Ipv6Addr),
}

const LOCALHOST_CLIENT: ClientId = ClientId::Ipv4(Ipv4Addr::new(127, 0, 0, 1));

impl Default for ClientId {
    fn default() -> Self {
        // https://tools.ietf.org/html/rfc5321#section-4.1.4
        //
        // The SMTP client MUST, if possible, ensure that the domain parameter
        // to the EHLO command is a primary host name. If this is not possible,
        // an address literal SHOULD be substituted for the domain name.
        #[cfg(feature = "hostname")]
        {
            hostname::get()
                .ok()
                .and_then(|s| s.into_string().map(Self::Domain).ok())
                .unwrap_or(LOCALHOST_CLIENT)
        }
        #[cfg(not(feature = "hostname"))]
        LOCALHOST_CLIENT
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Domain(ref value) => f.write_str(value),
            Self::Ipv4(ref value) => write!(f, "[{value}]"),
            Self::Ipv6(ref value) => write!(f, "[IPv6:{value}]"),
        }
    }
}

/// Supported ESMTP keywords
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Extension {
    /// 8BITMIME keyword
    ///
    /// Defined in [RFC 6152](https://tools.ietf.org/html/rfc6152)
    EightBitMime,
    /// SMTPUTF8 keyword
    ///
    /// Defined in [RFC 6531](https://tools.ietf.org/html/rfc6531)
    SmtpUtfEight,
    /// STARTTLS keyword
    ///
    /// Defined in [RFC 2487](https://tools.ietf.org/html/rfc2487)
    StartTls,
    /// DSN keyword
    ///
    /// Defined in [RFC 3461](https://tools.ietf.org/html/rfc3461)
    Dsn,
    /// AUTH mechanism
    Authentication(Mechanism),
}

impl Display for Extension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Extension::EightBitMime => f.write_str("8BITMIME"),
            Extension::SmtpUtfEight => f.write_str("SMTPUTF8"),
            Extension::StartTls => f.write_str("STARTTLS"),
            Extension::Dsn => f.write_str("DSN"),
            Extension::Authentication(ref mechanism) => write!(f, "AUTH {mechanism}"),
        }
    }
}

/// Contains information about an SMTP server
#[derive(Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerInfo {
    /// Server name
    ///
    /// The name given in the server banner
    name: String,
    /// ESMTP features supported by the server
    ///
    /// It contains the features supported by the server and known by the `Extension` module.
    features: HashSet<Extension>,
    /// Maximum message size, `Some(0)` when advertised without a limit
    max_size: Option<usize>,
}

impl Display for ServerInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let features = if self.features.is_empty() {
            "no supported features".to_owned()
        } else {
            format!("{:?}", self.features)
        };
        write!(f, "{} with {}", self.name, features)
    }
}

impl ServerInfo {
    /// Parses a EHLO response to create a `ServerInfo`
    pub fn from_response(response: &Response) -> Result<ServerInfo, Error> {
        let name = match response.first_word() {
            Some(name) => name,
            None => return Err(error::response("Could not read server name")),
        };

        let mut features: HashSet<Extension> = HashSet::new();
        let mut max_size = None;

        // the first line holds the greeting, keywords start on the second one
        for line in response.message().skip(1) {
            let mut split = line.split_whitespace();
            let keyword = match split.next() {
                Some(keyword) => keyword.to_ascii_uppercase(),
                None => continue,
            };

            match keyword.as_str() {
                "8BITMIME" => {
                    features.insert(Extension::EightBitMime);
                }
                "SMTPUTF8" => {
                    features.insert(Extension::SmtpUtfEight);
                }
                "STARTTLS" => {
                    features.insert(Extension::StartTls);
                }
                "DSN" => {
                    features.insert(Extension::Dsn);
                }
                "SIZE" => {
                    max_size = Some(split.next().and_then(|s| s.parse().ok()).unwrap_or(0));
                }
                // `AUTH=LOGIN PLAIN` is sent by some older servers
                auth if auth == "AUTH" || auth.starts_with("AUTH=") => {
                    let first = auth.strip_prefix("AUTH=").filter(|m| !m.is_empty());
                    for mechanism in first.into_iter().chain(split) {
                        if let Some(mechanism) = Mechanism::from_name(mechanism) {
                            features.insert(Extension::Authentication(mechanism));
                        }
                    }
                }
                _ => (),
            };
        }

        Ok(ServerInfo {
            name: name.to_owned(),
            features,
            max_size,
        })
    }

    /// Capabilities assumed after a `HELO` fallback
    ///
    /// Servers not knowing `EHLO` can't advertise anything, only `AUTH LOGIN`
    /// is tried with them.
    pub fn helo_fallback(name: String) -> ServerInfo {
        let mut features = HashSet::new();
        features.insert(Extension::Authentication(Mechanism::Login));
        ServerInfo {
            name,
            features,
            max_size: None,
        }
    }

    /// Checks if the server supports an ESMTP feature
    pub fn supports_feature(&self, keyword: Extension) -> bool {
        self.features.contains(&keyword)
    }

    /// Checks if the server supports an ESMTP feature
    pub fn supports_auth_mechanism(&self, mechanism: Mechanism) -> bool {
        self.features
            .contains(&Extension::Authentication(mechanism))
    }

    /// Gets a compatible mechanism from list
    pub fn get_auth_mechanism(&self, mechanisms: &[Mechanism]) -> Option<Mechanism> {
        mechanisms
            .iter()
            .copied()
            .find(|mechanism| self.supports_auth_mechanism(*mechanism))
    }

    /// The advertised `SIZE` limit, if any
    pub fn max_size(&self) -> Option<usize> {
        self.max_size.filter(|size| *size > 0)
    }

    /// The name given in the server banner
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }
}

/// A `MAIL FROM` extension parameter
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MailParameter {
    /// `BODY` parameter
    Body(MailBodyParameter),
    /// `SIZE` parameter
    Size(usize),
    /// `SMTPUTF8` parameter
    SmtpUtfEight,
    /// `RET` parameter, what a delivery status notification includes
    Ret(DsnReturn),
    /// `ENVID` parameter, an identifier echoed in notifications
    EnvId(String),
    /// Custom parameter
    Other {
        /// Parameter keyword
        keyword: String,
        /// Parameter value
        value: Option<String>,
    },
}

impl Display for MailParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            MailParameter::Body(ref value) => write!(f, "BODY={value}"),
            MailParameter::Size(size) => write!(f, "SIZE={size}"),
            MailParameter::SmtpUtfEight => f.write_str("SMTPUTF8"),
            MailParameter::Ret(ref ret) => write!(f, "RET={ret}"),
            MailParameter::EnvId(ref id) => write!(f, "ENVID={}", XText(id)),
            MailParameter::Other {
                ref keyword,
                value: Some(ref value),
            } => write!(f, "{}={}", keyword, XText(value)),
            MailParameter::Other {
                ref keyword,
                value: None,
            } => f.write_str(keyword),
        }
    }
}

/// Values for the `BODY` parameter to `MAIL FROM`
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MailBodyParameter {
    /// `7BIT`
    SevenBit,
    /// `8BITMIME`
    EightBitMime,
}

impl Display for MailBodyParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            MailBodyParameter::SevenBit => f.write_str("7BIT"),
            MailBodyParameter::EightBitMime => f.write_str("8BITMIME"),
        }
    }
}

/// Values for the `RET` parameter to `MAIL FROM`
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DsnReturn {
    /// Return the full message
    Full,
    /// Return the headers only
    Headers,
}

impl Display for DsnReturn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            DsnReturn::Full => "FULL",
            DsnReturn::Headers => "HDRS",
        })
    }
}

/// Conditions for a delivery status notification, the `NOTIFY` parameter
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DsnNotify {
    /// Never notify, can't be combined with the others
    Never,
    Success,
    Failure,
    Delay,
}

impl Display for DsnNotify {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            DsnNotify::Never => "NEVER",
            DsnNotify::Success => "SUCCESS",
            DsnNotify::Failure => "FAILURE",
            DsnNotify::Delay => "DELAY",
        })
    }
}

/// A `RCPT TO` extension parameter
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RcptParameter {
    /// `NOTIFY` parameter
    Notify(Vec<DsnNotify>),
    /// `ORCPT` parameter, the original recipient
    Orcpt(Address),
    /// Custom parameter
    Other {
        /// Parameter keyword
        keyword: String,
        /// Parameter value
        value: Option<String>,
    },
}

impl Display for RcptParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            RcptParameter::Notify(ref conditions) => {
                f.write_str("NOTIFY=")?;
                if conditions.is_empty() || conditions.contains(&DsnNotify::Never) {
                    return f.write_str("NEVER");
                }
                for (i, condition) in conditions.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{condition}")?;
                }
                Ok(())
            }
            RcptParameter::Orcpt(ref address) => {
                write!(f, "ORCPT=rfc822;{}", XText(address.as_ref()))
            }
            RcptParameter::Other {
                ref keyword,
                value: Some(ref value),
            } => write!(f, "{}={}", keyword, XText(value)),
            RcptParameter::Other {
                ref keyword,
                value: None,
            } => f.write_str(keyword),
        }
    }
}

/// Delivery status notification requests
///
/// Only sent to servers advertising `DSN`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DsnOptions {
    /// What a notification carries of the message
    pub ret: Option<DsnReturn>,
    /// Envelope identifier echoed in notifications
    pub envid: Option<String>,
    /// When to notify, empty lets the server decide
    pub notify: Vec<DsnNotify>,
}

impl DsnOptions {
    pub(crate) fn mail_parameters(&self) -> Vec<MailParameter> {
        let mut parameters = Vec::new();
        if let Some(ret) = self.ret {
            parameters.push(MailParameter::Ret(ret));
        }
        if let Some(ref envid) = self.envid {
            parameters.push(MailParameter::EnvId(envid.clone()));
        }
        parameters
    }

    pub(crate) fn rcpt_parameters(&self, recipient: &Address) -> Vec<RcptParameter> {
        let mut parameters = Vec::new();
        if !self.notify.is_empty() {
            parameters.push(RcptParameter::Notify(self.notify.clone()));
        }
        parameters.push(RcptParameter::Orcpt(recipient.clone()));
        parameters
    }
}

/// Encode a string as xtext
///
/// [RFC 3461 section 4](https://tools.ietf.org/html/rfc3461#section-4)
#[derive(Debug)]
pub struct XText<'a>(pub &'a str);

impl Display for XText<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        while let Some(idx) = rest.find(|c| c < '!' || c == '+' || c == '=') {
            let (start, end) = rest.split_at(idx);
            f.write_str(start)?;
            // the matched chars are all ASCII
            write!(f, "+{:02X}", end.as_bytes()[0])?;
            rest = &end[1..];
        }
        f.write_str(rest)
    }
}
