use std::fmt::{self, Debug};

#[cfg(feature = "native-tls")]
use native_tls::{Protocol, TlsConnector};

#[cfg(feature = "native-tls")]
use crate::transport::smtp::error::{self, Error};

/// TLS protocol versions.
#[derive(Debug, Copy, Clone, Default)]
#[non_exhaustive]
#[cfg(feature = "native-tls")]
pub enum TlsVersion {
    /// TLS 1.0
    ///
    /// Should only be used when trying to support legacy
    /// SMTP servers that haven't updated to
    /// at least TLS 1.2 yet.
    Tlsv10,
    /// TLS 1.1
    Tlsv11,
    /// TLS 1.2
    ///
    /// A good option for most SMTP servers.
    #[default]
    Tlsv12,
}

#[cfg(feature = "native-tls")]
impl From<TlsVersion> for Protocol {
    fn from(version: TlsVersion) -> Self {
        match version {
            TlsVersion::Tlsv10 => Protocol::Tlsv10,
            TlsVersion::Tlsv11 => Protocol::Tlsv11,
            TlsVersion::Tlsv12 => Protocol::Tlsv12,
        }
    }
}

/// Specifies how to establish a TLS connection
///
/// Use [`Tls::Wrapper`] or [`Tls::Required`] when connecting to a remote
/// server, [`Tls::None`] when connecting to a local server.
#[derive(Clone)]
#[allow(missing_copy_implementations)]
pub enum Tls {
    /// Insecure (plaintext) connection only.
    ///
    /// Should only be used for trusted local relays, credentials and
    /// messages are sent in the clear.
    None,
    /// Begin with a plaintext connection and use `STARTTLS` if advertised.
    ///
    /// A man in the middle can strip the `STARTTLS` keyword and keep the
    /// session in plaintext.
    #[cfg(feature = "native-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
    Opportunistic(TlsParameters),
    /// Begin with a plaintext connection and require `STARTTLS`.
    ///
    /// The session fails before sending credentials or messages if the
    /// server does not advertise `STARTTLS`.
    #[cfg(feature = "native-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
    Required(TlsParameters),
    /// Establish a connection wrapped in TLS from the start.
    #[cfg(feature = "native-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
    Wrapper(TlsParameters),
}

impl Debug for Tls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            Self::None => f.pad("None"),
            #[cfg(feature = "native-tls")]
            Self::Opportunistic(_) => f.pad("Opportunistic"),
            #[cfg(feature = "native-tls")]
            Self::Required(_) => f.pad("Required"),
            #[cfg(feature = "native-tls")]
            Self::Wrapper(_) => f.pad("Wrapper"),
        }
    }
}

/// Parameters to use for secure clients
#[derive(Clone)]
#[cfg(feature = "native-tls")]
pub struct TlsParameters {
    pub(crate) connector: TlsConnector,
    /// The domain name which is expected in the TLS certificate from the server
    pub(super) domain: String,
}

#[cfg(feature = "native-tls")]
impl TlsParameters {
    /// Creates a new `TlsParameters` using native-tls with the provided domain
    pub fn new(domain: String) -> Result<Self, Error> {
        TlsParametersBuilder::new(domain).build()
    }

    /// Creates a new `TlsParameters` builder
    pub fn builder(domain: String) -> TlsParametersBuilder {
        TlsParametersBuilder::new(domain)
    }

    /// The domain name which is expected in the TLS certificate from the server
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[cfg(feature = "native-tls")]
impl Debug for TlsParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsParameters")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Builder for `TlsParameters`
#[derive(Debug, Clone)]
#[cfg(feature = "native-tls")]
pub struct TlsParametersBuilder {
    domain: String,
    root_certs: Vec<Certificate>,
    accept_invalid_hostnames: bool,
    accept_invalid_certs: bool,
    min_tls_version: TlsVersion,
}

#[cfg(feature = "native-tls")]
impl TlsParametersBuilder {
    /// Creates a new builder for `TlsParameters`
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            root_certs: Vec::new(),
            accept_invalid_hostnames: false,
            accept_invalid_certs: false,
            min_tls_version: TlsVersion::default(),
        }
    }

    /// Add a custom root certificate
    ///
    /// Can be used to safely connect to a server using a self-signed certificate, for example.
    pub fn add_root_certificate(mut self, cert: Certificate) -> Self {
        self.root_certs.push(cert);
        self
    }

    /// Controls whether certificates with an invalid hostname are accepted
    ///
    /// Defaults to `false`.
    ///
    /// # Warning
    ///
    /// You should think very carefully before using this method.
    /// If hostname verification is disabled *any* valid certificate,
    /// including those from other sites, are trusted.
    pub fn dangerous_accept_invalid_hostnames(mut self, accept_invalid_hostnames: bool) -> Self {
        self.accept_invalid_hostnames = accept_invalid_hostnames;
        self
    }

    /// Controls which minimum TLS version is allowed
    ///
    /// Defaults to [`Tlsv12`][TlsVersion::Tlsv12].
    pub fn set_min_tls_version(mut self, min_tls_version: TlsVersion) -> Self {
        self.min_tls_version = min_tls_version;
        self
    }

    /// Controls whether invalid certificates are accepted
    ///
    /// Defaults to `false`.
    ///
    /// # Warning
    ///
    /// You should think very carefully before using this method.
    /// If certificate verification is disabled, *any* certificate is
    /// trusted for use, including expired and self-signed ones.
    pub fn dangerous_accept_invalid_certs(mut self, accept_invalid_certs: bool) -> Self {
        self.accept_invalid_certs = accept_invalid_certs;
        self
    }

    /// Creates a new `TlsParameters` using native-tls with the provided configuration
    pub fn build(self) -> Result<TlsParameters, Error> {
        let mut tls_builder = TlsConnector::builder();

        for cert in self.root_certs {
            tls_builder.add_root_certificate(cert.0);
        }
        tls_builder.danger_accept_invalid_hostnames(self.accept_invalid_hostnames);
        tls_builder.danger_accept_invalid_certs(self.accept_invalid_certs);
        tls_builder.min_protocol_version(Some(self.min_tls_version.into()));

        let connector = tls_builder.build().map_err(error::tls)?;
        Ok(TlsParameters {
            connector,
            domain: self.domain,
        })
    }
}

/// A certificate that can be used with [`TlsParametersBuilder::add_root_certificate`]
#[derive(Clone)]
#[cfg(feature = "native-tls")]
pub struct Certificate(native_tls::Certificate);

#[cfg(feature = "native-tls")]
impl Certificate {
    /// Create a `Certificate` from a DER encoded certificate
    pub fn from_der(der: Vec<u8>) -> Result<Self, Error> {
        Ok(Self(
            native_tls::Certificate::from_der(&der).map_err(error::tls)?,
        ))
    }

    /// Create a `Certificate` from a PEM encoded certificate
    pub fn from_pem(pem: &[u8]) -> Result<Self, Error> {
        Ok(Self(
            native_tls::Certificate::from_pem(pem).map_err(error::tls)?,
        ))
    }
}

#[cfg(feature = "native-tls")]
impl Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate").finish_non_exhaustive()
    }
}
