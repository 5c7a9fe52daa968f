use std::borrow::Cow;

use url::Url;

#[cfg(feature = "native-tls")]
use super::client::{Tls, TlsParameters};
#[cfg(feature = "native-tls")]
use super::{SUBMISSIONS_PORT, SUBMISSION_PORT};
use super::{
    authentication::Credentials, error, extension::ClientId, Error, SmtpTransportBuilder,
    SMTP_PORT,
};

/// Create a new `SmtpTransportBuilder` from a connection URL
pub(crate) fn from_connection_url(connection_url: &str) -> Result<SmtpTransportBuilder, Error> {
    let connection_url = Url::parse(connection_url).map_err(error::connection)?;
    let tls: Option<String> = connection_url
        .query_pairs()
        .find(|(k, _)| k == "tls")
        .map(|(_, v)| v.to_string());

    let host = connection_url
        .host_str()
        .ok_or_else(|| error::connection("smtp host undefined"))?;

    let mut builder = SmtpTransportBuilder::new(host);

    match (connection_url.scheme(), tls.as_deref()) {
        ("smtp", None) => {
            builder = builder.port(connection_url.port().unwrap_or(SMTP_PORT));
        }
        #[cfg(feature = "native-tls")]
        ("smtp", Some("required")) => {
            builder = builder
                .port(connection_url.port().unwrap_or(SUBMISSION_PORT))
                .tls(Tls::Required(TlsParameters::new(host.into())?));
        }
        #[cfg(feature = "native-tls")]
        ("smtp", Some("opportunistic")) => {
            builder = builder
                .port(connection_url.port().unwrap_or(SUBMISSION_PORT))
                .tls(Tls::Opportunistic(TlsParameters::new(host.into())?));
        }
        #[cfg(feature = "native-tls")]
        ("smtps", _) => {
            builder = builder
                .port(connection_url.port().unwrap_or(SUBMISSIONS_PORT))
                .tls(Tls::Wrapper(TlsParameters::new(host.into())?));
        }
        (scheme, tls) => {
            return Err(error::connection(format!(
                "Unknown scheme '{scheme}' or tls parameter '{tls:?}', note that a transport with TLS requires the native-tls feature"
            )))
        }
    }

    // use the path segment of the URL as name in the HELO / EHLO command
    if connection_url.path().len() > 1 {
        let name = connection_url.path().trim_matches('/').to_owned();
        builder = builder.hello_name(ClientId::Domain(name));
    }

    if let Some(password) = connection_url.password() {
        let percent_decode = |s: &str| {
            percent_encoding::percent_decode_str(s)
                .decode_utf8()
                .map(Cow::into_owned)
                .map_err(error::connection)
        };
        let credentials = Credentials::new(
            percent_decode(connection_url.username())?,
            percent_decode(password)?,
        );
        builder = builder.credentials(credentials);
    }

    Ok(builder)
}
