use std::{
    fmt::{self, Display},
    io::{self, Read, Write},
    mem,
    net::{Shutdown, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};

#[cfg(feature = "tracing")]
use super::escape_crlf;
#[cfg(feature = "native-tls")]
use super::TlsParameters;
use super::{DataStream, NetworkStream, SessionState};
use crate::{
    address::Envelope,
    encoder::LineBuffer,
    transport::smtp::{
        authentication::{Authenticator, Credentials, Mechanism},
        commands::{
            Auth, AuthResponse, Data, DataEnd, Ehlo, Greeting, Helo, Mail, Noop, Outcome, Quit,
            Rcpt, Rset, SmtpCommand,
        },
        error::{self, Error, FailedRecipient},
        extension::{ClientId, DsnOptions, Extension, MailBodyParameter, MailParameter, ServerInfo},
        response::{ReadMode, ReplyReader, Response},
    },
};
#[cfg(feature = "native-tls")]
use crate::transport::smtp::commands::Starttls;

/// Maximum number of `334` challenges accepted during one authentication
const MAX_CHALLENGES: u8 = 10;

const READ_BUFFER_SIZE: usize = 4096;

/// Returns the error after aborting the session
macro_rules! try_smtp (
    ($err: expr, $client: ident) => ({
        match $err {
            Ok(val) => val,
            Err(err) => return Err($client.fail(err)),
        }
    })
);

/// Structure that implements the SMTP client
///
/// Every fatal error tears the session down without `QUIT`, later calls fail.
pub struct SmtpConnection {
    /// TCP stream between client and server
    stream: NetworkStream,
    /// Bytes read from the stream, `start..end` not consumed yet
    read_buf: Box<[u8]>,
    start: usize,
    end: usize,
    state: SessionState,
    /// Information about the server
    server_info: ServerInfo,
    dsn: Option<DsnOptions>,
    /// Recipients refused in the current transaction
    failed: Vec<FailedRecipient>,
    /// Set by the first timeout, makes every later error a timeout
    timed_out: bool,
}

impl fmt::Debug for SmtpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConnection")
            .field("stream", &self.stream)
            .field("state", &self.state)
            .field("server_info", &self.server_info)
            .finish_non_exhaustive()
    }
}

impl SmtpConnection {
    /// Get information about the server
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether an I/O timeout hit this session
    pub fn has_timed_out(&self) -> bool {
        self.timed_out
    }

    /// Delivery status notification requests for the next transactions
    pub fn set_dsn(&mut self, dsn: Option<DsnOptions>) {
        self.dsn = dsn;
    }

    /// Connects to the configured server
    ///
    /// Reads the greeting, sends EHLO and parses server information
    pub fn connect<A: ToSocketAddrs>(
        server: A,
        timeout: Option<Duration>,
        hello_name: &ClientId,
    ) -> Result<SmtpConnection, Error> {
        let stream = NetworkStream::connect(server, timeout)?;
        SmtpConnection::from_stream(stream, timeout, hello_name)
    }

    /// Connects to a server expecting TLS from the first byte
    #[cfg(feature = "native-tls")]
    pub fn connect_tls<A: ToSocketAddrs>(
        server: A,
        timeout: Option<Duration>,
        hello_name: &ClientId,
        tls_parameters: &TlsParameters,
    ) -> Result<SmtpConnection, Error> {
        let mut stream = NetworkStream::connect(server, timeout)?;
        stream.set_read_timeout(timeout).map_err(error::network)?;
        stream.set_write_timeout(timeout).map_err(error::network)?;
        stream.upgrade_tls(tls_parameters)?;
        SmtpConnection::from_stream(stream, timeout, hello_name)
    }

    /// Starts a session over an already connected stream
    pub fn from_stream(
        stream: NetworkStream,
        timeout: Option<Duration>,
        hello_name: &ClientId,
    ) -> Result<SmtpConnection, Error> {
        let mut conn = SmtpConnection {
            stream,
            read_buf: vec![0; READ_BUFFER_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
            state: SessionState::Connected,
            server_info: ServerInfo::default(),
            dsn: None,
            failed: Vec::new(),
            timed_out: false,
        };
        try_smtp!(conn.set_timeout(timeout).map_err(error::network), conn);

        conn.read_checked::<Greeting>(ReadMode::FirstLine)?;
        conn.state = SessionState::Greeted;

        conn.ehlo(hello_name)?;
        Ok(conn)
    }

    /// Send EHLO and update server info, falling back to HELO
    fn ehlo(&mut self, hello_name: &ClientId) -> Result<(), Error> {
        let (outcome, response) =
            self.command(Ehlo::new(hello_name.clone()), ReadMode::AllLines)?;
        self.server_info = match outcome {
            Outcome::Success => try_smtp!(ServerInfo::from_response(&response), self),
            Outcome::Rejected | Outcome::Fatal => {
                #[cfg(feature = "tracing")]
                tracing::debug!("EHLO refused, falling back to HELO");
                let (_, response) =
                    self.command(Helo::new(hello_name.clone()), ReadMode::FirstLine)?;
                ServerInfo::helo_fallback(response.first_word().unwrap_or_default().to_owned())
            }
        };
        self.state = SessionState::Hello;

        #[cfg(feature = "tracing")]
        tracing::debug!("server {}", self.server_info);
        Ok(())
    }

    pub fn can_starttls(&self) -> bool {
        !self.is_encrypted() && self.server_info.supports_feature(Extension::StartTls)
    }

    /// Upgrades the session with `STARTTLS`, then sends EHLO again
    ///
    /// Fails when the server doesn't advertise it, there is no fallback to
    /// plaintext.
    #[cfg(feature = "native-tls")]
    pub fn starttls(
        &mut self,
        tls_parameters: &TlsParameters,
        hello_name: &ClientId,
    ) -> Result<(), Error> {
        if self.is_encrypted() {
            return Ok(());
        }
        if !self.server_info.supports_feature(Extension::StartTls) {
            return Err(self.fail(error::tls("server does not support STARTTLS")));
        }

        self.state = SessionState::TlsUpgrading;
        self.command(Starttls, ReadMode::FirstLine)?;
        // anything sent before the handshake would be trusted as encrypted
        if self.start < self.end {
            return Err(self.fail(error::protocol("data pipelined after the STARTTLS reply")));
        }
        try_smtp!(self.stream.upgrade_tls(tls_parameters), self);

        #[cfg(feature = "tracing")]
        tracing::debug!("connection encrypted");
        self.ehlo(hello_name)
    }

    /// Runs the authentication modules in order until one succeeds
    ///
    /// Modules the server doesn't advertise, or needing credentials when there
    /// are none, are skipped. Once `GSSAPI` was offered `NTLM` is skipped.
    /// Returns `None` when no module applied and the session goes on
    /// unauthenticated.
    pub fn auth(
        &mut self,
        authenticators: &[Arc<dyn Authenticator>],
        credentials: Option<&Credentials>,
    ) -> Result<Option<Response>, Error> {
        self.state = SessionState::Authenticating;

        let mut attempted = false;
        let mut offered_gssapi = false;
        for authenticator in authenticators {
            let mechanism = authenticator.mechanism();
            if !self.server_info.supports_auth_mechanism(mechanism) {
                continue;
            }
            match mechanism {
                Mechanism::Ntlm if offered_gssapi => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("skipping NTLM, GSSAPI was already offered");
                    continue;
                }
                Mechanism::Gssapi => offered_gssapi = true,
                _ => {}
            }
            if authenticator.requires_credentials() && credentials.is_none() {
                continue;
            }

            attempted = true;
            if let Some(response) = self.authenticate(authenticator.as_ref(), credentials)? {
                self.state = SessionState::Ready;
                return Ok(Some(response));
            }
            #[cfg(feature = "tracing")]
            tracing::debug!("{} refused, trying the next mechanism", mechanism);
        }

        if attempted {
            return Err(self.fail(error::authentication(
                "no authentication mechanism succeeded",
            )));
        }

        #[cfg(feature = "tracing")]
        if credentials.is_some() {
            tracing::warn!("no authentication mechanism in common with the server");
        }
        self.state = SessionState::Ready;
        Ok(None)
    }

    /// Sends AUTH and answers the challenges, `None` when the mechanism was refused
    fn authenticate(
        &mut self,
        authenticator: &dyn Authenticator,
        credentials: Option<&Credentials>,
    ) -> Result<Option<Response>, Error> {
        let initial_response = try_smtp!(authenticator.initial_response(credentials), self);
        let (mut outcome, mut response) = self.command(
            Auth::new(authenticator.mechanism(), initial_response),
            ReadMode::FirstLine,
        )?;

        // Limit challenges to avoid blocking
        let mut challenges = MAX_CHALLENGES;
        while outcome == Outcome::Success && response.has_code(334) {
            if challenges == 0 {
                return Err(self.fail(error::response("Unexpected number of challenges")));
            }
            challenges -= 1;

            let challenge = try_smtp!(Auth::decode_challenge(&response), self);
            let answer = try_smtp!(authenticator.respond(credentials, &challenge), self);
            (outcome, response) = self.command(AuthResponse::new(answer), ReadMode::FirstLine)?;
        }

        Ok((outcome == Outcome::Success).then_some(response))
    }

    /// Opens a mail transaction and returns the stream for the message content
    ///
    /// `eight_bit` requests `BODY=8BITMIME`, `size` is announced to servers
    /// advertising a maximum size. Fails when every recipient was refused.
    pub fn data(
        &mut self,
        envelope: &Envelope,
        eight_bit: bool,
        size: Option<usize>,
    ) -> Result<DataStream<'_>, Error> {
        let mut mail_options = vec![];

        // Internationalization handling
        //
        // * 8BITMIME: https://tools.ietf.org/html/rfc6152
        // * SMTPUTF8: https://tools.ietf.org/html/rfc6531
        if envelope.has_non_ascii_addresses() {
            if !self.server_info.supports_feature(Extension::SmtpUtfEight) {
                // don't try to send non-ascii addresses (per RFC)
                return Err(self.fail(error::client(
                    "Envelope contains non-ascii chars but server does not support SMTPUTF8",
                )));
            }
            mail_options.push(MailParameter::SmtpUtfEight);
        }

        if eight_bit {
            if !self.server_info.supports_feature(Extension::EightBitMime) {
                return Err(self.fail(error::client(
                    "Message contains non-ascii chars but server does not support 8BITMIME",
                )));
            }
            mail_options.push(MailParameter::Body(MailBodyParameter::EightBitMime));
        }

        if let (Some(max_size), Some(size)) = (self.server_info.max_size(), size) {
            if size > max_size {
                return Err(self.fail(error::client(format!(
                    "Message size {size} exceeds the server limit of {max_size}"
                ))));
            }
            mail_options.push(MailParameter::Size(size));
        }

        let dsn = match self.dsn {
            Some(ref dsn) if self.server_info.supports_feature(Extension::Dsn) => Some(dsn.clone()),
            _ => None,
        };
        if let Some(ref dsn) = dsn {
            mail_options.extend(dsn.mail_parameters());
        }

        self.state = SessionState::Sending;
        self.failed.clear();
        self.command(
            Mail::new(envelope.from().cloned(), mail_options),
            ReadMode::FirstLine,
        )?;

        let mut accepted = 0;
        for to_address in envelope.to() {
            let parameters = dsn
                .as_ref()
                .map(|dsn| dsn.rcpt_parameters(to_address))
                .unwrap_or_default();
            let (outcome, response) = self.command(
                Rcpt::new(to_address.clone(), parameters),
                ReadMode::FirstLine,
            )?;
            if outcome == Outcome::Success {
                accepted += 1;
            } else {
                #[cfg(feature = "tracing")]
                tracing::debug!("recipient {} rejected ({})", to_address, response.code());
                self.failed
                    .push(FailedRecipient::new(to_address.clone(), response));
            }
        }

        if accepted == 0 {
            let failed = mem::take(&mut self.failed);
            return Err(self.fail(error::recipients(failed, true)));
        }

        self.command(Data, ReadMode::FirstLine)?;
        Ok(DataStream::new(self))
    }

    /// Sends a whole message to the envelope recipients
    ///
    /// Recipients refused by the server are reported with a non-fatal error
    /// once the message was accepted for the others.
    pub fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        let data = self.data(envelope, !email.is_ascii(), Some(email.len()))?;
        write_message(data, email)
    }

    /// Sends the message content after a manual `DATA` command
    pub fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        self.state = SessionState::Sending;
        self.failed.clear();
        write_message(DataStream::new(self), message)
    }

    /// Writes encoded message content
    pub(super) fn write_data(&mut self, buf: &mut LineBuffer) -> io::Result<()> {
        if self.state != SessionState::Sending {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no DATA transaction in progress",
            ));
        }

        let result = buf.flush_to(&mut self.stream).and_then(|()| self.stream.flush());
        if let Err(ref err) = result {
            if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                self.timed_out = true;
            }
            self.abort();
        }
        result
    }

    /// Terminates the content and reads the final reply
    pub(super) fn end_data(&mut self, at_line_start: bool) -> Result<Response, Error> {
        if !at_line_start {
            try_smtp!(self.write(b"\r\n"), self);
        }
        let (_, response) = self.command(DataEnd, ReadMode::FirstLine)?;
        self.state = SessionState::Ready;

        let failed = mem::take(&mut self.failed);
        if failed.is_empty() {
            Ok(response)
        } else {
            Err(error::recipients(failed, false))
        }
    }

    /// Resets the mail transaction
    pub fn rset(&mut self) -> Result<Response, Error> {
        let (_, response) = self.command(Rset, ReadMode::FirstLine)?;
        self.failed.clear();
        self.state = SessionState::Ready;
        Ok(response)
    }

    /// Closes the session gracefully
    pub fn quit(&mut self) -> Result<Response, Error> {
        let (_, response) = self.command(Quit, ReadMode::FirstLine)?;
        self.state = SessionState::Closed;
        let _ = self.stream.shutdown(Shutdown::Both);
        Ok(response)
    }

    /// Tears the session down without `QUIT`
    pub fn abort(&mut self) {
        if matches!(self.state, SessionState::Aborted | SessionState::Closed) {
            return;
        }
        self.state = SessionState::Aborted;

        #[cfg(feature = "tracing")]
        tracing::debug!("aborting session");
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    /// Aborts the session, returning the error to report
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        if err.is_timeout() {
            self.timed_out = true;
        }
        self.abort();

        if self.timed_out {
            err.into_timeout()
        } else {
            err
        }
    }

    /// Tells if the underlying stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        self.stream.is_encrypted()
    }

    /// Set timeout
    pub fn set_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(duration)?;
        self.stream.set_write_timeout(duration)
    }

    /// Checks if the server is connected using the NOOP SMTP command
    pub fn test_connected(&mut self) -> bool {
        self.command(Noop, ReadMode::FirstLine).is_ok()
    }

    /// Sends an SMTP command and classifies the reply
    ///
    /// Replies outside the command's reply table abort the session.
    pub fn command<C: SmtpCommand + Display>(
        &mut self,
        command: C,
        mode: ReadMode,
    ) -> Result<(Outcome, Response), Error> {
        let line = command.to_string();

        #[cfg(feature = "tracing")]
        if C::SENSITIVE {
            tracing::debug!(">> <redacted>");
        } else {
            tracing::debug!(">> {}", escape_crlf(&line));
        }

        try_smtp!(self.write(line.as_bytes()), self);
        self.read_checked::<C>(mode)
    }

    fn read_checked<C: SmtpCommand>(&mut self, mode: ReadMode) -> Result<(Outcome, Response), Error> {
        let response = try_smtp!(self.read_response(mode), self);
        Ok(try_smtp!(C::REPLY.check(response), self))
    }

    /// Writes bytes to the server
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if matches!(self.state, SessionState::Aborted | SessionState::Closed) {
            return Err(error::client("the session is closed"));
        }
        self.stream.write_all(bytes).map_err(error::network)?;
        self.stream.flush().map_err(error::network)
    }

    /// Reads one reply, leaving any following bytes buffered
    fn read_response(&mut self, mode: ReadMode) -> Result<Response, Error> {
        if matches!(self.state, SessionState::Aborted | SessionState::Closed) {
            return Err(error::client("the session is closed"));
        }

        let mut reader = ReplyReader::new(mode);
        loop {
            if self.start < self.end {
                self.start += reader.feed(&self.read_buf[self.start..self.end])?;
                if reader.is_done() {
                    break;
                }
            }

            self.start = 0;
            self.end = 0;
            match self.stream.read(&mut self.read_buf) {
                Ok(0) => return Err(error::connection("connection closed by the server")),
                Ok(n) => self.end = n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(error::network(err)),
            }
        }

        let response = reader.finish()?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "<< {} {}",
            response.code(),
            response.message().collect::<Vec<_>>().join(" | ")
        );
        Ok(response)
    }
}

/// Streams a complete message, aborting on write errors
fn write_message(mut data: DataStream<'_>, message: &[u8]) -> Result<Response, Error> {
    match data.write_all(message) {
        Ok(()) => data.finish(),
        Err(err) => Err(data.fail(error::network(err))),
    }
}
