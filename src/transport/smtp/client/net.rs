use std::{
    fmt,
    io::{self, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

#[cfg(feature = "native-tls")]
use native_tls::TlsStream;

#[cfg(test)]
use super::mock::MockStream;
#[cfg(feature = "native-tls")]
use super::TlsParameters;
use crate::transport::smtp::error::{self, Error};

/// A network stream
pub struct NetworkStream {
    inner: InnerNetworkStream,
}

/// Represents the different types of underlying network streams
// usually only one TLS backend at a time is going to be enabled,
// so clippy::large_enum_variant doesn't make sense here
#[allow(clippy::large_enum_variant)]
enum InnerNetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    #[cfg(feature = "native-tls")]
    NativeTls(TlsStream<TcpStream>),
    /// Mock stream
    #[cfg(test)]
    Mock(MockStream),
}

impl fmt::Debug for NetworkStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            InnerNetworkStream::Tcp(_) => "Tcp",
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(_) => "NativeTls",
            #[cfg(test)]
            InnerNetworkStream::Mock(_) => "Mock",
        };
        f.debug_tuple("NetworkStream").field(&kind).finish()
    }
}

impl NetworkStream {
    fn new(inner: InnerNetworkStream) -> Self {
        NetworkStream { inner }
    }

    /// Wraps an already connected plaintext stream
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self::new(InnerNetworkStream::Tcp(stream))
    }

    #[cfg(test)]
    pub(crate) fn mock(stream: MockStream) -> Self {
        Self::new(InnerNetworkStream::Mock(stream))
    }

    /// Shutdowns the connection
    pub fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.shutdown(how),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.get_ref().shutdown(how),
            #[cfg(test)]
            InnerNetworkStream::Mock(_) => Ok(()),
        }
    }

    /// Connects to the first address `server` resolves to that accepts the connection
    pub fn connect<T: ToSocketAddrs>(
        server: T,
        timeout: Option<Duration>,
    ) -> Result<NetworkStream, Error> {
        fn try_connect<T: ToSocketAddrs>(
            server: T,
            timeout: Option<Duration>,
        ) -> Result<TcpStream, Error> {
            let addrs = server.to_socket_addrs().map_err(error::connection)?;

            let mut last_err = None;

            for addr in addrs {
                let result = match timeout {
                    Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                    None => TcpStream::connect(addr),
                };
                match result {
                    Ok(stream) => return Ok(stream),
                    Err(err) => last_err = Some(err),
                }
            }

            Err(match last_err {
                Some(last_err) => error::network(last_err),
                None => error::connection("could not resolve to any address"),
            })
        }

        try_connect(server, timeout).map(NetworkStream::from_tcp)
    }

    /// Runs the TLS handshake over a plaintext stream
    #[cfg(feature = "native-tls")]
    pub fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut stream) => {
                let tcp_stream = stream.try_clone().map_err(error::network)?;
                let tls_stream = tls_parameters
                    .connector
                    .connect(tls_parameters.domain(), tcp_stream)
                    .map_err(error::tls)?;
                self.inner = InnerNetworkStream::NativeTls(tls_stream);
                Ok(())
            }
            InnerNetworkStream::NativeTls(_) => Ok(()),
            #[cfg(test)]
            InnerNetworkStream::Mock(_) => Err(error::tls("mock streams can't be encrypted")),
        }
    }

    /// Tells if the stream is encrypted
    pub fn is_encrypted(&self) -> bool {
        match self.inner {
            InnerNetworkStream::Tcp(_) => false,
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(_) => true,
            #[cfg(test)]
            InnerNetworkStream::Mock(_) => false,
        }
    }

    /// Set read timeout for IO calls
    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut stream) => stream.set_read_timeout(duration),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut stream) => {
                stream.get_ref().set_read_timeout(duration)
            }
            #[cfg(test)]
            InnerNetworkStream::Mock(_) => Ok(()),
        }
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut stream) => stream.set_write_timeout(duration),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut stream) => {
                stream.get_ref().set_write_timeout(duration)
            }
            #[cfg(test)]
            InnerNetworkStream::Mock(_) => Ok(()),
        }
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.read(buf),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.read(buf),
            #[cfg(test)]
            InnerNetworkStream::Mock(ref mut s) => s.read(buf),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.write(buf),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.write(buf),
            #[cfg(test)]
            InnerNetworkStream::Mock(ref mut s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.flush(),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.flush(),
            #[cfg(test)]
            InnerNetworkStream::Mock(ref mut s) => s.flush(),
        }
    }
}
