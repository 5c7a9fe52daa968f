use std::io::{self, Write};

use super::SmtpConnection;
use crate::{
    encoder::{EightBitCodec, LineBuffer, TransferEncoder},
    transport::smtp::{
        error::{self, Error},
        response::Response,
    },
};

/// Bytes buffered before they are written to the connection
const FLUSH_THRESHOLD: usize = 8 * 1024;

/// Message content of an open `DATA` transaction
///
/// Bytes written are dot-stuffed on their way to the server. [`DataStream::finish`]
/// sends the terminating `.` line and reads the server verdict. A stream
/// dropped before `finish` aborts the session, since the server can't tell a
/// truncated message from a complete one.
#[must_use = "the message is only sent by `finish`"]
pub struct DataStream<'a> {
    conn: &'a mut SmtpConnection,
    codec: EightBitCodec,
    buf: LineBuffer,
    finished: bool,
}

impl<'a> DataStream<'a> {
    pub(super) fn new(conn: &'a mut SmtpConnection) -> Self {
        DataStream {
            conn,
            codec: EightBitCodec::dot_stuffing(),
            buf: LineBuffer::unfolded(),
            finished: false,
        }
    }

    /// Ends the content and returns the reply to it
    ///
    /// Fails with a non-fatal recipients error when the message was accepted
    /// but some recipients were refused earlier.
    pub fn finish(mut self) -> Result<Response, Error> {
        self.finished = true;
        if let Err(err) = self.conn.write_data(&mut self.buf) {
            return Err(self.conn.fail(error::network(err)));
        }
        self.conn.end_data(self.codec.at_line_start())
    }

    /// Aborts the session, returning the error to report
    pub(super) fn fail(mut self, err: Error) -> Error {
        self.finished = true;
        self.conn.fail(err)
    }
}

impl Write for DataStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.codec.encode(buf, &mut self.buf);
        if self.buf.len() >= FLUSH_THRESHOLD {
            self.conn.write_data(&mut self.buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.conn.write_data(&mut self.buf)
    }
}

impl Drop for DataStream<'_> {
    fn drop(&mut self) {
        if !self.finished {
            #[cfg(feature = "tracing")]
            tracing::warn!("message content dropped before the end, aborting");
            self.conn.abort();
        }
    }
}
