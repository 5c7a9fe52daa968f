//! Scripted stream for session tests
//!
//! Reads are served from the server script given at creation, writes are
//! recorded and shared between clones.

use std::{
    io::{self, Cursor, Read, Write},
    sync::{Arc, Mutex, PoisonError},
};

#[derive(Clone, Debug)]
pub(crate) struct MockStream {
    reader: Arc<Mutex<Cursor<Vec<u8>>>>,
    written: Arc<Mutex<Vec<u8>>>,
    /// Size of each read, to exercise reply reassembly
    read_size: usize,
    /// Reads past the script time out instead of returning EOF
    timing_out: bool,
}

impl MockStream {
    pub(crate) fn with_script(script: &str) -> MockStream {
        MockStream {
            reader: Arc::new(Mutex::new(Cursor::new(script.as_bytes().to_vec()))),
            written: Arc::new(Mutex::new(Vec::new())),
            read_size: usize::MAX,
            timing_out: false,
        }
    }

    pub(crate) fn read_size(mut self, read_size: usize) -> MockStream {
        self.read_size = read_size;
        self
    }

    pub(crate) fn timing_out(mut self) -> MockStream {
        self.timing_out = true;
        self
    }

    /// Everything the client wrote so far
    pub(crate) fn written(&self) -> String {
        let written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&written).into_owned()
    }
}

impl Write for MockStream {
    fn write(&mut self, msg: &[u8]) -> io::Result<usize> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(msg)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.read_size);
        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        let n = reader.read(&mut buf[..len])?;
        if n == 0 && len > 0 && self.timing_out {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "mock read timed out"));
        }
        Ok(n)
    }
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};

    use pretty_assertions::assert_eq;

    use super::MockStream;

    #[test]
    fn write_is_shared_with_clones() {
        let mut mock = MockStream::with_script("");
        let cloned = mock.clone();
        mock.write_all(b"EHLO me\r\n").unwrap();
        assert_eq!(cloned.written(), "EHLO me\r\n");
    }

    #[test]
    fn reads_follow_the_script() {
        let mut mock = MockStream::with_script("220 hi\r\n").read_size(3);
        let mut buf = [0; 16];
        assert_eq!(mock.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"220");
        let mut rest = String::new();
        mock.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, " hi\r\n");
    }

    #[test]
    fn times_out_past_the_script() {
        let mut mock = MockStream::with_script("").timing_out();
        let err = mock.read(&mut [0; 4]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    }
}
