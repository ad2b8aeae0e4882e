//! Common test utilities.

use std::io::{self, ErrorKind, Write};

/// Writer whose reader has gone away, as when `manifestctl list deploy | head -1`
/// closes its end early.
pub struct BrokenPipeWriter;

impl Write for BrokenPipeWriter {
	fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
		Err(ErrorKind::BrokenPipe.into())
	}

	fn flush(&mut self) -> io::Result<()> {
		Err(ErrorKind::BrokenPipe.into())
	}
}
