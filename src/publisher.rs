//! Where finished status lines go

use anyhow::{Context, Result};
use std::io::{self, Write};

/// Sink for assembled status strings
pub trait Publisher {
    fn publish(&mut self, status: &str) -> Result<()>;
}

/// Writes each status as one line, for piping into a bar program
pub struct StdoutPublisher<W: Write = io::Stdout> {
    out: W,
    /// Last published line, to skip identical repeats
    last: Option<String>,
}

impl StdoutPublisher {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for StdoutPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> StdoutPublisher<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out, last: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Publisher for StdoutPublisher<W> {
    fn publish(&mut self, status: &str) -> Result<()> {
        if self.last.as_deref() == Some(status) {
            return Ok(());
        }
        // One status per line; embedded newlines would split it
        let line = status.replace('\n', " ");
        writeln!(self.out, "{}", line).context("Failed to write status")?;
        self.out.flush().context("Failed to flush status")?;
        self.last = Some(status.to_string());
        Ok(())
    }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, status: &str) -> Result<()> {
        (**self).publish(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publishes_one_line_per_status() {
        let mut publisher = StdoutPublisher::with_writer(Vec::new());
        publisher.publish("CPU:12 Mem:40").unwrap();
        publisher.publish("CPU:12 Mem:41").unwrap();
        let written = String::from_utf8(publisher.into_inner()).unwrap();
        assert_eq!(written, "CPU:12 Mem:40\nCPU:12 Mem:41\n");
    }

    #[test]
    fn test_identical_status_is_not_repeated() {
        let mut publisher = StdoutPublisher::with_writer(Vec::new());
        publisher.publish("same").unwrap();
        publisher.publish("same").unwrap();
        publisher.publish("other").unwrap();
        publisher.publish("same").unwrap();
        let written = String::from_utf8(publisher.into_inner()).unwrap();
        assert_eq!(written, "same\nother\nsame\n");
    }

    #[test]
    fn test_newlines_are_flattened() {
        let mut publisher = StdoutPublisher::with_writer(Vec::new());
        publisher.publish("a\nb").unwrap();
        assert_eq!(String::from_utf8(publisher.into_inner()).unwrap(), "a b\n");
    }
}
