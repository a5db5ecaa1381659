//! The downstream seam: where emitted records and signals go.

use crate::error::{Error, Result};
use crate::value::Record;
use std::sync::mpsc;

/// Control markers travelling alongside records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Soft segment marker, e.g. "start a new file".
    Boundary,
    /// No more records will follow.
    EndOfStream,
}

/// One unit produced by the encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Record(Record),
    Signal(Signal),
}

impl Output {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Signal(_) => None,
        }
    }
}

/// A receiver of encoded output. Errors are propagated to the caller of
/// `submit`/`signal` unchanged.
pub trait Sink {
    fn submit(&mut self, record: Record) -> Result<()>;
    fn punctuate(&mut self, signal: Signal) -> Result<()>;
}

impl Sink for Vec<Output> {
    fn submit(&mut self, record: Record) -> Result<()> {
        self.push(Output::Record(record));
        Ok(())
    }

    fn punctuate(&mut self, signal: Signal) -> Result<()> {
        self.push(Output::Signal(signal));
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn submit(&mut self, record: Record) -> Result<()> {
        (**self).submit(record)
    }

    fn punctuate(&mut self, signal: Signal) -> Result<()> {
        (**self).punctuate(signal)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn submit(&mut self, record: Record) -> Result<()> {
        (**self).submit(record)
    }

    fn punctuate(&mut self, signal: Signal) -> Result<()> {
        (**self).punctuate(signal)
    }
}

impl Sink for mpsc::Sender<Output> {
    fn submit(&mut self, record: Record) -> Result<()> {
        self.send(Output::Record(record)).map_err(Error::downstream)
    }

    fn punctuate(&mut self, signal: Signal) -> Result<()> {
        self.send(Output::Signal(signal)).map_err(Error::downstream)
    }
}

#[cfg(any(test, feature = "tokio"))]
impl Sink for tokio::sync::mpsc::UnboundedSender<Output> {
    fn submit(&mut self, record: Record) -> Result<()> {
        self.send(Output::Record(record)).map_err(Error::downstream)
    }

    fn punctuate(&mut self, signal: Signal) -> Result<()> {
        self.send(Output::Signal(signal)).map_err(Error::downstream)
    }
}
