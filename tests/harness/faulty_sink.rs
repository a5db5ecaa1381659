#![allow(dead_code)]

use avrostream::{Error, Output, Record, Signal, Sink};
use std::io;

/// A sink that rejects records while `fail_records` is set.
#[derive(Default)]
pub struct FaultySink {
    pub fail_records: bool,
    pub fail_signals: bool,
    pub accepted: Vec<Output>,
}

impl Sink for FaultySink {
    fn submit(&mut self, record: Record) -> avrostream::Result<()> {
        if self.fail_records {
            return Err(Error::downstream(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated downstream failure",
            )));
        }
        self.accepted.push(Output::Record(record));
        Ok(())
    }

    fn punctuate(&mut self, signal: Signal) -> avrostream::Result<()> {
        if self.fail_signals {
            return Err(Error::downstream(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated downstream failure",
            )));
        }
        self.accepted.push(Output::Signal(signal));
        Ok(())
    }
}
