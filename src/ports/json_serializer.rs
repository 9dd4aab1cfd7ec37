//! JSON Lines Serializer
//!
//! One JSON object per record, same order as the text form.

use crate::domain::ast::Record;
use crate::ports::RecordSink;
use std::io::{Result, Write};

pub struct JsonLinesSerializer<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSerializer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for JsonLinesSerializer<W> {
    fn emit(&mut self, record: &Record) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()
    }
}
