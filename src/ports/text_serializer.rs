//! Text Serializer
//!
//! Renders walker records as indentation-encoded lines:
//!
//! ```text
//! <depth spaces><kind> [<identifier> ](<file>:<line>:<column>)[ (implicit)]
//! ```

use crate::domain::ast::{NodeKind, Record};
use crate::ports::RecordSink;
use std::io::{Result, Write};

/// Marker appended to synthesized declarations.
pub const IMPLICIT_MARKER: &str = "(implicit)";

/// Rendering of a node without any source position.
pub const INVALID_LOCATION: &str = "<invalid sloc>";

pub struct TextSerializer<W: Write> {
    out: W,
}

impl<W: Write> TextSerializer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render one record as a line, including the trailing newline.
    pub fn to_line(record: &Record) -> String {
        let mut line = String::with_capacity(record.depth + 64);

        for _ in 0..record.depth {
            line.push(' ');
        }
        line.push_str(record.kind_name);
        line.push(' ');

        // Declarations always occupy the identifier slot, even when it is empty.
        if record.node_kind == NodeKind::Declaration {
            line.push_str(&record.identifier);
            line.push(' ');
        }

        line.push('(');
        match &record.location {
            Some(loc) => line.push_str(&loc.to_string()),
            None => line.push_str(INVALID_LOCATION),
        }
        line.push(')');

        if record.implicit && record.node_kind == NodeKind::Declaration {
            line.push(' ');
            line.push_str(IMPLICIT_MARKER);
        }

        line.push('\n');
        line
    }
}

impl<W: Write> RecordSink for TextSerializer<W> {
    fn emit(&mut self, record: &Record) -> Result<()> {
        self.out.write_all(Self::to_line(record).as_bytes())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()
    }
}
