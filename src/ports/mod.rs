use crate::domain::ast::{Location, Record};
use crate::domain::error::SymbolError;

pub mod filter;
pub mod json_serializer;
pub mod text_serializer;

pub use filter::{FilteredSink, RecordFilter};
pub use json_serializer::JsonLinesSerializer;
pub use text_serializer::TextSerializer;

/// Maps a node to the file/line/column it was written at.
pub trait LocationResolver<N> {
    /// Best effort: `None` only when the node carries no position at all.
    fn resolve(&self, node: &N) -> Option<Location>;
}

/// Derives the deterministic identifier of a declaration.
pub trait SymbolIdentifier<N> {
    fn identify(&self, decl: &N) -> Result<String, SymbolError>;
}

/// Streaming consumer of walker records.
pub trait RecordSink {
    fn emit(&mut self, record: &Record) -> std::io::Result<()>;

    /// Called once after the last record of a translation unit.
    fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn emit(&mut self, record: &Record) -> std::io::Result<()> {
        (**self).emit(record)
    }

    fn finish(&mut self) -> std::io::Result<()> {
        (**self).finish()
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn emit(&mut self, record: &Record) -> std::io::Result<()> {
        (**self).emit(record)
    }

    fn finish(&mut self) -> std::io::Result<()> {
        (**self).finish()
    }
}
