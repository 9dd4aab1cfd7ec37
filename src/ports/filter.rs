// Record filtering happens at the sink, never in the walker: depths of the
// records that survive are the depths the walker computed.

use crate::domain::ast::{NodeKind, Record};
use crate::ports::RecordSink;
use serde::Deserialize;
use std::io::Result;

/// Which records reach the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    pub declarations: bool,
    pub statements: bool,
    pub implicit: bool,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            declarations: true,
            statements: true,
            implicit: true,
        }
    }
}

impl RecordFilter {
    pub fn accepts(&self, record: &Record) -> bool {
        let kind_ok = match record.node_kind {
            NodeKind::Declaration => self.declarations,
            NodeKind::Statement => self.statements,
        };
        kind_ok && (self.implicit || !record.implicit)
    }

    pub fn is_pass_through(&self) -> bool {
        *self == Self::default()
    }
}

pub struct FilteredSink<S> {
    inner: S,
    filter: RecordFilter,
    dropped: usize,
}

impl<S: RecordSink> FilteredSink<S> {
    pub fn new(inner: S, filter: RecordFilter) -> Self {
        Self {
            inner,
            filter,
            dropped: 0,
        }
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RecordSink> RecordSink for FilteredSink<S> {
    fn emit(&mut self, record: &Record) -> Result<()> {
        if self.filter.accepts(record) {
            self.inner.emit(record)
        } else {
            self.dropped += 1;
            Ok(())
        }
    }

    fn finish(&mut self) -> Result<()> {
        tracing::debug!(dropped = self.dropped, filter = ?self.filter, "records filtered out");
        self.inner.finish()
    }
}
