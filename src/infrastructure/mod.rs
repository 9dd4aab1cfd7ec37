// Infrastructure implementations for the dump tool: the syn front-end, the
// collaborators the walker consumes, and the plumbing around them.

pub mod batch;
pub mod concurrency;
pub mod config;
pub mod expander;
pub mod location;
pub mod project_loader;
pub mod syn_ast;
pub mod usr;

pub use config::{DumpConfig, OutputFormat};
pub use location::SpanLocationResolver;
pub use project_loader::{ProjectLoader, SourceUnit};
pub use syn_ast::{SynNode, TranslationUnit};
pub use usr::UsrGenerator;

use std::io::Write;

use crate::application::{TreeWalker, WalkStats};
use crate::domain::error::DumpError;
use crate::ports::{FilteredSink, JsonLinesSerializer, RecordFilter, RecordSink, TextSerializer};

/// Sink for `format`, wrapped in a filter unless the filter lets everything through.
pub fn make_sink<'w, W: Write + 'w>(
    format: OutputFormat,
    filter: RecordFilter,
    out: W,
) -> Box<dyn RecordSink + 'w> {
    let sink: Box<dyn RecordSink + 'w> = match format {
        OutputFormat::Text => Box::new(TextSerializer::new(out)),
        OutputFormat::Json => Box::new(JsonLinesSerializer::new(out)),
    };
    if filter.is_pass_through() {
        sink
    } else {
        Box::new(FilteredSink::new(sink, filter))
    }
}

/// Parse one unit and stream its records into `sink`.
pub fn dump_unit(unit: &SourceUnit, sink: &mut dyn RecordSink) -> Result<WalkStats, DumpError> {
    let tu = TranslationUnit::parse(unit).map_err(|e| {
        let start = e.span().start();
        DumpError::Parse {
            path: unit.path.clone(),
            line: start.line,
            column: start.column + 1,
            message: e.to_string(),
        }
    })?;

    let locations = SpanLocationResolver::new(unit.path.as_str());
    let stats = TreeWalker::<SynNode<'_>>::new(&locations, &UsrGenerator, sink).traverse(tu.root())?;

    tracing::debug!(
        unit = %unit.path,
        declarations = stats.declarations,
        statements = stats.statements,
        implicit = stats.implicit,
        unidentified = stats.unidentified,
        max_depth = stats.max_depth,
        "dumped translation unit"
    );
    Ok(stats)
}
