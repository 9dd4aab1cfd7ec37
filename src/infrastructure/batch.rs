//! Batch dumps: every unit of a workspace into its own `.ast` file.
//!
//! Units are independent, so they are spread over a rayon pool. Each unit is
//! parsed, walked and written by one worker only.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::domain::error::DumpError;
use crate::infrastructure::{dump_unit, make_sink, OutputFormat, SourceUnit};
use crate::ports::RecordFilter;

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files written, in unit order.
    pub dumped: Vec<PathBuf>,
    /// `(unit path, reason)` for every unit that produced no dump.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `<out_dir>/<relative>.ast`
pub fn output_path(out_dir: &Path, unit: &SourceUnit) -> PathBuf {
    let mut name = out_dir.join(&unit.relative).into_os_string();
    name.push(".ast");
    PathBuf::from(name)
}

pub fn dump_to_dir(
    units: &[SourceUnit],
    out_dir: &Path,
    format: OutputFormat,
    filter: RecordFilter,
    pool: &rayon::ThreadPool,
) -> Result<BatchReport> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Cannot create output directory {}", out_dir.display()))?;

    // Two units writing one file would race; only the first unit keeps it.
    let mut owners: HashMap<PathBuf, &str> = HashMap::new();
    let mut planned = Vec::with_capacity(units.len());
    let mut collisions = Vec::new();
    for unit in units {
        let target = output_path(out_dir, unit);
        match owners.get(&target) {
            Some(first) => collisions.push((
                unit.path.clone(),
                format!("{} is already written by {}", target.display(), first),
            )),
            None => {
                owners.insert(target.clone(), unit.path.as_str());
                planned.push((unit, target));
            }
        }
    }

    let outcomes: Vec<std::result::Result<PathBuf, (String, String)>> = pool.install(|| {
        planned
            .into_par_iter()
            .map(|(unit, target)| {
                dump_one(unit, &target, format, filter)
                    .map(|()| target)
                    .map_err(|e| (unit.path.clone(), format!("{:#}", e)))
            })
            .collect()
    });

    let mut report = BatchReport::default();
    for outcome in outcomes.into_iter().chain(collisions.into_iter().map(Err)) {
        match outcome {
            Ok(path) => report.dumped.push(path),
            Err((unit, reason)) => {
                tracing::warn!("{}: {}", unit, reason);
                report.failed.push((unit, reason));
            }
        }
    }

    tracing::info!(
        dumped = report.dumped.len(),
        failed = report.failed.len(),
        out_dir = %out_dir.display(),
        "batch dump finished"
    );
    Ok(report)
}

fn dump_one(
    unit: &SourceUnit,
    target: &Path,
    format: OutputFormat,
    filter: RecordFilter,
) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {}", parent.display()))?;
    }
    let file = File::create(target)
        .with_context(|| format!("Cannot create {}", target.display()))?;

    let result = {
        let mut sink = make_sink(format, filter, BufWriter::new(file));
        dump_unit(unit, &mut *sink)
    };

    match result {
        Ok(_) => Ok(()),
        Err(e @ DumpError::Parse { .. }) => {
            // A unit that fails to parse leaves no partial dump behind.
            let _ = fs::remove_file(target);
            Err(e.into())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("Cannot write {}", target.display()))),
    }
}
