//! Per-study processing and the cross-study merge.
//!
//! Studies are independent until the merge: each one is loaded, resolved,
//! canonicalized, aggregated, normalized and quality filtered on its own
//! rayon task. A failed study becomes a [`StudyFailure`] and never cancels
//! its siblings. [`merge`] runs only after every study has produced an output
//! or failed.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    aggregate::aggregate,
    assay::AssayMode,
    canonical::Canonicalizer,
    config::HarmonizeConfig,
    error::HarmonizeError,
    io_utils,
    matrix::FeatureMatrix,
    metadata::SampleRecord,
    mirbase::SequenceIndex,
    quality::filter_samples,
    raw_table::{LoadOptions, load_table},
    report::{RunReport, RunTotals, StudyReport, StudyStatus},
    schema::{Confidence, SchemaResolver},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyInput {
    pub accession: String,
    pub path: PathBuf,
}

impl StudyInput {
    pub fn new(accession: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            accession: accession.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug)]
pub struct StudyOutput {
    pub accession: String,
    /// Retained samples only, columns named by global sample id.
    pub matrix: FeatureMatrix,
    pub records: Vec<SampleRecord>,
    pub report: StudyReport,
}

#[derive(Debug)]
pub struct StudyFailure {
    pub accession: String,
    pub error: HarmonizeError,
}

impl StudyFailure {
    pub fn report(&self) -> StudyReport {
        StudyReport::failed(&self.accession, self.error.kind(), self.error.to_string())
    }
}

/// Shared, read-only state for every study in one run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext<'a> {
    pub mode: AssayMode,
    pub config: &'a HarmonizeConfig,
    pub sequences: Option<&'a SequenceIndex>,
    pub load: LoadOptions,
}

impl<'a> PipelineContext<'a> {
    pub fn new(mode: AssayMode, config: &'a HarmonizeConfig) -> Self {
        Self {
            mode,
            config,
            sequences: None,
            load: LoadOptions::default(),
        }
    }

    pub fn with_sequences(mut self, sequences: Option<&'a SequenceIndex>) -> Self {
        self.sequences = sequences;
        self
    }
}

pub fn process_study(
    ctx: &PipelineContext<'_>,
    input: &StudyInput,
) -> Result<StudyOutput, HarmonizeError> {
    let accession = input.accession.as_str();
    let table = load_table(&input.path, &ctx.load)?;
    debug!(
        "{accession}: loaded {} row(s) x {} column(s) from {:?}",
        table.row_count(),
        table.column_count(),
        input.path
    );

    let schema = SchemaResolver::new(ctx.mode).resolve(&table, accession)?;
    if schema.confidence() == Confidence::Low {
        warn!(
            "{accession}: low-confidence identifier column '{}' ({})",
            schema.feature_column.header, schema.feature_column.rule
        );
    }

    let canonicalizer = Canonicalizer::new(ctx.mode).with_sequences(ctx.sequences);
    let (mut matrix, stats) = aggregate(&table, &schema, &canonicalizer);
    let branch = ctx.config.normalization.normalize(ctx.mode, &mut matrix);
    let threshold = ctx.config.min_detected(ctx.mode);
    let outcome = filter_samples(accession, matrix, threshold)?;

    let records = outcome
        .retained()
        .map(|q| SampleRecord::new(accession, &q.sample, q.detected))
        .collect::<Vec<_>>();
    let samples_dropped = outcome
        .dropped()
        .map(|q| q.sample.clone())
        .collect::<Vec<_>>();
    let mut matrix = outcome.matrix;
    matrix.rename_samples(records.iter().map(|r| r.global_id.clone()).collect());

    info!(
        "{accession}: {} {} across {} sample(s) ({branch})",
        matrix.feature_count(),
        ctx.mode.detected_label(),
        records.len()
    );
    let report = StudyReport {
        accession: accession.to_string(),
        status: StudyStatus::Merged,
        identifier_column: Some(schema.feature_column.header.clone()),
        schema_confidence: Some(schema.confidence()),
        normalization: Some(branch),
        features: matrix.feature_count(),
        samples_kept: records.len(),
        samples_dropped,
        rows_excluded: stats.rows_excluded,
        failure_kind: None,
        failure_reason: None,
    };
    Ok(StudyOutput {
        accession: accession.to_string(),
        matrix,
        records,
        report,
    })
}

/// Processes every study in parallel; results keep the input order.
pub fn process_studies(
    ctx: &PipelineContext<'_>,
    inputs: &[StudyInput],
) -> Vec<Result<StudyOutput, StudyFailure>> {
    inputs
        .par_iter()
        .map(|input| {
            process_study(ctx, input).map_err(|error| {
                warn!("{}: skipped ({error})", input.accession);
                StudyFailure {
                    accession: input.accession.clone(),
                    error,
                }
            })
        })
        .collect()
}

#[derive(Debug)]
pub struct Harmonized {
    pub matrix: FeatureMatrix,
    pub metadata: Vec<SampleRecord>,
    pub report: RunReport,
}

/// Outer-joins every study matrix and concatenates their metadata.
pub fn merge(
    mode: AssayMode,
    results: Vec<Result<StudyOutput, StudyFailure>>,
) -> Result<Harmonized, HarmonizeError> {
    let mut outputs = Vec::new();
    let mut reports = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for result in results {
        match result {
            Ok(output) => {
                reports.push(output.report.clone());
                outputs.push(output);
            }
            Err(failure) => {
                failed += 1;
                reports.push(failure.report());
            }
        }
    }
    if outputs.is_empty() {
        return Err(HarmonizeError::NothingToMerge);
    }

    let (matrix, duplicates) = FeatureMatrix::outer_union(outputs.iter().map(|o| &o.matrix));
    for duplicate in &duplicates {
        warn!("Sample id '{duplicate}' appears in more than one study; keeping the first");
    }
    let mut seen = HashSet::new();
    let metadata = outputs
        .into_iter()
        .flat_map(|o| o.records)
        .filter(|r| seen.insert(r.global_id.clone()))
        .collect::<Vec<_>>();

    let totals = RunTotals {
        studies_merged: reports.len() - failed,
        studies_failed: failed,
        features: matrix.feature_count(),
        samples: matrix.sample_count(),
        duplicate_samples: duplicates.len(),
    };
    info!(
        "Merged {} stud(ies) into {} feature(s) x {} sample(s); {} failed",
        totals.studies_merged, totals.features, totals.samples, totals.studies_failed
    );
    Ok(Harmonized {
        matrix,
        metadata,
        report: RunReport::new(mode, reports, totals),
    })
}

/// Processes all studies on `threads` workers (0 keeps rayon's default) and merges.
pub fn harmonize(
    ctx: &PipelineContext<'_>,
    inputs: &[StudyInput],
    threads: usize,
) -> Result<Harmonized> {
    let results = if threads == 0 {
        process_studies(ctx, inputs)
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("Building study worker pool")?;
        pool.install(|| process_studies(ctx, inputs))
    };
    Ok(merge(ctx.mode, results)?)
}

/// Reads `accession,path` rows; relative paths resolve against the manifest's directory.
pub fn read_manifest(path: &Path) -> Result<Vec<StudyInput>> {
    let text = io_utils::read_text(path, encoding_rs::UTF_8)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut reader =
        io_utils::open_csv_reader(text.as_bytes(), io_utils::resolve_output_delimiter(path), true);
    let mut inputs = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading manifest row {} of {path:?}", idx + 2))?;
        let accession = record.get(0).unwrap_or_default().trim();
        let file = record.get(1).unwrap_or_default().trim();
        if accession.is_empty() && file.is_empty() {
            continue;
        }
        if accession.is_empty() || file.is_empty() {
            return Err(anyhow!(
                "Manifest row {} of {path:?} needs both an accession and a path",
                idx + 2
            ));
        }
        let file = PathBuf::from(file);
        let resolved = if file.is_absolute() { file } else { base.join(file) };
        inputs.push(StudyInput::new(accession, resolved));
    }
    Ok(inputs)
}

/// Rejects study lists that would give two studies the same accession.
pub fn check_unique_accessions(inputs: &[StudyInput]) -> Result<()> {
    let mut seen = HashSet::new();
    for input in inputs {
        if !seen.insert(input.accession.as_str()) {
            return Err(anyhow!(
                "Study accession '{}' is listed more than once",
                input.accession
            ));
        }
    }
    Ok(())
}
