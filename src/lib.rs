pub mod aggregate;
pub mod assay;
pub mod balance;
pub mod canonical;
pub mod cli;
pub mod config;
pub mod error;
pub mod io_utils;
pub mod labels;
pub mod matrix;
pub mod metadata;
pub mod mirbase;
pub mod normalize;
pub mod pipeline;
pub mod quality;
pub mod raw_table;
pub mod report;
pub mod schema;
pub mod table;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    config::HarmonizeConfig,
    labels::{LabelCascade, LabelInputs, SampleResolver, SampleSources, StudyLabels},
    pipeline::{PipelineContext, StudyInput},
    raw_table::LoadOptions,
    schema::SchemaResolver,
    table::TextTable,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("omics_harmonize", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Harmonize(args) => handle_harmonize(&args),
        Commands::Refine(args) => handle_refine(&args),
        Commands::FinalizeLabels(args) => handle_finalize_labels(&args),
        Commands::Inspect(args) => handle_inspect(&args),
        Commands::Balance(args) => handle_balance(&args),
        Commands::Config(args) => handle_config(&args),
    }
}

/// Loads every label channel named on the command line.
pub fn load_label_inputs(args: &cli::LabelSourceArgs, config: &HarmonizeConfig) -> Result<LabelInputs> {
    let columns = &config.label_columns;
    let study_diseases = match &args.study_diseases {
        Some(path) => StudyLabels::load(path, &columns.accession, &columns.study_disease)
            .with_context(|| format!("Loading study diseases from {path:?}"))?,
        None => StudyLabels::default(),
    };
    let final_labels = match &args.final_labels {
        Some(path) => StudyLabels::load(path, &columns.accession, &columns.final_label)
            .with_context(|| format!("Loading final labels from {path:?}"))?,
        None => StudyLabels::default(),
    };
    let mut samples = SampleSources::default();
    for path in &args.characteristics {
        samples
            .load_characteristics(path)
            .with_context(|| format!("Loading sample characteristics from {path:?}"))?;
    }
    for (accession, path) in &args.series_matrix {
        samples.load_series_matrix(accession, path)?;
    }
    debug!(
        "Label inputs: {} study disease(s), {} final label(s), sample text for {} stud(ies)",
        study_diseases.len(),
        final_labels.len(),
        samples.study_count()
    );
    Ok(LabelInputs {
        study_diseases,
        final_labels,
        samples,
    })
}

fn study_inputs(args: &cli::HarmonizeArgs) -> Result<Vec<StudyInput>> {
    let mut inputs = args
        .studies
        .iter()
        .map(|(accession, path)| StudyInput::new(accession.as_str(), path.as_path()))
        .collect::<Vec<_>>();
    if let Some(manifest) = &args.manifest {
        inputs.extend(
            pipeline::read_manifest(manifest)
                .with_context(|| format!("Reading manifest {manifest:?}"))?,
        );
    }
    if inputs.is_empty() {
        return Err(anyhow!("No studies given; use --study ACCESSION=PATH or --manifest"));
    }
    pipeline::check_unique_accessions(&inputs)?;
    Ok(inputs)
}

fn handle_harmonize(args: &cli::HarmonizeArgs) -> Result<()> {
    let config = HarmonizeConfig::load_or_default(args.config.as_deref())?;
    let inputs = study_inputs(args)?;
    let label_inputs = load_label_inputs(&args.labels, &config)?;
    let sequences = match &args.mirbase {
        Some(path) => Some(mirbase::SequenceIndex::load(path)?),
        None => None,
    };
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let mut ctx = PipelineContext::new(args.mode, &config).with_sequences(sequences.as_ref());
    ctx.load = LoadOptions { encoding };

    info!("Harmonizing {} {} stud(ies)", inputs.len(), args.mode);
    let mut harmonized = pipeline::harmonize(&ctx, &inputs, args.threads)?;

    let cascade = LabelCascade::new(
        &config.labels,
        &label_inputs,
        SampleResolver::standard(config.accession_regex()?),
    );
    cascade.apply(&mut harmonized.metadata, false);

    // Both tables are staged and only moved into place once both are written.
    let matrix_stage = io_utils::staging_path(&args.matrix);
    let metadata_stage = io_utils::staging_path(&args.metadata);
    let staged = harmonized
        .matrix
        .write(&matrix_stage)
        .with_context(|| format!("Writing matrix to {:?}", args.matrix))
        .and_then(|()| {
            metadata::write_metadata(&metadata_stage, &harmonized.metadata)
                .with_context(|| format!("Writing metadata to {:?}", args.metadata))
        });
    if let Err(err) = staged {
        io_utils::discard_staged(&[matrix_stage.as_path(), metadata_stage.as_path()]);
        return Err(err);
    }
    io_utils::commit_staged(&metadata_stage, &args.metadata)?;
    io_utils::commit_staged(&matrix_stage, &args.matrix)?;
    if let Some(path) = &args.report {
        harmonized.report.save(path)?;
        info!("Run report written to {path:?}");
    }
    info!(
        "Wrote {} feature(s) x {} sample(s) to {:?}",
        harmonized.matrix.feature_count(),
        harmonized.matrix.sample_count(),
        args.matrix
    );
    Ok(())
}

fn handle_refine(args: &cli::RefineArgs) -> Result<()> {
    let config = HarmonizeConfig::load_or_default(args.config.as_deref())?;
    let label_inputs = load_label_inputs(&args.labels, &config)?;
    let mut records = metadata::read_metadata(&args.input)
        .with_context(|| format!("Reading metadata from {:?}", args.input))?;
    let cascade = LabelCascade::new(
        &config.labels,
        &label_inputs,
        SampleResolver::standard(config.accession_regex()?),
    );
    cascade.apply(&mut records, !args.from_names);
    let output = args.output.as_ref().unwrap_or(&args.input);
    metadata::write_metadata(output, &records)
        .with_context(|| format!("Writing metadata to {output:?}"))?;
    info!("Relabelled {} sample(s) into {:?}", records.len(), output);
    Ok(())
}

fn handle_finalize_labels(args: &cli::FinalizeLabelsArgs) -> Result<()> {
    let config = HarmonizeConfig::load_or_default(args.config.as_deref())?;
    labels::study::finalize_file(&args.input, &args.output, &config.labels)?;
    Ok(())
}

fn handle_inspect(args: &cli::InspectArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let accession = match &args.accession {
        Some(accession) => accession.clone(),
        None => args
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let table = raw_table::load_table(&args.input, &LoadOptions { encoding })?;
    let schema = SchemaResolver::new(args.mode).resolve(&table, &accession)?;

    let mut candidates = TextTable::new(["column", "header", "rule", "confidence", "chosen"])
        .right_align(&[0]);
    for candidate in &schema.candidates {
        let chosen = candidate.index == schema.feature_column.index;
        candidates.push_row(vec![
            candidate.index.to_string(),
            candidate.header.clone(),
            candidate.rule.clone(),
            candidate.confidence.to_string(),
            if chosen { "*".to_string() } else { String::new() },
        ]);
    }
    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "{accession}: {} row(s), identifier '{}' via {} ({} confidence)",
        table.row_count(),
        schema.feature_column.header,
        schema.feature_column.rule,
        schema.confidence()
    )?;
    if !candidates.is_empty() {
        write!(stdout, "{}", candidates.render())?;
    }
    writeln!(stdout, "{} value column(s):", schema.value_columns.len())?;
    for column in &schema.value_columns {
        writeln!(stdout, "  {} -> {}", column.header, column.sample)?;
    }
    Ok(())
}

fn handle_balance(args: &cli::BalanceArgs) -> Result<()> {
    let records = metadata::read_metadata(&args.metadata)
        .with_context(|| format!("Reading metadata from {:?}", args.metadata))?;
    let balance = balance::control_balance(&records);
    balance::balance_table(&balance).print();
    Ok(())
}

fn handle_config(args: &cli::ConfigArgs) -> Result<()> {
    let config = HarmonizeConfig::default();
    match &args.output {
        Some(path) => {
            config.save(path)?;
            info!("Default configuration written to {path:?}");
        }
        None => print!("{}", config.to_yaml()?),
    }
    Ok(())
}
