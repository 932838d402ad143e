use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{assay::AssayMode, labels::sources::parse_accession_path};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Harmonize protein and small-RNA study tables into one labelled matrix",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process every study and write the merged matrix and sample metadata
    Harmonize(HarmonizeArgs),
    /// Re-run the label cascade over an existing metadata table
    Refine(RefineArgs),
    /// Choose one disease label per study from repository evidence
    FinalizeLabels(FinalizeLabelsArgs),
    /// Show how a single table's schema resolves
    Inspect(InspectArgs),
    /// Report healthy-control balance per study
    Balance(BalanceArgs),
    /// Print or write the default configuration as YAML
    Config(ConfigArgs),
}

/// External label channels shared by `harmonize` and `refine`.
#[derive(Debug, Args, Default)]
pub struct LabelSourceArgs {
    /// Study disease table (accession + disease columns) used for sample-name inference
    #[arg(long = "study-diseases")]
    pub study_diseases: Option<PathBuf>,
    /// Finalized study labels (accession + label columns)
    #[arg(long = "final-labels")]
    pub final_labels: Option<PathBuf>,
    /// Sample characteristics table with accession,sample,text columns (repeatable)
    #[arg(long = "characteristics", action = clap::ArgAction::Append)]
    pub characteristics: Vec<PathBuf>,
    /// GEO series-matrix file for one study as ACCESSION=PATH (repeatable)
    #[arg(long = "series-matrix", value_parser = parse_accession_path, action = clap::ArgAction::Append)]
    pub series_matrix: Vec<(String, PathBuf)>,
}

#[derive(Debug, Args)]
pub struct HarmonizeArgs {
    /// Table family of every study in this run
    #[arg(long, value_enum)]
    pub mode: AssayMode,
    /// Study table as ACCESSION=PATH (repeatable)
    #[arg(long = "study", value_parser = parse_accession_path, action = clap::ArgAction::Append)]
    pub studies: Vec<(String, PathBuf)>,
    /// CSV manifest with accession,path columns
    #[arg(long)]
    pub manifest: Option<PathBuf>,
    #[command(flatten)]
    pub labels: LabelSourceArgs,
    /// miRBase mature FASTA used to name sequence identifiers
    #[arg(long)]
    pub mirbase: Option<PathBuf>,
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Worker threads for per-study processing (0 uses all cores)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
    /// Character encoding of the study tables (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Output path for the harmonized matrix
    #[arg(long)]
    pub matrix: PathBuf,
    /// Output path for the sample metadata table
    #[arg(long)]
    pub metadata: PathBuf,
    /// Optional JSON run report
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RefineArgs {
    /// Existing metadata table
    #[arg(short, long)]
    pub input: PathBuf,
    /// Destination for the relabelled table (defaults to overwriting the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub labels: LabelSourceArgs,
    /// Start from sample-name inference instead of the recorded condition
    #[arg(long = "from-names")]
    pub from_names: bool,
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FinalizeLabelsArgs {
    /// Study evidence table (Accession, Existing_Label, Diseases, Keywords, Title, Description, Abstract)
    #[arg(short, long)]
    pub input: PathBuf,
    /// Destination for Accession,Final_Disease_Label,Label_Source
    #[arg(short, long)]
    pub output: PathBuf,
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Study table to inspect
    #[arg(short, long)]
    pub input: PathBuf,
    #[arg(long, value_enum)]
    pub mode: AssayMode,
    /// Accession used in messages (defaults to the file stem)
    #[arg(long)]
    pub accession: Option<String>,
    /// Character encoding of the table (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct BalanceArgs {
    /// Harmonized metadata table
    #[arg(short, long)]
    pub metadata: PathBuf,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write to this file instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
