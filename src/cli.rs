use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "pkginsert",
    version,
    about = "Package insert section extraction tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Ingest(IngestArgs),
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SourceEncoding {
    EucJp,
    Utf8,
}

impl SourceEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EucJp => "euc-jp",
            Self::Utf8 => "utf-8",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub rules_path: Option<PathBuf>,

    #[arg(long)]
    pub min_heading_score: Option<f64>,

    #[arg(long, value_enum, default_value_t = SourceEncoding::EucJp)]
    pub encoding: SourceEncoding,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = "./drug_information")]
    pub source_dir: PathBuf,

    #[arg(long, default_value = ".cache/pkginsert")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub heading_log_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub rules_path: Option<PathBuf>,

    #[arg(long)]
    pub min_heading_score: Option<f64>,

    #[arg(long, value_enum, default_value_t = SourceEncoding::EucJp)]
    pub encoding: SourceEncoding,

    #[arg(long, default_value_t = 0.0)]
    pub report_min_score: f64,

    #[arg(long, default_value_t = 300)]
    pub report_max_lines: usize,

    #[arg(long, default_value_t = false)]
    pub no_report_candidates: bool,

    #[arg(long)]
    pub resume_after: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/pkginsert")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
