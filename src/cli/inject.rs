
use anyhow::ensure;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use strum_macros::EnumString;

use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};

#[derive(Clone, Copy, Default, Debug, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum OutputCompression {
    /// Compresses when the output path ends with .gz
    #[default]
    #[strum(ascii_case_insensitive, serialize = "auto")]
    #[clap(name = "auto")]
    Auto,
    /// Always writes bgzip-compressed output
    #[strum(ascii_case_insensitive, serialize = "bgzf")]
    #[clap(name = "bgzf")]
    Bgzf,
    /// Always writes plain text output
    #[strum(ascii_case_insensitive, serialize = "plain")]
    #[clap(name = "plain")]
    Plain,
}

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct InjectSettings {
    #[clap(skip)]
    phasegraft_version: String,

    /// Unphased input VCF; defines the coordinate grid and all pass-through content of the output
    #[clap(value_name = "UNPHASED_VCF")]
    pub unphased_filename: PathBuf,

    /// Phased input VCF; may cover a subset of the unphased coordinates
    #[clap(value_name = "PHASED_VCF")]
    pub phased_filename: PathBuf,

    /// Output merged VCF; statistics are written to stdout
    #[clap(value_name = "OUT_VCF")]
    pub output_filename: PathBuf,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// Selects the output compression mode
    #[clap(long = "compression")]
    #[clap(value_name = "MODE")]
    #[clap(default_value = "auto")]
    #[clap(help_heading = Some("Input/Output"))]
    pub compression: OutputCompression,

    /// Restricts genotypes at matched coordinates to the biallelic diploid set
    #[clap(long = "strict-genotypes")]
    #[clap(help_heading = Some("Injection parameters"))]
    pub strict_genotypes: bool,

    /// Number of threads to use for output compression
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn check_inject_settings(mut settings: InjectSettings) -> anyhow::Result<InjectSettings> {
    // hard code the version in
    settings.phasegraft_version = FULL_VERSION.clone();
    info!("Phasegraft version: {:?}", &settings.phasegraft_version);
    info!("Sub-command: inject");
    info!("Inputs:");

    // check for all the required input files
    check_required_filename(&settings.unphased_filename, "Unphased VCF")?;
    info!("\tUnphased VCF: {:?}", &settings.unphased_filename);
    check_required_filename(&settings.phased_filename, "Phased VCF")?;
    info!("\tPhased VCF: {:?}", &settings.phased_filename);

    // outputs; refuse to clobber an input in place
    ensure!(settings.output_filename != settings.unphased_filename, "Output VCF must not overwrite the unphased input");
    ensure!(settings.output_filename != settings.phased_filename, "Output VCF must not overwrite the phased input");
    info!("Outputs:");
    info!("\tMerged VCF: {:?}", &settings.output_filename);
    info!("\tCompression mode: {}", settings.compression);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    info!("Injection parameters:");
    info!("\tStrict genotypes: {}", if settings.strict_genotypes { "ENABLED" } else { "DISABLED" });

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Compression threads: {}", settings.threads);

    Ok(settings)
}
