
use log::{LevelFilter, error, info};
use std::time::Instant;

use phasegraft::cli::core::{Commands, get_cli, FULL_VERSION};
use phasegraft::cli::inject::{InjectSettings, check_inject_settings};
use phasegraft::inject_solver::{InjectConfigBuilder, InjectError};
use phasegraft::merge_driver::inject_streams;
use phasegraft::parsing::variant_reader::{VariantReader, VariantStreamError};
use phasegraft::util::json_io::save_json;
use phasegraft::writers::stats_writer::write_run_statistics;
use phasegraft::writers::variant_writer::OutputVcf;

fn run_inject(settings: InjectSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let settings = match check_inject_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // create a debug folder if specified
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("Creating debug folder at {debug_folder:?}...");
        match std::fs::create_dir_all(debug_folder) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while creating debug folder: {e}");
                std::process::exit(exitcode::IOERR);
            }
        }

        // save the CLI options
        let cli_json = debug_folder.join("cli_settings.json");
        info!("Saving CLI options to {cli_json:?}...");
        if let Err(e) = save_json(&settings, &cli_json) {
            error!("Error while saving CLI options: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // open both input streams; the unphased input defines the output grid
    info!("Opening input VCF files...");
    let mut unphased_reader = match VariantReader::from_path(&settings.unphased_filename) {
        Ok(reader) => reader,
        Err(e) => {
            error!("Error while opening unphased input: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let mut phased_reader = match VariantReader::from_path(&settings.phased_filename) {
        Ok(reader) => reader,
        Err(e) => {
            error!("Error while opening phased input: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    // open the output; all writes go to a temporary file until the run completes
    let mut output_vcf = match OutputVcf::create(&settings.output_filename, settings.compression, settings.threads) {
        Ok(writer) => writer,
        Err(e) => {
            error!("Error while creating output VCF: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    // replay the unphased header with our provenance lines added
    let ver: &str = FULL_VERSION.as_str(); // clippy gets weird about direct access
    let metadata_lines = vec![
        format!("##phasegraft_version={ver}"),
        format!("##phasegraft_command={}", std::env::args().collect::<Vec<String>>().join(" ")),
        format!("##phasegraft_date={}", chrono::Utc::now().format("%Y-%m-%d"))
    ];
    if let Err(e) = output_vcf.writer_mut().write_header(unphased_reader.header(), &metadata_lines) {
        error!("Error while writing output header: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    // build our injection configuration
    let inject_config = match InjectConfigBuilder::default()
        .strict_genotypes(settings.strict_genotypes)
        .build() {
        Ok(ic) => ic,
        Err(e) => {
            error!("Error while building inject config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Merging variant records...");
    let stats = match inject_streams(&mut unphased_reader, &mut phased_reader, output_vcf.writer_mut(), inject_config) {
        Ok(stats) => stats,
        Err(e) => {
            error!("Error while merging inputs: {e:#}");
            let exit_code = if e.downcast_ref::<VariantStreamError>().is_some() || e.downcast_ref::<InjectError>().is_some() {
                exitcode::DATAERR
            } else {
                exitcode::IOERR
            };
            std::process::exit(exit_code);
        }
    };

    // only a completed run gets renamed into place
    if let Err(e) = output_vcf.finalize() {
        error!("Error while finalizing output VCF: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Read lines: {}", stats.read_lines());
    info!("Replaced genotypes: {}", stats.replaced_genotypes());
    info!("Inconsistent REF/ALT genotypes: {}", stats.inconsistent_ref_alt_genotypes());
    info!("Inconsistent REF/ALT alleles: {}", stats.inconsistent_ref_alt_alleles());
    info!("Kept genotypes: {}", stats.kept_genotypes());
    if stats.read_lines() > 0 {
        info!("Replaced fraction: {:.4}", stats.replaced_genotypes() as f64 / stats.read_lines() as f64);
    }

    // the statistics log goes to stdout, where the caller redirects it per run
    if let Err(e) = write_run_statistics(&stats, std::io::stdout().lock()) {
        error!("Error while writing statistics log: {e}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Injection completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Inject(settings) => {
            run_inject(*settings);
        }
    }

    info!("Process finished successfully.");
}
