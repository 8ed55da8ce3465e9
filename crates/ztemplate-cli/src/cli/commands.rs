use super::CliError;
use super::helpers::*;
use anyhow::Context;
use std::path::PathBuf;
use ztemplate_core::modules::{
    FluxChecker, JsonModelLibrary, NdArchiveFile, QualityCondition, TemplatePipeline, read_archive,
};

#[derive(clap::Args)]
pub(super) struct BuildArgs {
    /// JSON configuration path; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model library directory (overrides config and SSP_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Model family to load from the library directory
    #[arg(long)]
    family: Option<String>,

    /// Directory the archive is written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct InspectArgs {
    /// Template archive path
    #[arg(value_name = "ARCHIVE")]
    archive: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct CheckArgs {
    /// JSON document with `flux` and `ivar` row arrays
    #[arg(long)]
    input: PathBuf,

    /// Where to write the corrected inverse variance and events
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON configuration path; only the `quality` section is used
    #[arg(long)]
    config: Option<PathBuf>,
}

pub(super) fn run_build_command(args: BuildArgs) -> Result<i32, CliError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }
    if let Some(family) = args.family {
        config.model_family = family;
    }
    config.apply_env();

    let data_dir = config.data_dir().map_err(CliError::Compute)?.to_path_buf();
    let pipeline = TemplatePipeline::new(config).map_err(CliError::Compute)?;
    let path = pipeline
        .run_and_write(
            &JsonModelLibrary::new(data_dir),
            &NdArchiveFile::new(&args.output_dir),
        )
        .map_err(CliError::Compute)?;

    println!("Wrote template archive: {}", path.display());
    Ok(0)
}

pub(super) fn run_inspect_command(args: InspectArgs) -> Result<i32, CliError> {
    let archive = read_archive(&args.archive).map_err(CliError::Compute)?;

    if args.json {
        let summary = InspectSummary {
            shape: archive.flux().shape(),
            baselines: archive.baselines(),
            metadata: archive.metadata(),
        };
        let rendered = serde_json::to_string_pretty(&summary)
            .context("failed to render archive summary")?;
        println!("{}", rendered);
        return Ok(0);
    }

    let metadata = archive.metadata();
    println!("Archive: {}", args.archive.display());
    println!("Shape: {:?}", archive.flux().shape());
    for (axis, baseline) in archive.baselines().iter().enumerate() {
        let values = baseline.values();
        println!(
            "Axis {}: {} [{}] {} {} values from {} to {}",
            axis + 1,
            baseline.name(),
            baseline.unit(),
            baseline.axis_type(),
            values.len(),
            values[0],
            values[values.len() - 1]
        );
    }
    println!("Pixels: {}", archive.pixel_count());
    println!("coeff0: {}", metadata.coeff0);
    println!("coeff1: {}", metadata.coeff1);
    println!("fluxunit: {}", metadata.fluxunit);
    println!("filename: {}", metadata.filename);
    Ok(0)
}

pub(super) fn run_check_command(args: CheckArgs) -> Result<i32, CliError> {
    let config = load_config(args.config.as_deref())?;
    let document = read_check_document(&args.input)?;
    let flux = rows_to_array("flux", document.flux)?;
    let ivar = rows_to_array("ivar", document.ivar)?;

    let report = FluxChecker::new(config.quality)
        .check(flux.view(), ivar.view())
        .map_err(|error| CliError::Compute(error.into()))?;
    let masked_pixels = report
        .ivar
        .iter()
        .zip(ivar.iter())
        .filter(|(after, before)| **after == 0.0 && **before != 0.0)
        .count();

    println!("Rows checked: {}", flux.nrows());
    println!(
        "Over-significant rows: {}",
        report.events_for(QualityCondition::OverSignificant).count()
    );
    println!(
        "Negative-flux rows: {}",
        report.events_for(QualityCondition::NegativeFlux).count()
    );
    println!("Masked pixels: {}", masked_pixels);

    if let Some(output) = args.output {
        write_json_report(
            &output,
            &CheckReportDocument {
                ivar: array_to_rows(&report.ivar),
                events: report.events,
                masked_pixels,
            },
        )?;
        println!("Wrote corrected inverse variance: {}", output.display());
    }
    Ok(0)
}
