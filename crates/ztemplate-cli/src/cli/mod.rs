mod commands;
mod helpers;

use clap::Parser;
use ztemplate_core::domain::TemplateError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let template_error = error.as_template_error();
            eprintln!("{}", template_error.diagnostic_line());
            eprintln!("{}", template_error.fatal_exit_line());
            template_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("ztemplate".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "ztemplate",
    version,
    about = "Redshift template builder for spectral model libraries"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Build a velocity-dispersion x age template archive from a model library
    Build(commands::BuildArgs),
    /// Print the shape, baselines and metadata of a template archive
    Inspect(commands::InspectArgs),
    /// Screen flux / inverse-variance arrays and mask unphysical pixels
    Check(commands::CheckArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Build(args) => commands::run_build_command(args),
        CliCommand::Inspect(args) => commands::run_inspect_command(args),
        CliCommand::Check(args) => commands::run_check_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(TemplateError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_template_error(&self) -> TemplateError {
        match self {
            Self::Usage(message) => {
                TemplateError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => TemplateError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
