#![deny(clippy::all, warnings)]

use std::path::PathBuf;

use atty::Stream;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use plx_core::{to_json_response, CommandStatus, ExecutionOutcome, ExportFormat, ExportRequest};

mod style;

use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = PlxCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let (command, outcome) = match &cli.command {
        PlxCommand::Export(args) => (
            "export",
            plx_core::export(&export_request(args)).map_err(|err| eyre!("{err:?}"))?,
        ),
    };
    let code = emit_output(&cli, command, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

#[derive(Parser)]
#[command(
    name = "plx",
    version,
    about = "Export a resolved Python dependency lock to external formats"
)]
struct PlxCli {
    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,
    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, global = true)]
    trace: bool,
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: PlxCommand,
}

#[derive(Subcommand)]
enum PlxCommand {
    /// Write the locked dependency set in the chosen output format
    Export(ExportArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "requirements.txt")]
    format: FormatArg,
    /// Directory the exported file is written into
    #[arg(long, default_value = ".")]
    output: PathBuf,
    /// Output filename; defaults per format, `-` streams to stdout
    #[arg(long)]
    file: Option<String>,
    /// Dependency group to export (repeatable; defaults to main)
    #[arg(long = "group")]
    groups: Vec<String>,
    /// Optional extra to activate (repeatable)
    #[arg(long = "extra")]
    extras: Vec<String>,
    /// Project directory holding pyproject.toml and poetry.lock
    #[arg(long, default_value = ".")]
    directory: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    #[value(name = "requirements.txt")]
    Requirements,
    #[value(name = "pylock.toml")]
    Pylock,
}

fn export_request(args: &ExportArgs) -> ExportRequest {
    ExportRequest {
        root: args.directory.clone(),
        format: match args.format {
            FormatArg::Requirements => ExportFormat::Requirements,
            FormatArg::Pylock => ExportFormat::Pylock,
        },
        output_dir: args.output.clone(),
        output_file: args.file.clone(),
        groups: args.groups.clone(),
        extras: args.extras.clone(),
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("plx={level},plx_core={level},plx_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(cli: &PlxCli, command: &str, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = match outcome.status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    };

    if cli.json {
        let payload = to_json_response(command, outcome, code);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    if outcome.status == CommandStatus::Ok {
        // When the document itself went to stdout, the status line moves to
        // stderr so the exported text stays clean.
        let to_stdout = outcome.details["destination"] == "stdout";
        if !cli.quiet {
            if to_stdout {
                let style = Style::new(cli.no_color, atty::is(Stream::Stderr));
                eprintln!("{}", style.status(&outcome.status, &outcome.message));
            } else {
                let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
                println!("{}", style.status(&outcome.status, &outcome.message));
            }
        }
    } else {
        let style = Style::new(cli.no_color, atty::is(Stream::Stderr));
        eprintln!("{}", style.status(&outcome.status, &outcome.message));
    }
    Ok(code)
}
