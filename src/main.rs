//! `sash` command-line front end.

use anyhow::Context;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use sash::buffer::LineRing;
use sash::config::{ColorMode, Config};
use sash::error::warn_user;
use sash::runtime::{
    signals, Coordinator, ExecMode, LineSource, OutputSinks, ProcessBridge, SinkSpec,
};
use sash::terminal::{RenderOptions, TerminalSession, TtyDevice};
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

/// tee with a live tail window.
///
/// Copies standard input (or the output of COMMAND) to each FILE while
/// showing the most recent lines in a fixed window on the terminal.
#[derive(Debug, Parser)]
#[command(name = "sash", version, about)]
struct Cli {
    /// Window height in lines
    #[arg(short = 'n', long = "lines", value_name = "N", default_value = "10")]
    lines: NonZeroUsize,

    /// Flush output files after every line
    #[arg(short = 'f', long = "flush")]
    flush: bool,

    /// Run COMMAND directly instead of through /bin/sh -c
    #[arg(short = 'x', long = "exec")]
    exec: bool,

    /// Show line numbers
    #[arg(short = 'l', long = "line-numbers")]
    line_numbers: bool,

    /// Force color on
    #[arg(short = 'c', long = "color", conflicts_with = "no_color")]
    color: bool,

    /// Force color off
    #[arg(short = 'C', long = "no-color")]
    no_color: bool,

    /// Write to FILE, truncating it (repeatable)
    #[arg(short = 'w', long = "write", value_name = "FILE", action = ArgAction::Append)]
    write: Vec<PathBuf>,

    /// Append to FILE (repeatable)
    #[arg(short = 'a', long = "append", value_name = "FILE", action = ArgAction::Append)]
    append: Vec<PathBuf>,

    /// Command to run; its stdout and stderr become the input
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    command: Vec<OsString>,
}

impl Cli {
    fn into_config(self, matches: &ArgMatches) -> Config {
        let color = match (self.color, self.no_color) {
            (true, _) => ColorMode::Always,
            (_, true) => ColorMode::Never,
            _ => ColorMode::Auto,
        };
        Config {
            window_height: self.lines,
            flush_each_line: self.flush,
            exec_mode: if self.exec { ExecMode::Direct } else { ExecMode::Shell },
            line_numbers: self.line_numbers,
            color,
            outputs: ordered_outputs(matches, self.write, self.append),
            command: self.command,
        }
    }
}

/// Interleave `-w` and `-a` files back into command-line order.
fn ordered_outputs(
    matches: &ArgMatches,
    write: Vec<PathBuf>,
    append: Vec<PathBuf>,
) -> Vec<SinkSpec> {
    let write_at = matches.indices_of("write").into_iter().flatten();
    let append_at = matches.indices_of("append").into_iter().flatten();

    let mut indexed: Vec<(usize, SinkSpec)> = write_at
        .zip(write.into_iter().map(SinkSpec::truncate))
        .chain(append_at.zip(append.into_iter().map(SinkSpec::append)))
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, spec)| spec).collect()
}

/// Parse the command line. Help and version exit 0; usage errors exit 1.
fn parse_args() -> Result<Config, ExitCode> {
    let matches = Cli::command().try_get_matches().map_err(|err| {
        let code = if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        // Nothing useful to do if printing the usage message itself fails.
        let _ = err.print();
        code
    })?;
    let cli = Cli::from_arg_matches(&matches).map_err(|err| {
        let _ = err.print();
        ExitCode::FAILURE
    })?;
    Ok(cli.into_config(&matches))
}

fn run(config: &Config) -> anyhow::Result<i32> {
    if let Err(err) = sash::logging::init_from_env() {
        warn_user(format_args!("cannot set up logging: {err}"));
    }

    let device = match TtyDevice::open() {
        Ok(device) => Some(device),
        Err(err) => {
            tracing::debug!(%err, "no controlling terminal, passing lines through");
            None
        }
    };
    let options = RenderOptions {
        line_numbers: config.line_numbers,
        color: config.color.resolve_from_env(device.is_some()),
    };
    let height = config.window_height.get();

    let sinks = OutputSinks::open(&config.outputs, config.flush_each_line);
    let notifications = signals::install().context("installing signal handlers")?;

    let bridge = if config.has_command() {
        let bridge = ProcessBridge::spawn(&config.command, config.exec_mode)
            .context("starting command")?;
        Some(bridge)
    } else {
        if io::stdin().is_terminal() {
            warn_user(format_args!(
                "warning: reading from terminal (did you forget to pipe input?)"
            ));
        }
        None
    };

    let session = device.map(|device| TerminalSession::new(device, height, options));
    let coordinator = Coordinator::new(
        LineRing::new(height),
        session,
        sinks,
        io::stdout().lock(),
        notifications,
    );

    let outcome = match bridge {
        Some(bridge) => coordinator
            .with_child(bridge.child)
            .run(LineSource::new(bridge.output)),
        None => {
            let source = LineSource::stdin().context("reading standard input")?;
            coordinator.run(source)
        }
    };
    Ok(outcome.exit_code)
}

fn main() -> ExitCode {
    let config = match parse_args() {
        Ok(config) => config,
        Err(code) => return code,
    };

    match run(&config) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("sash: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sash::runtime::SinkMode;

    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        let matches = Cli::command().try_get_matches_from(args)?;
        let cli = Cli::from_arg_matches(&matches)?;
        Ok(cli.into_config(&matches))
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["sash"]).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_flags() {
        let config = parse(&["sash", "-n", "4", "-f", "-x", "-l", "-C"]).unwrap();
        assert_eq!(config.window_height.get(), 4);
        assert!(config.flush_each_line);
        assert_eq!(config.exec_mode, ExecMode::Direct);
        assert!(config.line_numbers);
        assert_eq!(config.color, ColorMode::Never);
    }

    #[test]
    fn test_zero_height_is_rejected() {
        assert!(parse(&["sash", "-n", "0"]).is_err());
        assert!(parse(&["sash", "-n", "abc"]).is_err());
    }

    #[test]
    fn test_color_flags_conflict() {
        assert!(parse(&["sash", "-c", "-C"]).is_err());
    }

    #[test]
    fn test_outputs_keep_command_line_order() {
        let config = parse(&["sash", "-a", "one", "-w", "two", "-a", "three"]).unwrap();
        let order: Vec<_> = config
            .outputs
            .iter()
            .map(|spec| (spec.path.to_str().unwrap(), spec.mode))
            .collect();
        assert_eq!(
            order,
            vec![
                ("one", SinkMode::Append),
                ("two", SinkMode::Truncate),
                ("three", SinkMode::Append),
            ]
        );
    }

    #[test]
    fn test_trailing_command_keeps_its_flags() {
        let config = parse(&["sash", "-n", "3", "make", "-j4", "-n"]).unwrap();
        assert_eq!(config.window_height.get(), 3);
        let expected: Vec<OsString> = ["make", "-j4", "-n"].map(OsString::from).into();
        assert_eq!(config.command, expected);
    }
}
