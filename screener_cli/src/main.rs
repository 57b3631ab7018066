use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

mod repl;

/// Split-screen layout tool: claim grid cells and export a compositor graph.
#[derive(Parser, Debug)]
#[command(name = "screener")]
#[command(version)]
pub struct Args {
    /// Log cascades and edits to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the node graph for a layout built from defaults and claimed cells
    Export {
        /// Claim the cells spanned by two indices, e.g. `1:8`; repeatable
        #[arg(long = "cells", value_name = "A:B", value_parser = parse_cells)]
        cells: Vec<(u32, u32)>,

        /// Leave out MediaIn/MediaOut for the standalone compositor
        #[arg(long)]
        studio: bool,

        /// Defaults file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the stock defaults as TOML
    Defaults,

    /// Interactive session
    Repl {
        /// Defaults file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn parse_cells(s: &str) -> Result<(u32, u32), String> {
    let (a, b) = s.split_once(':').ok_or_else(|| format!("expected A:B, got '{s}'"))?;
    let a = a.trim().parse().map_err(|_| format!("bad cell index '{a}'"))?;
    let b = b.trim().parse().map_err(|_| format!("bad cell index '{b}'"))?;
    Ok((a, b))
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout carries the export text
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_defaults(path: Option<&Path>) -> anyhow::Result<screener_core::Defaults> {
    match path {
        Some(path) => screener_core::Defaults::load(path),
        None => Ok(screener_core::Defaults::default()),
    }
}

fn export(cells: &[(u32, u32)], studio: bool, config: Option<&Path>) -> anyhow::Result<String> {
    let defaults = load_defaults(config)?;
    let mut layout = screener_core::Layout::from_defaults(&defaults)?;

    for &(a, b) in cells {
        layout
            .claim_cells(a, b)
            .with_context(|| format!("failed to claim cells {a}:{b}"))?;
    }

    let text = layout.export(studio || defaults.export.studio)?;
    info!(screens = cells.len(), "export ready");
    Ok(text)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Export {
            cells,
            studio,
            config,
        } => {
            print!("{}", export(&cells, studio, config.as_deref())?);
        }
        Command::Defaults => {
            print!("{}", screener_core::Defaults::default().to_toml_string()?);
        }
        Command::Repl { config } => {
            let defaults = load_defaults(config.as_deref())?;
            let layout = screener_core::Layout::from_defaults(&defaults)?;
            repl::run(repl::Session::new(layout, defaults.export.studio))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_does_not_error() {
        let err = Args::try_parse_from(["screener", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn a_subcommand_is_required() {
        assert!(Args::try_parse_from(["screener"]).is_err());
    }

    #[test]
    fn cells_flag_repeats() {
        let args = Args::parse_from([
            "screener", "export", "--cells", "1:8", "--cells", "30:1", "--studio",
        ]);
        match args.command {
            Command::Export { cells, studio, .. } => {
                assert_eq!(cells, vec![(1, 8), (30, 1)]);
                assert!(studio);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn malformed_cells_are_rejected() {
        let err = Args::try_parse_from(["screener", "export", "--cells", "7"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn verbose_is_global() {
        let args = Args::parse_from(["screener", "defaults", "-v"]);
        assert!(args.verbose);
    }

    #[test]
    fn export_claims_each_pair() -> anyhow::Result<()> {
        let text = export(&[(30, 1)], false, None)?;
        assert!(text.contains("SSMerge1 = Merge {"));
        assert!(!text.contains("SSMerge2"));

        let studio = export(&[(30, 1), (12, 12)], true, None)?;
        assert!(studio.contains("SSMerge2 = Merge {"));
        assert!(!studio.contains("MediaOut1"));
        Ok(())
    }

    #[test]
    fn export_reports_bad_cells() {
        let err = export(&[(1, 999)], false, None).unwrap_err();
        assert!(format!("{err:#}").contains("1:999"));
    }
}
