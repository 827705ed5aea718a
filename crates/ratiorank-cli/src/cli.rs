//! CLI argument definitions for ratiorank.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rank` | Collect attributes and print the composite ranking |
//! | `fetch` | Collect and print raw attributes |
//! | `criteria` | Print the criteria table |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `table` | Output format (table, json, ndjson) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings and errors as failures |
//! | `--timeout-ms` | `RATIORANK_TIMEOUT_MS` or 10000 | Per-symbol request timeout |
//! | `--mock` | `false` | Serve deterministic synthetic data |
//!
//! # Examples
//!
//! ```bash
//! ratiorank rank PETR4 VALE3 ITUB4 BBDC4
//! ratiorank rank PETR4 VALE3 --criteria QR,ROE,P/E --format json --pretty
//! ratiorank rank --input attributes.json --top 10
//! ratiorank fetch PETR4 --format ndjson
//! ratiorank criteria
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Rank equities by a composite of financial ratios.
#[derive(Debug, Parser)]
#[command(
    name = "ratiorank",
    author,
    version,
    about = "Rank equities by a composite of financial ratios",
    long_about = "ratiorank fetches fundamentals for a list of equities, ranks every \
symbol on each criterion (average ties, missing data last), and orders the symbols \
by the sum of their ranks. Lower totals rank better.\n\
\n\
Use 'ratiorank <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Per-symbol request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Serve deterministic synthetic attributes instead of calling Yahoo.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table.
    Table,
    /// Single JSON envelope.
    Json,
    /// One JSON object per row.
    Ndjson,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect attributes and print the composite ranking.
    ///
    /// # Examples
    ///
    ///   ratiorank rank PETR4 VALE3 ITUB4
    ///   ratiorank rank PETR4 VALE3 --criteria QR,CR,ROE --explain
    ///   ratiorank rank --input attributes.json --top 5
    Rank(RankArgs),

    /// Collect and print raw provider attributes.
    ///
    /// # Examples
    ///
    ///   ratiorank fetch PETR4 VALE3
    Fetch(FetchArgs),

    /// Print the criteria table.
    Criteria,
}

/// Collection options shared by `rank` and `fetch`.
#[derive(Debug, Clone, Args)]
pub struct CollectArgs {
    /// Exchange suffix appended to tickers (e.g. .SA); empty for none.
    #[arg(long)]
    pub suffix: Option<String>,

    /// Maximum number of concurrent provider requests.
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Arguments for the `rank` command.
#[derive(Debug, Args)]
pub struct RankArgs {
    /// Symbols to rank (e.g. PETR4 VALE3). Optional with --input.
    #[arg(num_args = 0.., required_unless_present = "input")]
    pub symbols: Vec<String>,

    #[command(flatten)]
    pub collect: CollectArgs,

    /// Comma-separated criterion codes to rank on (default: all).
    #[arg(long, value_delimiter = ',')]
    pub criteria: Option<Vec<String>>,

    /// Only print the best N rows.
    #[arg(long)]
    pub top: Option<usize>,

    /// Read attributes from a JSON file (symbol -> attributes) instead of
    /// calling the provider. Listed symbols match file keys ignoring case.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Include derived criterion values next to each rank.
    #[arg(long, default_value_t = false)]
    pub explain: bool,
}

/// Arguments for the `fetch` command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// One or more symbols.
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,

    #[command(flatten)]
    pub collect: CollectArgs,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rank_parses_criteria_list_and_globals() {
        let cli = Cli::try_parse_from([
            "ratiorank",
            "rank",
            "PETR4",
            "VALE3",
            "--criteria",
            "QR,ROE",
            "--top",
            "1",
            "--format",
            "json",
            "--mock",
        ])
        .expect("valid arguments");

        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.mock);
        let Command::Rank(args) = cli.command else {
            panic!("expected rank command");
        };
        assert_eq!(args.symbols, vec!["PETR4", "VALE3"]);
        assert_eq!(
            args.criteria,
            Some(vec![String::from("QR"), String::from("ROE")])
        );
        assert_eq!(args.top, Some(1));
    }

    #[test]
    fn rank_requires_symbols_or_input() {
        assert!(Cli::try_parse_from(["ratiorank", "rank"]).is_err());
        assert!(Cli::try_parse_from(["ratiorank", "rank", "--input", "a.json"]).is_ok());
    }

    #[test]
    fn fetch_accepts_suffix_override() {
        let cli = Cli::try_parse_from(["ratiorank", "fetch", "AAPL", "--suffix", ""])
            .expect("valid arguments");
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch command");
        };
        assert_eq!(args.collect.suffix.as_deref(), Some(""));
    }
}
