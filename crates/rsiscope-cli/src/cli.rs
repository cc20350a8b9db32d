//! CLI argument definitions for rsiscope.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rsi` | Price series with RSI for a stock or crypto asset |
//! | `fundamentals` | Ratio tables for one or more tickers |
//! | `forecast` | Five-day moving-average projection |
//! | `news` | Latest headlines for a company |
//! | `insights` | AI commentary for a company |
//! | `sources` | List data source capabilities |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, ndjson, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--source` | `auto` | Source selection strategy |
//! | `--timeout-ms` | `10000` | Request timeout in ms |
//!
//! # Examples
//!
//! ```bash
//! rsiscope rsi AAPL --interval 1d --days 90
//! rsiscope rsi ETH --asset crypto --interval 1h --days 30 --csv eth.csv
//! rsiscope fundamentals AAPL,MSFT TSLA --zip fundamentals.zip
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use rsiscope_core::indicators::DEFAULT_RSI_PERIOD;

/// Relative strength and fundamentals analyzer.
///
/// Fetches prices from Yahoo Finance or, for crypto assets, from KuCoin,
/// Kraken and Coinbase in turn.
#[derive(Debug, Parser)]
#[command(
    name = "rsiscope",
    author,
    version,
    about = "RSI and fundamentals analyzer for stocks and crypto assets"
)]
pub struct Cli {
    /// Output format for results.
    ///
    /// - json: Single JSON object (default)
    /// - ndjson: One JSON object per line
    /// - table: ASCII table format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Source selection strategy for routing requests.
    #[arg(long, global = true, value_enum, default_value_t = SourceSelector::Auto)]
    pub source: SourceSelector,

    /// Request timeout in milliseconds. Overrides RSISCOPE_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format for terminal display.
    Table,
    /// Single JSON object output.
    Json,
    /// Newline-delimited JSON (one record per line).
    Ndjson,
}

/// Source selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceSelector {
    /// Asset-class fallback chain.
    Auto,
    /// Use Yahoo Finance only.
    Yahoo,
    /// Use KuCoin only.
    Kucoin,
    /// Use Kraken only.
    Kraken,
    /// Use Coinbase only.
    Coinbase,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch closing prices and compute the Relative Strength Index.
    ///
    /// # Examples
    ///
    ///   rsiscope rsi AAPL
    ///   rsiscope rsi BTC --asset crypto --interval 4h --days 60
    Rsi(RsiArgs),

    /// Derive fundamental ratio tables for one or more tickers.
    ///
    /// Tickers may be given as separate arguments or comma-separated.
    Fundamentals(FundamentalsArgs),

    /// Project the next close from the latest five-day moving average.
    Forecast(ForecastArgs),

    /// Show the latest news headlines for a company. Needs NEWS_API_KEY.
    News(CompanyArgs),

    /// Ask the chat model for an analysis of a company. Needs OPENAI_API_KEY.
    Insights(CompanyArgs),

    /// List data source capability matrix.
    Sources(SourcesArgs),
}

/// Asset class selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AssetArg {
    Stock,
    Crypto,
}

#[derive(Debug, Args)]
pub struct RsiArgs {
    /// Ticker (AAPL) or crypto base asset (BTC).
    pub symbol: String,

    #[arg(long, value_enum, default_value_t = AssetArg::Stock)]
    pub asset: AssetArg,

    /// Bar interval: 1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w.
    #[arg(long, default_value = "1d")]
    pub interval: String,

    /// Lookback window in days.
    #[arg(long, default_value_t = 365)]
    pub days: u32,

    /// RSI smoothing period.
    #[arg(long, default_value_t = DEFAULT_RSI_PERIOD)]
    pub period: usize,

    /// Only include the last N rows in the output.
    #[arg(long)]
    pub tail: Option<usize>,

    /// Write `timestamp,Price,RSI` to this CSV file.
    #[arg(long)]
    pub csv: Option<std::path::PathBuf>,
}

#[derive(Debug, Args)]
pub struct FundamentalsArgs {
    /// One or more tickers.
    #[arg(required = true, num_args = 1.., value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// Write per-ticker CSVs into this ZIP archive.
    #[arg(long)]
    pub zip: Option<std::path::PathBuf>,
}

#[derive(Debug, Args)]
pub struct ForecastArgs {
    pub ticker: String,

    #[arg(long, value_enum, default_value_t = AssetArg::Stock)]
    pub asset: AssetArg,
}

#[derive(Debug, Args)]
pub struct CompanyArgs {
    /// Company name or ticker, e.g. "Apple".
    #[arg(required = true, num_args = 1..)]
    pub company: Vec<String>,
}

impl CompanyArgs {
    pub fn query(&self) -> String {
        self.company.join(" ")
    }
}

#[derive(Debug, Args)]
pub struct SourcesArgs {
    /// Include supported intervals per source.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fundamentals_accepts_comma_separated_tickers() {
        let cli = Cli::try_parse_from(["rsiscope", "fundamentals", "AAPL,MSFT", "TSLA"])
            .expect("parses");
        let Command::Fundamentals(args) = cli.command else {
            panic!("expected fundamentals");
        };
        assert_eq!(args.tickers, ["AAPL", "MSFT", "TSLA"]);
    }

    #[test]
    fn rsi_defaults() {
        let cli = Cli::try_parse_from(["rsiscope", "rsi", "btc", "--asset", "crypto"])
            .expect("parses");
        assert_eq!(cli.source, SourceSelector::Auto);
        assert_eq!(cli.timeout_ms, None);
        let Command::Rsi(args) = cli.command else {
            panic!("expected rsi");
        };
        assert_eq!(args.asset, AssetArg::Crypto);
        assert_eq!(args.interval, "1d");
        assert_eq!(args.period, 14);
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["rsiscope", "sources", "--source", "kraken", "--pretty"])
            .expect("parses");
        assert_eq!(cli.source, SourceSelector::Kraken);
        assert!(cli.pretty);
    }
}
