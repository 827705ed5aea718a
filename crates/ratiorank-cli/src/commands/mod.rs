mod criteria;
mod fetch;
mod rank;

use std::sync::Arc;
use std::time::Duration;

use ratiorank_core::{
    AttributeSource, Collector, CollectorConfig, Envelope, EnvelopeError, MarketSuffix,
    ProviderId, Symbol, UtcDateTime, YahooAdapter,
};
use serde_json::Value;

use crate::cli::{CollectArgs, Cli, Command};
use crate::error::CliError;
use crate::metadata;
use crate::output::TextTable;

pub struct CommandResult {
    pub data: Value,
    pub table: TextTable,
    /// One entry per NDJSON line.
    pub records: Vec<Value>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub generated_at: Option<UtcDateTime>,
    pub provider: ProviderId,
}

impl CommandResult {
    pub fn ok(data: Value, table: TextTable, provider: ProviderId) -> Self {
        Self {
            data,
            table,
            records: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            generated_at: None,
            provider,
        }
    }

    pub fn with_records(mut self, records: Vec<Value>) -> Self {
        self.records = records;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_generated_at(mut self, generated_at: UtcDateTime) -> Self {
        self.generated_at = Some(generated_at);
        self
    }
}

/// What the output layer needs to render one command run.
pub struct CommandOutput {
    pub envelope: Envelope<Value>,
    pub table: TextTable,
    pub records: Vec<Value>,
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    let result = match &cli.command {
        Command::Rank(args) => rank::run(args, cli).await?,
        Command::Fetch(args) => fetch::run(args, cli).await?,
        Command::Criteria => criteria::run()?,
    };

    let CommandResult {
        data,
        table,
        records,
        warnings,
        errors,
        latency_ms,
        generated_at,
        provider,
    } = result;

    let meta = metadata::envelope_meta(provider, latency_ms, generated_at, warnings)?;
    let envelope = Envelope::with_errors(meta, data, errors)?;

    Ok(CommandOutput {
        envelope,
        table,
        records,
    })
}

/// Collector settings: environment first, then command-line overrides.
fn collector_config(cli: &Cli, args: &CollectArgs) -> Result<CollectorConfig, CliError> {
    let mut config = CollectorConfig::from_env()?;
    if let Some(suffix) = &args.suffix {
        config = config.with_market_suffix(MarketSuffix::parse(suffix)?);
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_max_concurrency(concurrency);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_request_timeout(Duration::from_millis(timeout_ms));
    }
    Ok(config)
}

fn yahoo_source(cli: &Cli, config: &CollectorConfig) -> Arc<dyn AttributeSource> {
    let adapter = if cli.mock {
        YahooAdapter::mock()
    } else {
        YahooAdapter::live()
    };
    let timeout_ms = u64::try_from(config.request_timeout.as_millis()).unwrap_or(u64::MAX);
    Arc::new(adapter.with_timeout_ms(timeout_ms))
}

fn build_collector(cli: &Cli, args: &CollectArgs) -> Result<Collector, CliError> {
    let config = collector_config(cli, args)?;
    let source = yahoo_source(cli, &config);
    Ok(Collector::new(source, config))
}

fn parse_symbols(raw: &[String]) -> Result<Vec<Symbol>, CliError> {
    raw.iter()
        .map(|value| Symbol::parse(value).map_err(CliError::from))
        .collect()
}
