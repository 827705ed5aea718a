use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{AttributeSource, AttributesFuture, SourceError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, NoopHttpClient, ReqwestHttpClient};
use crate::retry::RetryConfig;
use crate::{Field, ProviderId, RawAttributes};

const REFERER: &str = "https://finance.yahoo.com/";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const MODULES: &str = "summaryDetail,financialData,defaultKeyStatistics";
const COOKIE_ENV: &str = "YAHOO_COOKIE";

const SUMMARY_DETAIL_FIELDS: [Field; 8] = [
    Field::PreviousClose,
    Field::FiftyTwoWeekLow,
    Field::FiftyTwoWeekHigh,
    Field::FiveYearAvgDividendYield,
    Field::PayoutRatio,
    Field::Beta,
    Field::TrailingPe,
    Field::PriceToSalesTrailing12Months,
];

const FINANCIAL_DATA_FIELDS: [Field; 7] = [
    Field::QuickRatio,
    Field::CurrentRatio,
    Field::ReturnOnAssets,
    Field::ReturnOnEquity,
    Field::DebtToEquity,
    Field::GrossProfits,
    Field::EarningsGrowth,
];

const KEY_STATISTICS_FIELDS: [Field; 5] = [
    Field::FloatShares,
    Field::PriceToBook,
    Field::EnterpriseToRevenue,
    Field::EnterpriseToEbitda,
    Field::BookValue,
];

// ============================================================================
// Auth manager
// ============================================================================

#[derive(Debug, Clone)]
struct CachedCrumb {
    value: String,
    fetched_at: Instant,
}

/// Cookie/crumb session for Yahoo's anonymous API.
///
/// The session cookie comes from `fc.yahoo.com` and lives in the transport's
/// cookie jar; the crumb is fetched from `/v1/test/getcrumb` and must be sent
/// as a query parameter. A cached crumb is reused for `ttl`. Setting
/// `YAHOO_COOKIE` sends that cookie explicitly on every request.
#[derive(Debug)]
pub struct YahooAuthManager {
    cached: Mutex<Option<CachedCrumb>>,
    refresh: tokio::sync::Mutex<()>,
    ttl: Duration,
    auth: HttpAuth,
}

impl Default for YahooAuthManager {
    fn default() -> Self {
        let auth = std::env::var(COOKIE_ENV)
            .ok()
            .filter(|cookie| !cookie.trim().is_empty())
            .map_or(HttpAuth::None, HttpAuth::Cookie);
        Self::new(Duration::from_secs(3600), auth)
    }
}

impl YahooAuthManager {
    pub fn new(ttl: Duration, auth: HttpAuth) -> Self {
        Self {
            cached: Mutex::new(None),
            refresh: tokio::sync::Mutex::new(()),
            ttl,
            auth,
        }
    }

    pub fn auth(&self) -> &HttpAuth {
        &self.auth
    }

    fn slot(&self) -> MutexGuard<'_, Option<CachedCrumb>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached_crumb(&self) -> Option<String> {
        self.slot()
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.value.clone())
    }

    /// Returns a valid crumb, running the handshake when none is cached.
    /// Concurrent callers share a single handshake.
    pub async fn crumb(
        &self,
        http_client: &dyn HttpClient,
        timeout_ms: u64,
    ) -> Result<String, SourceError> {
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }

        let _refreshing = self.refresh.lock().await;
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }

        let crumb = self.handshake(http_client, timeout_ms).await?;
        *self.slot() = Some(CachedCrumb {
            value: crumb.clone(),
            fetched_at: Instant::now(),
        });
        tracing::debug!("yahoo crumb refreshed");
        Ok(crumb)
    }

    /// Drops the cached crumb; the next call performs a new handshake.
    pub fn invalidate(&self) {
        *self.slot() = None;
    }

    async fn handshake(
        &self,
        http_client: &dyn HttpClient,
        timeout_ms: u64,
    ) -> Result<String, SourceError> {
        // fc.yahoo.com answers 404 but still sets the session cookie.
        let cookie_request = HttpRequest::get(COOKIE_URL)
            .with_header("referer", REFERER)
            .with_auth(&self.auth)
            .with_timeout_ms(timeout_ms);
        http_client.execute(cookie_request).await.map_err(|error| {
            SourceError::unavailable(format!("failed to fetch yahoo cookie: {}", error.message()))
        })?;

        for url in CRUMB_URLS {
            let request = HttpRequest::get(url)
                .with_header("referer", REFERER)
                .with_auth(&self.auth)
                .with_timeout_ms(timeout_ms);

            let response = match http_client.execute(request).await {
                Ok(response) if response.is_success() => response,
                Ok(response) if response.status == 429 => {
                    return Err(SourceError::rate_limited(
                        "yahoo rate limited the crumb request",
                    ));
                }
                _ => continue,
            };

            let body = response.body.trim();
            if body.to_ascii_lowercase().contains("too many requests") {
                return Err(SourceError::rate_limited(
                    "yahoo rate limited the crumb request",
                ));
            }
            if body.is_empty() || body.contains('<') || body.contains(' ') || body.len() >= 100 {
                continue;
            }
            return Ok(body.to_owned());
        }

        Err(SourceError::unavailable(
            "failed to fetch yahoo crumb from all endpoints",
        ))
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Yahoo Finance `quoteSummary` adapter.
///
/// Built on a mock transport (the default) it serves deterministic synthetic
/// attributes seeded from the ticker and never touches the network.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    auth_manager: Arc<YahooAuthManager>,
    circuit_breaker: Arc<CircuitBreaker>,
    retry: RetryConfig,
    timeout_ms: u64,
    use_real_api: bool,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient))
    }
}

impl YahooAdapter {
    /// Adapter talking to Yahoo over reqwest.
    pub fn live() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }

    /// Adapter serving synthetic data.
    pub fn mock() -> Self {
        Self::default()
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            auth_manager: Arc::new(YahooAuthManager::default()),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            retry: RetryConfig::default(),
            timeout_ms: 10_000,
            use_real_api,
        }
    }

    pub fn with_auth_manager(mut self, auth_manager: Arc<YahooAuthManager>) -> Self {
        self.auth_manager = auth_manager;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Per-HTTP-call timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn is_mock(&self) -> bool {
        !self.use_real_api
    }

    fn summary_url(ticker: &str, crumb: &str) -> String {
        format!(
            "{QUOTE_SUMMARY_URL}/{}?modules={MODULES}&crumb={}",
            urlencoding::encode(ticker),
            urlencoding::encode(crumb)
        )
    }

    async fn fetch_real_attributes(&self, ticker: &str) -> Result<RawAttributes, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable(
                "yahoo circuit breaker is open; skipping upstream call",
            ));
        }

        let mut crumb = self.session_crumb().await?;
        let mut reauthenticated = false;
        let mut attempt = 0;

        loop {
            let request = HttpRequest::get(Self::summary_url(ticker, &crumb))
                .with_header("referer", REFERER)
                .with_auth(self.auth_manager.auth())
                .with_timeout_ms(self.timeout_ms);

            let response = match self.http_client.execute(request).await {
                Ok(response) => response,
                Err(error) => {
                    self.circuit_breaker.record_failure();
                    if attempt + 1 < self.retry.attempts() && self.retry.should_retry_error(&error)
                    {
                        self.backoff(ticker, attempt, error.message()).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(SourceError::unavailable(format!(
                        "yahoo transport error: {}",
                        error.message()
                    )));
                }
            };

            match response.status {
                200..=299 => {
                    self.circuit_breaker.record_success();
                    return parse_quote_summary(&response.body, ticker);
                }
                401 | 429 if !reauthenticated => {
                    tracing::debug!(ticker, status = response.status, "refreshing yahoo crumb");
                    self.auth_manager.invalidate();
                    crumb = self.session_crumb().await?;
                    reauthenticated = true;
                }
                401 | 429 => {
                    self.circuit_breaker.record_failure();
                    return Err(SourceError::rate_limited(format!(
                        "yahoo returned status {} after auth refresh",
                        response.status
                    )));
                }
                404 => {
                    self.circuit_breaker.record_success();
                    return Err(parse_error_payload(&response.body, ticker)
                        .unwrap_or_else(|| SourceError::not_found(ticker)));
                }
                status => {
                    self.circuit_breaker.record_failure();
                    if attempt + 1 < self.retry.attempts() && self.retry.should_retry_status(status)
                    {
                        self.backoff(ticker, attempt, &format!("status {status}")).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(SourceError::unavailable(format!(
                        "yahoo returned status {status}"
                    )));
                }
            }
        }
    }

    /// Cookie/crumb handshake; a failed handshake counts against the breaker.
    async fn session_crumb(&self) -> Result<String, SourceError> {
        let crumb = self
            .auth_manager
            .crumb(self.http_client.as_ref(), self.timeout_ms)
            .await;
        if crumb.is_err() {
            self.circuit_breaker.record_failure();
        }
        crumb
    }

    async fn backoff(&self, ticker: &str, attempt: u32, reason: &str) {
        let delay = self.retry.delay_for_attempt(attempt);
        tracing::debug!(
            ticker,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            reason,
            "retrying yahoo request"
        );
        tokio::time::sleep(delay).await;
    }
}

impl AttributeSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch_attributes<'a>(&'a self, ticker: &'a str) -> AttributesFuture<'a> {
        Box::pin(async move {
            let ticker = ticker.trim();
            if ticker.is_empty() {
                return Err(SourceError::invalid_request("ticker must not be empty"));
            }
            if self.use_real_api {
                self.fetch_real_attributes(ticker).await
            } else {
                Ok(fake_attributes(ticker))
            }
        })
    }
}

// ============================================================================
// quoteSummary payload
// ============================================================================

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    error: Option<QuoteSummaryError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "summaryDetail", default)]
    summary_detail: Option<Map<String, Value>>,
    #[serde(rename = "financialData", default)]
    financial_data: Option<Map<String, Value>>,
    #[serde(rename = "defaultKeyStatistics", default)]
    default_key_statistics: Option<Map<String, Value>>,
}

/// Decodes a `quoteSummary` body into an attribute record.
pub(crate) fn parse_quote_summary(body: &str, ticker: &str) -> Result<RawAttributes, SourceError> {
    let response: QuoteSummaryResponse = serde_json::from_str(body).map_err(|error| {
        SourceError::invalid_response(format!("failed to parse yahoo quoteSummary: {error}"))
    })?;

    if let Some(error) = response.quote_summary.error {
        return Err(summary_error(error, ticker));
    }

    let result = response
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::not_found(ticker))?;

    let mut attributes = RawAttributes::missing();
    let modules = [
        (result.summary_detail.as_ref(), &SUMMARY_DETAIL_FIELDS[..]),
        (result.financial_data.as_ref(), &FINANCIAL_DATA_FIELDS[..]),
        (result.default_key_statistics.as_ref(), &KEY_STATISTICS_FIELDS[..]),
    ];
    for (module, fields) in modules {
        let Some(module) = module else { continue };
        for &field in fields {
            attributes.set(field, module.get(field.as_str()).and_then(yahoo_number));
        }
    }

    Ok(attributes)
}

fn parse_error_payload(body: &str, ticker: &str) -> Option<SourceError> {
    let response: QuoteSummaryResponse = serde_json::from_str(body).ok()?;
    response
        .quote_summary
        .error
        .map(|error| summary_error(error, ticker))
}

fn summary_error(error: QuoteSummaryError, ticker: &str) -> SourceError {
    let code = error.code.unwrap_or_default();
    if code.eq_ignore_ascii_case("not found") {
        return SourceError::not_found(ticker);
    }
    let description = error
        .description
        .unwrap_or_else(|| String::from("no description"));
    SourceError::invalid_response(format!("yahoo quoteSummary error {code}: {description}"))
}

/// Yahoo sends numbers as `{"raw": x, "fmt": "..."}`, bare numbers, `{}` for
/// unavailable values, and occasionally strings such as `"Infinity"`. Only
/// finite numbers survive.
fn yahoo_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|v| v.is_finite()),
        Value::Object(object) => object.get("raw").and_then(yahoo_number),
        _ => None,
    }
}

// ============================================================================
// Mock data
// ============================================================================

fn fake_attributes(ticker: &str) -> RawAttributes {
    let seed = ticker_seed(ticker);
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut between = |low: f64, high: f64| low + rng.f64() * (high - low);

    let previous_close = between(4.0, 120.0);
    let low = previous_close * between(0.55, 0.95);
    let high = previous_close * between(1.02, 1.6);

    let attributes = RawAttributes::missing()
        .with(Field::PreviousClose, previous_close)
        .with(Field::FiftyTwoWeekLow, low)
        .with(Field::FiftyTwoWeekHigh, high)
        .with(Field::Beta, between(0.3, 1.9))
        .with(Field::QuickRatio, between(0.3, 2.5))
        .with(Field::CurrentRatio, between(0.6, 3.2))
        .with(Field::ReturnOnAssets, between(-0.05, 0.18))
        .with(Field::ReturnOnEquity, between(-0.1, 0.35))
        .with(Field::PriceToBook, between(0.4, 6.0))
        .with(Field::TrailingPe, between(3.0, 40.0))
        .with(Field::PriceToSalesTrailing12Months, between(0.2, 8.0))
        .with(Field::FiveYearAvgDividendYield, between(0.0, 12.0))
        .with(Field::FloatShares, between(1.0e8, 6.0e9).round())
        .with(Field::EnterpriseToRevenue, between(0.3, 9.0))
        .with(Field::EnterpriseToEbitda, between(2.0, 25.0))
        .with(Field::BookValue, between(1.0, 60.0))
        .with(Field::DebtToEquity, between(5.0, 250.0))
        .with(Field::GrossProfits, between(1.0e8, 8.0e10).round())
        .with(Field::EarningsGrowth, between(-0.4, 0.6));

    // Some issuers report no payout ratio.
    if seed % 5 == 0 {
        attributes
    } else {
        attributes.with(Field::PayoutRatio, between(0.0, 1.1))
    }
}

fn ticker_seed(ticker: &str) -> u64 {
    ticker
        .bytes()
        .fold(0_u64, |acc, byte| acc.wrapping_mul(33).wrapping_add(u64::from(byte)))
}
