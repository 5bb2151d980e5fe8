use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub const CACHE_TTL_SECS: i64 = 60;
pub const RATE_WINDOW_SECS: i64 = 60;
pub const MAX_REQUESTS_PER_WINDOW: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("ticker symbol not found")]
    InvalidTicker,
    #[error("quote provider rate limit exceeded")]
    RateLimited,
    #[error("quote request failed")]
    RequestFailed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub latest_trading_day: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub ticker: String,
    pub company_name: String,
    pub dividend_yield: f64,
    pub dividend_per_share: f64,
    pub ex_dividend_date: Option<String>,
    pub sector: String,
    pub industry: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockData {
    #[serde(flatten)]
    pub quote: Quote,
    pub company_name: String,
    pub dividend_yield: f64,
    pub ex_dividend_date: Option<String>,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub trait QuoteProvider: Send + Sync {
    fn global_quote(
        &self,
        ticker: &str,
    ) -> impl Future<Output = Result<Quote, QuoteError>> + Send;
    fn overview(&self, ticker: &str) -> impl Future<Output = Result<Overview, QuoteError>> + Send;
}

#[derive(Debug, Clone)]
pub struct AlphaVantage {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantage {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.alphavantage.co/query";

    pub fn new(api_key: impl Into<String>) -> AlphaVantage {
        AlphaVantage::with_base_url(api_key, AlphaVantage::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> AlphaVantage {
        AlphaVantage {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn fetch(&self, function: &str, symbol: &str) -> Result<Value, QuoteError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|err| {
                warn!(%symbol, %err, "quote request failed");
                QuoteError::RequestFailed
            })?;

        let body: Value = response.json().await.map_err(|err| {
            warn!(%symbol, %err, "quote response was not valid JSON");
            QuoteError::RequestFailed
        })?;

        if body.get("Error Message").is_some() {
            return Err(QuoteError::InvalidTicker);
        }
        // The upstream signals its own throttle with a "Note" payload.
        if body.get("Note").is_some() {
            return Err(QuoteError::RateLimited);
        }

        Ok(body)
    }
}

fn text_field(object: &serde_json::Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number_field(object: &serde_json::Map<String, Value>, key: &str) -> f64 {
    object
        .get(key)
        .and_then(Value::as_str)
        .and_then(|raw| raw.trim_end_matches('%').parse().ok())
        .unwrap_or(0.0)
}

impl QuoteProvider for AlphaVantage {
    async fn global_quote(&self, ticker: &str) -> Result<Quote, QuoteError> {
        let body = self.fetch("GLOBAL_QUOTE", ticker).await?;
        let quote = body
            .get("Global Quote")
            .and_then(Value::as_object)
            .filter(|object| !object.is_empty())
            .ok_or(QuoteError::InvalidTicker)?;

        Ok(Quote {
            ticker: ticker.to_string(),
            price: number_field(quote, "05. price"),
            change: number_field(quote, "09. change"),
            change_percent: number_field(quote, "10. change percent"),
            volume: number_field(quote, "06. volume") as u64,
            latest_trading_day: text_field(quote, "07. latest trading day"),
        })
    }

    async fn overview(&self, ticker: &str) -> Result<Overview, QuoteError> {
        let body = self.fetch("OVERVIEW", ticker).await?;
        let object = body.as_object().ok_or(QuoteError::RequestFailed)?;
        if !object.contains_key("Symbol") {
            return Err(QuoteError::InvalidTicker);
        }

        let company_name = match text_field(object, "Name") {
            name if name.is_empty() => ticker.to_string(),
            name => name,
        };
        Ok(Overview {
            ticker: ticker.to_string(),
            company_name,
            dividend_yield: number_field(object, "DividendYield"),
            dividend_per_share: number_field(object, "DividendPerShare"),
            ex_dividend_date: object
                .get("ExDividendDate")
                .and_then(Value::as_str)
                .filter(|date| !date.is_empty() && *date != "None")
                .map(str::to_string),
            sector: text_field(object, "Sector"),
            industry: text_field(object, "Industry"),
        })
    }
}

#[derive(Clone, Debug)]
struct Cached<T> {
    fetched_at: DateTime<Utc>,
    value: T,
}

#[derive(Debug, Default)]
struct ServiceState {
    quotes: HashMap<String, Cached<Quote>>,
    overviews: HashMap<String, Cached<Overview>>,
    window_start: Option<DateTime<Utc>>,
    window_count: u32,
}

impl ServiceState {
    fn take_request_slot(&mut self, now: DateTime<Utc>) -> Result<(), QuoteError> {
        match self.window_start {
            Some(start) if (now - start).num_seconds() < RATE_WINDOW_SECS => {
                if self.window_count >= MAX_REQUESTS_PER_WINDOW {
                    warn!("quote rate limit window exhausted");
                    return Err(QuoteError::RateLimited);
                }
                self.window_count += 1;
            }
            _ => {
                self.window_start = Some(now);
                self.window_count = 1;
            }
        }
        Ok(())
    }
}

// All throttle and cache state is owned by the constructed service; two
// services never interfere with each other.
#[derive(Debug)]
pub struct QuoteService<P, C = SystemClock> {
    provider: P,
    clock: C,
    state: Mutex<ServiceState>,
}

impl<P: QuoteProvider> QuoteService<P> {
    pub fn new(provider: P) -> QuoteService<P> {
        QuoteService::with_clock(provider, SystemClock)
    }
}

impl<P: QuoteProvider, C: Clock> QuoteService<P, C> {
    pub fn with_clock(provider: P, clock: C) -> QuoteService<P, C> {
        QuoteService {
            provider,
            clock,
            state: Mutex::new(ServiceState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn global_quote(&self, ticker: &str) -> Result<Quote, QuoteError> {
        let ticker = ticker.to_uppercase();
        let now = self.clock.now();
        {
            let mut state = self.lock();
            if let Some(cached) = state.quotes.get(&ticker) {
                if (now - cached.fetched_at).num_seconds() < CACHE_TTL_SECS {
                    debug!(%ticker, "quote cache hit");
                    return Ok(cached.value.clone());
                }
            }
            state.take_request_slot(now)?;
        }

        let quote = self.provider.global_quote(&ticker).await?;
        self.lock().quotes.insert(
            ticker,
            Cached {
                fetched_at: now,
                value: quote.clone(),
            },
        );
        Ok(quote)
    }

    pub async fn overview(&self, ticker: &str) -> Result<Overview, QuoteError> {
        let ticker = ticker.to_uppercase();
        let now = self.clock.now();
        {
            let mut state = self.lock();
            if let Some(cached) = state.overviews.get(&ticker) {
                if (now - cached.fetched_at).num_seconds() < CACHE_TTL_SECS {
                    debug!(%ticker, "overview cache hit");
                    return Ok(cached.value.clone());
                }
            }
            state.take_request_slot(now)?;
        }

        let overview = self.provider.overview(&ticker).await?;
        self.lock().overviews.insert(
            ticker,
            Cached {
                fetched_at: now,
                value: overview.clone(),
            },
        );
        Ok(overview)
    }

    pub async fn stock_data(&self, ticker: &str) -> Result<StockData, QuoteError> {
        let quote = self.global_quote(ticker).await?;
        let overview = self.overview(ticker).await?;
        Ok(StockData {
            quote,
            company_name: overview.company_name,
            dividend_yield: overview.dividend_yield,
            ex_dividend_date: overview.ex_dividend_date,
        })
    }

    pub async fn validate_ticker(&self, ticker: &str) -> Result<bool, QuoteError> {
        match self.global_quote(ticker).await {
            Ok(_) => Ok(true),
            Err(QuoteError::InvalidTicker) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
