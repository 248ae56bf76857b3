//! REST history client for a Fyers-style market data API
//!
//! `GET {base}/history?symbol=..&resolution=..&date_format=1&range_from=..&range_to=..&cont_flag=1`
//! answered by `{"s": "ok", "candles": [[epoch, open, high, low, close, volume], ...]}`.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::MarketDataError;
use crate::models::{Candle, DateRange};
use crate::services::market_data::MarketDataProvider;

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    s: String,
    #[serde(default)]
    candles: Vec<[f64; 6]>,
    #[serde(default)]
    message: Option<String>,
}

pub struct RestMarketDataProvider {
    client: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
}

impl RestMarketDataProvider {
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self, MarketDataError> {
        Self::with_client(base_url, access_token, reqwest::Client::new())
    }

    pub fn with_client(
        base_url: &str,
        access_token: Option<String>,
        client: reqwest::Client,
    ) -> Result<Self, MarketDataError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            MarketDataError::UpstreamUnavailable(format!("Invalid base URL '{}': {}", base_url, e))
        })?;
        Ok(Self {
            client,
            base_url,
            access_token,
        })
    }

    fn history_url(&self) -> Result<Url, MarketDataError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                MarketDataError::UpstreamUnavailable(format!(
                    "Base URL cannot be a base: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("history");
        Ok(url)
    }
}

#[async_trait]
impl MarketDataProvider for RestMarketDataProvider {
    async fn get_candles(
        &self,
        symbol: &str,
        range: &DateRange,
        resolution: u32,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let url = self.history_url()?;
        let start = range.start.format("%Y-%m-%d").to_string();
        let end = range.end.format("%Y-%m-%d").to_string();
        let resolution = resolution.to_string();

        let mut request = self.client.get(url).query(&[
            ("symbol", symbol),
            ("resolution", resolution.as_str()),
            ("date_format", "1"),
            ("range_from", start.as_str()),
            ("range_to", end.as_str()),
            ("cont_flag", "1"),
        ]);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }

        debug!(symbol = %symbol, start = %start, end = %end, "RestMarketData: requesting history for {}", symbol);

        let response = request
            .send()
            .await
            .map_err(|e| MarketDataError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(MarketDataError::RateLimited(format!(
                    "history request for {} rejected with {}",
                    symbol, status
                )))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(MarketDataError::AuthExpired(format!(
                    "history request for {} rejected with {}",
                    symbol, status
                )))
            }
            StatusCode::NOT_FOUND => return Err(MarketDataError::InvalidSymbol(symbol.to_string())),
            s if s.is_server_error() => {
                return Err(MarketDataError::UpstreamUnavailable(format!(
                    "upstream returned {}",
                    s
                )))
            }
            s if !s.is_success() => {
                return Err(MarketDataError::InvalidResponse(format!(
                    "unexpected status {}",
                    s
                )))
            }
            _ => {}
        }

        let body: HistoryResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::InvalidResponse(e.to_string()))?;

        match body.s.as_str() {
            "ok" => {}
            "no_data" => return Ok(Vec::new()),
            _ => {
                let message = body.message.unwrap_or_else(|| symbol.to_string());
                warn!(symbol = %symbol, message = %message, "RestMarketData: upstream rejected {}", symbol);
                return Err(MarketDataError::InvalidSymbol(message));
            }
        }

        let mut candles = Vec::with_capacity(body.candles.len());
        for [epoch, open, high, low, close, volume] in body.candles {
            let timestamp = Utc
                .timestamp_opt(epoch as i64, 0)
                .single()
                .ok_or_else(|| MarketDataError::InvalidResponse(format!("bad timestamp {}", epoch)))?;
            candles.push(Candle::new(open, high, low, close, volume, timestamp));
        }
        candles.sort_by_key(|c| c.timestamp);

        debug!(symbol = %symbol, count = candles.len(), "RestMarketData: received {} candles for {}", candles.len(), symbol);
        Ok(candles)
    }
}
