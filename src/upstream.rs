// =============================================================================
// Upstream market-data client — TradingView-style history endpoint
// =============================================================================
//
// Fetches raw price history from the market-data provider over HTTPS. The
// provider fronts its API with a certificate that is not always present in
// system trust stores, so an extra root certificate can be appended to the
// pool from a PEM file (`GATEWAY_CA_CERT`).
//
// The engine never sees HTTP: this client validates the response status,
// decodes the UDF column-array payload, and hands over a validated
// `CandleSeries`. Retries are deliberately absent — callers decide whether a
// failed fetch is worth repeating.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, Months, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::series::{Candle, CandleSeries};

/// User agent presented to the provider; it rejects non-browser agents.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.212 Safari/537.36";

/// Lightweight endpoint used as a liveness probe at startup.
const HEALTH_PATH: &str = "overview/topGainers/?count=5";

/// History endpoint in TradingView UDF format.
const HISTORY_PATH: &str = "tradingView/history";

/// HTTP client for the upstream market-data provider.
#[derive(Clone)]
pub struct HistoryClient {
    base_url: String,
    client: reqwest::Client,
}

impl HistoryClient {
    /// Build a client for `base_url`, optionally trusting an extra root
    /// certificate read from `ca_cert` (PEM).
    pub fn new(base_url: impl Into<String>, ca_cert: Option<&Path>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(10));

        if let Some(path) = ca_cert {
            let pem = std::fs::read(path)
                .with_context(|| format!("failed to read CA certificate {}", path.display()))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .with_context(|| format!("invalid PEM certificate in {}", path.display()))?;
            builder = builder.add_root_certificate(cert);
            info!(path = %path.display(), "extra root certificate added to trust pool");
        }

        let client = builder.build().context("failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "HistoryClient initialised");

        Ok(Self { base_url, client })
    }

    /// Probe the provider's top-gainers endpoint to confirm reachability.
    #[instrument(skip(self), name = "upstream::health")]
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/{}", self.base_url, HEALTH_PATH);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("upstream health request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("upstream health check returned {status}");
        }
        debug!("upstream health check ok");
        Ok(())
    }

    /// Fetch the candle history for `(symbol, resolution, from, to)` and
    /// return it as a validated series.
    #[instrument(skip(self), name = "upstream::fetch_history")]
    pub async fn fetch_history(
        &self,
        symbol: &str,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<CandleSeries> {
        let url = format!(
            "{}/{}?symbol={}&resolution={}&from={}&to={}",
            self.base_url, HISTORY_PATH, symbol, resolution, from, to
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("history request for {symbol} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("history request for {symbol} returned {status}");
        }

        let payload: HistoryPayload = resp
            .json()
            .await
            .with_context(|| format!("failed to decode history payload for {symbol}"))?;

        let series = payload.into_series()?;
        debug!(symbol, resolution, count = series.len(), "history fetched");
        Ok(series)
    }
}

impl std::fmt::Debug for HistoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Default history window: one year plus five days back from now, in UNIX
/// seconds. Long enough to warm up EMA-200 on daily candles.
pub fn default_window() -> (i64, i64) {
    let now = Utc::now();
    let start = now
        .checked_sub_months(Months::new(12))
        .unwrap_or(now)
        - Duration::days(5);
    (start.timestamp(), now.timestamp())
}

// =============================================================================
// Wire format
// =============================================================================

/// TradingView UDF history response: parallel column arrays plus a status
/// marker (`"ok"`, `"no_data"`, or `"error"`).
#[derive(Debug, Deserialize)]
struct HistoryPayload {
    s: String,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    v: Vec<f64>,
}

impl HistoryPayload {
    fn into_series(self) -> Result<CandleSeries> {
        match self.s.as_str() {
            "ok" => {}
            "no_data" => {
                warn!("provider returned no_data for requested window");
                return CandleSeries::new(Vec::new()).map_err(Into::into);
            }
            other => anyhow::bail!("provider returned history status '{other}'"),
        }

        let n = self.t.len();
        if [self.o.len(), self.h.len(), self.l.len(), self.c.len(), self.v.len()]
            .iter()
            .any(|&len| len != n)
        {
            anyhow::bail!(
                "history column length mismatch: t={} o={} h={} l={} c={} v={}",
                n,
                self.o.len(),
                self.h.len(),
                self.l.len(),
                self.c.len(),
                self.v.len()
            );
        }

        let candles: Vec<Candle> = (0..n)
            .map(|i| Candle::new(self.t[i], self.o[i], self.h[i], self.l[i], self.c[i], self.v[i]))
            .collect();

        CandleSeries::new(candles).context("provider returned an invalid candle series")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_ok_payload() {
        let json = r#"{
            "s": "ok",
            "t": [1700000000, 1700086400, 1700172800],
            "o": [500.0, 505.0, 510.0],
            "h": [506.0, 511.0, 515.0],
            "l": [498.0, 503.0, 508.0],
            "c": [505.0, 510.0, 512.0],
            "v": [12000.0, 9500.0, 11000.0]
        }"#;
        let payload: HistoryPayload = serde_json::from_str(json).unwrap();
        let series = payload.into_series().unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![505.0, 510.0, 512.0]);
        assert_eq!(series.last_close(), Some(512.0));
    }

    #[test]
    fn decode_no_data_payload_is_empty_series() {
        let json = r#"{ "s": "no_data" }"#;
        let payload: HistoryPayload = serde_json::from_str(json).unwrap();
        let series = payload.into_series().unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn decode_error_status_fails() {
        let json = r#"{ "s": "error" }"#;
        let payload: HistoryPayload = serde_json::from_str(json).unwrap();
        assert!(payload.into_series().is_err());
    }

    #[test]
    fn column_length_mismatch_fails() {
        let json = r#"{
            "s": "ok",
            "t": [1700000000, 1700086400],
            "o": [500.0],
            "h": [506.0],
            "l": [498.0],
            "c": [505.0],
            "v": [12000.0]
        }"#;
        let payload: HistoryPayload = serde_json::from_str(json).unwrap();
        let err = payload.into_series().unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn shuffled_timestamps_are_rejected() {
        let json = r#"{
            "s": "ok",
            "t": [1700086400, 1700000000],
            "o": [500.0, 505.0],
            "h": [506.0, 511.0],
            "l": [498.0, 503.0],
            "c": [505.0, 510.0],
            "v": [12000.0, 9500.0]
        }"#;
        let payload: HistoryPayload = serde_json::from_str(json).unwrap();
        assert!(payload.into_series().is_err());
    }

    #[test]
    fn default_window_spans_about_a_year() {
        let (from, to) = default_window();
        let span_days = (to - from) / 86_400;
        assert!((360..=372).contains(&span_days), "span was {span_days} days");
    }
}
