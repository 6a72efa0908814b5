use crate::contract::OptionContract;
use crate::errors::{PricingError, PricingResult};
use crate::models::{ExerciseStyle, PricingParameters};
use chrono::NaiveDate;
use reqwest::Client;

/// Yahoo-Finance-compatible REST client. One request per quantity, no polling.
/// Supplies the market inputs for a pricing run; staleness is not checked.
#[derive(Clone)]
pub struct MarketDataClient {
    client: Client,
    base_url: String,
    rate_ticker: String,
}

impl MarketDataClient {
    pub fn new(base_url: &str, rate_ticker: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .user_agent("Mozilla/5.0 (binomial_pricer)")
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_ticker: rate_ticker.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> PricingResult<T> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, path, "market data request failed");
                PricingError::MarketData(format!("request failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), path, "market data HTTP error");
            return Err(PricingError::MarketData(format!("HTTP {status} for {path}: {body}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| PricingError::MarketData(format!("parse {path}: {e}")))
    }

    async fn fetch_chart(&self, symbol: &str) -> PricingResult<ChartResponse> {
        let path = format!("/v8/finance/chart/{symbol}?range=1d&interval=1d");
        self.get_json(&path).await
    }

    /// Last traded price of `symbol`.
    pub async fn spot_price(&self, symbol: &str) -> PricingResult<f64> {
        let data = self.fetch_chart(symbol).await?;
        chart_price(&data, symbol)
    }

    /// Implied volatility quoted for the contract's strike, expiry and kind.
    pub async fn implied_volatility(&self, contract: &OptionContract) -> PricingResult<f64> {
        let expiry_ts = contract
            .expiry
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| PricingError::MarketData(format!("bad expiry {}", contract.expiry)))?;

        let path = format!("/v7/finance/options/{}?date={expiry_ts}", contract.underlying);
        let data: OptionChainResponse = self.get_json(&path).await?;
        chain_implied_volatility(&data, contract)
    }

    /// Risk-free proxy: the rate ticker quotes percent (e.g. ^IRX = 13-week T-bill).
    /// Zero and negative quotes are valid rates.
    pub async fn risk_free_rate(&self) -> PricingResult<f64> {
        let data = self.fetch_chart(&self.rate_ticker).await?;
        chart_rate(&data, &self.rate_ticker)
    }

    /// Assemble pricing inputs for `contract` from live quotes.
    pub async fn fetch_parameters(
        &self,
        contract: &OptionContract,
        steps: usize,
        exercise_style: ExerciseStyle,
        today: NaiveDate,
    ) -> PricingResult<PricingParameters> {
        let time_to_expiry = contract.time_to_expiry(today)?;

        let (spot, volatility, risk_free_rate) = tokio::try_join!(
            self.spot_price(&contract.underlying),
            self.implied_volatility(contract),
            self.risk_free_rate(),
        )?;

        tracing::info!(
            contract = %contract.symbol,
            spot,
            volatility,
            risk_free_rate,
            time_to_expiry,
            "market data fetched"
        );

        Ok(PricingParameters {
            spot,
            strike: contract.strike,
            time_to_expiry,
            risk_free_rate,
            volatility,
            steps,
            exercise_style,
            option_kind: contract.kind,
        })
    }
}

// Chart response (trimmed):
// {
//   "chart": {
//     "result": [ { "meta": { "symbol": "TSLA", "regularMarketPrice": 259.6 } } ],
//     "error": null
//   }
// }

#[derive(serde::Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(serde::Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(serde::Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

/// Last quote of the chart; only required to be finite.
fn chart_quote(data: &ChartResponse, symbol: &str) -> PricingResult<f64> {
    if let Some(err) = data.chart.error.as_ref().filter(|e| !e.is_null()) {
        return Err(PricingError::MarketData(format!("{symbol}: {err}")));
    }

    let price = data
        .chart
        .result
        .as_ref()
        .and_then(|r| r.first())
        .and_then(|r| r.meta.regular_market_price)
        .ok_or_else(|| PricingError::MarketData(format!("no price for {symbol}")))?;

    if !price.is_finite() {
        return Err(PricingError::MarketData(format!("invalid quote for {symbol}: {price}")));
    }

    Ok(price)
}

fn chart_price(data: &ChartResponse, symbol: &str) -> PricingResult<f64> {
    let price = chart_quote(data, symbol)?;
    if price <= 0.0 {
        return Err(PricingError::MarketData(format!("invalid price for {symbol}: {price}")));
    }
    Ok(price)
}

/// Percent quote to a decimal rate.
fn chart_rate(data: &ChartResponse, symbol: &str) -> PricingResult<f64> {
    Ok(chart_quote(data, symbol)? / 100.0)
}

// Option chain response (trimmed):
// {
//   "optionChain": {
//     "result": [ {
//       "underlyingSymbol": "TSLA",
//       "options": [ {
//         "expirationDate": 1781740800,
//         "calls": [ { "contractSymbol": "TSLA260618C00400000", "strike": 400.0, "impliedVolatility": 0.55 } ],
//         "puts":  [ ... ]
//       } ]
//     } ],
//     "error": null
//   }
// }

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionChainResponse {
    option_chain: OptionChainBody,
}

#[derive(serde::Deserialize)]
struct OptionChainBody {
    result: Option<Vec<OptionChainResult>>,
    error: Option<serde_json::Value>,
}

#[derive(serde::Deserialize)]
struct OptionChainResult {
    #[serde(default)]
    options: Vec<OptionSeries>,
}

#[derive(serde::Deserialize)]
struct OptionSeries {
    #[serde(default)]
    calls: Vec<OptionQuote>,
    #[serde(default)]
    puts: Vec<OptionQuote>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionQuote {
    contract_symbol: Option<String>,
    strike: f64,
    implied_volatility: Option<f64>,
}

fn chain_implied_volatility(
    data: &OptionChainResponse,
    contract: &OptionContract,
) -> PricingResult<f64> {
    if let Some(err) = data.option_chain.error.as_ref().filter(|e| !e.is_null()) {
        return Err(PricingError::MarketData(format!("{}: {err}", contract.symbol)));
    }

    let series = data
        .option_chain
        .result
        .as_ref()
        .and_then(|r| r.first())
        .and_then(|r| r.options.first())
        .ok_or_else(|| {
            PricingError::MarketData(format!("no option chain for {}", contract.underlying))
        })?;

    let quotes = match contract.kind {
        crate::models::OptionKind::Call => &series.calls,
        crate::models::OptionKind::Put => &series.puts,
    };

    // Prefer the exact symbol; fall back to strike when the symbol is absent
    let quote = quotes
        .iter()
        .find(|q| q.contract_symbol.as_deref() == Some(contract.symbol.as_str()))
        .or_else(|| quotes.iter().find(|q| (q.strike - contract.strike).abs() < 1e-9))
        .ok_or_else(|| {
            PricingError::MarketData(format!("{} not listed in chain", contract.symbol))
        })?;

    let vol = quote
        .implied_volatility
        .ok_or_else(|| PricingError::MarketData(format!("no implied vol for {}", contract.symbol)))?;

    if vol <= 0.0 || !vol.is_finite() {
        return Err(PricingError::MarketData(format!(
            "invalid implied vol for {}: {vol}",
            contract.symbol
        )));
    }

    Ok(vol)
}
