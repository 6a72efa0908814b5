use crate::contract::OptionContract;
use crate::errors::{PricingError, PricingResult};
use crate::models::{ExerciseStyle, OptionKind, PricingParameters};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = PricingError;

    fn from_str(s: &str) -> PricingResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(PricingError::Config(format!("OUTPUT_FORMAT: unknown format {other:?}"))),
        }
    }
}

/// Where the pricing inputs come from.
#[derive(Debug, Clone)]
pub enum ParameterSource {
    /// Fetch spot, implied vol and rate for a listed contract.
    Live(OptionContract),
    Manual(PricingParameters),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: ParameterSource,
    pub steps: usize,
    pub exercise_style: ExerciseStyle,
    pub market_data_base_url: String,
    pub rate_ticker: String,
    pub output_format: OutputFormat,
}

impl AppConfig {
    pub fn from_env() -> PricingResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> PricingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let steps = parse_var::<usize>("LATTICE_STEPS", &get_or("LATTICE_STEPS", "5000"))?;
        let exercise_style = get_or("EXERCISE_STYLE", "american").parse::<ExerciseStyle>()?;
        let output_format = get_or("OUTPUT_FORMAT", "text").parse::<OutputFormat>()?;

        let source = match lookup("OPTION_CONTRACT").filter(|s| !s.trim().is_empty()) {
            Some(symbol) => ParameterSource::Live(OptionContract::parse(&symbol)?),
            None => ParameterSource::Manual(PricingParameters {
                spot: parse_var("SPOT", &get_or("SPOT", "259.6"))?,
                strike: parse_var("STRIKE", &get_or("STRIKE", "260"))?,
                time_to_expiry: match lookup("TIME_TO_EXPIRY") {
                    Some(v) => parse_var("TIME_TO_EXPIRY", &v)?,
                    None => 344.0 / 365.0,
                },
                risk_free_rate: parse_var("RISK_FREE_RATE", &get_or("RISK_FREE_RATE", "0.05"))?,
                volatility: parse_var("VOLATILITY", &get_or("VOLATILITY", "0.4849"))?,
                steps,
                exercise_style,
                option_kind: get_or("OPTION_KIND", "put").parse::<OptionKind>()?,
            }),
        };

        Ok(Self {
            source,
            steps,
            exercise_style,
            market_data_base_url: get_or("MARKET_DATA_BASE_URL", "https://query2.finance.yahoo.com"),
            rate_ticker: get_or("RATE_TICKER", "^IRX"),
            output_format,
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> PricingResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| PricingError::Config(format!("{key}: {e}")))
}
