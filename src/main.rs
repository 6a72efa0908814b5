mod config;
mod contract;
mod errors;
mod feeds;
mod models;
mod report;

use crate::config::{AppConfig, OutputFormat, ParameterSource};
use crate::errors::PricingResult;
use crate::feeds::market_data::MarketDataClient;
use crate::models::binomial::BinomialLattice;
use crate::models::black_scholes::BlackScholes;
use crate::models::{ExerciseStyle, PricingModel, PricingParameters};
use crate::report::{ModelPrice, Valuation};

#[tokio::main]
async fn main() {
    // Structured logging on stderr; stdout carries the result only
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let output = run(&cfg)
        .await
        .and_then(|valuation| render(&valuation, cfg.output_format));

    match output {
        Ok(text) => println!("{text}"),
        Err(e) => {
            tracing::error!(error = %e, "pricing failed");
            std::process::exit(1);
        }
    }
}

fn render(valuation: &Valuation, format: OutputFormat) -> PricingResult<String> {
    match format {
        OutputFormat::Text => Ok(valuation.render_text()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(valuation)?),
    }
}

async fn run(cfg: &AppConfig) -> PricingResult<Valuation> {
    let (contract, params) = match &cfg.source {
        ParameterSource::Manual(params) => (None, *params),
        ParameterSource::Live(contract) => {
            tracing::info!(contract = %contract, "fetching market data");
            let client = MarketDataClient::new(&cfg.market_data_base_url, &cfg.rate_ticker);
            let today = chrono::Local::now().date_naive();
            let params = client
                .fetch_parameters(contract, cfg.steps, cfg.exercise_style, today)
                .await?;
            (Some(contract.symbol.clone()), params)
        }
    };

    value_request(contract, params).await
}

/// Price one request with every model. Each model is a pure function of its
/// parameters, so the runs go to the blocking pool side by side.
async fn value_request(
    contract: Option<String>,
    params: PricingParameters,
) -> PricingResult<Valuation> {
    // Construction validates; nothing is spawned for rejected inputs
    let european = BinomialLattice::new(params.with_style(ExerciseStyle::European))?;
    let american = BinomialLattice::new(params.with_style(ExerciseStyle::American))?;
    let closed_form = BlackScholes::new(params.with_style(ExerciseStyle::European))?;

    let (european, american, black_scholes) = tokio::try_join!(
        price_blocking(european),
        price_blocking(american),
        price_blocking(closed_form),
    )?;

    Ok(Valuation::new(contract, params, european, american, black_scholes))
}

async fn price_blocking<M>(model: M) -> PricingResult<ModelPrice>
where
    M: PricingModel + 'static,
{
    let started = std::time::Instant::now();
    let (name, price) = tokio::task::spawn_blocking(move || (model.name(), model.price())).await?;
    let price = price?;

    tracing::info!(
        model = name,
        price,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "valuation complete"
    );

    Ok(ModelPrice { model: name, price })
}
