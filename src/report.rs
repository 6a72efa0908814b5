use crate::models::{ExerciseStyle, PricingParameters};

/// One model's answer for a request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelPrice {
    pub model: &'static str,
    pub price: f64,
}

/// Everything priced for one request. Serialized as-is for OUTPUT_FORMAT=json.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Valuation {
    pub contract: Option<String>,
    pub parameters: PricingParameters,
    /// Lattice price at the requested exercise style.
    pub price: f64,
    pub european: ModelPrice,
    pub american: ModelPrice,
    pub black_scholes: ModelPrice,
    /// american - european; never negative.
    pub early_exercise_premium: f64,
    /// european lattice - closed form.
    pub discretization_error: f64,
}

impl Valuation {
    pub fn new(
        contract: Option<String>,
        parameters: PricingParameters,
        european: ModelPrice,
        american: ModelPrice,
        black_scholes: ModelPrice,
    ) -> Self {
        let price = match parameters.exercise_style {
            ExerciseStyle::European => european.price,
            ExerciseStyle::American => american.price,
        };

        Self {
            contract,
            parameters,
            price,
            early_exercise_premium: american.price - european.price,
            discretization_error: european.price - black_scholes.price,
            european,
            american,
            black_scholes,
        }
    }

    pub fn render_text(&self) -> String {
        let p = &self.parameters;
        let mut out = String::new();

        if let Some(symbol) = &self.contract {
            out.push_str(&format!("Contract: {symbol}\n"));
        }
        out.push_str(&format!(
            "{} {} | S={:.4} K={:.4} T={:.6}y r={:.4} sigma={:.4} N={}\n",
            p.exercise_style,
            p.option_kind,
            p.spot,
            p.strike,
            p.time_to_expiry,
            p.risk_free_rate,
            p.volatility,
            p.steps
        ));

        for m in [&self.european, &self.american, &self.black_scholes] {
            out.push_str(&format!("  {:<22} ${:.2}\n", m.model, m.price));
        }

        out.push_str(&format!(
            "  {:<22} ${:.4}\n",
            "Early-exercise premium", self.early_exercise_premium
        ));
        out.push_str(&format!("Estimated price: ${:.2}", self.price));
        out
    }
}
