use crate::errors::{PricingError, PricingResult};
use crate::models::{finite_price, ExerciseStyle, OptionKind, PricingModel, PricingParameters};
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes closed form for European options.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
///
/// call = S*Phi(d1) - K*exp(-rT)*Phi(d2)
/// put  = K*exp(-rT)*Phi(-d2) - S*Phi(-d1)
pub struct BlackScholes {
    params: PricingParameters,
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new(params: PricingParameters) -> PricingResult<Self> {
        params.validate()?;

        if params.exercise_style != ExerciseStyle::European {
            return Err(PricingError::UnsupportedExerciseStyle(format!(
                "closed form prices european exercise only, got {}",
                params.exercise_style
            )));
        }

        Ok(Self {
            params,
            normal: Normal::standard(),
        })
    }
}

impl PricingModel for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    fn price(&self) -> PricingResult<f64> {
        let PricingParameters {
            spot: s,
            strike: k,
            time_to_expiry: t,
            risk_free_rate: r,
            volatility: sigma,
            ..
        } = self.params;

        let sigma_sqrt_t = sigma * t.sqrt();
        let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / sigma_sqrt_t;
        let d2 = d1 - sigma_sqrt_t;
        let discounted_strike = k * (-r * t).exp();

        let value = match self.params.option_kind {
            OptionKind::Call => s * self.normal.cdf(d1) - discounted_strike * self.normal.cdf(d2),
            OptionKind::Put => discounted_strike * self.normal.cdf(-d2) - s * self.normal.cdf(-d1),
        };

        // Cancellation can leave a tiny negative for deep OTM contracts.
        // Clamp after the finiteness check: f64::max would swallow a NaN.
        finite_price(self.name(), value).map(|v| v.max(0.0))
    }
}
