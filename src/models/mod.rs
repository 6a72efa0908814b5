pub mod binomial;
pub mod black_scholes;

use crate::errors::{PricingError, PricingResult};
use std::str::FromStr;

/// All pricing models implement this trait.
/// price() must be a pure function of the parameters captured at construction.
/// Send + Sync required for dispatch onto tokio's blocking pool.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Present value of the option. Never negative on success.
    fn price(&self) -> PricingResult<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

impl FromStr for OptionKind {
    type Err = PricingError;

    fn from_str(s: &str) -> PricingResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(Self::Call),
            "put" | "p" => Ok(Self::Put),
            _ => Err(PricingError::UnsupportedOptionKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStyle {
    /// Exercisable at expiry only.
    European,
    /// Exercisable at any lattice node up to and including expiry.
    American,
}

impl std::fmt::Display for ExerciseStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::European => write!(f, "european"),
            Self::American => write!(f, "american"),
        }
    }
}

impl FromStr for ExerciseStyle {
    type Err = PricingError;

    fn from_str(s: &str) -> PricingResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "european" | "euro" | "e" => Ok(Self::European),
            "american" | "amer" | "a" => Ok(Self::American),
            _ => Err(PricingError::UnsupportedExerciseStyle(s.to_string())),
        }
    }
}

/// Inputs for one pricing run. Stack-allocated, Copy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PricingParameters {
    pub spot: f64,
    pub strike: f64,
    /// Years until expiry.
    pub time_to_expiry: f64,
    /// Annualized, continuously compounded. May be negative.
    pub risk_free_rate: f64,
    /// Annualized.
    pub volatility: f64,
    /// Lattice resolution. Ignored by the closed-form model.
    pub steps: usize,
    pub exercise_style: ExerciseStyle,
    pub option_kind: OptionKind,
}

impl PricingParameters {
    /// Same contract, different exercise style.
    #[inline]
    pub fn with_style(self, exercise_style: ExerciseStyle) -> Self {
        Self {
            exercise_style,
            ..self
        }
    }

    #[cfg(test)]
    pub fn with_kind(self, option_kind: OptionKind) -> Self {
        Self { option_kind, ..self }
    }

    /// Reject inputs no model can price. Called by every model constructor.
    pub fn validate(&self) -> PricingResult<()> {
        require_positive("spot", self.spot)?;
        require_positive("strike", self.strike)?;
        require_positive("time_to_expiry", self.time_to_expiry)?;
        require_positive("volatility", self.volatility)?;

        if !self.risk_free_rate.is_finite() {
            return Err(PricingError::InvalidParameter(format!(
                "risk_free_rate must be finite, got {}",
                self.risk_free_rate
            )));
        }

        if self.steps < 1 {
            return Err(PricingError::InvalidParameter(
                "steps must be >= 1".into(),
            ));
        }

        Ok(())
    }
}

fn require_positive(field: &str, value: f64) -> PricingResult<()> {
    // NaN fails this comparison too
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PricingError::InvalidParameter(format!(
            "{field} must be positive and finite, got {value}"
        )))
    }
}

/// Payoff from immediate exercise. Never negative.
#[inline(always)]
pub fn intrinsic(kind: OptionKind, spot: f64, strike: f64) -> f64 {
    match kind {
        OptionKind::Call => (spot - strike).max(0.0),
        OptionKind::Put => (strike - spot).max(0.0),
    }
}

/// Reject inf/nan before a price reaches the caller.
#[inline]
pub(crate) fn finite_price(model: &'static str, value: f64) -> PricingResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PricingError::NonFiniteResult { model, value })
    }
}

#[cfg(test)]
pub(crate) fn sample_params() -> PricingParameters {
    PricingParameters {
        spot: 100.0,
        strike: 120.0,
        time_to_expiry: 1.5,
        risk_free_rate: 0.05,
        volatility: 0.3,
        steps: 500,
        exercise_style: ExerciseStyle::European,
        option_kind: OptionKind::Put,
    }
}
