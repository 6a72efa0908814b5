use crate::errors::{PricingError, PricingResult};
use crate::models::OptionKind;
use chrono::NaiveDate;

/// Digits of yymmdd + kind letter + strike in thousandths.
const SUFFIX_LEN: usize = 6 + 1 + 8;
const MAX_ROOT_LEN: usize = 6;

/// A listed equity option identified by its OCC-style symbol,
/// e.g. `TSLA260618P00400000` = TSLA, 2026-06-18, put, strike 400.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionContract {
    pub symbol: String,
    pub underlying: String,
    pub expiry: NaiveDate,
    pub kind: OptionKind,
    pub strike: f64,
}

impl OptionContract {
    pub fn parse(symbol: &str) -> PricingResult<Self> {
        let symbol = symbol.trim().to_ascii_uppercase();

        if !symbol.is_ascii() || symbol.len() <= SUFFIX_LEN {
            return Err(PricingError::Parse(format!(
                "contract symbol too short: {symbol:?}"
            )));
        }

        let (root, suffix) = symbol.split_at(symbol.len() - SUFFIX_LEN);
        if root.len() > MAX_ROOT_LEN || !root.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PricingError::Parse(format!("invalid underlying root: {root:?}")));
        }

        let (date_part, rest) = suffix.split_at(6);
        let (kind_part, strike_part) = rest.split_at(1);

        if !date_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PricingError::Parse(format!("invalid expiry digits: {date_part:?}")));
        }
        let expiry = NaiveDate::parse_from_str(date_part, "%y%m%d")?;

        let kind = match kind_part {
            "C" => OptionKind::Call,
            "P" => OptionKind::Put,
            other => return Err(PricingError::UnsupportedOptionKind(other.to_string())),
        };

        if !strike_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PricingError::Parse(format!("invalid strike digits: {strike_part:?}")));
        }
        let strike_thousandths: u64 = strike_part
            .parse()
            .map_err(|e| PricingError::Parse(format!("strike {strike_part:?}: {e}")))?;
        if strike_thousandths == 0 {
            return Err(PricingError::Parse("strike must be non-zero".into()));
        }

        Ok(Self {
            underlying: root.to_string(),
            expiry,
            kind,
            strike: strike_thousandths as f64 / 1000.0,
            symbol,
        })
    }

    /// Years to expiry counted in whole calendar days, expiry day inclusive.
    pub fn time_to_expiry(&self, today: NaiveDate) -> PricingResult<f64> {
        let days = (self.expiry - today).num_days();
        if days < 0 {
            return Err(PricingError::InvalidParameter(format!(
                "{} expired on {}",
                self.symbol, self.expiry
            )));
        }
        Ok((days + 1) as f64 / 365.0)
    }
}

impl std::fmt::Display for OptionContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {:.3}",
            self.underlying, self.expiry, self.kind, self.strike
        )
    }
}
