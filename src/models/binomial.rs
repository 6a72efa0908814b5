use crate::errors::{PricingError, PricingResult};
use crate::models::{finite_price, intrinsic, ExerciseStyle, PricingModel, PricingParameters};

/// Cox-Ross-Rubinstein binomial lattice.
///
/// Node `i` of layer `j` is the state reached after `i` up-moves and `j - i`
/// down-moves:
///
///   S(j, i) = spot * up^i * down^(j - i) = spot * up^(2i - j)
///
/// so node `i` at layer `j` has children `i` (down) and `i + 1` (up) at
/// layer `j + 1`. The same convention is used for the terminal payoffs, the
/// continuation value and the American intrinsic value.
///
/// All derived constants are computed in `new()`. `price()` allocates two
/// buffers of `steps + 1` and overwrites them in place as the layer shrinks.
///
/// Numeric range: node prices are taken as a single power of `up`, so an
/// extreme node saturates to `inf` or `0` instead of `inf * 0 = NaN`. A call
/// whose top node overflows rolls back to a non-finite value, which is rejected.
#[derive(Debug, Clone)]
pub struct BinomialLattice {
    params: PricingParameters,
    up: f64,
    /// Risk-neutral probability of an up-move, in (0, 1).
    prob: f64,
    /// exp(-r * dt)
    discount: f64,
}

impl BinomialLattice {
    pub fn new(params: PricingParameters) -> PricingResult<Self> {
        params.validate()?;

        let dt = params.time_to_expiry / params.steps as f64;
        let up = (params.volatility * dt.sqrt()).exp();
        let down = 1.0 / up;
        let prob = ((params.risk_free_rate * dt).exp() - down) / (up - down);

        // Negated so NaN is rejected as well
        if !(prob > 0.0 && prob < 1.0) {
            return Err(PricingError::ArbitrageViolation { prob });
        }

        let discount = (-params.risk_free_rate * dt).exp();

        tracing::debug!(
            steps = params.steps,
            dt,
            up,
            down,
            prob,
            style = %params.exercise_style,
            "binomial lattice constructed"
        );

        Ok(Self {
            params,
            up,
            prob,
            discount,
        })
    }

    /// Underlying price at node `index` of `layer`.
    #[inline]
    pub fn node_price(&self, layer: usize, index: usize) -> f64 {
        debug_assert!(index <= layer);
        // up * down == 1, so up^i * down^(j-i) collapses to one exponent
        let exponent = 2.0 * index as f64 - layer as f64;
        self.params.spot * self.up.powf(exponent)
    }

    /// Terminal layer: asset prices and payoffs at expiry.
    fn terminal_layer(&self, asset_prices: &mut [f64], option_values: &mut [f64]) {
        let n = self.params.steps;
        let kind = self.params.option_kind;
        let strike = self.params.strike;

        for (i, (s, v)) in asset_prices
            .iter_mut()
            .zip(option_values.iter_mut())
            .enumerate()
        {
            *s = self.node_price(n, i);
            *v = intrinsic(kind, *s, strike);
        }
    }

    /// Backward induction. Returns the value at the root node.
    fn roll_back(&self, asset_prices: &mut [f64], option_values: &mut [f64]) -> f64 {
        let n = self.params.steps;
        let kind = self.params.option_kind;
        let strike = self.params.strike;

        let disc_up = self.discount * self.prob;
        let disc_down = self.discount * (1.0 - self.prob);

        for layer in (0..n).rev() {
            match self.params.exercise_style {
                ExerciseStyle::European => {
                    for i in 0..=layer {
                        option_values[i] =
                            disc_up * option_values[i + 1] + disc_down * option_values[i];
                    }
                }
                ExerciseStyle::American => {
                    for i in 0..=layer {
                        let continuation =
                            disc_up * option_values[i + 1] + disc_down * option_values[i];
                        // S(j+1, i) * up = S(j, i) since up * down == 1.
                        // Must happen before the intrinsic value is taken.
                        asset_prices[i] *= self.up;
                        let exercise = intrinsic(kind, asset_prices[i], strike);
                        option_values[i] = continuation.max(exercise);
                    }
                }
            }
        }

        option_values[0]
    }
}

impl PricingModel for BinomialLattice {
    fn name(&self) -> &'static str {
        match self.params.exercise_style {
            ExerciseStyle::European => "Binomial (European)",
            ExerciseStyle::American => "Binomial (American)",
        }
    }

    /// Pure function: same lattice, same bits.
    fn price(&self) -> PricingResult<f64> {
        let width = self.params.steps + 1;
        let mut asset_prices = vec![0.0_f64; width];
        let mut option_values = vec![0.0_f64; width];

        self.terminal_layer(&mut asset_prices, &mut option_values);
        let value = self.roll_back(&mut asset_prices, &mut option_values);

        finite_price(self.name(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::BlackScholes;
    use crate::models::{sample_params, OptionKind};

    fn lattice_price(params: PricingParameters) -> f64 {
        BinomialLattice::new(params).unwrap().price().unwrap()
    }

    #[test]
    fn test_derived_constants() {
        let lattice = BinomialLattice::new(sample_params()).unwrap();
        assert!((lattice.up * (1.0 / lattice.up) - 1.0).abs() < 1e-15);
        let dt: f64 = 1.5 / 500.0;
        assert!((lattice.up - (0.3 * dt.sqrt()).exp()).abs() < 1e-15);
        assert!((lattice.discount - (-0.05 * dt).exp()).abs() < 1e-15);
        let p = lattice.prob;
        assert!(p > 0.0 && p < 1.0, "p={p}");
    }

    #[test]
    fn test_negative_spot_rejected() {
        let params = PricingParameters { spot: -1.0, ..sample_params() };
        assert!(matches!(
            BinomialLattice::new(params),
            Err(PricingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_zero_steps_rejected() {
        let params = PricingParameters { steps: 0, ..sample_params() };
        assert!(matches!(
            BinomialLattice::new(params),
            Err(PricingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_arbitrage_violation_rejected() {
        // One coarse step with a rate far above volatility: exp(r*dt) > up.
        let params = PricingParameters {
            time_to_expiry: 1.0,
            risk_free_rate: 0.5,
            volatility: 0.2,
            steps: 1,
            ..sample_params()
        };
        match BinomialLattice::new(params) {
            Err(PricingError::ArbitrageViolation { prob }) => {
                assert!(prob > 1.0, "prob={prob} should exceed 1")
            }
            other => panic!("expected ArbitrageViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_two_step_tree_by_hand() {
        let params = PricingParameters {
            spot: 100.0,
            strike: 100.0,
            time_to_expiry: 1.0,
            risk_free_rate: 0.05,
            volatility: 0.2,
            steps: 2,
            exercise_style: ExerciseStyle::American,
            option_kind: OptionKind::Put,
        };

        let dt: f64 = 0.5;
        let u = (0.2 * dt.sqrt()).exp();
        let d = 1.0 / u;
        let p = ((0.05 * dt).exp() - d) / (u - d);
        let disc = (-0.05 * dt).exp();
        let put = |s: f64| (100.0 - s).max(0.0);

        // Terminal: uu, ud, dd
        let v_uu = put(100.0 * u * u);
        let v_ud = put(100.0);
        let v_dd = put(100.0 * d * d);

        let euro_u = disc * (p * v_uu + (1.0 - p) * v_ud);
        let euro_d = disc * (p * v_ud + (1.0 - p) * v_dd);
        let euro_0 = disc * (p * euro_u + (1.0 - p) * euro_d);

        // Early exercise at layer 1 uses S(1, i), not the terminal prices.
        let amer_u = euro_u.max(put(100.0 * u));
        let amer_d = euro_d.max(put(100.0 * d));
        let amer_0 = (disc * (p * amer_u + (1.0 - p) * amer_d)).max(put(100.0));

        let american = lattice_price(params);
        let european = lattice_price(params.with_style(ExerciseStyle::European));

        assert!((european - euro_0).abs() < 1e-12, "european={european} expected={euro_0}");
        assert!((american - amer_0).abs() < 1e-12, "american={american} expected={amer_0}");
        assert!((american - 5.737654377069708).abs() < 1e-9, "american={american}");
        assert!((european - 4.6634437886543445).abs() < 1e-9, "european={european}");
    }

    #[test]
    fn test_node_price_convention() {
        let lattice = BinomialLattice::new(sample_params()).unwrap();
        let n = lattice.params.steps;
        // Up-moves increase with the index.
        assert!(lattice.node_price(n, 1) > lattice.node_price(n, 0));
        // Walking node i back one layer by `up` lands on S(j-1, i).
        for i in [0usize, 7, 250, 499] {
            let walked = lattice.node_price(n, i) * lattice.up;
            let direct = lattice.node_price(n - 1, i);
            assert!(
                ((walked - direct) / direct).abs() < 1e-12,
                "i={i} walked={walked} direct={direct}"
            );
        }
        // Recombining: up then down returns to the parent's price.
        let parent = lattice.node_price(10, 4);
        let child_up = lattice.node_price(11, 5);
        assert!((child_up / lattice.up - parent).abs() / parent < 1e-12);
    }

    #[test]
    fn test_price_non_negative() {
        let base = sample_params();
        for kind in [OptionKind::Call, OptionKind::Put] {
            for style in [ExerciseStyle::European, ExerciseStyle::American] {
                for strike in [50.0, 100.0, 120.0, 400.0] {
                    let params = PricingParameters { strike, ..base }
                        .with_kind(kind)
                        .with_style(style);
                    let v = lattice_price(params);
                    assert!(v >= 0.0, "{kind} {style} K={strike} price={v}");
                }
            }
        }
    }

    #[test]
    fn test_put_call_parity() {
        let params = sample_params();
        let call = lattice_price(params.with_kind(OptionKind::Call));
        let put = lattice_price(params.with_kind(OptionKind::Put));
        let forward = params.spot
            - params.strike * (-params.risk_free_rate * params.time_to_expiry).exp();
        assert!(
            (call - put - forward).abs() < 1e-8,
            "C-P={} forward={forward}",
            call - put
        );
    }

    #[test]
    fn test_american_at_least_european() {
        let base = sample_params();
        for kind in [OptionKind::Call, OptionKind::Put] {
            for rate in [-0.01, 0.0, 0.05] {
                let params = PricingParameters { risk_free_rate: rate, ..base }.with_kind(kind);
                let euro = lattice_price(params.with_style(ExerciseStyle::European));
                let amer = lattice_price(params.with_style(ExerciseStyle::American));
                assert!(amer >= euro, "{kind} r={rate}: american={amer} < european={euro}");
            }
        }
    }

    #[test]
    fn test_american_call_without_dividends_matches_european() {
        let params = sample_params().with_kind(OptionKind::Call);
        let euro = lattice_price(params.with_style(ExerciseStyle::European));
        let amer = lattice_price(params.with_style(ExerciseStyle::American));
        assert!((amer - euro).abs() < 1e-9, "american={amer} european={euro}");
    }

    #[test]
    fn test_converges_to_black_scholes() {
        let params = PricingParameters { steps: 3000, ..sample_params() };
        let lattice = lattice_price(params);
        let closed = BlackScholes::new(params).unwrap().price().unwrap();
        assert!(
            (lattice - closed).abs() < 1e-2,
            "lattice={lattice} black-scholes={closed}"
        );
        assert!((closed - 21.710634713337868).abs() < 1e-6, "black-scholes={closed}");
    }

    #[test]
    fn test_low_volatility_tends_to_discounted_forward() {
        let params = PricingParameters {
            spot: 100.0,
            strike: 90.0,
            time_to_expiry: 1.0,
            risk_free_rate: 0.05,
            volatility: 0.01,
            steps: 100,
            exercise_style: ExerciseStyle::European,
            option_kind: OptionKind::Call,
        };
        let expected = 100.0 - 90.0 * (-0.05_f64).exp();
        for style in [ExerciseStyle::European, ExerciseStyle::American] {
            let v = lattice_price(params.with_style(style));
            assert!((v - expected).abs() < 1e-6, "{style}: {v} vs {expected}");
        }

        // Deep ITM American put exercises immediately.
        let put = PricingParameters { strike: 110.0, ..params }
            .with_kind(OptionKind::Put)
            .with_style(ExerciseStyle::American);
        let v = lattice_price(put);
        assert!((v - 10.0).abs() < 1e-6, "american put={v}");
    }

    #[test]
    fn test_short_expiry_tends_to_intrinsic() {
        let params = PricingParameters {
            spot: 100.0,
            strike: 90.0,
            time_to_expiry: 1e-6,
            risk_free_rate: 0.05,
            volatility: 0.2,
            steps: 50,
            exercise_style: ExerciseStyle::American,
            option_kind: OptionKind::Call,
        };
        let call = lattice_price(params);
        let put = lattice_price(params.with_kind(OptionKind::Put));
        assert!((call - 10.0).abs() < 1e-4, "call={call}");
        assert!(put.abs() < 1e-9, "put={put}");
    }

    #[test]
    fn test_reference_american_put() {
        let params = PricingParameters {
            spot: 259.6,
            strike: 260.0,
            time_to_expiry: 344.0 / 365.0,
            risk_free_rate: 0.05,
            volatility: 0.4849,
            steps: 5000,
            exercise_style: ExerciseStyle::American,
            option_kind: OptionKind::Put,
        };
        let lattice = BinomialLattice::new(params).unwrap();
        let first = lattice.price().unwrap();
        let second = lattice.price().unwrap();
        assert_eq!(first.to_bits(), second.to_bits(), "price() must be idempotent");
        assert!((first - 42.953).abs() < 1e-2, "american put={first}");

        let euro = lattice_price(params.with_style(ExerciseStyle::European));
        assert!((euro - 41.6629).abs() < 1e-2, "european put={euro}");
    }

    #[test]
    fn test_extreme_nodes_do_not_poison_put() {
        // sigma * sqrt(dt) * N/2 = 1000: the middle of the terminal layer sits
        // far beyond the range where up^i or down^(N-i) alone is finite.
        let params = PricingParameters {
            spot: 100.0,
            strike: 100.0,
            time_to_expiry: 1.0,
            risk_free_rate: 0.05,
            volatility: 20.0,
            steps: 10_000,
            exercise_style: ExerciseStyle::European,
            option_kind: OptionKind::Put,
        };
        let lattice = BinomialLattice::new(params).unwrap();
        let n = params.steps;
        for i in [0, n / 4, n / 2, 3 * n / 4, n] {
            assert!(!lattice.node_price(n, i).is_nan(), "node {i} is NaN");
        }
        assert!((lattice.node_price(n, n / 2) - 100.0).abs() < 1e-9);

        let euro = lattice.price().unwrap();
        let closed = BlackScholes::new(params).unwrap().price().unwrap();
        assert!((euro - closed).abs() < 1e-6, "lattice={euro} black-scholes={closed}");
        assert!((euro - 95.12294245).abs() < 1e-6, "european put={euro}");

        // Worth more dead than alive: the American put exercises at the root.
        let amer = lattice_price(params.with_style(ExerciseStyle::American));
        assert!((amer - 100.0).abs() < 1e-9, "american put={amer}");
    }

    #[test]
    fn test_overflow_is_rejected() {
        let params = PricingParameters {
            spot: 100.0,
            strike: 100.0,
            time_to_expiry: 1000.0,
            risk_free_rate: 0.0,
            volatility: 40.0,
            steps: 2000,
            exercise_style: ExerciseStyle::European,
            option_kind: OptionKind::Call,
        };
        // up^steps = exp(40 * sqrt(1000 * 2000)) overflows f64.
        let lattice = BinomialLattice::new(params).unwrap();
        assert!(matches!(
            lattice.price(),
            Err(PricingError::NonFiniteResult { .. })
        ));
    }
}
