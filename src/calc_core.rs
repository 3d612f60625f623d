//! Core A/B test statistics
//! Shared types, input helpers, and the two computation engines:
//! significance evaluation (two-proportion z-test) and sample size planning.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use thiserror::Error;

/// Two-sided critical value at 95% confidence.
/// The significance engine always reports a 95% interval, matching the
/// reference calculator (the planner honors configurable confidence,
/// the evaluator does not).
pub const Z_CRIT_95: f64 = 1.96;

// ============================================================================
// INPUT HELPERS
// ============================================================================

/// Get f64 input from user with prompt
pub fn get_input(prompt: &str) -> f64 {
    loop {
        print!("{}", prompt);
        io::stdout().flush().unwrap();
        let mut buffer = String::new();
        match io::stdin().read_line(&mut buffer) {
            Ok(_) => match buffer.trim().parse::<f64>() {
                Ok(num) => return num,
                Err(_) => println!("Invalid number."),
            },
            Err(_) => println!("Error."),
        }
    }
}

/// Get u64 input from user with prompt
pub fn get_input_u64(prompt: &str) -> u64 {
    loop {
        print!("{}", prompt);
        io::stdout().flush().unwrap();
        let mut buffer = String::new();
        match io::stdin().read_line(&mut buffer) {
            Ok(_) => match buffer.trim().parse::<u64>() {
                Ok(num) => return num,
                Err(_) => println!("Invalid number."),
            },
            Err(_) => println!("Error."),
        }
    }
}

/// Get yes/no input from user
pub fn get_bool(prompt: &str) -> bool {
    loop {
        print!("{} (y/n): ", prompt);
        io::stdout().flush().unwrap();
        let mut buffer = String::new();
        io::stdin().read_line(&mut buffer).unwrap();
        match buffer.trim().to_lowercase().as_str() {
            "y" | "yes" => return true,
            "n" | "no" => return false,
            _ => println!("Please type 'y' or 'n'."),
        }
    }
}

/// Get optional u64 input (empty = None)
pub fn get_optional_input(prompt: &str) -> Option<u64> {
    print!("{}", prompt);
    io::stdout().flush().unwrap();
    let mut buffer = String::new();
    io::stdin().read_line(&mut buffer).unwrap();
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        None
    } else {
        trimmed.parse::<u64>().ok()
    }
}

/// Get string input from user
pub fn get_string(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().unwrap();
    let mut buffer = String::new();
    io::stdin().read_line(&mut buffer).unwrap();
    buffer.trim().to_string()
}

/// Get choice from numbered options
pub fn get_choice(prompt: &str, options: &[&str]) -> usize {
    loop {
        println!("{}", prompt);
        for (i, opt) in options.iter().enumerate() {
            println!("  {}. {}", i + 1, opt);
        }
        print!("Select: ");
        io::stdout().flush().unwrap();
        let mut buffer = String::new();
        if io::stdin().read_line(&mut buffer).is_ok() {
            if let Ok(num) = buffer.trim().parse::<usize>() {
                if num >= 1 && num <= options.len() {
                    return num;
                }
            }
        }
        println!("Invalid choice.");
    }
}

// ============================================================================
// TYPES
// ============================================================================

/// One arm of an experiment. The control is always the first/reference arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub visitors: u64,
    pub conversions: u64,
}

impl Variant {
    pub fn new(id: impl Into<String>, visitors: u64, conversions: u64) -> Self {
        Variant {
            id: id.into(),
            visitors,
            conversions,
        }
    }

    /// Observed conversion rate; 0.0 when no visitors have been recorded
    pub fn rate(&self) -> f64 {
        if self.visitors == 0 {
            0.0
        } else {
            self.conversions as f64 / self.visitors as f64
        }
    }
}

/// Per-treatment comparison against the control, computed fresh on every
/// evaluation. Differences and interval bounds are in percentage points,
/// relative improvement is a percentage of the control rate.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub variant_id: String,
    pub rate_difference: f64,
    pub confidence_interval: (f64, f64),
    /// None when the control rate is zero (relative lift is undefined)
    pub relative_improvement: Option<f64>,
    pub z_score: f64,
    pub p_value: f64,
    pub is_significant: bool,
    pub is_winner: bool,
    pub is_loser: bool,
    /// Treatment had zero visitors; numbers are well-defined but unreliable
    pub insufficient_data: bool,
}

/// Planning inputs for the sample size engine. Rates and effect are in
/// percent; the effect is relative to the baseline, not absolute points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SampleSizeParams {
    pub baseline_conversion: f64,
    pub minimum_detectable_effect: f64,
    pub confidence_level: u32,
    pub statistical_power: u32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatError {
    #[error("variant '{id}': conversions ({conversions}) exceed visitors ({visitors})")]
    InvalidCounts {
        id: String,
        conversions: u64,
        visitors: u64,
    },

    #[error("invalid sample size parameters: {0}")]
    InvalidParameters(String),
}

// ============================================================================
// SIGNIFICANCE ENGINE
// ============================================================================

/// Evaluate every treatment against the control with a two-proportion
/// z-test, then classify winner/loser across the batch.
///
/// Returns one result per treatment, in input order. A control with zero
/// visitors is a normal "not ready" state and yields an empty batch.
/// Counts where conversions exceed visitors are rejected up front.
pub fn evaluate(control: &Variant, treatments: &[Variant]) -> Result<Vec<TestResult>, StatError> {
    for v in std::iter::once(control).chain(treatments.iter()) {
        if v.conversions > v.visitors {
            return Err(StatError::InvalidCounts {
                id: v.id.clone(),
                conversions: v.conversions,
                visitors: v.visitors,
            });
        }
    }

    if control.visitors == 0 {
        return Ok(Vec::new());
    }

    let rate_a = control.rate();
    let se_a = standard_error(rate_a, control.visitors);

    let mut results: Vec<TestResult> = treatments
        .iter()
        .map(|v| {
            let rate_b = v.rate();
            let se_b = standard_error(rate_b, v.visitors);
            let se_diff = (se_a * se_a + se_b * se_b).sqrt();

            let diff = rate_b - rate_a;
            // Both rates at 0 or 1 collapse the standard error; report z = 0
            // rather than a NaN that would poison the winner scan.
            let z_score = if se_diff > 0.0 { diff / se_diff } else { 0.0 };
            let margin = Z_CRIT_95 * se_diff;

            let relative_improvement = if rate_a > 0.0 {
                Some(diff / rate_a * 100.0)
            } else {
                None
            };

            TestResult {
                variant_id: v.id.clone(),
                rate_difference: diff * 100.0,
                confidence_interval: ((diff - margin) * 100.0, (diff + margin) * 100.0),
                relative_improvement,
                z_score,
                p_value: two_sided_p(z_score),
                is_significant: z_score.abs() > Z_CRIT_95,
                is_winner: false,
                is_loser: false,
                insufficient_data: v.visitors == 0,
            }
        })
        .collect();

    // Winner = highest z among significant positive results; losers are the
    // significant negative ones. Exact float equality on the maximum is the
    // reference behavior and is kept as-is.
    let max_z = results
        .iter()
        .filter(|r| r.is_significant)
        .map(|r| r.z_score)
        .fold(f64::NEG_INFINITY, f64::max);

    for r in &mut results {
        r.is_winner = r.is_significant && r.z_score > Z_CRIT_95 && r.z_score == max_z;
        r.is_loser = r.is_significant && r.z_score < -Z_CRIT_95;
    }

    Ok(results)
}

fn standard_error(rate: f64, visitors: u64) -> f64 {
    if visitors == 0 {
        return 0.0;
    }
    (rate * (1.0 - rate) / visitors as f64).sqrt()
}

// ============================================================================
// SAMPLE SIZE ENGINE
// ============================================================================

/// Minimum visitors required per variant to detect the given relative lift.
///
/// Uses the pooled two-proportion formula
/// `n = ceil(2 p (1-p) (z_alpha + z_beta)^2 / (p2 - p1)^2)` where
/// p2 = p1 * (1 + MDE). Confidence and power map to fixed z tables for
/// the enumerated option sets; anything else is rejected.
pub fn required_sample_size(params: &SampleSizeParams) -> Result<u64, StatError> {
    if !(params.baseline_conversion > 0.0 && params.baseline_conversion < 100.0) {
        return Err(StatError::InvalidParameters(format!(
            "baseline conversion must be within (0, 100), got {}",
            params.baseline_conversion
        )));
    }
    if params.minimum_detectable_effect <= 0.0 {
        return Err(StatError::InvalidParameters(format!(
            "minimum detectable effect must be positive, got {}",
            params.minimum_detectable_effect
        )));
    }
    if !matches!(params.confidence_level, 90 | 95 | 99) {
        return Err(StatError::InvalidParameters(format!(
            "confidence level must be one of 90/95/99, got {}",
            params.confidence_level
        )));
    }
    if !matches!(params.statistical_power, 80 | 90 | 95 | 99) {
        return Err(StatError::InvalidParameters(format!(
            "statistical power must be one of 80/90/95/99, got {}",
            params.statistical_power
        )));
    }

    let p1 = params.baseline_conversion / 100.0;
    let mde = params.minimum_detectable_effect / 100.0;
    let p2 = p1 * (1.0 + mde);

    if p2 >= 1.0 {
        return Err(StatError::InvalidParameters(format!(
            "lifted rate reaches {:.1}%; baseline plus effect must stay below 100%",
            p2 * 100.0
        )));
    }

    let z_alpha: f64 = match params.confidence_level {
        99 => 2.576,
        95 => 1.96,
        _ => 1.645,
    };
    let z_beta = match params.statistical_power {
        99 => 2.326,
        95 => 1.645,
        90 => 1.282,
        _ => 0.842,
    };

    let p = (p1 + p2) / 2.0;
    let n = (2.0 * p * (1.0 - p) * (z_alpha + z_beta).powi(2) / (p2 - p1).powi(2)).ceil();

    Ok(n as u64)
}

// ============================================================================
// STATISTICAL HELPERS
// ============================================================================

/// Standard normal CDF approximation
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Two-sided p-value for a z statistic
pub fn two_sided_p(z: f64) -> f64 {
    2.0 * (1.0 - normal_cdf(z.abs()))
}

/// Error function approximation (Abramowitz and Stegun)
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

/// Analytic power of the fixed-horizon two-proportion z-test at 95%
/// confidence, given true rates and a per-variant sample size.
pub fn z_test_power(rate_a: f64, rate_b: f64, n_per_variant: u64) -> f64 {
    if n_per_variant == 0 {
        return 0.0;
    }
    let delta = (rate_b - rate_a).abs();
    let var = rate_a * (1.0 - rate_a) + rate_b * (1.0 - rate_b);
    let se = (var / n_per_variant as f64).sqrt();

    if se < 1e-10 {
        return 1.0;
    }

    normal_cdf(delta / se - Z_CRIT_95)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(visitors: u64, conversions: u64) -> Variant {
        Variant::new("T", visitors, conversions)
    }

    #[test]
    fn clear_winner_is_significant() {
        let control = Variant::new("A", 1000, 50);
        let treatment = Variant::new("B", 1000, 80);

        let results = evaluate(&control, &[treatment]).unwrap();
        assert_eq!(results.len(), 1);
        let r = &results[0];

        // rateA = 5%, rateB = 8%: z = 0.03 / sqrt(4.75e-5 + 7.36e-5) ~ 2.726
        assert!((r.z_score - 2.726).abs() < 0.01, "z = {}", r.z_score);
        assert!((r.rate_difference - 3.0).abs() < 1e-9);
        assert!(r.is_significant);
        assert!(r.is_winner);
        assert!(!r.is_loser);
        assert!(!r.insufficient_data);

        // CI excludes zero for a significant positive difference
        assert!(r.confidence_interval.0 > 0.0);
        assert!(r.confidence_interval.1 > r.confidence_interval.0);

        // +60% relative lift over a 5% baseline
        let lift = r.relative_improvement.unwrap();
        assert!((lift - 60.0).abs() < 1e-9, "lift = {}", lift);
    }

    #[test]
    fn small_difference_is_not_significant() {
        let control = Variant::new("A", 1000, 50);
        let treatment = Variant::new("B", 1000, 52);

        let results = evaluate(&control, &[treatment]).unwrap();
        let r = &results[0];

        assert!((r.z_score - 0.203).abs() < 0.01, "z = {}", r.z_score);
        assert!(!r.is_significant);
        assert!(!r.is_winner);
        assert!(!r.is_loser);
        // CI straddles zero
        assert!(r.confidence_interval.0 < 0.0 && r.confidence_interval.1 > 0.0);
    }

    #[test]
    fn unpooled_z_for_moderate_lift() {
        // 5% vs 7% at n=1000 per arm sits just under the 1.96 threshold
        // with the unpooled standard error the engine uses.
        let control = Variant::new("A", 1000, 50);
        let treatment = Variant::new("B", 1000, 70);

        let results = evaluate(&control, &[treatment]).unwrap();
        let r = &results[0];

        assert!((r.z_score - 1.885).abs() < 0.01, "z = {}", r.z_score);
        assert!(!r.is_significant);
        assert!(!r.is_winner);
    }

    #[test]
    fn significant_drop_is_a_loser() {
        let control = Variant::new("A", 1000, 50);
        let treatment = Variant::new("B", 1000, 20);

        let results = evaluate(&control, &[treatment]).unwrap();
        let r = &results[0];

        assert!(r.z_score < -1.96, "z = {}", r.z_score);
        assert!(r.is_significant);
        assert!(r.is_loser);
        assert!(!r.is_winner);
        assert!(r.relative_improvement.unwrap() < 0.0);
    }

    #[test]
    fn only_highest_z_wins_among_multiple_significant() {
        let control = Variant::new("A", 1000, 50);
        let b = Variant::new("B", 1000, 80); // z ~ 2.73
        let c = Variant::new("C", 1000, 90); // z ~ 3.52

        let results = evaluate(&control, &[b, c]).unwrap();
        assert!(results[0].is_significant && results[1].is_significant);
        assert!(!results[0].is_winner);
        assert!(results[1].is_winner);

        let winners = results.iter().filter(|r| r.is_winner).count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn winner_and_loser_are_exclusive() {
        let control = Variant::new("A", 1000, 50);
        let up = Variant::new("B", 1000, 90);
        let down = Variant::new("C", 1000, 15);

        let results = evaluate(&control, &[up, down]).unwrap();
        for r in &results {
            assert!(!(r.is_winner && r.is_loser), "variant {}", r.variant_id);
            if r.is_winner || r.is_loser {
                assert!(r.is_significant);
            }
        }
        assert!(results[0].is_winner);
        assert!(results[1].is_loser);
    }

    #[test]
    fn control_without_visitors_yields_empty_batch() {
        let control = Variant::new("A", 0, 0);
        let treatment = Variant::new("B", 1000, 80);

        let results = evaluate(&control, &[treatment]).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn zero_visitor_treatment_is_flagged_not_crashed() {
        let control = Variant::new("A", 1000, 50);
        let treatment = Variant::new("B", 0, 0);

        let results = evaluate(&control, &[treatment]).unwrap();
        let r = &results[0];

        assert!(r.insufficient_data);
        assert!(r.z_score.is_finite());
        assert!(r.rate_difference.is_finite());
    }

    #[test]
    fn collapsed_standard_error_yields_zero_z() {
        // No conversions anywhere: se = 0 on both sides, z stays defined.
        let control = Variant::new("A", 10, 0);
        let treatment = Variant::new("B", 10, 0);

        let results = evaluate(&control, &[treatment]).unwrap();
        let r = &results[0];

        assert_eq!(r.z_score, 0.0);
        assert!(!r.is_significant);
        assert!(r.relative_improvement.is_none());
    }

    #[test]
    fn conversions_above_visitors_rejected() {
        let control = Variant::new("A", 10, 20);
        let err = evaluate(&control, &[pct(10, 5)]).unwrap_err();
        assert!(matches!(err, StatError::InvalidCounts { .. }));

        let control = Variant::new("A", 100, 10);
        let err = evaluate(&control, &[pct(10, 20)]).unwrap_err();
        assert!(matches!(err, StatError::InvalidCounts { .. }));
    }

    #[test]
    fn evaluation_is_order_preserving_and_elementwise() {
        let control = Variant::new("A", 1000, 50);
        let b = Variant::new("B", 1000, 80);
        let c = Variant::new("C", 2000, 130);

        let fwd = evaluate(&control, &[b.clone(), c.clone()]).unwrap();
        let rev = evaluate(&control, &[c, b]).unwrap();

        assert_eq!(fwd[0].variant_id, "B");
        assert_eq!(rev[1].variant_id, "B");
        assert_eq!(fwd[0].z_score, rev[1].z_score);
        assert_eq!(fwd[1].z_score, rev[0].z_score);
        assert_eq!(fwd[0].is_winner, rev[1].is_winner);
        assert_eq!(fwd[1].is_winner, rev[0].is_winner);
    }

    #[test]
    fn p_value_agrees_with_significance_flag() {
        let control = Variant::new("A", 1000, 50);
        let cases = [
            pct(1000, 52),
            pct(1000, 70),
            pct(1000, 80),
            pct(1000, 20),
            pct(500, 40),
        ];

        for v in cases {
            let r = &evaluate(&control, &[v]).unwrap()[0];
            assert_eq!(
                r.p_value < 0.05,
                r.is_significant,
                "z = {}, p = {}",
                r.z_score,
                r.p_value
            );
        }
    }

    #[test]
    fn sample_size_matches_closed_form() {
        let params = SampleSizeParams {
            baseline_conversion: 5.0,
            minimum_detectable_effect: 20.0,
            confidence_level: 95,
            statistical_power: 80,
        };

        let n = required_sample_size(&params).unwrap();

        // Recompute the closed form: p1=0.05, p2=0.06, p=0.055
        let p1 = 0.05_f64;
        let p2 = p1 * 1.2;
        let p = (p1 + p2) / 2.0;
        let expected = (2.0 * p * (1.0 - p) * (1.96_f64 + 0.842).powi(2) / (p2 - p1).powi(2))
            .ceil() as u64;

        assert_eq!(n, expected);
        assert_eq!(n, 8162);
    }

    #[test]
    fn smaller_effects_need_more_sample() {
        let base = SampleSizeParams {
            baseline_conversion: 5.0,
            minimum_detectable_effect: 40.0,
            confidence_level: 95,
            statistical_power: 80,
        };
        let n40 = required_sample_size(&base).unwrap();
        let n20 = required_sample_size(&SampleSizeParams {
            minimum_detectable_effect: 20.0,
            ..base
        })
        .unwrap();
        let n10 = required_sample_size(&SampleSizeParams {
            minimum_detectable_effect: 10.0,
            ..base
        })
        .unwrap();

        assert!(n10 > n20);
        assert!(n20 > n40);
    }

    #[test]
    fn stricter_confidence_and_power_need_more_sample() {
        let base = SampleSizeParams {
            baseline_conversion: 5.0,
            minimum_detectable_effect: 20.0,
            confidence_level: 90,
            statistical_power: 80,
        };
        let n90 = required_sample_size(&base).unwrap();
        let n95 = required_sample_size(&SampleSizeParams {
            confidence_level: 95,
            ..base
        })
        .unwrap();
        let n99 = required_sample_size(&SampleSizeParams {
            confidence_level: 99,
            ..base
        })
        .unwrap();
        assert!(n99 > n95 && n95 > n90);

        let p80 = required_sample_size(&base).unwrap();
        let p95 = required_sample_size(&SampleSizeParams {
            statistical_power: 95,
            ..base
        })
        .unwrap();
        assert!(p95 > p80);
    }

    #[test]
    fn sample_size_is_deterministic() {
        let params = SampleSizeParams {
            baseline_conversion: 3.5,
            minimum_detectable_effect: 15.0,
            confidence_level: 99,
            statistical_power: 90,
        };
        assert_eq!(
            required_sample_size(&params).unwrap(),
            required_sample_size(&params).unwrap()
        );
    }

    #[test]
    fn out_of_domain_planning_inputs_rejected() {
        let valid = SampleSizeParams {
            baseline_conversion: 5.0,
            minimum_detectable_effect: 20.0,
            confidence_level: 95,
            statistical_power: 80,
        };
        assert!(required_sample_size(&valid).is_ok());

        let cases = [
            SampleSizeParams { baseline_conversion: 0.0, ..valid },
            SampleSizeParams { baseline_conversion: 100.0, ..valid },
            SampleSizeParams { baseline_conversion: -2.0, ..valid },
            SampleSizeParams { minimum_detectable_effect: 0.0, ..valid },
            SampleSizeParams { minimum_detectable_effect: -10.0, ..valid },
            SampleSizeParams { confidence_level: 97, ..valid },
            SampleSizeParams { statistical_power: 85, ..valid },
            // 90% baseline with +20% lift overshoots 100%
            SampleSizeParams { baseline_conversion: 90.0, ..valid },
        ];

        for params in cases {
            let err = required_sample_size(&params).unwrap_err();
            assert!(
                matches!(err, StatError::InvalidParameters(_)),
                "params {:?} gave {:?}",
                params,
                err
            );
        }
    }

    #[test]
    fn normal_cdf_sanity() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
        assert!(normal_cdf(6.0) > 0.999);
    }

    #[test]
    fn planned_sample_size_reaches_target_power() {
        // The N from the planner should deliver roughly the requested 80%
        // power at the planned rates.
        let params = SampleSizeParams {
            baseline_conversion: 5.0,
            minimum_detectable_effect: 20.0,
            confidence_level: 95,
            statistical_power: 80,
        };
        let n = required_sample_size(&params).unwrap();
        let power = z_test_power(0.05, 0.06, n);
        assert!((0.78..0.83).contains(&power), "power = {}", power);
    }
}
