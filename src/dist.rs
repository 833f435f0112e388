//! Log-space probability arithmetic for the genotype model.
//!
//! All probability combining in the genotyper happens in log space.
//! These functions convert between phred scores, probabilities, and log
//! probabilities, and evaluate the multinomial log PMF used by the strand
//! bias term.

//-----------------------------------------------------------------------------

/// Converts a phred score to a log probability of error.
pub fn phred_to_logprob(phred: f64) -> f64 {
    -phred * std::f64::consts::LN_10 / 10.0
}

/// Converts a log probability to a phred score.
pub fn logprob_to_phred(logprob: f64) -> f64 {
    -10.0 * logprob / std::f64::consts::LN_10
}

/// Converts a probability to a log probability.
pub fn prob_to_logprob(prob: f64) -> f64 {
    prob.ln()
}

/// Converts a log probability to a probability.
pub fn logprob_to_prob(logprob: f64) -> f64 {
    logprob.exp()
}

/// Returns `ln(1 - exp(logprob))` in a numerically stable form.
pub fn logprob_invert(logprob: f64) -> f64 {
    (-logprob.exp()).ln_1p()
}

//-----------------------------------------------------------------------------

/// Returns `ln(n!)`.
pub fn ln_factorial(n: usize) -> f64 {
    let mut result = 0.0;
    for i in 2..=n {
        result += (i as f64).ln();
    }
    result
}

/// Returns the log PMF of the multinomial distribution for the given
/// category probabilities and observed counts.
///
/// The slices must have the same length.
pub fn multinomial_ln(probs: &[f64], obs: &[usize]) -> f64 {
    assert_eq!(probs.len(), obs.len(), "Mismatched multinomial parameters");
    let total: usize = obs.iter().sum();
    let mut result = ln_factorial(total);
    for (&prob, &count) in probs.iter().zip(obs.iter()) {
        result -= ln_factorial(count);
        if count > 0 {
            result += (count as f64) * prob.ln();
        }
    }
    result
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(value: f64, truth: f64, name: &str) {
        assert!((value - truth).abs() < 1e-10, "Wrong value for {}: {} vs. {}", name, value, truth);
    }

    #[test]
    fn phred_conversions() {
        assert_close(phred_to_logprob(10.0), 0.1f64.ln(), "phred 10");
        assert_close(phred_to_logprob(30.0), 0.001f64.ln(), "phred 30");
        assert_close(logprob_to_phred(0.01f64.ln()), 20.0, "logprob of 0.01");
        assert_close(logprob_to_phred(phred_to_logprob(17.5)), 17.5, "round trip");
    }

    #[test]
    fn invert() {
        assert_close(logprob_invert(0.25f64.ln()), 0.75f64.ln(), "invert 0.25");
        assert_eq!(logprob_invert(prob_to_logprob(1.0)), f64::NEG_INFINITY, "Wrong inversion of certainty");
        // A value too small for naive 1 - exp(x).
        let tiny = -1e-15;
        assert!(logprob_invert(tiny).is_finite(), "Unstable inversion near zero");
    }

    #[test]
    fn multinomial() {
        // Binomial(4, 0.5) at 2: 6 / 16.
        let logprob = multinomial_ln(&[0.5, 0.5], &[2, 2]);
        assert_close(logprob_to_prob(logprob), 6.0 / 16.0, "binomial(4, 0.5) at 2");
        // All mass on one category.
        let logprob = multinomial_ln(&[0.5, 0.5], &[4, 0]);
        assert_close(logprob_to_prob(logprob), 1.0 / 16.0, "binomial(4, 0.5) at 4");
        // Even split is more likely than a skewed one.
        let even = multinomial_ln(&[0.5, 0.5], &[10, 10]);
        let skewed = multinomial_ln(&[0.5, 0.5], &[20, 0]);
        assert!(even > skewed, "Even strand split should be more likely than one-sided");
    }

    #[test]
    fn factorials() {
        assert_close(ln_factorial(0), 0.0, "0!");
        assert_close(ln_factorial(1), 0.0, "1!");
        assert_close(ln_factorial(5), 120.0f64.ln(), "5!");
    }
}

//-----------------------------------------------------------------------------
