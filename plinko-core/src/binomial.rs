//! Derandomized binomial sampling for the PMNS descent.
//!
//! `binomial_sample(count, num, denom, r)` always returns the same
//! value for the same inputs; over a uniform choice of `r` the output
//! is distributed as Binomial(count, num/denom). Small trial counts
//! use exact inverse-CDF; large counts use the normal approximation
//! with a Beasley-Springer-Moro probit.

/// Above this trial count the normal approximation takes over.
const EXACT_THRESHOLD: u64 = 50;

const U64_MAX_F64: f64 = u64::MAX as f64;

/// Map a PRF output to the open unit interval.
#[inline]
fn prf_to_unit(prf_output: u64) -> f64 {
    (prf_output as f64 + 0.5) / (U64_MAX_F64 + 1.0)
}

/// Deterministic draw from Binomial(count, num/denom) using
/// `prf_output` as the randomness source. Result is clamped to
/// `[0, count]`.
pub fn binomial_sample(count: u64, num: u64, denom: u64, prf_output: u64) -> u64 {
    if denom == 0 || count == 0 || num == 0 {
        return 0;
    }
    if num >= denom {
        return count;
    }

    let p = num as f64 / denom as f64;
    let u = prf_to_unit(prf_output);

    if count <= EXACT_THRESHOLD {
        binomial_inverse_exact(count, p, u)
    } else {
        binomial_normal_approx(count, p, u)
    }
}

/// Exact inverse-CDF via the PMF recurrence
/// `pmf(k+1) = pmf(k) * ((n-k)/(k+1)) * (p/q)`.
fn binomial_inverse_exact(n: u64, p: f64, u: f64) -> u64 {
    let q = 1.0 - p;
    let mut pmf = q.powi(n as i32);
    let mut cdf = pmf;
    if u <= cdf {
        return 0;
    }

    let p_over_q = p / q;
    for k in 1..=n {
        pmf *= ((n - k + 1) as f64 / k as f64) * p_over_q;
        cdf += pmf;
        if u <= cdf {
            return k;
        }
    }
    n
}

/// `round(n*p + probit(u) * sqrt(n*p*(1-p)))`, clamped into `[0, n]`.
fn binomial_normal_approx(n: u64, p: f64, u: f64) -> u64 {
    let mean = n as f64 * p;
    let std_dev = (n as f64 * p * (1.0 - p)).sqrt();
    let k = (mean + probit(u) * std_dev).round();
    if k < 0.0 {
        0
    } else if k > n as f64 {
        n
    } else {
        k as u64
    }
}

/// Beasley-Springer-Moro approximation of the inverse standard normal
/// CDF. Central region uses a rational polynomial in `(p - 0.5)^2`;
/// the tails use a polynomial in `ln(-ln(r))`.
fn probit(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }

    const A: [f64; 4] = [2.50662823884, -18.61500062529, 41.39119773534, -25.44106049637];
    const B: [f64; 4] = [-8.47351093090, 23.08336743743, -21.06224101826, 3.13082909833];
    const C: [f64; 9] = [
        0.3374754822726147,
        0.9761690190917186,
        0.1607979714918209,
        0.0276438810333863,
        0.0038405729373609,
        0.0003951896511919,
        0.0000321767881768,
        0.0000002888167364,
        0.0000003960315187,
    ];

    let y = p - 0.5;
    if y.abs() < 0.42 {
        let r = y * y;
        return y * (((A[3] * r + A[2]) * r + A[1]) * r + A[0])
            / ((((B[3] * r + B[2]) * r + B[1]) * r + B[0]) * r + 1.0);
    }

    let r = if y > 0.0 { 1.0 - p } else { p };
    let r = (-r.ln()).ln();
    let x = C[0]
        + r * (C[1]
            + r * (C[2]
                + r * (C[3] + r * (C[4] + r * (C[5] + r * (C[6] + r * (C[7] + r * C[8])))))));
    if y < 0.0 {
        -x
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_cases() {
        assert_eq!(binomial_sample(0, 1, 2, 12345), 0);
        assert_eq!(binomial_sample(10, 0, 2, 12345), 0);
        assert_eq!(binomial_sample(10, 1, 0, 12345), 0);
        assert_eq!(binomial_sample(10, 2, 2, 12345), 10);
        assert_eq!(binomial_sample(10, 3, 2, 12345), 10);
    }

    #[test]
    fn result_stays_in_range() {
        for count in [1u64, 10, 50, 51, 100, 1000, 100_000] {
            for prf in [0u64, 1, u64::MAX / 2, u64::MAX - 1, u64::MAX] {
                let k = binomial_sample(count, 1, 2, prf);
                assert!(k <= count, "k={k} > count={count}");
            }
        }
    }

    #[test]
    fn deterministic() {
        assert_eq!(
            binomial_sample(100, 1, 2, 42),
            binomial_sample(100, 1, 2, 42)
        );
        assert_eq!(binomial_sample(40, 1, 3, 7), binomial_sample(40, 1, 3, 7));
    }

    #[test]
    fn extreme_randomness_hits_extremes() {
        // u near 0 should land at or near 0; u near 1 at or near n.
        assert_eq!(binomial_sample(20, 1, 2, 0), 0);
        assert_eq!(binomial_sample(20, 1, 2, u64::MAX), 20);
    }

    #[test]
    fn mean_tracks_probability_exact_branch() {
        let n = 40u64;
        let samples = 20_000u64;
        let mut sum = 0u64;
        for i in 0..samples {
            let prf = i.wrapping_mul(0x9E3779B97F4A7C15);
            sum += binomial_sample(n, 1, 2, prf);
        }
        let mean = sum as f64 / samples as f64;
        assert!((mean - 20.0).abs() < 0.5, "mean {mean} far from 20");
    }

    #[test]
    fn mean_tracks_probability_normal_branch() {
        let n = 10_000u64;
        let samples = 5_000u64;
        let mut sum = 0u64;
        for i in 0..samples {
            let prf = i.wrapping_mul(0x9E3779B97F4A7C15);
            sum += binomial_sample(n, 1, 2, prf);
        }
        let mean = sum as f64 / samples as f64;
        assert!((mean - 5000.0).abs() < 20.0, "mean {mean} far from 5000");
    }

    #[test]
    fn complementary_probabilities_order_means() {
        let n = 200u64;
        let samples = 2_000u64;
        let mut low = 0u64;
        let mut high = 0u64;
        for i in 0..samples {
            let prf = i.wrapping_mul(0x9E3779B97F4A7C15);
            low += binomial_sample(n, 1, 4, prf);
            high += binomial_sample(n, 3, 4, prf);
        }
        assert!(high > low, "p=3/4 mean should exceed p=1/4 mean");
    }

    #[test]
    fn full_support_small_n() {
        let n = 10u64;
        let mut seen = vec![false; (n + 1) as usize];
        for i in 0..50_000u64 {
            let prf = i.wrapping_mul(0x9E3779B97F4A7C15);
            seen[binomial_sample(n, 1, 2, prf) as usize] = true;
        }
        let hit = seen.iter().filter(|&&s| s).count();
        assert!(hit >= 9, "only {hit} of 11 support points seen");
    }

    #[test]
    fn probit_known_values() {
        assert_eq!(probit(0.5), 0.0);
        assert!((probit(0.975) - 1.96).abs() < 0.01);
        assert!((probit(0.025) + 1.96).abs() < 0.01);
        // Symmetry around the median.
        assert!((probit(0.7) + probit(0.3)).abs() < 1e-9);
    }

    #[test]
    fn probit_is_monotone() {
        let mut prev = f64::NEG_INFINITY;
        for i in 1..1000 {
            let z = probit(i as f64 / 1000.0);
            assert!(z >= prev, "probit not monotone at {i}");
            prev = z;
        }
    }

    #[test]
    fn probit_guards_degenerate_inputs() {
        assert_eq!(probit(0.0), 0.0);
        assert_eq!(probit(1.0), 0.0);
    }
}
