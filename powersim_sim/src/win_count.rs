//! Leader election: how many blocks a miner wins in one epoch.

use powersim_actors::builtin::EXPECTED_LEADERS_PER_EPOCH;
use powersim_actors::StoragePower;
use rand::Rng;

/// Draws a miner's win count for one epoch.
///
/// The count is Poisson distributed with rate
/// `λ = miner_power / total_power * E`, sampled by inverse transform: draw
/// `h` in `[0, 1)` and return the smallest `k` with `P(X > k) <= h`, peeling
/// probability mass off the upper tail one term at a time.
///
/// Exactly one value is drawn from `rng`. Callers must not pass a
/// non-positive `total_power`; it yields 0 without drawing.
pub fn win_count<R: Rng + ?Sized>(miner_power: StoragePower, total_power: StoragePower, rng: &mut R) -> u64 {
    if !total_power.is_positive() {
        return 0;
    }

    let lambda = miner_power.value().saturating_mul(EXPECTED_LEADERS_PER_EPOCH) as f64 / total_power.value() as f64;
    let h: f64 = rng.gen();

    let decay = (-lambda).exp();
    let mut factorial = 1.0;
    let mut rhs = 1.0 - decay;
    let mut wins = 0u64;
    while rhs > h {
        wins += 1;
        factorial *= wins as f64;
        let pmf = decay * lambda.powi(wins as i32) / factorial;
        // Remaining tail is below float resolution
        if pmf == 0.0 {
            break;
        }
        rhs -= pmf;
    }
    wins
}

/// Poisson probability mass `P(X = k)` for rate `lambda`.
pub fn poisson_pmf(lambda: f64, k: u64) -> f64 {
    let factorial: f64 = (2..=k).map(|i| i as f64).product();
    (-lambda).exp() * lambda.powi(k as i32) / factorial
}
