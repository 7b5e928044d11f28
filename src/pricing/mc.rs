//! Seeded Monte-Carlo driver shared by the model pricers.
//!
//! Paths are split into fixed-size chunks, each with a seed derived from the
//! caller's seed and the chunk index, so the estimate is identical whether
//! chunks run serially or fanned out with rayon under the `parallel` feature.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const CHUNK_PATHS: usize = 4096;

fn chunk_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Sample mean and standard error of `payoff` over `paths` draws.
pub(crate) fn sample_mean<F>(paths: usize, seed: u64, payoff: F) -> (f64, f64)
where
    F: Fn(&mut StdRng) -> f64 + Sync,
{
    let mut chunks = Vec::new();
    let mut remaining = paths;
    let mut index = 0usize;
    while remaining > 0 {
        let count = remaining.min(CHUNK_PATHS);
        chunks.push((index, count));
        remaining -= count;
        index += 1;
    }

    let run_chunk = |&(index, count): &(usize, usize)| -> (f64, f64) {
        let mut rng = StdRng::seed_from_u64(chunk_seed(seed, index));
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..count {
            let x = payoff(&mut rng);
            sum += x;
            sum_sq += x * x;
        }
        (sum, sum_sq)
    };

    #[cfg(feature = "parallel")]
    let partials: Vec<(f64, f64)> = chunks.par_iter().map(run_chunk).collect();
    #[cfg(not(feature = "parallel"))]
    let partials: Vec<(f64, f64)> = chunks.iter().map(run_chunk).collect();

    let (sum, sum_sq) = partials
        .iter()
        .fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
    let n = paths as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    (mean, (variance / n).sqrt())
}
