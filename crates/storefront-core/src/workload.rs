//! CPU-bound workload used to contrast latency before and after optimization
//!
//! Both paths are deterministic functions of their inputs. They do not compute
//! the same value; they exist to make the latency difference measurable.

use tracing::trace;

use crate::{
    params::{Mode, WorkloadParams},
    CoreError, Result,
};

/// Modulus applied to every accumulated result
pub const RESULT_MODULUS: u64 = 1_000_003;

/// Elements serialized and parsed back on each baseline round
pub const ROUND_TRIP_SLICE: usize = 10_000;

/// Minimum element count for the optimized path
pub const MIN_OPTIMIZED_SIZE: usize = 1_000;

/// Run the path selected by `params.mode`
pub fn simulate(params: &WorkloadParams) -> Result<u64> {
    match params.mode {
        Mode::Before => heavy_compute(params.size, params.rounds),
        Mode::After => Ok(optimized_compute(params.size, params.rounds)),
    }
}

/// Unoptimized baseline.
///
/// Every round transforms and fully re-sorts the sequence, then forces an
/// allocation-heavy JSON round trip of its head.
pub fn heavy_compute(size: usize, rounds: usize) -> Result<u64> {
    let mut seq: Vec<u64> = (0..size as u64).map(|i| (i * 17) % 997).collect();
    let mut checksum = 0u64;

    for round in 0..rounds {
        seq = seq.iter().map(|x| (x * 13 + 7) % 1009).collect();
        seq.sort_unstable();

        let head = &seq[..seq.len().min(ROUND_TRIP_SLICE)];
        let text = serde_json::to_string(head)
            .map_err(|e| CoreError::serialization("failed to encode workload slice", e))?;
        let parsed: Vec<u64> = serde_json::from_str(&text)
            .map_err(|e| CoreError::serialization("failed to decode workload slice", e))?;

        let tail = parsed.last().copied().unwrap_or(0);
        checksum = (checksum + tail) % RESULT_MODULUS;
        trace!(round, tail, checksum, "baseline round");
    }

    let smallest = seq.first().copied().unwrap_or(0);
    Ok((smallest % RESULT_MODULUS + checksum) % RESULT_MODULUS)
}

/// Optimized path: a running modular sum over a reduced problem
/// (`rounds / 4`, at least 1; `size / 2`, at least 1000).
pub fn optimized_compute(size: usize, rounds: usize) -> u64 {
    let rounds = (rounds / 4).max(1) as u64;
    let size = (size / 2).max(MIN_OPTIMIZED_SIZE) as u64;

    let mut acc = 0u64;
    for r in 0..rounds {
        for i in 0..size {
            acc = (acc + (i * 13 + r) % 1009) % RESULT_MODULUS;
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heavy_compute_known_values() {
        // [0, 17, 34, 51, 68] -> [7, 228, 449, 670, 891]
        assert_eq!(heavy_compute(5, 1).unwrap(), 898);
        assert_eq!(heavy_compute(2000, 3).unwrap(), 3024);
    }

    #[test]
    fn test_heavy_compute_slices_large_sequences() {
        assert_eq!(heavy_compute(20_000, 2).unwrap(), 1002);
    }

    #[test]
    fn test_heavy_compute_degenerate_inputs() {
        assert_eq!(heavy_compute(0, 3).unwrap(), 0);
        // no rounds: smallest seed element is 0, checksum stays 0
        assert_eq!(heavy_compute(100, 0).unwrap(), 0);
    }

    #[test]
    fn test_optimized_compute_known_values() {
        assert_eq!(optimized_compute(1000, 4), 500_040);
        assert_eq!(optimized_compute(2000, 8), 68);
    }

    #[test]
    fn test_optimized_compute_floors() {
        // size floors at 1000 and rounds at 1
        assert_eq!(optimized_compute(1, 1), optimized_compute(2000, 4));
        assert_eq!(optimized_compute(10, 0), optimized_compute(1000, 4));
    }

    #[test]
    fn test_results_stay_below_modulus() {
        assert!(optimized_compute(30_000, 80) < RESULT_MODULUS);
        assert!(heavy_compute(3_000, 5).unwrap() < RESULT_MODULUS);
    }

    #[test]
    fn test_simulate_dispatches_on_mode() {
        let after = WorkloadParams::new(Mode::After, 1000, 4);
        let before = WorkloadParams::new(Mode::Before, 5, 1);
        assert_eq!(simulate(&after).unwrap(), 500_040);
        assert_eq!(simulate(&before).unwrap(), 898);
    }
}
