//! Strength estimation formulas.

/// Divisor `K` in the Epley formula `w × (1 + r/K)`.
///
/// Versions of the tracker used both 30 and 40. The rankings use 40, which
/// estimates more conservatively for higher rep counts.
pub const DEFAULT_EPLEY_DIVISOR: f64 = 40.0;

/// Calculates estimated 1RM from weight and reps with the Epley formula.
///
/// Returns 0 when either weight or reps is zero: a bare rep count with no
/// load (or a load with no reps) says nothing about a one-rep max. A weight
/// so large that the estimate overflows also gives 0.
///
/// # Arguments
/// * `weight_kg` - Weight lifted in kilograms
/// * `reps` - Number of repetitions performed
/// * `divisor` - Epley divisor `K`, must be positive
///
/// # Returns
/// Estimated 1RM in kilograms
pub fn estimate_1rm(weight_kg: f64, reps: u32, divisor: f64) -> f64 {
    if weight_kg <= 0.0 || reps == 0 {
        return 0.0;
    }

    let e1rm = weight_kg * (1.0 + reps as f64 / divisor);
    if !e1rm.is_finite() {
        return 0.0;
    }
    e1rm
}
