//! Parsing of free-text "kg-reps" exercise fields.

/// Separator between weight and reps, as in `80-10`.
const SEPARATOR: char = '-';

/// Weight and repetitions extracted from one exercise field.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExerciseEntry {
    pub weight_kg: f64,
    pub repetitions: u32,
}

impl ExerciseEntry {
    pub fn new(weight_kg: f64, repetitions: u32) -> Self {
        Self {
            weight_kg,
            repetitions,
        }
    }

    /// Parses a raw field value.
    ///
    /// - `"80-10"` gives 80 kg × 10 reps.
    /// - A lone integer such as `"15"` gives 15 reps at 0 kg (chin-ups and
    ///   old single-number entries).
    /// - Anything else, including empty text, gives `(0, 0)`.
    ///
    /// Never fails: malformed input means "no data".
    pub fn parse(value: &str) -> Self {
        let value = value.trim();

        if value.contains(SEPARATOR) {
            let mut parts = value.split(SEPARATOR);
            return match (parts.next(), parts.next(), parts.next()) {
                (Some(kg), Some(reps), None) => match (parse_weight(kg), parse_reps(reps)) {
                    (Some(w), Some(r)) => Self::new(w, r),
                    _ => Self::default(),
                },
                _ => Self::default(),
            };
        }

        parse_reps(value)
            .map(|r| Self::new(0.0, r))
            .unwrap_or_default()
    }

    /// True when nothing usable was recorded.
    pub fn is_empty(&self) -> bool {
        self.weight_kg == 0.0 && self.repetitions == 0
    }
}

fn parse_weight(token: &str) -> Option<f64> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w >= 0.0)
}

/// Accepts integers, and integral decimals like `15.0` that spreadsheet
/// numeric cells turn into.
fn parse_reps(token: &str) -> Option<u32> {
    let token = token.trim();
    if let Ok(r) = token.parse::<u32>() {
        return Some(r);
    }
    let f = token.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}
