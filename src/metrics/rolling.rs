//! Trailing-window smoothing.
//!
//! The mean at row `i` covers rows `i - window .. i - 1`: the current row is
//! never part of its own average.

/// Causal trailing mean over the `window` rows before each position.
///
/// Positions `< window` are `None`. A window containing any missing input
/// also yields `None` rather than a mean over fewer values.
pub fn trailing_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }

    for (i, slot) in out.iter_mut().enumerate().skip(window) {
        let prior = &values[i - window..i];
        let mut sum = 0.0;
        let mut complete = true;
        for v in prior {
            match v {
                Some(v) => sum += v,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            *slot = Some(sum / window as f64);
        }
    }

    out
}

/// Round to 2 decimal places (half away from zero).
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_excludes_current_row() {
        let values: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();
        let out = trailing_mean(&values, 7);
        assert!(out[..7].iter().all(Option::is_none));
        // Row 7 averages rows 0..=6 -> 3.0.
        assert_eq!(out[7], Some(3.0));
        assert_eq!(out[8], Some(4.0));
        assert_eq!(out[9], Some(5.0));
    }

    #[test]
    fn missing_input_propagates_undefined() {
        let mut values: Vec<Option<f64>> = (0..12).map(|i| Some(i as f64)).collect();
        values[3] = None;
        let out = trailing_mean(&values, 7);
        // Rows 7..=10 include row 3 in their window.
        for (i, v) in out.iter().enumerate().take(11).skip(7) {
            assert_eq!(*v, None, "row {i}");
        }
        assert_eq!(out[11], Some((4..11).sum::<i32>() as f64 / 7.0));
    }

    #[test]
    fn short_input_is_all_undefined() {
        let values = vec![Some(1.0); 5];
        assert!(trailing_mean(&values, 7).iter().all(Option::is_none));
        assert!(trailing_mean(&[], 7).is_empty());
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.2351), 1.24);
        assert_eq!(round2(-1.2351), -1.24);
        assert_eq!(round2(2.0), 2.0);
    }
}
