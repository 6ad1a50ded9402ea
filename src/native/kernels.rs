//==================================================
// File: native/kernels.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Numeric kernels behind the built-in library
// Objective: Plain f64 routines with no knowledge of symbols, so they can be
//            tested and reused on bare buffers
//==================================================

/// Sum with compensation for lost low-order bits.
pub fn total(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut carry = 0.0;
    for value in values {
        let y = value - carry;
        let t = sum + y;
        carry = (t - sum) - y;
        sum = t;
    }
    sum
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(total(values) / values.len() as f64)
    }
}

pub fn map(values: &[f64], f: fn(f64) -> f64) -> Vec<f64> {
    values.iter().copied().map(f).collect()
}

/// Julian day number at noon of the given civil date. Dates from
/// 1582-10-15 on are Gregorian, earlier ones Julian.
pub fn julian_day(year: i64, month: i64, day: f64) -> f64 {
    let (y, m) = if month <= 2 { (year - 1, month + 12) } else { (year, month) };
    let gregorian = (year, month, day) >= (1582, 10, 15.0);
    let b = if gregorian {
        let a = y.div_euclid(100);
        2 - a + a.div_euclid(4)
    } else {
        0
    };
    (365.25 * (y + 4716) as f64).floor() + (30.6001 * (m + 1) as f64).floor() + day + b as f64 - 1524.5
        + 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compensated_total_keeps_small_terms() {
        let mut values = vec![1.0e16];
        values.extend(std::iter::repeat(1.0).take(100));
        assert_eq!(total(&values), 1.0e16 + 100.0);
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn julian_day_matches_known_dates() {
        assert_eq!(julian_day(2000, 1, 1.0), 2_451_545.0);
        assert_eq!(julian_day(1970, 1, 1.0), 2_440_588.0);
        assert_eq!(julian_day(1582, 10, 15.0), 2_299_161.0);
        assert_eq!(julian_day(1582, 10, 4.0), 2_299_160.0);
    }
}

//==================================================
// End of file
//==================================================
