use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Every simulated quantity (seconds, progress, satisfaction, multipliers)
/// is stored in this type so two runs with the same seed and the same `dt`
/// sequence produce bit-identical state.
pub type Fixed64 = I32F32;

/// Simulated time in seconds.
pub type Seconds = Fixed64;

/// Ticks count executed simulation steps.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization and host input.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Whole seconds as Fixed64.
#[inline]
pub fn secs(v: u32) -> Seconds {
    Fixed64::from_num(v)
}

/// Checked division for Fixed64 that returns None on zero divisor.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}

/// Clamp into the closed unit interval.
#[inline]
pub fn clamp_unit(v: Fixed64) -> Fixed64 {
    v.clamp(Fixed64::ZERO, Fixed64::from_num(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn fixed64_checked_div_by_zero() {
        assert!(checked_div_64(secs(1), Fixed64::ZERO).is_none());
        assert_eq!(checked_div_64(secs(20), secs(20)), Some(secs(1)));
    }

    #[test]
    fn clamp_unit_bounds() {
        assert_eq!(clamp_unit(f64_to_fixed64(-0.5)), Fixed64::ZERO);
        assert_eq!(clamp_unit(f64_to_fixed64(1.5)), secs(1));
        assert_eq!(clamp_unit(f64_to_fixed64(0.25)), f64_to_fixed64(0.25));
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a * secs(3), b * secs(3));
    }
}
