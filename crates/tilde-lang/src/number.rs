use std::fmt;

/// A numeric parameter value.
#[derive(Debug, Clone, PartialEq, Copy)]
pub struct Number(f64);

impl Number {
    pub fn new(value: f64) -> Self {
        Number(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Returns `true` if the number has no fractional part.
    pub fn is_int(&self) -> bool {
        self.0.is_finite() && self.0.fract() == 0.0
    }
}

impl Default for Number {
    fn default() -> Self {
        Number(0.0)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(value: $ty) -> Self {
                    Number(value as f64)
                }
            }
        )*
    };
}

impl_from_int!(i32, i64, isize, u8, u32, u64, usize);

impl From<f32> for Number {
    fn from(value: f32) -> Self {
        Number(value as f64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number(value)
    }
}

/// Largest magnitude below which every integral `f64` is exact.
const MAX_SAFE_INT: f64 = 9_007_199_254_740_992.0;

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_int() && self.0.abs() < MAX_SAFE_INT {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::integer(Number::from(42), "42")]
    #[case::negative(Number::from(-7i64), "-7")]
    #[case::integral_float(Number::from(3.0), "3")]
    #[case::fraction(Number::from(1.25), "1.25")]
    #[case::repeating(Number::from(1.0 / 3.0), "0.3333333333333333")]
    #[case::large(Number::from(1e20), "100000000000000000000")]
    #[case::large_negative(Number::from(-1e20), "-100000000000000000000")]
    #[case::small(Number::from(1e-7), "0.0000001")]
    #[case::tiny(Number::from(1e-20), "0.00000000000000000001")]
    #[case::max_safe(Number::from(9_007_199_254_740_991i64), "9007199254740991")]
    #[case::nan(Number::new(f64::NAN), "NaN")]
    #[case::infinity(Number::new(f64::INFINITY), "inf")]
    fn test_display(#[case] number: Number, #[case] expected: &str) {
        assert_eq!(number.to_string(), expected);
    }

    #[rstest]
    #[case(Number::from(2.0), true)]
    #[case(Number::from(2.5), false)]
    #[case(Number::from(1e-20), false)]
    #[case(Number::new(f64::NAN), false)]
    fn test_is_int(#[case] number: Number, #[case] expected: bool) {
        assert_eq!(number.is_int(), expected);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Number::from(5usize).value(), 5.0);
        assert_eq!(Number::from(2u8).value(), 2.0);
        assert_eq!(Number::default().value(), 0.0);
    }
}
