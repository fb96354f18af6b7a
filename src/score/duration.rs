use num_rational::Ratio;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// An exact duration or offset measured in quarter notes.
///
/// Stored as a reduced fraction so tuplet positions such as `7/3` compare
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuarterLength(Ratio<i64>);

impl QuarterLength {
    pub const ZERO: QuarterLength = QuarterLength(Ratio::new_raw(0, 1));

    /// Creates `num / den` quarter notes. A zero denominator yields zero.
    pub fn new(num: i64, den: i64) -> Self {
        if den == 0 {
            return Self::ZERO;
        }
        QuarterLength(Ratio::new(num, den))
    }

    pub fn from_int(n: i64) -> Self {
        QuarterLength(Ratio::from_integer(n))
    }

    /// Converts a tick count into quarter lengths.
    pub fn from_ticks(ticks: u64, ticks_per_quarter: u32) -> Self {
        Self::new(ticks as i64, i64::from(ticks_per_quarter))
    }

    /// Converts back to ticks, rounding to the nearest tick.
    pub fn to_ticks(self, ticks_per_quarter: u32) -> u64 {
        let scaled = self.0 * Ratio::from_integer(i64::from(ticks_per_quarter));
        scaled.round().to_integer().max(0) as u64
    }

    pub fn numerator(self) -> i64 {
        *self.0.numer()
    }

    pub fn denominator(self) -> i64 {
        *self.0.denom()
    }

    pub fn is_zero(self) -> bool {
        self.numerator() == 0
    }

    pub fn to_f64(self) -> f64 {
        self.numerator() as f64 / self.denominator() as f64
    }

    pub fn mul_int(self, n: i64) -> Self {
        QuarterLength(self.0 * n)
    }

    pub fn div_int(self, n: i64) -> Self {
        if n == 0 {
            return Self::ZERO;
        }
        QuarterLength(self.0 / n)
    }

    /// Ratio of two lengths as a float.
    pub fn ratio(self, other: QuarterLength) -> f64 {
        if other.is_zero() {
            return f64::INFINITY;
        }
        QuarterLength(self.0 / other.0).to_f64()
    }

    /// True when `self` is a whole multiple of `unit`.
    pub fn is_multiple_of(self, unit: QuarterLength) -> bool {
        if unit.is_zero() {
            return self.is_zero();
        }
        (self.0 / unit.0).is_integer()
    }

    /// Exact decimal digits of a value whose denominator is a power of two,
    /// or `None` when the expansion does not fit.
    fn dyadic_decimal(self) -> Option<String> {
        let den = self.denominator();
        if den & (den - 1) != 0 {
            return None;
        }
        let places = den.trailing_zeros();
        let scaled = i128::from(self.numerator()).checked_mul(5i128.checked_pow(places)?)?;
        let unit = 10i128.checked_pow(places)?;

        let sign = if scaled < 0 { "-" } else { "" };
        let whole = scaled.abs() / unit;
        let frac = format!("{:0width$}", scaled.abs() % unit, width = places as usize);
        let frac = frac.trim_end_matches('0');
        Some(format!("{}{}.{}", sign, whole, if frac.is_empty() { "0" } else { frac }))
    }
}

impl Default for QuarterLength {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for QuarterLength {
    type Output = QuarterLength;

    fn add(self, rhs: QuarterLength) -> QuarterLength {
        QuarterLength(self.0 + rhs.0)
    }
}

impl AddAssign for QuarterLength {
    fn add_assign(&mut self, rhs: QuarterLength) {
        self.0 += rhs.0;
    }
}

impl Sub for QuarterLength {
    type Output = QuarterLength;

    fn sub(self, rhs: QuarterLength) -> QuarterLength {
        QuarterLength(self.0 - rhs.0)
    }
}

impl fmt::Display for QuarterLength {
    /// Dyadic values print as plain decimals (`0.25`, `1.0`), everything
    /// else as a fraction (`7/3`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dyadic_decimal() {
            Some(decimal) => f.write_str(&decimal),
            None => write!(f, "{}/{}", self.numerator(), self.denominator()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid quarter length: {0:?}")]
pub struct ParseQuarterLengthError(pub String);

impl FromStr for QuarterLength {
    type Err = ParseQuarterLengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseQuarterLengthError(s.to_string());

        if let Some((num, den)) = s.split_once('/') {
            let num: i64 = num.trim().parse().map_err(|_| err())?;
            let den: i64 = den.trim().parse().map_err(|_| err())?;
            if den == 0 {
                return Err(err());
            }
            return Ok(QuarterLength::new(num, den));
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }

        let scale = 10i64.checked_pow(frac.len() as u32).ok_or_else(err)?;
        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| err())? };
        let frac_val: i64 = if frac.is_empty() { 0 } else { frac.parse().map_err(|_| err())? };
        let num = whole
            .checked_mul(scale)
            .and_then(|n| n.checked_add(frac_val))
            .ok_or_else(err)?;
        Ok(QuarterLength::new(if negative { -num } else { num }, scale))
    }
}

impl Serialize for QuarterLength {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct QuarterLengthVisitor;

impl<'de> Visitor<'de> for QuarterLengthVisitor {
    type Value = QuarterLength;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or a string such as \"0.25\" or \"7/3\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<QuarterLength, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<QuarterLength, E> {
        Ok(QuarterLength::from_int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<QuarterLength, E> {
        i64::try_from(v)
            .map(QuarterLength::from_int)
            .map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<QuarterLength, E> {
        if !v.is_finite() {
            return Err(E::custom(format!("invalid quarter length: {}", v)));
        }
        // f64 Display never uses exponent notation
        self.visit_str(&v.to_string())
    }
}

impl<'de> Deserialize<'de> for QuarterLength {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuarterLengthVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_and_orders() {
        assert_eq!(QuarterLength::new(2, 4), QuarterLength::new(1, 2));
        assert!(QuarterLength::new(1, 3) < QuarterLength::new(1, 2));
        assert!(QuarterLength::new(-1, 2) < QuarterLength::ZERO);
        assert_eq!(QuarterLength::new(1, 3) + QuarterLength::new(2, 3), QuarterLength::from_int(1));
        assert_eq!(QuarterLength::new(1, 0), QuarterLength::ZERO);
    }

    #[test]
    fn displays_decimals_and_tuplets() {
        assert_eq!(QuarterLength::from_int(1).to_string(), "1.0");
        assert_eq!(QuarterLength::new(1, 8).to_string(), "0.125");
        assert_eq!(QuarterLength::new(-3, 2).to_string(), "-1.5");
        assert_eq!(QuarterLength::new(7, 3).to_string(), "7/3");
    }

    #[test]
    fn tiny_dyadic_values_print_without_exponent() {
        let tiny = QuarterLength::new(1, 16384);
        assert_eq!(tiny.to_string(), "0.00006103515625");
        assert_eq!(tiny.to_string().parse::<QuarterLength>(), Ok(tiny));

        let finest = QuarterLength::new(3, 1 << 40);
        assert_eq!(finest.to_string().parse::<QuarterLength>(), Ok(finest));
    }

    #[test]
    fn parses_decimals_and_fractions() {
        assert_eq!("0.25".parse::<QuarterLength>().unwrap(), QuarterLength::new(1, 4));
        assert_eq!("7/3".parse::<QuarterLength>().unwrap(), QuarterLength::new(7, 3));
        assert_eq!("2".parse::<QuarterLength>().unwrap(), QuarterLength::from_int(2));
        assert!("x".parse::<QuarterLength>().is_err());
    }

    #[test]
    fn oversized_decimals_are_errors() {
        assert!("99999999999999999999".parse::<QuarterLength>().is_err());
        assert!("9999999999.9999999999".parse::<QuarterLength>().is_err());
        assert!("0.00000000000000000001".parse::<QuarterLength>().is_err());
    }
}
