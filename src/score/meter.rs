use super::duration::QuarterLength;
use serde::{Deserialize, Serialize};

/// Deepest metrical level probed when computing beat strength.
const MAX_METRIC_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        TimeSignature {
            numerator: numerator.max(1),
            denominator: denominator.max(1),
        }
    }

    /// Compound meters group the beat in threes (6/8, 9/8, 12/8).
    pub fn is_compound(&self) -> bool {
        self.numerator > 3 && self.numerator % 3 == 0
    }

    pub fn bar_length(&self) -> QuarterLength {
        QuarterLength::new(i64::from(self.numerator) * 4, i64::from(self.denominator))
    }

    pub fn beat_length(&self) -> QuarterLength {
        let unit = QuarterLength::new(4, i64::from(self.denominator));
        if self.is_compound() {
            unit.mul_int(3)
        } else {
            unit
        }
    }

    pub fn beat_count(&self) -> u32 {
        if self.is_compound() {
            self.numerator / 3
        } else {
            self.numerator
        }
    }

    /// 1-based beat of a position in the bar, rounded to two decimals.
    pub fn beat(&self, offset_in_bar: QuarterLength) -> f64 {
        let beat = 1.0 + offset_in_bar.ratio(self.beat_length());
        (beat * 100.0).round() / 100.0
    }

    /// Metrical weight of a position in the bar: 1.0 on the downbeat,
    /// halving at each deeper level of the metrical hierarchy.
    ///
    /// 4/4 divides into halves before quarters, so beat 3 scores 0.5 and
    /// beats 2 and 4 score 0.25.
    pub fn beat_strength(&self, offset_in_bar: QuarterLength) -> f64 {
        if offset_in_bar.is_zero() {
            return 1.0;
        }

        let subdivision = if self.is_compound() { 3 } else { 2 };
        let levels = factorize(self.beat_count())
            .into_iter()
            .chain(std::iter::once(subdivision))
            .chain(std::iter::repeat(2));

        let mut segment = self.bar_length();
        let mut strength = 1.0;
        for divisor in levels.take(MAX_METRIC_DEPTH) {
            segment = segment.div_int(i64::from(divisor));
            strength /= 2.0;
            if offset_in_bar.is_multiple_of(segment) {
                return strength;
            }
        }
        strength / 2.0
    }
}

/// Splits a beat count into metrical levels, duple groupings first.
fn factorize(mut n: u32) -> Vec<u32> {
    let mut factors = Vec::new();
    for p in [2, 3] {
        while n > 1 && n % p == 0 {
            factors.push(p);
            n /= p;
        }
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// One bar of the score's shared measure map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub number: i32,
    /// Absolute offset of the barline.
    pub offset: QuarterLength,
    pub duration: QuarterLength,
    pub time_signature: TimeSignature,
    /// Missing time at the start of an anacrusis.
    pub padding: QuarterLength,
}

impl Measure {
    pub fn end(&self) -> QuarterLength {
        self.offset + self.duration
    }

    pub fn beat(&self, offset_in_measure: QuarterLength) -> f64 {
        self.time_signature.beat(offset_in_measure + self.padding)
    }

    pub fn beat_strength(&self, offset_in_measure: QuarterLength) -> f64 {
        self.time_signature
            .beat_strength(offset_in_measure + self.padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ql(n: i64, d: i64) -> QuarterLength {
        QuarterLength::new(n, d)
    }

    #[test]
    fn common_time_strengths() {
        let ts = TimeSignature::new(4, 4);
        assert_eq!(ts.beat_strength(ql(0, 1)), 1.0);
        assert_eq!(ts.beat_strength(ql(1, 1)), 0.25);
        assert_eq!(ts.beat_strength(ql(2, 1)), 0.5);
        assert_eq!(ts.beat_strength(ql(3, 2)), 0.125);
    }

    #[test]
    fn triple_and_compound_strengths() {
        let waltz = TimeSignature::new(3, 4);
        assert_eq!(waltz.beat_strength(ql(1, 1)), 0.5);
        assert_eq!(waltz.beat_strength(ql(1, 2)), 0.25);

        let jig = TimeSignature::new(6, 8);
        assert_eq!(jig.beat_strength(ql(3, 2)), 0.5);
        assert_eq!(jig.beat_strength(ql(1, 2)), 0.25);
        assert_eq!(jig.beat(ql(3, 2)), 2.0);
    }

    #[test]
    fn tuplet_beats_round() {
        let waltz = TimeSignature::new(3, 4);
        assert_eq!(waltz.beat(ql(4, 3)), 2.33);
    }
}
