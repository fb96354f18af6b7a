use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Diatonic step of a spelled pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Position within the octave, C = 0 .. B = 6.
    pub fn index(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 1,
            Step::E => 2,
            Step::F => 3,
            Step::G => 4,
            Step::A => 5,
            Step::B => 6,
        }
    }

    /// Pitch class of the natural step.
    pub fn pitch_class(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    pub fn from_char(c: char) -> Option<Step> {
        match c.to_ascii_uppercase() {
            'C' => Some(Step::C),
            'D' => Some(Step::D),
            'E' => Some(Step::E),
            'F' => Some(Step::F),
            'G' => Some(Step::G),
            'A' => Some(Step::A),
            'B' => Some(Step::B),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
            Step::A => 'A',
            Step::B => 'B',
        }
    }
}

/// A spelled pitch: step, chromatic alteration in semitones, and octave.
///
/// Octave numbering follows scientific pitch notation, so middle C is
/// `C4` and MIDI 60.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    pub alter: i8,
    pub octave: i8,
}

/// Default spellings for pitches that only carry a MIDI number.
const MIDI_SPELLINGS: [(Step, i8); 12] = [
    (Step::C, 0),
    (Step::C, 1),
    (Step::D, 0),
    (Step::E, -1),
    (Step::E, 0),
    (Step::F, 0),
    (Step::F, 1),
    (Step::G, 0),
    (Step::G, 1),
    (Step::A, 0),
    (Step::B, -1),
    (Step::B, 0),
];

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: i8) -> Self {
        Pitch { step, alter, octave }
    }

    pub fn from_midi(number: u8) -> Self {
        let (step, alter) = MIDI_SPELLINGS[usize::from(number % 12)];
        Pitch {
            step,
            alter,
            octave: (number / 12) as i8 - 1,
        }
    }

    /// MIDI note number; may fall outside 0..=127 for extreme spellings.
    pub fn midi(self) -> i32 {
        12 * (i32::from(self.octave) + 1) + self.step.pitch_class() + i32::from(self.alter)
    }

    pub fn pitch_class(self) -> u8 {
        self.midi().rem_euclid(12) as u8
    }

    /// Count of diatonic steps above C0.
    pub fn diatonic_number(self) -> i32 {
        i32::from(self.octave) * 7 + self.step.index()
    }

    /// Name without octave, e.g. `F#` or `B-`.
    pub fn name(self) -> String {
        let mut name = String::new();
        name.push(self.step.as_char());
        let accidental = if self.alter > 0 { '#' } else { '-' };
        for _ in 0..self.alter.unsigned_abs() {
            name.push(accidental);
        }
        name
    }

    pub fn name_with_octave(self) -> String {
        format!("{}{}", self.name(), self.octave)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name_with_octave())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pitch name: {0:?}")]
pub struct ParsePitchError(pub String);

impl FromStr for Pitch {
    type Err = ParsePitchError;

    /// Accepts `C4`, `C#4`, `B-3`, `Bb3` and double accidentals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePitchError(s.to_string());
        let mut chars = s.trim().chars().peekable();
        let step = chars.next().and_then(Step::from_char).ok_or_else(err)?;

        let mut alter: i8 = 0;
        while let Some(&c) = chars.peek() {
            let step_by = match c {
                '#' => 1,
                '-' | 'b' => -1,
                _ => break,
            };
            alter = alter.checked_add(step_by).ok_or_else(err)?;
            chars.next();
        }

        let octave: String = chars.collect();
        let octave: i8 = octave.parse().map_err(|_| err())?;
        Ok(Pitch { step, alter, octave })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midi_numbers() {
        assert_eq!(Pitch::new(Step::C, 0, 4).midi(), 60);
        assert_eq!(Pitch::new(Step::B, 1, 3).midi(), 60);
        assert_eq!(Pitch::new(Step::B, -1, 3).midi(), 58);
    }

    #[test]
    fn names_round_trip() {
        for name in ["C4", "F#5", "B-3", "E--2", "G##1"] {
            let pitch: Pitch = name.parse().unwrap();
            assert_eq!(pitch.name_with_octave(), name);
        }
        assert_eq!("Bb3".parse::<Pitch>().unwrap().name_with_octave(), "B-3");
    }

    #[test]
    fn runaway_accidentals_are_errors() {
        let sharps = format!("C{}4", "#".repeat(200));
        assert!(sharps.parse::<Pitch>().is_err());
        let flats = format!("D{}4", "-".repeat(200));
        assert!(flats.parse::<Pitch>().is_err());
    }

    #[test]
    fn default_midi_spelling() {
        assert_eq!(Pitch::from_midi(61).name_with_octave(), "C#4");
        assert_eq!(Pitch::from_midi(70).name_with_octave(), "B-4");
        assert_eq!(Pitch::from_midi(48).name_with_octave(), "C3");
    }
}
