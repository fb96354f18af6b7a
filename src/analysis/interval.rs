use crate::score::Pitch;
use std::fmt;

/// Semitones above the lower note for major/perfect simple intervals,
/// indexed by diatonic distance.
const REFERENCE_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    Perfect,
    Major,
    Minor,
    /// Augmented, by how many semitones.
    Augmented(u8),
    /// Diminished, by how many semitones.
    Diminished(u8),
}

/// A directionless interval between two spelled pitches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub quality: Quality,
    /// 1 for a unison, 8 for an octave, 10 for a compound third.
    pub generic: u32,
    pub semitones: i32,
}

impl Interval {
    /// Interval from `a` to `b`, named as if ascending.
    ///
    /// The diatonic distance decides the generic size, the chromatic
    /// distance the quality, so `B#3`-`C4` is a diminished second.
    pub fn between(a: Pitch, b: Pitch) -> Interval {
        let mut steps = b.diatonic_number() - a.diatonic_number();
        let mut semitones = b.midi() - a.midi();
        if steps < 0 || (steps == 0 && semitones < 0) {
            steps = -steps;
            semitones = -semitones;
        }

        let simple = (steps % 7) as usize;
        let octaves = steps / 7;
        let deviation = semitones - 12 * octaves - REFERENCE_SEMITONES[simple];
        let perfect_class = matches!(simple, 0 | 3 | 4);

        let quality = if perfect_class {
            match deviation {
                0 => Quality::Perfect,
                d if d > 0 => Quality::Augmented(d as u8),
                d => Quality::Diminished((-d) as u8),
            }
        } else {
            match deviation {
                0 => Quality::Major,
                -1 => Quality::Minor,
                d if d > 0 => Quality::Augmented(d as u8),
                d => Quality::Diminished((-d - 1) as u8),
            }
        };

        Interval {
            quality,
            generic: steps as u32 + 1,
            semitones,
        }
    }

    /// Short name such as `P5`, `m3`, `A6` or `dd7`.
    pub fn name(&self) -> String {
        let quality = match self.quality {
            Quality::Perfect => "P".to_string(),
            Quality::Major => "M".to_string(),
            Quality::Minor => "m".to_string(),
            Quality::Augmented(n) => "A".repeat(usize::from(n)),
            Quality::Diminished(n) => "d".repeat(usize::from(n)),
        };
        format!("{}{}", quality, self.generic)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Names of every pairwise interval in a chord, in pair order, without
/// duplicates.
pub fn chord_intervals(pitches: &[Pitch]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (i, low) in pitches.iter().enumerate() {
        for high in &pitches[i + 1..] {
            let name = Interval::between(*low, *high).name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(a: &str, b: &str) -> String {
        Interval::between(a.parse().unwrap(), b.parse().unwrap()).name()
    }

    #[test]
    fn simple_intervals() {
        assert_eq!(name("C4", "C4"), "P1");
        assert_eq!(name("C4", "E4"), "M3");
        assert_eq!(name("E4", "G4"), "m3");
        assert_eq!(name("B3", "F4"), "d5");
        assert_eq!(name("F4", "B4"), "A4");
        assert_eq!(name("C4", "C5"), "P8");
    }

    #[test]
    fn spelling_decides_the_name() {
        assert_eq!(name("A-3", "F#4"), "A6");
        assert_eq!(name("C#4", "E-4"), "d3");
        assert_eq!(name("B#3", "C4"), "d2");
    }

    #[test]
    fn direction_does_not_matter() {
        assert_eq!(name("D5", "B4"), "m3");
        assert_eq!(name("G4", "F#4"), "m2");
    }

    #[test]
    fn compound_intervals_keep_their_size() {
        assert_eq!(name("C3", "E4"), "M10");
        assert_eq!(name("C3", "G4"), "P12");
        assert_eq!(name("B2", "F4"), "d12");
    }

    #[test]
    fn chord_intervals_are_deduplicated() {
        let pitches: Vec<Pitch> = ["C4", "E4", "G4", "C5"].iter().map(|p| p.parse().unwrap()).collect();
        assert_eq!(chord_intervals(&pitches), vec!["M3", "P5", "P8", "m3", "m6", "P4"]);
    }
}
