use super::duration::QuarterLength;
use super::meter::{Measure, TimeSignature};

/// A time signature taking effect at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterChange {
    pub tick: u64,
    pub time_signature: TimeSignature,
}

/// Time signature changes of a MIDI file plus its resolution.
#[derive(Debug, Clone)]
pub struct MeterMap {
    pub ticks_per_quarter: u32,
    /// Sorted by tick; always starts at tick 0.
    pub changes: Vec<MeterChange>,
}

impl MeterMap {
    pub fn new(ticks_per_quarter: u32, mut changes: Vec<MeterChange>) -> Self {
        changes.sort_by_key(|c| c.tick);
        if changes.first().map_or(true, |c| c.tick > 0) {
            changes.insert(
                0,
                MeterChange {
                    tick: 0,
                    time_signature: TimeSignature::default(),
                },
            );
        }
        MeterMap {
            ticks_per_quarter,
            changes,
        }
    }

    /// Lays out numbered bars from tick 0 until `end_ticks` is covered.
    ///
    /// A meter change that lands mid-bar cuts the running bar short and
    /// starts a new one at the change.
    pub fn measures(&self, end_ticks: u64) -> Vec<Measure> {
        let end = QuarterLength::from_ticks(end_ticks, self.ticks_per_quarter);
        let mut measures = Vec::new();
        let mut offset = QuarterLength::ZERO;
        let mut change_idx = 0;

        loop {
            while change_idx + 1 < self.changes.len()
                && QuarterLength::from_ticks(self.changes[change_idx + 1].tick, self.ticks_per_quarter) <= offset
            {
                change_idx += 1;
            }
            let time_signature = self.changes[change_idx].time_signature;

            let mut duration = time_signature.bar_length();
            if let Some(next) = self.changes.get(change_idx + 1) {
                let next_offset = QuarterLength::from_ticks(next.tick, self.ticks_per_quarter);
                if next_offset < offset + duration {
                    duration = next_offset - offset;
                }
            }

            measures.push(Measure {
                number: measures.len() as i32 + 1,
                offset,
                duration,
                time_signature,
                padding: QuarterLength::ZERO,
            });
            offset += duration;

            if offset >= end {
                break;
            }
        }

        measures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_follow_meter_changes() {
        let map = MeterMap::new(
            480,
            vec![MeterChange {
                tick: 480 * 4,
                time_signature: TimeSignature::new(3, 4),
            }],
        );
        let measures = map.measures(480 * 10);
        assert_eq!(measures.len(), 3);
        assert_eq!(measures[0].duration, QuarterLength::from_int(4));
        assert_eq!(measures[1].duration, QuarterLength::from_int(3));
        assert_eq!(measures[2].offset, QuarterLength::from_int(7));
        assert_eq!(measures[2].number, 3);
    }

    #[test]
    fn empty_file_still_has_one_bar() {
        let map = MeterMap::new(96, Vec::new());
        assert_eq!(map.measures(0).len(), 1);
    }
}
