/// Interval naming and pitch-class set classification shared by the slice
/// and segment pipelines. Every function here is a pure, deterministic
/// function of its input.
mod interval;
mod pcset;

pub use interval::{chord_intervals, Interval, Quality};
pub use pcset::{normal_order, pitch_classes, prime_form, transposed_normal_form};
