//! Pitch-class set classification: normal order and prime form.
//!
//! Ties between rotations are broken with Forte's rule: after the overall
//! span, prefer the smaller interval from the first element to the second,
//! then to the third, and so on.
use crate::score::Pitch;

/// Sorted, de-duplicated pitch classes of a chord.
pub fn pitch_classes(pitches: &[Pitch]) -> Vec<u8> {
    let mut pcs: Vec<u8> = pitches.iter().map(|p| p.pitch_class()).collect();
    pcs.sort_unstable();
    pcs.dedup();
    pcs
}

fn canonical(pcs: &[u8]) -> Vec<u8> {
    let mut set: Vec<u8> = pcs.iter().map(|pc| pc % 12).collect();
    set.sort_unstable();
    set.dedup();
    set
}

/// Comparison key of a rotation: span first, then distances from the first
/// element to each following one.
fn packing_key(rotation: &[u8]) -> Vec<u8> {
    let first = rotation[0];
    let distance = |pc: u8| (pc + 12 - first) % 12;
    let mut key = Vec::with_capacity(rotation.len());
    key.push(distance(rotation[rotation.len() - 1]));
    key.extend(rotation[1..rotation.len() - 1].iter().map(|&pc| distance(pc)));
    key
}

/// Most compact rotation of the set, in actual pitch classes.
pub fn normal_order(pcs: &[u8]) -> Vec<u8> {
    let set = canonical(pcs);
    if set.len() < 2 {
        return set;
    }

    let mut best: Option<(Vec<u8>, Vec<u8>)> = None;
    for start in 0..set.len() {
        let rotation: Vec<u8> = set[start..].iter().chain(&set[..start]).copied().collect();
        let key = packing_key(&rotation);
        if best.as_ref().map_or(true, |(best_key, _)| key < *best_key) {
            best = Some((key, rotation));
        }
    }
    best.map(|(_, rotation)| rotation).unwrap_or_default()
}

fn transpose_to_zero(order: &[u8]) -> Vec<u8> {
    match order.first() {
        Some(&first) => order.iter().map(|&pc| (pc + 12 - first) % 12).collect(),
        None => Vec::new(),
    }
}

/// Normal order transposed to start on 0. Keeps major `[0, 4, 7]` apart from
/// minor `[0, 3, 7]`, which the prime form merges.
pub fn transposed_normal_form(pcs: &[u8]) -> Vec<u8> {
    transpose_to_zero(&normal_order(pcs))
}

/// The more compact of the set and its inversion, transposed to 0.
pub fn prime_form(pcs: &[u8]) -> Vec<u8> {
    let set = canonical(pcs);
    if set.is_empty() {
        return Vec::new();
    }

    let original = transposed_normal_form(&set);
    let inverted: Vec<u8> = set.iter().map(|&pc| (12 - pc) % 12).collect();
    let inverted = transposed_normal_form(&inverted);

    if inverted.len() > 1 && packing_key(&inverted) < packing_key(&original) {
        inverted
    } else {
        original
    }
}
