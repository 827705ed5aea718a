//! Per-column rank transform.
//!
//! Ranks are 1-based and fractional. Equal values share the mean of the
//! positions they occupy. Missing values take the positions after every
//! present value and share the mean of that block.

use std::cmp::Ordering;

use crate::{MissingPolicy, RankDirection};

/// Ranks `values` in place order. The output has one rank per input slot.
pub fn rank_column(
    values: &[Option<f64>],
    direction: RankDirection,
    missing: MissingPolicy,
) -> Vec<f64> {
    let n = values.len();
    let mut ranks = vec![0.0_f64; n];

    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| value.map(|v| (index, v)))
        .collect();

    // Stable sort; tie order does not matter since ties share a rank.
    present.sort_by(|a, b| match direction {
        RankDirection::Ascending => a.1.total_cmp(&b.1),
        RankDirection::Descending => b.1.total_cmp(&a.1),
    });

    let mut start = 0;
    while start < present.len() {
        let mut end = start;
        while end + 1 < present.len() && same_value(present[end + 1].1, present[start].1) {
            end += 1;
        }
        let shared = average_position(start, end);
        for &(index, _) in &present[start..=end] {
            ranks[index] = shared;
        }
        start = end + 1;
    }

    match missing {
        MissingPolicy::Bottom => {
            let first_missing = present.len();
            if first_missing < n {
                let shared = average_position(first_missing, n - 1);
                for (index, value) in values.iter().enumerate() {
                    if value.is_none() {
                        ranks[index] = shared;
                    }
                }
            }
        }
    }

    ranks
}

fn same_value(a: f64, b: f64) -> bool {
    a.total_cmp(&b) == Ordering::Equal || a == b
}

/// Mean of the 1-based positions `start + 1 ..= end + 1`.
fn average_position(start: usize, end: usize) -> f64 {
    (start + end + 2) as f64 / 2.0
}
