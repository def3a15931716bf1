//! Count normalization.
//!
//! Scales raw symbol counts to a distribution summing to exactly
//! `2^table_log`, rounding in the same direction as the reference encoder
//! so that compressed output is byte-identical.

use zentropy_core::{Error, Result};

use super::{min_table_log, FSE_MAX_TABLELOG, FSE_MIN_TABLELOG};

/// Round-up thresholds for probabilities below 8, in units of `2^(scale-20)`.
const RTB_TABLE: [u64; 8] = [0, 473_195, 504_333, 520_860, 550_000, 700_000, 750_000, 830_000];

const NOT_YET_ASSIGNED: i16 = -2;

/// Normalize `counts` (indexed by symbol, length `max_symbol + 1`) over
/// `2^table_log` slots.
///
/// Symbols whose count is at most `total >> table_log` receive the
/// low-probability marker `-1` when `use_low_prob_count` is set, `1`
/// otherwise. A symbol owning the whole `total` cannot be normalized and
/// is rejected; callers emit RLE for that case.
pub fn normalize_count(
    counts: &[u32],
    total: usize,
    table_log: u32,
    use_low_prob_count: bool,
) -> Result<Vec<i16>> {
    if table_log < FSE_MIN_TABLELOG {
        return Err(Error::Generic("normalize: table log below minimum"));
    }
    if table_log > FSE_MAX_TABLELOG {
        return Err(Error::table_log_too_large(table_log, FSE_MAX_TABLELOG));
    }
    if counts.is_empty() || total < 2 {
        return Err(Error::Generic("normalize: nothing to normalize"));
    }
    let max_symbol = (counts.len() - 1) as u32;
    if table_log < min_table_log(total, max_symbol) {
        return Err(Error::Generic("normalize: table log too small for alphabet"));
    }

    let low_prob: i16 = if use_low_prob_count { -1 } else { 1 };
    let scale = 62 - table_log;
    let step = (1u64 << 62) / total as u64;
    let v_step = 1u64 << (scale - 20);
    let low_threshold = (total >> table_log) as u64;

    let mut norm = vec![0i16; counts.len()];
    let mut still_to_distribute: i32 = 1 << table_log;
    let mut largest = 0usize;
    let mut largest_p: i16 = 0;

    for (s, &count) in counts.iter().enumerate() {
        let count = u64::from(count);
        if count == total as u64 {
            return Err(Error::Generic("normalize: single symbol input"));
        }
        if count == 0 {
            continue;
        }
        if count <= low_threshold {
            norm[s] = low_prob;
            still_to_distribute -= 1;
        } else {
            let scaled = count * step;
            let mut proba = (scaled >> scale) as i16;
            if proba < 8 {
                let rest_to_beat = v_step * RTB_TABLE[proba as usize];
                if scaled - ((proba as u64) << scale) > rest_to_beat {
                    proba += 1;
                }
            }
            if proba > largest_p {
                largest_p = proba;
                largest = s;
            }
            norm[s] = proba;
            still_to_distribute -= i32::from(proba);
        }
    }

    if -still_to_distribute >= i32::from(norm[largest] >> 1) {
        normalize_m2(&mut norm, table_log, counts, total, low_prob)?;
    } else {
        norm[largest] += still_to_distribute as i16;
    }
    Ok(norm)
}

/// Secondary method for distributions where the largest symbol would have
/// to absorb too much rounding error.
fn normalize_m2(
    norm: &mut [i16],
    table_log: u32,
    counts: &[u32],
    total: usize,
    low_prob: i16,
) -> Result<()> {
    let mut total = total as u64;
    let low_threshold = total >> table_log;
    let mut low_one = (total * 3) >> (table_log + 1);
    let mut distributed: u32 = 0;

    for (s, &count) in counts.iter().enumerate() {
        let count = u64::from(count);
        if count == 0 {
            norm[s] = 0;
        } else if count <= low_threshold {
            norm[s] = low_prob;
            distributed += 1;
            total -= count;
        } else if count <= low_one {
            norm[s] = 1;
            distributed += 1;
            total -= count;
        } else {
            norm[s] = NOT_YET_ASSIGNED;
        }
    }

    let mut to_distribute = (1u32 << table_log) - distributed;
    if to_distribute == 0 {
        return Ok(());
    }

    if total / u64::from(to_distribute) > low_one {
        low_one = (total * 3) / (u64::from(to_distribute) * 2);
        for (s, &count) in counts.iter().enumerate() {
            if norm[s] == NOT_YET_ASSIGNED && u64::from(count) <= low_one {
                norm[s] = 1;
                distributed += 1;
                total -= u64::from(count);
            }
        }
        to_distribute = (1u32 << table_log) - distributed;
    }

    if distributed as usize == counts.len() {
        // every symbol is poor; hand the remainder to the most frequent
        let mut max_v = 0;
        let mut max_c = 0;
        for (s, &count) in counts.iter().enumerate() {
            if count > max_c {
                max_v = s;
                max_c = count;
            }
        }
        norm[max_v] += to_distribute as i16;
        return Ok(());
    }

    if total == 0 {
        if !norm.iter().any(|&n| n > 0) {
            return Err(Error::Generic("normalize: no symbol can absorb remainder"));
        }
        let mut s = 0;
        while to_distribute > 0 {
            if norm[s] > 0 {
                to_distribute -= 1;
                norm[s] += 1;
            }
            s = (s + 1) % norm.len();
        }
        return Ok(());
    }

    let v_step_log = 62 - table_log;
    let mid = (1u64 << (v_step_log - 1)) - 1;
    let r_step = ((1u64 << v_step_log) * u64::from(to_distribute) + mid) / total;
    let mut tmp_total = mid;
    for (s, &count) in counts.iter().enumerate() {
        if norm[s] == NOT_YET_ASSIGNED {
            let end = tmp_total + u64::from(count) * r_step;
            let s_start = (tmp_total >> v_step_log) as u32;
            let s_end = (end >> v_step_log) as u32;
            let weight = s_end - s_start;
            if weight < 1 {
                return Err(Error::Generic("normalize: symbol rounded to zero"));
            }
            norm[s] = weight as i16;
            tmp_total = end;
        }
    }
    Ok(())
}
