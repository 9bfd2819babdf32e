//! Meet-in-the-middle: the half-state tables built by
//! [`crate::enumerator::state_loop`] are bucketed by their most-significant
//! byte, matching buckets are merged pairwise, and every join is handed to
//! [`crate::verifier::verify`].
//!
//! Ported from `struct Msb`, `binsearch`, `quicksort`, `extend_table`,
//! `old_recover` and `calculate_msb_tables` in the Proxmark3
//! `mfkey_desktop.c` reference implementation.

use crate::cancel::CancelFlag;
use crate::enumerator::{state_loop, update_contribution, STATE_BUFFER_CAP};
use crate::filter::{evenparity32, filter};
use crate::lfsr::{Crypto1State, LF_POLY_EVEN, LF_POLY_ODD};
use crate::nonce::NonceRecord;
use crate::verifier::verify;

/// Number of MSB values processed together in one `calculate_msb_tables`
/// round; `256 / MSB_LIMIT` rounds cover the full byte range.
pub const MSB_LIMIT: u32 = 16;
/// Per-bucket candidate capacity.
pub const BUCKET_CAP: usize = 768;
/// Scratch buffer capacity `old_recover` works in; sized well above any
/// bucket's expected occupancy.
pub const SCRATCH_CAP: usize = 1280;

pub const CONST_M1_1: u32 = (LF_POLY_EVEN << 1) | 1;
pub const CONST_M2_1: u32 = LF_POLY_ODD << 1;
pub const CONST_M1_2: u32 = LF_POLY_ODD;
pub const CONST_M2_2: u32 = (LF_POLY_EVEN << 1) | 1;

/// Candidates sharing one most-significant byte, deduplicated on insert.
///
/// The odd and even dedup scans use different bounds (`tail - 1` vs
/// `tail`) in the original — the odd scan never compares the most recently
/// inserted slot against itself, the even scan does. Both are preserved
/// exactly rather than unified, since unifying them would change which
/// duplicate states survive into the join phase.
pub struct MsbBucket {
    pub tail: usize,
    pub states: [u32; BUCKET_CAP],
}

impl Default for MsbBucket {
    fn default() -> Self {
        Self { tail: 0, states: [0u32; BUCKET_CAP] }
    }
}

impl MsbBucket {
    pub fn push_odd(&mut self, value: u32) {
        let scan_end = self.tail.saturating_sub(1);
        if !self.states[..scan_end].contains(&value) {
            self.states[self.tail] = value;
            self.tail += 1;
        }
    }

    pub fn push_even(&mut self, value: u32) {
        if !self.states[..self.tail].contains(&value) {
            self.states[self.tail] = value;
            self.tail += 1;
        }
    }
}

/// Leftmost index in `data[start..=stop]` whose top byte equals
/// `data[stop]`'s top byte, ordered by the signed (`^ 0x8000_0000`)
/// comparison below — not plain unsigned order, and not the order
/// `quicksort` actually sorts by. This mismatch is in the original and is
/// preserved rather than reconciled; see `old_recover`.
pub fn binsearch(data: &[u32], start: isize, stop: isize) -> isize {
    let val = data[stop as usize] & 0xff000000;
    let mut start = start;
    let mut stop = stop;
    while start != stop {
        let mid = (stop - start) >> 1;
        if (data[(start + mid) as usize] ^ 0x8000_0000) > (val ^ 0x8000_0000) {
            stop = start + mid;
        } else {
            start += mid + 1;
        }
    }
    start
}

/// In-place quicksort over `data[low..=high]`, ascending by plain unsigned
/// value (not the signed order `binsearch` uses for its own comparisons).
pub fn quicksort(data: &mut [u32], low: isize, high: isize) {
    if low >= high {
        return;
    }
    let middle = low + (high - low) / 2;
    let pivot = data[middle as usize];
    let (mut i, mut j) = (low, high);
    while i <= j {
        while data[i as usize] < pivot {
            i += 1;
        }
        while data[j as usize] > pivot {
            j -= 1;
        }
        if i <= j {
            data.swap(i as usize, j as usize);
            i += 1;
            j -= 1;
        }
    }
    if low < j {
        quicksort(data, low, j);
    }
    if high > i {
        quicksort(data, i, high);
    }
}

/// Extend every candidate in `data[tbl..=end]` by one keystream bit,
/// forking entries the filter function doesn't determine and discarding
/// entries it rules out. Returns the new `end`.
pub fn extend_table(
    data: &mut [u32],
    tbl: isize,
    end: isize,
    bit: u32,
    m1: u32,
    m2: u32,
    in_word: u32,
) -> isize {
    let in_shifted = in_word << 24;
    let mut tbl = tbl;
    let mut end = end;
    data[tbl as usize] <<= 1;
    while tbl <= end {
        if (filter(data[tbl as usize]) ^ filter(data[tbl as usize] | 1)) != 0 {
            data[tbl as usize] |= filter(data[tbl as usize]) ^ bit;
            update_contribution(data, tbl as usize, m1, m2);
            data[tbl as usize] ^= in_shifted;
        } else if filter(data[tbl as usize]) == bit {
            end += 1;
            data[end as usize] = data[(tbl + 1) as usize];
            data[(tbl + 1) as usize] = data[tbl as usize] | 1;
            update_contribution(data, tbl as usize, m1, m2);
            data[tbl as usize] ^= in_shifted;
            tbl += 1;
            update_contribution(data, tbl as usize, m1, m2);
            data[tbl as usize] ^= in_shifted;
        } else {
            data[tbl as usize] = data[end as usize];
            tbl -= 1;
            end -= 1;
        }
        tbl += 1;
        if (tbl as usize) < data.len() {
            data[tbl as usize] <<= 1;
        }
    }
    end
}

/// Join the odd/even half-state tables and hand every consistent pair to
/// [`verify`]. `rem` counts the extension rounds still owed before the two
/// tables are considered fully grown; `first_run` skips that extension on
/// the outermost call, which has already been extended by its caller.
///
/// The equal-top-byte recursive branch below passes `rem` through
/// unchanged rather than decrementing it — that is the original's
/// behavior (`old_recover`'s recursive call reuses the caller's `rem`
/// verbatim) and is preserved rather than "fixed", since changing it would
/// change which candidate ranges get matched.
#[allow(clippy::too_many_arguments)]
pub fn old_recover(
    odd: &mut [u32],
    o_head: isize,
    o_tail: isize,
    oks: u32,
    even: &mut [u32],
    e_head: isize,
    e_tail: isize,
    eks: u32,
    rem: i32,
    record: &NonceRecord,
    in_word: u32,
    first_run: bool,
) -> Option<[u8; 6]> {
    if rem == -1 {
        for e in e_head..=e_tail {
            let e_idx = e as usize;
            even[e_idx] =
                (even[e_idx] << 1) ^ evenparity32(even[e_idx] & LF_POLY_EVEN) ^ ((in_word & 4 != 0) as u32);
            for o in o_head..=o_tail {
                let o_idx = o as usize;
                let mut candidate = Crypto1State {
                    even: odd[o_idx],
                    odd: even[e_idx] ^ evenparity32(odd[o_idx] & LF_POLY_ODD),
                };
                if let Some(key) = verify(&mut candidate, record) {
                    return Some(key);
                }
            }
        }
        return None;
    }

    let mut oks = oks;
    let mut eks = eks;
    let mut in_word = in_word;
    let mut rem = rem;
    let mut o_tail = o_tail;
    let mut e_tail = e_tail;

    if !first_run {
        let mut i = 0;
        loop {
            if i >= 4 {
                break;
            }
            let old_rem = rem;
            rem -= 1;
            if old_rem == 0 {
                break;
            }
            oks >>= 1;
            eks >>= 1;
            in_word >>= 2;
            o_tail = extend_table(odd, o_head, o_tail, oks & 1, CONST_M1_1, CONST_M2_1, 0);
            if o_head > o_tail {
                return None;
            }
            e_tail = extend_table(even, e_head, e_tail, eks & 1, CONST_M1_2, CONST_M2_2, in_word & 3);
            if e_head > e_tail {
                return None;
            }
            i += 1;
        }
    }

    quicksort(odd, o_head, o_tail);
    quicksort(even, e_head, e_tail);

    while o_tail >= o_head && e_tail >= e_head {
        if ((odd[o_tail as usize] ^ even[e_tail as usize]) >> 24) == 0 {
            let o_hi = o_tail;
            let e_hi = e_tail;
            let o_lo = binsearch(odd, o_head, o_tail);
            let e_lo = binsearch(even, e_head, e_tail);
            let result =
                old_recover(odd, o_lo, o_hi, oks, even, e_lo, e_hi, eks, rem, record, in_word, false);
            o_tail = o_lo - 1;
            e_tail = e_lo - 1;
            if result.is_some() {
                return result;
            }
        } else if (odd[o_tail as usize] ^ 0x8000_0000) > (even[e_tail as usize] ^ 0x8000_0000) {
            o_tail = binsearch(odd, o_head, o_tail) - 1;
        } else {
            e_tail = binsearch(even, e_head, e_tail) - 1;
        }
    }
    None
}

/// Working buffers for one `recover` call, reused across MSB rounds.
pub struct SearchBuffers {
    pub states_buffer: Vec<u32>,
    pub odd_msbs: Vec<MsbBucket>,
    pub even_msbs: Vec<MsbBucket>,
    pub temp_odd: Vec<u32>,
    pub temp_even: Vec<u32>,
}

impl SearchBuffers {
    pub fn new() -> Self {
        Self {
            states_buffer: vec![0u32; STATE_BUFFER_CAP],
            odd_msbs: (0..MSB_LIMIT).map(|_| MsbBucket::default()).collect(),
            even_msbs: (0..MSB_LIMIT).map(|_| MsbBucket::default()).collect(),
            temp_odd: vec![0u32; SCRATCH_CAP],
            temp_even: vec![0u32; SCRATCH_CAP],
        }
    }
}

impl Default for SearchBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerate one MSB round (semi-states `0..=2^20`, bucketed into the
/// `msb_round`-th slice of the 256-value MSB range) and attempt every join.
///
/// The semi-state loop's literal bound is `1 << 20` inclusive down to `0`
/// (the reference implementation's `for(semi_state = 1 << 20; semi_state >=
/// 0; semi_state--)`), not a looser `2^21` reading of the prose
/// description — the C source is authoritative here.
#[allow(clippy::too_many_arguments)]
pub fn calculate_msb_tables(
    oks: u32,
    eks: u32,
    msb_round: u32,
    record: &NonceRecord,
    buffers: &mut SearchBuffers,
    in_word: u32,
    cancel: &CancelFlag,
    mut on_semi_state_progress: impl FnMut(f32),
) -> Option<[u8; 6]> {
    let msb_head = MSB_LIMIT * msb_round;
    let msb_tail = MSB_LIMIT * (msb_round + 1);
    let in_rotated = ((in_word >> 16 & 0xff) | (in_word << 16) | (in_word & 0xff00)) << 1;

    for bucket in buffers.odd_msbs.iter_mut() {
        *bucket = MsbBucket::default();
    }
    for bucket in buffers.even_msbs.iter_mut() {
        *bucket = MsbBucket::default();
    }

    let mut semi_state: i64 = 1 << 20;
    while semi_state >= 0 {
        if cancel.is_set() {
            return None;
        }
        if semi_state % 65536 == 0 {
            let progress = (1_048_576 - semi_state) as f32 / 1_048_576.0 * 100.0;
            on_semi_state_progress(progress);
        }

        let semi_state_u = semi_state as u32;

        if filter(semi_state_u) == (oks & 1) {
            buffers.states_buffer[0] = semi_state_u;
            let states_tail =
                state_loop(&mut buffers.states_buffer, oks, CONST_M1_1, CONST_M2_1, 0, 0);
            for i in (0..=states_tail).rev() {
                let value = buffers.states_buffer[i as usize];
                let msb = value >> 24;
                if msb >= msb_head && msb < msb_tail {
                    buffers.odd_msbs[(msb - msb_head) as usize].push_odd(value);
                }
            }
        }

        if filter(semi_state_u) == (eks & 1) {
            buffers.states_buffer[0] = semi_state_u;
            let states_tail =
                state_loop(&mut buffers.states_buffer, eks, CONST_M1_2, CONST_M2_2, in_rotated, 3);
            for i in 0..=states_tail {
                let value = buffers.states_buffer[i as usize];
                let msb = value >> 24;
                if msb >= msb_head && msb < msb_tail {
                    buffers.even_msbs[(msb - msb_head) as usize].push_even(value);
                }
            }
        }

        semi_state -= 1;
    }

    let oks = oks >> 12;
    let eks = eks >> 12;

    for i in 0..MSB_LIMIT as usize {
        if cancel.is_set() {
            return None;
        }

        buffers.temp_odd.fill(0);
        buffers.temp_even.fill(0);
        let odd_tail = buffers.odd_msbs[i].tail;
        let even_tail = buffers.even_msbs[i].tail;
        buffers.temp_odd[..odd_tail].copy_from_slice(&buffers.odd_msbs[i].states[..odd_tail]);
        buffers.temp_even[..even_tail].copy_from_slice(&buffers.even_msbs[i].states[..even_tail]);

        let result = old_recover(
            &mut buffers.temp_odd,
            0,
            odd_tail as isize,
            oks,
            &mut buffers.temp_even,
            0,
            even_tail as isize,
            eks,
            3,
            record,
            in_rotated >> 16,
            true,
        );
        if result.is_some() {
            return result;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binsearch_finds_leftmost_matching_top_byte() {
        let data = [0x01_000000u32, 0x01_000001, 0x02_000000, 0x02_000001];
        assert_eq!(binsearch(&data, 0, 3), 2);
        assert_eq!(binsearch(&data, 0, 1), 0);
    }

    #[test]
    fn quicksort_orders_ascending_unsigned() {
        let mut data = vec![5u32, 1, 4, 2, 3];
        quicksort(&mut data, 0, 4);
        assert_eq!(data, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn msb_bucket_odd_dedup_allows_immediate_repeat() {
        let mut bucket = MsbBucket::default();
        bucket.push_odd(7);
        // tail-1 bound means the just-inserted value isn't checked against
        // itself, so pushing the same value again is NOT deduped here.
        bucket.push_odd(7);
        assert_eq!(bucket.tail, 2);
    }

    #[test]
    fn msb_bucket_even_dedup_rejects_immediate_repeat() {
        let mut bucket = MsbBucket::default();
        bucket.push_even(7);
        bucket.push_even(7);
        assert_eq!(bucket.tail, 1);
    }
}
