//! Top-level driver: for one captured trace, derive the meet-in-the-middle
//! search parameters, deinterleave the observed keystream into its odd/even
//! halves, and sweep all 16 MSB rounds.
//!
//! Ported from `recover` in the Proxmark3 `mfkey_desktop.c` reference
//! implementation.

use crate::cancel::CancelFlag;
use crate::lfsr::bebit;
use crate::mitm::{calculate_msb_tables, SearchBuffers, MSB_LIMIT};
use crate::nonce::{FoundKeySet, NonceRecord};

/// Per-MSB-round progress notification, fed to the CLI's progress display.
pub struct Progress {
    pub msb_round: u32,
    pub total_msb_rounds: u32,
    pub semi_state_percent: f32,
}

/// Run the meet-in-the-middle search for one trace. `ks2`/`in_word` are the
/// attack-kind-specific pair from [`NonceRecord::ks2_and_in`].
pub fn recover(
    record: &NonceRecord,
    ks2: u32,
    in_word: u32,
    cancel: &CancelFlag,
    mut on_progress: impl FnMut(Progress),
) -> Option<[u8; 6]> {
    let mut buffers = SearchBuffers::new();

    let mut oks = 0u32;
    for i in (1..32).step_by(2).rev() {
        oks = (oks << 1) | bebit(ks2, i);
    }
    let mut eks = 0u32;
    for i in (0..32).step_by(2).rev() {
        eks = (eks << 1) | bebit(ks2, i);
    }

    let total_msb_rounds = 256 / MSB_LIMIT;
    for msb in 0..total_msb_rounds {
        if cancel.is_set() {
            return None;
        }
        let found = calculate_msb_tables(oks, eks, msb, record, &mut buffers, in_word, cancel, |pct| {
            on_progress(Progress { msb_round: msb + 1, total_msb_rounds, semi_state_percent: pct });
        });
        if found.is_some() {
            return found;
        }
        if cancel.is_set() {
            return None;
        }
        on_progress(Progress { msb_round: msb + 1, total_msb_rounds, semi_state_percent: 100.0 });
    }
    None
}

/// Run the search over every record, collecting unique recovered keys.
/// Stops early (returning whatever was found so far) once `cancel` is set.
pub fn recover_keys(
    records: &[NonceRecord],
    cancel: &CancelFlag,
    mut on_progress: impl FnMut(usize, usize, Progress),
) -> FoundKeySet {
    let mut found = FoundKeySet::new();
    for (i, record) in records.iter().enumerate() {
        if cancel.is_set() {
            break;
        }
        crate::ui::print_info(&format!(
            "Record {}/{}: uid {:08X}, attack {}",
            i + 1,
            records.len(),
            record.uid(),
            record.kind_name()
        ));
        let (ks2, in_word) = record.ks2_and_in();
        let key = recover(record, ks2, in_word, cancel, |progress| {
            on_progress(i + 1, records.len(), progress);
        });
        if let Some(key) = key {
            found.insert(key);
        }
    }
    found
}
