//! Candidate verification: given a joined 48-bit LFSR state recovered by the
//! meet-in-the-middle search, confirm it actually reproduces the observed
//! trace and, if so, extract the key.
//!
//! Ported from `check_state` in the Proxmark3 `mfkey_desktop.c` reference
//! implementation. The three branches below preserve that function's
//! behavior exactly, including two asymmetries worth flagging up front:
//! `static_nested` parses
//! `ks1_2_enc`/`par_2` but never consults them in its match condition (the
//! match instead re-derives and compares against `ks1_1_enc`), and
//! `static_encrypted` extracts the key from the post-rollback state `t`
//! while `static_nested` extracts from a separately rolled-back `temp` — the
//! two states are equal in both cases, but the code paths that reach them
//! differ.

use crate::lfsr::Crypto1State;
use crate::nonce::NonceRecord;

/// Check whether `state` (the candidate joined LFSR state from the search)
/// is consistent with `record`, returning the recovered key if so.
///
/// `state` is mutated in place by the rollback/forward steps; callers that
/// need the original candidate afterward should clone it first.
pub fn verify(state: &mut Crypto1State, record: &NonceRecord) -> Option<[u8; 6]> {
    if state.is_zero() {
        return None;
    }
    match *record {
        NonceRecord::Mfkey32 { p64, p64b, nr0_enc, ar0_enc, uid_xor_nt0, uid_xor_nt1, nr1_enc, ar1_enc, .. } => {
            let rb = state.rollback_word(0, false) ^ p64;
            if rb != ar0_enc {
                return None;
            }
            state.rollback_word_noret(nr0_enc, true);
            state.rollback_word_noret(uid_xor_nt0, false);
            let temp = *state;
            state.crypt_word_noret(uid_xor_nt1, false);
            state.crypt_word_noret(nr1_enc, true);
            if ar1_enc == (state.crypt_word() ^ p64b) {
                Some(temp.get_lfsr())
            } else {
                None
            }
        }
        NonceRecord::StaticNested { uid_xor_nt1, uid_xor_nt0, ks1_1_enc, .. } => {
            let temp = *state;
            state.rollback_word_noret(uid_xor_nt1, false);
            if ks1_1_enc == state.crypt_word_ret(uid_xor_nt0, false) {
                let mut temp = temp;
                temp.rollback_word_noret(uid_xor_nt1, false);
                Some(temp.get_lfsr())
            } else {
                None
            }
        }
        NonceRecord::StaticEncrypted { uid_xor_nt0, ks1_1_enc, par_1, nt0, .. } => {
            if ks1_1_enc == state.rollback_word(uid_xor_nt0, false) {
                let mut temp = *state;
                let (ks, parity) = temp.crypt_word_par(uid_xor_nt0, false, nt0);
                if ks == ks1_1_enc && parity == par_1 {
                    Some(state.get_lfsr())
                } else {
                    None
                }
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lfsr::Crypto1State;

    fn state_from_key(key: u64) -> Crypto1State {
        // Exact inverse of `Crypto1State::get_lfsr`: rebuilds the odd/even
        // halves such that `state_from_key(k).get_lfsr() == k`'s bytes.
        let mut odd = 0u32;
        let mut even = 0u32;
        for i in (0..24u32).rev() {
            let odd_bit = ((key >> (2 * i + 1)) & 1) as u32;
            let even_bit = ((key >> (2 * i)) & 1) as u32;
            odd |= odd_bit << (i ^ 3);
            even |= even_bit << (i ^ 3);
        }
        Crypto1State { odd, even }
    }

    fn key_to_u64(key: [u8; 6]) -> u64 {
        key.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }

    #[test]
    fn state_from_key_is_inverse_of_get_lfsr() {
        let key = key_to_u64([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);
        let state = state_from_key(key);
        assert_eq!(state.get_lfsr(), [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);
    }

    #[test]
    fn static_encrypted_round_trip_verifies() {
        let key = key_to_u64([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        let init = state_from_key(key);
        let uid = 0xDEAD_BEEFu32;
        let nt0 = 0x1234_5678u32;
        let uid_xor_nt0 = uid ^ nt0;

        let mut s = init;
        let (ks1_1_enc, par_1) = s.crypt_word_par(uid_xor_nt0, false, nt0);

        let record = NonceRecord::StaticEncrypted { uid, nt0, uid_xor_nt0, ks1_1_enc, par_1 };
        let mut candidate = s; // the MITM search recovers exactly this post-feed state
        let key_bytes = verify(&mut candidate, &record);
        assert_eq!(key_bytes, Some([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]));
    }

    #[test]
    fn static_nested_round_trip_verifies() {
        let key = key_to_u64([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let init = state_from_key(key);
        let uid = 0x1111_2222u32;
        let nt0 = 0x3333_4444u32;
        let nt1 = 0x5555_6666u32;
        let uid_xor_nt0 = uid ^ nt0;
        let uid_xor_nt1 = uid ^ nt1;

        let mut s0 = init;
        let ks1_1_enc = s0.crypt_word_ret(uid_xor_nt0, false);
        let mut s1 = init;
        let ks1_2_enc = s1.crypt_word_ret(uid_xor_nt1, false);

        let record = NonceRecord::StaticNested {
            uid,
            nt0,
            nt1,
            uid_xor_nt0,
            uid_xor_nt1,
            ks1_1_enc,
            ks1_2_enc,
            par_1: 0,
            par_2: 0,
        };
        let mut candidate = s1; // MITM search is keyed on ks1_2_enc/uid_xor_nt1
        let key_bytes = verify(&mut candidate, &record);
        assert_eq!(key_bytes, Some([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]));
    }

    #[test]
    fn mismatched_record_is_rejected() {
        let mut state = Crypto1State { odd: 0x1, even: 0x2 };
        let record = NonceRecord::StaticEncrypted {
            uid: 1,
            nt0: 2,
            uid_xor_nt0: 3,
            ks1_1_enc: 0xDEADBEEF,
            par_1: 0xF,
        };
        assert_eq!(verify(&mut state, &record), None);
    }

    #[test]
    fn zero_state_never_verifies() {
        let mut state = Crypto1State::new();
        let record = NonceRecord::StaticEncrypted {
            uid: 1,
            nt0: 2,
            uid_xor_nt0: 3,
            ks1_1_enc: 0,
            par_1: 0,
        };
        assert_eq!(verify(&mut state, &record), None);
    }
}
