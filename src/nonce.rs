//! Captured authentication traces ("nonce records") and the de-duplicated
//! set of recovered keys.
//!
//! Grounded in the tagged-union `MfClassicNonce` of the Proxmark3
//! `mfkey_desktop.c` reference implementation, split here into one variant
//! per attack kind so each only carries the fields its verifier actually
//! reads (the C union carries all of them regardless of `attack`).

/// One captured authentication trace, tagged by the attack it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceRecord {
    /// Two full reader/tag authentication exchanges against the same key.
    Mfkey32 {
        uid: u32,
        nt0: u32,
        nt1: u32,
        uid_xor_nt0: u32,
        uid_xor_nt1: u32,
        p64: u32,
        p64b: u32,
        nr0_enc: u32,
        ar0_enc: u32,
        nr1_enc: u32,
        ar1_enc: u32,
    },
    /// Two encrypted keystreams from a card with a static (non-random) nonce.
    StaticNested {
        uid: u32,
        nt0: u32,
        nt1: u32,
        uid_xor_nt0: u32,
        uid_xor_nt1: u32,
        ks1_1_enc: u32,
        ks1_2_enc: u32,
        par_1: u8,
        par_2: u8,
    },
    /// One encrypted keystream plus its observed keystream parity.
    StaticEncrypted {
        uid: u32,
        nt0: u32,
        uid_xor_nt0: u32,
        ks1_1_enc: u32,
        par_1: u8,
    },
}

impl NonceRecord {
    pub fn uid(&self) -> u32 {
        match self {
            NonceRecord::Mfkey32 { uid, .. }
            | NonceRecord::StaticNested { uid, .. }
            | NonceRecord::StaticEncrypted { uid, .. } => *uid,
        }
    }

    /// The `(ks2, in)` pair fed into the meet-in-the-middle search for this
    /// record. For the static attacks this mirrors the original driver's
    /// `switch` on `nonce->attack` verbatim. `Mfkey32` has no counterpart in
    /// the original driver (which never reaches `recover()` for it); `ks2` is
    /// derived from the `ar0`-rollback identity `check_state` itself checks
    /// (`rollback_word(t, 0, 0) ^ p64 == ar0_enc`), i.e. `ar0_enc` is the
    /// plain (unfed) keystream word XORed with `p64`, and no plaintext is
    /// folded into the extend phase.
    pub fn ks2_and_in(&self) -> (u32, u32) {
        match *self {
            NonceRecord::Mfkey32 { p64, ar0_enc, .. } => (ar0_enc ^ p64, 0),
            NonceRecord::StaticNested { ks1_2_enc, uid_xor_nt1, .. } => (ks1_2_enc, uid_xor_nt1),
            NonceRecord::StaticEncrypted { ks1_1_enc, uid_xor_nt0, .. } => (ks1_1_enc, uid_xor_nt0),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NonceRecord::Mfkey32 { .. } => "mfkey32",
            NonceRecord::StaticNested { .. } => "static_nested",
            NonceRecord::StaticEncrypted { .. } => "static_encrypted",
        }
    }
}

/// Insertion-ordered, content-deduplicated set of recovered 48-bit keys.
///
/// Mirrors `add_found_key`'s linear "already known?" scan rather than a
/// hash-based set, since the expected key count is tiny (a handful at most).
#[derive(Debug, Default, Clone)]
pub struct FoundKeySet {
    keys: Vec<[u8; 6]>,
}

impl FoundKeySet {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Insert `key` if not already present. Returns `true` if it was newly
    /// added.
    pub fn insert(&mut self, key: [u8; 6]) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8; 6]> {
        self.keys.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_key_set_dedups_and_preserves_order() {
        let mut set = FoundKeySet::new();
        assert!(set.insert([1, 2, 3, 4, 5, 6]));
        assert!(set.insert([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]));
        assert!(!set.insert([1, 2, 3, 4, 5, 6]));
        assert_eq!(set.len(), 2);
        let keys: Vec<_> = set.iter().copied().collect();
        assert_eq!(keys, vec![[1, 2, 3, 4, 5, 6], [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]]);
    }

    #[test]
    fn mfkey32_ks2_in_derivation() {
        let record = NonceRecord::Mfkey32 {
            uid: 1,
            nt0: 2,
            nt1: 3,
            uid_xor_nt0: 3,
            uid_xor_nt1: 2,
            p64: 0x1000,
            p64b: 0x2000,
            nr0_enc: 0,
            ar0_enc: 0x5555,
            nr1_enc: 0,
            ar1_enc: 0,
        };
        assert_eq!(record.ks2_and_in(), (0x5555 ^ 0x1000, 0));
    }
}
