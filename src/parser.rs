//! Nonce-record file parser. Produces [`NonceRecord`] values; never touches
//! anything about the recovery core itself.
//!
//! The static-attack line format is ported from `load_nested_nonces` in the
//! Proxmark3 `mfkey_desktop.c` reference implementation (field layout, the
//! `"dist 0"` line filter, and the 4-vs-7-field `static_encrypted`/
//! `static_nested` split). The `Mfkey32` line form has no counterpart
//! there — it's added so the `Mfkey32` verifier is reachable from a real
//! input file rather than only from unit tests.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::RecoverError;
use crate::nonce::NonceRecord;
use crate::prng::prng_successor;

fn token_after<'a>(tokens: &[&'a str], key: &str) -> Option<&'a str> {
    tokens.windows(2).find(|w| w[0] == key).map(|w| w[1])
}

fn hex_after(tokens: &[&str], key: &str) -> Option<u32> {
    u32::from_str_radix(token_after(tokens, key)?, 16).ok()
}

/// Convert a 4-character `'0'`/`'1'` string to a 4-bit value, MSB-first.
fn parse_binary4(s: &str) -> Option<u8> {
    if s.len() != 4 || !s.chars().all(|c| c == '0' || c == '1') {
        return None;
    }
    let mut result = 0u8;
    for c in s.chars() {
        result = (result << 1) | (c == '1') as u8;
    }
    Some(result)
}

fn parse_static_line(line: &str) -> Option<NonceRecord> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let cuid = hex_after(&tokens, "cuid")?;
    let nt0 = hex_after(&tokens, "nt0")?;
    let ks0 = hex_after(&tokens, "ks0")?;
    let par_1 = parse_binary4(token_after(&tokens, "par0")?)?;
    let uid_xor_nt0 = cuid ^ nt0;

    if let (Some(nt1), Some(ks1), Some(par1_str)) =
        (hex_after(&tokens, "nt1"), hex_after(&tokens, "ks1"), token_after(&tokens, "par1"))
    {
        if let Some(par_2) = parse_binary4(par1_str) {
            return Some(NonceRecord::StaticNested {
                uid: cuid,
                nt0,
                nt1,
                uid_xor_nt0,
                uid_xor_nt1: cuid ^ nt1,
                ks1_1_enc: ks0,
                ks1_2_enc: ks1,
                par_1,
                par_2,
            });
        }
    }

    Some(NonceRecord::StaticEncrypted { uid: cuid, nt0, uid_xor_nt0, ks1_1_enc: ks0, par_1 })
}

fn parse_mfkey32_line(line: &str) -> Option<NonceRecord> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let cuid = hex_after(&tokens, "cuid")?;
    let nt0 = hex_after(&tokens, "nt0")?;
    let nr0_enc = hex_after(&tokens, "nr0")?;
    let ar0_enc = hex_after(&tokens, "ar0")?;
    let nt1 = hex_after(&tokens, "nt1")?;
    let nr1_enc = hex_after(&tokens, "nr1")?;
    let ar1_enc = hex_after(&tokens, "ar1")?;

    Some(NonceRecord::Mfkey32 {
        uid: cuid,
        nt0,
        nt1,
        uid_xor_nt0: cuid ^ nt0,
        uid_xor_nt1: cuid ^ nt1,
        p64: prng_successor(nt0, 64),
        p64b: prng_successor(nt1, 64),
        nr0_enc,
        ar0_enc,
        nr1_enc,
        ar1_enc,
    })
}

/// Read and parse every recognized nonce-record line in `path`. Malformed
/// or unrecognized lines are silently skipped, matching the original
/// parser's tolerance of free-form log noise.
pub fn load_nonce_records(path: &Path) -> Result<Vec<NonceRecord>, RecoverError> {
    let file = File::open(path)
        .map_err(|source| RecoverError::InputOpen { path: path.to_path_buf(), source })?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for line in reader.lines() {
        let Ok(line) = line else { continue };
        let trimmed = line.trim();
        if trimmed.starts_with("Mfkey32") {
            if let Some(record) = parse_mfkey32_line(trimmed) {
                records.push(record);
            }
            continue;
        }
        if !line.contains("dist 0") {
            continue;
        }
        if let Some(record) = parse_static_line(&line) {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_static_encrypted_only_line() {
        let line = "Sec 0 key A cuid 12345678 nt0 abcd1234 ks0 11223344 par0 0101 dist 0";
        let record = parse_static_line(line).unwrap();
        match record {
            NonceRecord::StaticEncrypted { uid, nt0, ks1_1_enc, par_1, .. } => {
                assert_eq!(uid, 0x12345678);
                assert_eq!(nt0, 0xabcd1234);
                assert_eq!(ks1_1_enc, 0x11223344);
                assert_eq!(par_1, 0b0101);
            }
            other => panic!("expected StaticEncrypted, got {other:?}"),
        }
    }

    #[test]
    fn parses_static_nested_line_with_both_sessions() {
        let line = "Sec 0 key A cuid 12345678 nt0 abcd1234 ks0 11223344 par0 0101 \
                     nt1 87654321 ks1 44332211 par1 1010 dist 0";
        let record = parse_static_line(line).unwrap();
        match record {
            NonceRecord::StaticNested { uid, nt1, ks1_2_enc, par_2, .. } => {
                assert_eq!(uid, 0x12345678);
                assert_eq!(nt1, 0x87654321);
                assert_eq!(ks1_2_enc, 0x44332211);
                assert_eq!(par_2, 0b1010);
            }
            other => panic!("expected StaticNested, got {other:?}"),
        }
    }

    #[test]
    fn rejects_line_missing_required_fields() {
        let line = "Sec 0 key A cuid 12345678 nt0 abcd1234 dist 0";
        assert!(parse_static_line(line).is_none());
    }

    #[test]
    fn parses_mfkey32_line() {
        let line = "Mfkey32 cuid 52b0e277 nt0 7ecfbd74 nr0 8872b3f7 ar0 ea9c6461 \
                     nt1 4ecb6b1d nr1 6ea9c28e ar1 214470a9";
        let record = parse_mfkey32_line(line).unwrap();
        match record {
            NonceRecord::Mfkey32 { uid, ar0_enc, .. } => {
                assert_eq!(uid, 0x52b0e277);
                assert_eq!(ar0_enc, 0xea9c6461);
            }
            other => panic!("expected Mfkey32, got {other:?}"),
        }
    }

    #[test]
    fn load_nonce_records_skips_lines_without_dist_zero() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"Sec 0 key A cuid 12345678 nt0 abcd1234 ks0 11223344 par0 0101 dist 1\n\
              Sec 0 key A cuid 12345678 nt0 abcd1234 ks0 11223344 par0 0101 dist 0\n",
        )
        .unwrap();
        file.flush().unwrap();
        let records = load_nonce_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
    }
}
