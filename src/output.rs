//! Writes recovered keys to the output file, one 12 hex digit uppercase
//! key per line. Ported from `save_keys_to_file` in the Proxmark3
//! `mfkey_desktop.c` reference implementation, which opens the file only
//! once a key exists, so an empty [`FoundKeySet`] leaves no file behind.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::RecoverError;
use crate::nonce::FoundKeySet;

pub fn format_key(key: [u8; 6]) -> String {
    key.iter().map(|b| format!("{b:02X}")).collect()
}

pub fn save_keys(path: &Path, found: &FoundKeySet) -> Result<(), RecoverError> {
    if found.is_empty() {
        return Ok(());
    }

    let mut file = File::create(path)
        .map_err(|source| RecoverError::OutputCreate { path: path.to_path_buf(), source })?;

    for key in found.iter() {
        writeln!(file, "{}", format_key(*key))
            .map_err(|source| RecoverError::OutputWrite { path: path.to_path_buf(), source })?;
    }
    Ok(())
}
