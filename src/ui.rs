//! Console output. The section headers and status helpers mirror this
//! project's existing `ui` display conventions; the progress line format is
//! ported from `print_simple_progress`/`print_usage` in the Proxmark3
//! `mfkey_desktop.c` reference implementation.

use std::io::{self, Write};

use crate::recover::Progress;

pub fn print_section_header(title: &str) {
    println!("\n=== {title} ===");
}

pub fn print_success(message: &str) {
    println!("✅ {message}");
}

pub fn print_error(message: &str) {
    println!("❌ {message}");
}

pub fn print_info(message: &str) {
    println!("ℹ️ {message}");
}

pub fn print_usage(program_name: &str) {
    println!("Usage: {program_name} <nested.log file> [output_keys.txt]");
    println!("  nested.log file: Input file containing nested attack nonces");
    println!("  output_keys.txt: Optional output file for found keys (default: found_keys.txt)");
    println!("\nExample: {program_name} /path/to/.nested.log keys.txt");
}

/// Single-line progress readout, rewritten in place with `\r`.
/// `record_current`/`record_total` are 1-based.
pub fn print_progress(record_current: usize, record_total: usize, progress: &Progress) {
    let record_percentage = record_current as f32 / record_total as f32 * 100.0;
    let msb_percentage = progress.msb_round as f32 / progress.total_msb_rounds as f32 * 100.0;

    print!(
        "\rProgress: Record {record_current}/{record_total} ({record_percentage:.1}%) | \
         MSB {}/{} ({msb_percentage:.1}%) | Current {:.1}%",
        progress.msb_round, progress.total_msb_rounds, progress.semi_state_percent,
    );
    let _ = io::stdout().flush();
}
