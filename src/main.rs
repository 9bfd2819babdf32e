mod cancel;
mod enumerator;
mod error;
mod filter;
mod lfsr;
mod mitm;
mod nonce;
mod output;
mod parser;
mod prng;
mod recover;
mod ui;
mod verifier;

use std::path::Path;
use std::process::ExitCode;

use cancel::CancelFlag;
use output::format_key;

fn run(input_path: &Path, output_path: &Path) -> Result<(), error::RecoverError> {
    let records = parser::load_nonce_records(input_path)?;

    ui::print_info(&format!("Loaded {} nonce record(s)", records.len()));
    println!("Starting key recovery... (Press Ctrl+C to stop gracefully.)\n");

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        let _ = ctrlc::set_handler(move || {
            println!("\n\nReceived interrupt signal. Stopping attack gracefully...");
            cancel.set();
        });
    }

    let found = recover::recover_keys(&records, &cancel, |current, total, progress| {
        ui::print_progress(current, total, &progress);
    });

    println!();
    ui::print_section_header("Key recovery completed");
    println!("Total unique keys found: {}\n", found.len());

    if found.is_empty() {
        println!("No keys were recovered. This could happen if:");
        println!("  * The nonces are invalid or corrupted");
        println!("  * The keyspace being searched doesn't contain the key");
        println!("  * The attack was interrupted before completion\n");
    } else {
        println!("Found keys:");
        for (i, key) in found.iter().enumerate() {
            println!("Key {}: {}", i + 1, format_key(*key));
        }
        println!();
        output::save_keys(output_path, &found)?;
        ui::print_success(&format!("Keys saved to {}", output_path.display()));
    }

    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        ui::print_usage(&args[0]);
        return ExitCode::FAILURE;
    }

    let input_path = Path::new(&args[1]);
    let output_path = args.get(2).map(Path::new).unwrap_or_else(|| Path::new("found_keys.txt"));

    println!("MIFARE Classic Key Recovery Tool");
    println!("================================================================================");
    println!("Input file:  {}", input_path.display());
    println!("Output file: {}", output_path.display());
    println!("================================================================================\n");

    match run(input_path, output_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::print_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}
