//! Seed command
//!
//! Usage: claritydash seed

use claritydash_core::model::User;
use claritydash_store::Storage;

use super::CliResult;

/// Execute seed command
pub fn execute(storage: &Storage) -> CliResult {
    let report = storage.entities::<User>().ensure_default_seed()?;

    for key in &report.reconciled.indexed {
        println!("Reindexed {}", key);
    }
    for key in &report.reconciled.dropped {
        println!("Dropped stale index entry {}", key);
    }

    if !report.seeded {
        println!("Already seeded");
        return Ok(());
    }
    for key in &report.created {
        println!("✓ Created {}", key);
    }
    for key in &report.skipped {
        println!("Kept existing {}", key);
    }
    println!(
        "Seeded ({} created, {} kept)",
        report.created.len(),
        report.skipped.len()
    );
    Ok(())
}
