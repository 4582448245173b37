//! Consistency commands
//!
//! Usage: claritydash <check|reconcile>

use claritydash_core::model::User;
use claritydash_store::Storage;

use super::CliResult;

/// Fail if the user index has drifted from the stored records
pub fn check(storage: &Storage) -> CliResult {
    storage.entities::<User>().check_consistency()?;
    println!("✓ Consistent");
    Ok(())
}

/// Repair user index drift and report each repair
pub fn reconcile(storage: &Storage) -> CliResult {
    let report = storage.entities::<User>().reconcile()?;

    if report.is_clean() {
        println!("✓ Nothing to repair");
        return Ok(());
    }
    for key in &report.indexed {
        println!("Reindexed {}", key);
    }
    for key in &report.dropped {
        println!("Dropped stale index entry {}", key);
    }
    println!("✓ Repaired {} entries", report.repaired());
    Ok(())
}
