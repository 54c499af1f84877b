use std::io::Write;

use anyhow::Result;
use migrun_db::AppliedMigration;

pub fn print_table(out: &mut impl Write, table: &str, records: &[AppliedMigration]) -> Result<()> {
    if records.is_empty() {
        writeln!(out, "No migrations recorded in '{table}'.")?;
        return Ok(());
    }

    let width = records
        .iter()
        .map(|r| r.identifier.len())
        .max()
        .unwrap_or(0)
        .max("IDENTIFIER".len());
    writeln!(out, "{:<width$}  APPLIED AT (UTC)", "IDENTIFIER")?;
    for record in records {
        writeln!(
            out,
            "{:<width$}  {}",
            record.identifier,
            record.applied_at.format("%Y-%m-%d %H:%M:%S%.3f")
        )?;
    }
    writeln!(out)?;
    writeln!(out, "{} migration(s) applied.", records.len())?;
    Ok(())
}

pub fn print_json(out: &mut impl Write, records: &[AppliedMigration]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, records)?;
    writeln!(out)?;
    Ok(())
}
