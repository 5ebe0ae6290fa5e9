//! Record output on stdout

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use micrograph_orchestrator::MetadataRecord;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns
    Text,
    /// One JSON object per line
    Jsonl,
}

pub fn write_records<W: Write>(
    out: &mut W,
    records: &[MetadataRecord],
    format: OutputFormat,
) -> Result<()> {
    for record in records {
        match format {
            OutputFormat::Jsonl => {
                let line =
                    serde_json::to_string(record).context("Failed to serialize record")?;
                writeln!(out, "{line}")?;
            }
            OutputFormat::Text => {
                writeln!(
                    out,
                    "{:<28} page {:>3}  panel {:>2}  sub-image {:>2}  {:<12} {}",
                    record.source_id,
                    record.page_index,
                    record.panel_index,
                    record.sub_image_index,
                    record.label.as_str(),
                    record.caption_ref.as_deref().unwrap_or("-")
                )?;
            }
        }
    }
    Ok(())
}

/// Print records to stdout
pub fn print_records(records: &[MetadataRecord], format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_records(&mut out, records, format)?;
    out.flush()?;
    Ok(())
}
