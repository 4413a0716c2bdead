use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::{ExtractError, Result};
use crate::extract::Extraction;
use crate::types::ResolvedSegment;

/// Formats an extraction can be written out in.
///
/// Parsing is case-insensitive; anything unrecognized is rejected with
/// [`ExtractError::UnsupportedFormat`] before any file is touched.
///
/// # Examples
///
/// ```rust
/// use artiseg::{ExportFormat, ExtractError};
///
/// assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
/// assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
/// assert!(matches!(
///     "parquet".parse::<ExportFormat>(),
///     Err(ExtractError::UnsupportedFormat(_))
/// ));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Writes an extraction's segments under `out_dir`.
///
/// Anomalies land in `<out_dir>/anomalies/<base_name>_anomalies.<ext>`,
/// normal segments in `<out_dir>/normal_segments/<base_name>_normal.<ext>`.
/// Both directories are created as needed.
pub fn export_extraction(
    extraction: &Extraction,
    out_dir: &Path,
    base_name: &str,
    format: ExportFormat,
) -> Result<()> {
    let anomaly_dir = out_dir.join("anomalies");
    let normal_dir = out_dir.join("normal_segments");
    fs::create_dir_all(&anomaly_dir)?;
    fs::create_dir_all(&normal_dir)?;

    let ext = format.extension();
    write_segments(
        &extraction.anomalies,
        &anomaly_dir.join(format!("{}_anomalies.{}", base_name, ext)),
        format,
    )?;
    write_segments(
        &extraction.normals,
        &normal_dir.join(format!("{}_normal.{}", base_name, ext)),
        format,
    )
}

fn write_segments(segments: &[ResolvedSegment], path: &Path, format: ExportFormat) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, segments)
                .map_err(|e| ExtractError::Io(e.into()))?;
        }
        ExportFormat::Csv => {
            writeln!(
                writer,
                "start_time,end_time,empty,source_file,patient_id,frequency,data"
            )?;
            for segment in segments {
                let data = segment
                    .data
                    .iter()
                    .map(f64::to_string)
                    .collect::<Vec<_>>()
                    .join(";");
                writeln!(
                    writer,
                    "{},{},{},{},{},{},\"{}\"",
                    segment.start_time,
                    segment.end_time,
                    segment.empty,
                    segment.source_file.display(),
                    segment.patient_id,
                    segment.frequency,
                    data
                )?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}
