use std::io;

use csv::{QuoteStyle, StringRecord, Terminator};
use monitor_client::domain::{positive, SensorReading};
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    OffsetDateTime, UtcOffset,
};

/// Column headers of the machine-history export, in order.
pub const HEADERS: [&str; 7] = [
    "Timestamp",
    "Temperature (°C)",
    "RMS Vibration",
    "Vibration Velocity",
    "Alarm",
    "Machine ID",
    "Company",
];

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to format timestamp: {0}")]
    Format(#[from] time::error::Format),
    #[error("row {row}: {message}")]
    Row { row: usize, message: String },
}

/// UTC instant with millisecond precision, e.g. `2024-02-01T06:30:00.000Z`.
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

fn metric_cell(value: Option<f64>) -> String {
    positive(value).map(|v| v.to_string()).unwrap_or_default()
}

/// Writes readings as a spreadsheet-friendly CSV document.
///
/// The header row is written bare. Every data cell is quoted with embedded
/// quotes doubled, rows end in `\n`, the timestamp is a millisecond UTC
/// instant and non-positive metrics are left empty.
pub fn write_history_csv<W: io::Write>(
    mut out: W,
    readings: &[SensorReading],
    machine_id: &str,
    company: &str,
) -> Result<(), ExportError> {
    writeln!(out, "{}", HEADERS.join(","))?;

    let mut wtr = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    for r in readings {
        let ts = r.ts.to_offset(UtcOffset::UTC).format(TIMESTAMP_FORMAT)?;
        wtr.write_record([
            ts,
            metric_cell(r.temperature),
            metric_cell(r.rms_vibration),
            metric_cell(r.vibration_velocity),
            r.alarm.clone().unwrap_or_default(),
            machine_id.to_string(),
            company.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn history_csv_string(
    readings: &[SensorReading],
    machine_id: &str,
    company: &str,
) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_history_csv(&mut buf, readings, machine_id, company)?;
    String::from_utf8(buf).map_err(|e| ExportError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// `machine-history_<machine>_<YYYY-MM-DD-HH-MM-SS>.csv`, stamped in UTC.
pub fn export_file_name(machine_id: &str, now: OffsetDateTime) -> Result<String, ExportError> {
    let stamp = now
        .to_offset(UtcOffset::UTC)
        .format(format_description!("[year]-[month]-[day]-[hour]-[minute]-[second]"))?;
    Ok(format!("machine-history_{machine_id}_{stamp}.csv"))
}

/// One row of a machine-history export read back from CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedRow {
    pub ts: Option<OffsetDateTime>,
    pub temperature: Option<f64>,
    pub rms_vibration: Option<f64>,
    pub vibration_velocity: Option<f64>,
    pub alarm: Option<String>,
    pub machine_id: String,
    pub company: Option<String>,
}

fn parse_optional_f64(s: &str, row: usize, column: &str) -> Result<Option<f64>, ExportError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some).map_err(|e| ExportError::Row {
        row,
        message: format!("invalid {column} '{trimmed}': {e}"),
    })
}

fn parse_optional_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn record_to_row(record: &StringRecord, headers: &StringRecord, row: usize) -> Result<ExportedRow, ExportError> {
    let get = |name: &str| -> Result<&str, ExportError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| ExportError::Row {
                row,
                message: format!("missing column '{name}'"),
            })
    };

    let ts = match parse_optional_string(get("Timestamp")?) {
        Some(s) => Some(OffsetDateTime::parse(&s, &Rfc3339).map_err(|e| ExportError::Row {
            row,
            message: format!("invalid timestamp '{s}': {e}"),
        })?),
        None => None,
    };

    Ok(ExportedRow {
        ts,
        temperature: parse_optional_f64(get("Temperature (°C)")?, row, "temperature")?,
        rms_vibration: parse_optional_f64(get("RMS Vibration")?, row, "rms vibration")?,
        vibration_velocity: parse_optional_f64(get("Vibration Velocity")?, row, "vibration velocity")?,
        alarm: parse_optional_string(get("Alarm")?),
        machine_id: get("Machine ID")?.to_string(),
        company: parse_optional_string(get("Company")?),
    })
}

/// Parses an export produced by [`write_history_csv`], matching columns by header.
pub fn read_history_csv<R: io::Read>(input: R) -> Result<Vec<ExportedRow>, ExportError> {
    let mut rdr = csv::Reader::from_reader(input);
    let headers = rdr.headers()?.clone();

    rdr.records()
        .enumerate()
        .map(|(idx, result)| {
            let record = result?;
            record_to_row(&record, &headers, idx + 1)
        })
        .collect()
}
