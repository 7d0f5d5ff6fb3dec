//! CSV export of the attendee list.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, SecondsFormat};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::info;

use crate::{
    core::projection::{ListQuery, SortKey, project},
    error::CheckInError,
    record::AttendeeRecord,
    types::{SortDirection, SortField},
};

/// Column header of every export.
pub const HEADER: [&str; 3] = ["identifier", "displayName", "checkInTime"];

/// Serializes `records` oldest check-in first, every field quoted.
pub fn to_csv<'a, I>(records: I) -> Result<String, CheckInError>
where
    I: IntoIterator<Item = &'a AttendeeRecord>,
{
    let query = ListQuery {
        filter: String::new(),
        sort: SortKey::new(SortField::CheckedInAt, SortDirection::Ascending),
    };
    let rows = project(records, &query);

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(HEADER).map_err(export_err)?;
    for rec in &rows {
        let at = rec.checked_in_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        wtr.write_record([rec.identifier.as_str(), rec.display_name.as_str(), at.as_str()])
            .map_err(export_err)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| CheckInError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CheckInError::Export(e.to_string()))
}

/// `checkin-export-YYYY-MM-DD.csv`
pub fn file_name(date: NaiveDate) -> String {
    format!("checkin-export-{}.csv", date.format("%Y-%m-%d"))
}

/// Writes the export for `date` into `dir` and returns the file path.
pub fn write_csv<'a, I>(dir: impl AsRef<Path>, records: I, date: NaiveDate) -> Result<PathBuf, CheckInError>
where
    I: IntoIterator<Item = &'a AttendeeRecord>,
{
    let body = to_csv(records)?;
    let path = dir.as_ref().join(file_name(date));
    std::fs::write(&path, body).map_err(|e| CheckInError::Export(e.to_string()))?;
    info!(path = %path.display(), "export written");
    Ok(path)
}

fn export_err(e: csv::Error) -> CheckInError {
    CheckInError::Export(e.to_string())
}
