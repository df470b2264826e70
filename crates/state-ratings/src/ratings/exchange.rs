use std::io::{Read, Write};

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::Rater;
use super::scoring::views::round_one_decimal;
use super::scoring::StateRow;
use super::service::RatingServiceError;

/// A parsed CSV row, not yet validated against the registry or catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportRow {
    pub(crate) line: usize,
    pub(crate) rater: String,
    pub(crate) state: String,
    pub(crate) criterion: String,
    pub(crate) rating: i64,
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read ratings CSV: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid ratings CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {line}: {source}")]
    Row {
        line: usize,
        #[source]
        source: Box<RatingServiceError>,
    },
}

#[derive(Debug, Deserialize)]
struct CsvRatingRow {
    rater: String,
    state: String,
    criterion: String,
    rating: i64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    notes: Option<String>,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ImportRow>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut rows = Vec::new();

    while csv_reader.read_record(&mut record)? {
        // physical line where the record starts; quoted fields may span several
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or_default();
        let row: CsvRatingRow = record.deserialize(Some(&headers))?;
        rows.push(ImportRow {
            line,
            rater: row.rater,
            state: row.state,
            criterion: row.criterion,
            rating: row.rating,
            notes: row.notes,
        });
    }

    Ok(rows)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Writes list rows as `state,name,combined,<rater ids...>`; unrated cells stay blank.
pub fn write_rows_csv<W: Write>(
    writer: W,
    rows: &[StateRow],
    raters: &[Rater],
) -> Result<(), ImportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec![
        "state".to_string(),
        "name".to_string(),
        "combined".to_string(),
    ];
    header.extend(raters.iter().map(|rater| rater.id.to_string()));
    csv_writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.state_code.to_string(),
            row.state_name.to_string(),
            format_cell(row.combined.has_ratings, row.combined.score),
        ];
        for rater in raters {
            let cell = row
                .raters
                .iter()
                .find(|entry| entry.rater_id == rater.id)
                .map(|entry| format_cell(entry.has_ratings, entry.average))
                .unwrap_or_default();
            record.push(cell);
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn format_cell(has_ratings: bool, value: f64) -> String {
    if has_ratings {
        format!("{:.1}", round_one_decimal(value))
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_blank_notes() {
        let csv = "rater,state,criterion,rating,notes\n\
                   primary,ca,Climate,8,sunny\n\
                   secondary, TX ,criterion-0001,5,\n";
        let rows = parse_rows(csv.as_bytes()).expect("csv parses");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].notes.as_deref(), Some("sunny"));
        assert_eq!(rows[1].state, "TX");
        assert_eq!(rows[1].notes, None);
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn line_numbers_follow_multiline_notes() {
        let csv = "rater,state,criterion,rating,notes\n\
                   primary,OR,Climate,7,\"wet winters\nmild summers\"\n\
                   secondary,OR,Climate,5,\n";
        let rows = parse_rows(csv.as_bytes()).expect("csv parses");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].notes.as_deref(), Some("wet winters\nmild summers"));
        assert_eq!(rows[1].line, 4);
    }

    #[test]
    fn rejects_non_numeric_ratings() {
        let csv = "rater,state,criterion,rating,notes\nprimary,CA,Climate,great,\n";
        assert!(matches!(parse_rows(csv.as_bytes()), Err(ImportError::Csv(_))));
    }
}
