use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use scraper::{ElementRef, Html};
use serde::Serialize;
use thiserror::Error;

use crate::dispatch::{list_files_with_suffix, REPORT_SUFFIX};

/// Written in place of any field whose label is not in the report.
pub const NOT_AVAILABLE: &str = "N/A";

const FILENAME_LABEL: &str = "Filename";
const TOTAL_BASES_LABEL: &str = "Total Bases";
const GC_LABEL: &str = "%GC";

const HEADER: [&str; 3] = [FILENAME_LABEL, TOTAL_BASES_LABEL, GC_LABEL];

/// The fields pulled out of one FastQC report. Serialization order is the column order of
/// the summary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub filename: String,
    pub total_bases: String,
    pub gc: String,
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("label `{label}` has no value cell after it")]
    MissingValue { label: &'static str },
}

/// Extracts the summary fields from the HTML of a FastQC report.
///
/// Each field is found by looking for the first `<td>` whose text is exactly the label, and
/// taking the text of the next `<td>` in document order.
///
/// # Errors
///
/// Returns `ScrapeError::MissingValue` if a label is present but nothing follows it.
/// A label which is absent altogether is not an error; its field is `N/A`.
pub fn extract_row(html: &str) -> Result<SummaryRow, ScrapeError> {
    let document = Html::parse_document(html);

    let cells: Vec<ElementRef> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect();

    Ok(SummaryRow {
        filename: labelled_value(&cells, FILENAME_LABEL)?,
        total_bases: labelled_value(&cells, TOTAL_BASES_LABEL)?,
        gc: labelled_value(&cells, GC_LABEL)?,
    })
}

fn labelled_value(cells: &[ElementRef], label: &'static str) -> Result<String, ScrapeError> {
    let Some(pos) = cells.iter().position(|c| cell_text(c) == label) else {
        return Ok(NOT_AVAILABLE.to_string());
    };

    cells
        .get(pos + 1)
        .map(cell_text)
        .ok_or(ScrapeError::MissingValue { label })
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect()
}

/// Lists the FastQC reports in `dir`.
pub fn list_reports(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(list_files_with_suffix(dir, REPORT_SUFFIX)?
        .into_iter()
        .map(|name| dir.join(name))
        .collect())
}

/// Parses every FastQC report in `dir` into a `SummaryRow`.
///
/// # Errors
///
/// Any report which cannot be read as UTF-8, or which has an unexpected shape, aborts the
/// whole scrape.
pub fn scrape_reports(dir: &Path) -> Result<Vec<SummaryRow>> {
    let reports = list_reports(dir)?;
    info!("Found {} FastQC report(s) in {}", reports.len(), dir.display());

    reports
        .iter()
        .map(|path| -> Result<SummaryRow> {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Unable to read report {}", path.display()))?;
            let row = extract_row(&html)
                .with_context(|| format!("Unexpected report layout in {}", path.display()))?;
            debug!("{}: {row:?}", path.display());
            Ok(row)
        })
        .collect()
}

/// Writes the summary rows as a .csv with a single header row and no index column.
/// The header is written even when there are no rows.
pub fn write_summary(path: &str, rows: &[SummaryRow]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Unable to create summary file {path}"))?;

    wtr.write_record(HEADER)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    Ok(())
}
