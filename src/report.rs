//! PDF rendering of the most recent upload summary.
//!
//! One A4 page: a bold title followed by the stored figures, each on its own
//! line at fixed offsets from the top margin. Field order is part of the
//! report's contract; fonts and offsets are presentation detail.

use thiserror::Error;

use crate::models::{round2, HistoryRecord};

// ---

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No data available to generate report")]
    NoData,
    #[error("failed to render report: {0}")]
    Render(String),
}

/// Suggested filename for the downloaded document.
pub const REPORT_FILENAME: &str = "chemviz_report.pdf";

const REPORT_TITLE: &str = "Chemical Equipment Analysis Report";

/// Render the given record into PDF bytes, or fail with [`ReportError::NoData`]
/// when the history is empty.
pub fn render(record: Option<&HistoryRecord>) -> Result<Vec<u8>, ReportError> {
    // ---
    use printpdf::{BuiltinFont, Mm, PdfDocument};

    let record = record.ok_or(ReportError::NoData)?;

    // A4 portrait
    let (doc, page, layer) = PdfDocument::new(REPORT_TITLE, Mm(210.0), Mm(297.0), "report");
    let title_font = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Render(e.to_string()))?;
    let body_font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Render(e.to_string()))?;
    let layer = doc.get_page(page).get_layer(layer);

    let left = 18.0;
    let mut y = 297.0 - 18.0;
    layer.use_text(REPORT_TITLE, 16.0, Mm(left), Mm(y), &title_font);

    y -= 14.0;
    for line in [
        format!("Total Equipment: {}", record.total_equipment),
        format!("Average Flowrate: {}", round2(record.avg_flowrate)),
        format!("Average Pressure: {}", round2(record.avg_pressure)),
        format!("Average Temperature: {}", round2(record.avg_temperature)),
        format!("Uploaded At: {}", record.uploaded_at),
    ] {
        layer.use_text(line, 12.0, Mm(left), Mm(y), &body_font);
        y -= 9.0;
    }

    doc.save_to_bytes()
        .map_err(|e| ReportError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_record() -> HistoryRecord {
        // ---
        HistoryRecord {
            id: 1,
            uploaded_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            total_equipment: 3,
            avg_flowrate: 15.0,
            avg_pressure: 150.0,
            avg_temperature: 27.666,
        }
    }

    #[test]
    fn empty_history_yields_no_data() {
        // ---
        assert!(matches!(render(None), Err(ReportError::NoData)));
    }

    #[test]
    fn renders_a_pdf_document() {
        // ---
        let bytes = render(Some(&sample_record())).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }
}
