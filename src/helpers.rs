use std::fmt;

use crate::detector::DetectionResult;

/// Renders a printable plain-text report for one diagnosis.
pub fn render_report(source: Option<&str>, result: &DetectionResult) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, source, result);
    out
}

pub fn write_report(out: &mut impl fmt::Write, source: Option<&str>, result: &DetectionResult) -> fmt::Result {
    if let Some(source) = source {
        writeln!(out, "Image: {}", source)?;
    }
    writeln!(out, "Diagnosis: {}", result.disease)?;
    writeln!(out, "Confidence: {:.1}%", result.confidence * 100.0)?;
    writeln!(out, "Severity: {}", result.severity)?;

    writeln!(out, "\nTreatment:")?;
    for (i, step) in result.treatment.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, step)?;
    }
    writeln!(out, "\nPrevention:")?;
    for (i, tip) in result.prevention.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, tip)?;
    }

    writeln!(out, "\nGenerated: {}", result.timestamp_iso())
}
