//! Snapshot export for the persistence/estimate pipeline
//!
//! [`TakeoffSnapshot`] is an owned, immutable copy of the current page's
//! measurements and scale. Sinks serialize it; none of them hold a
//! reference into the engine.

use crate::measurement::{Measurement, MeasurementGeometry, MeasurementId, MeasurementKind};
use crate::session::DocumentSession;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Error types for snapshot export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// One measurement as handed to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub id: MeasurementId,
    pub kind: MeasurementKind,
    pub geometry: MeasurementGeometry,
    /// Real-world value (length, or area for area kinds)
    pub value: f64,
    /// Value with unit, e.g. `20.00 ft`
    pub formatted: String,
    /// Creation timestamp (Unix seconds)
    pub created_at: i64,
}

impl MeasurementRecord {
    fn from_measurement(measurement: &Measurement, unit: &str) -> Self {
        Self {
            id: measurement.id,
            kind: measurement.kind(),
            geometry: measurement.geometry.clone(),
            value: measurement.value,
            formatted: measurement.formatted(unit),
            created_at: measurement.created_at,
        }
    }
}

/// Summed quantities for an estimate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub line_count: usize,
    pub total_length: f64,
    /// Rectangles and polygons
    pub area_count: usize,
    pub total_area: f64,
}

impl Totals {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a MeasurementRecord>) -> Self {
        records
            .into_iter()
            .fold(Totals::default(), |mut totals, record| {
                if record.kind.is_areal() {
                    totals.area_count += 1;
                    totals.total_area += record.value;
                } else {
                    totals.line_count += 1;
                    totals.total_length += record.value;
                }
                totals
            })
    }
}

/// Immutable export of the current page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeoffSnapshot {
    /// Display name of the loaded document
    pub source_ref: String,
    pub page_index: u32,
    pub page_count: u32,
    /// Units per pixel, `None` when the page was never calibrated
    pub scale: Option<f64>,
    pub unit: String,
    /// Measurements in creation order
    pub measurements: Vec<MeasurementRecord>,
    pub totals: Totals,
}

impl TakeoffSnapshot {
    /// Copy the current page of a session
    pub fn capture(session: &DocumentSession) -> Self {
        let unit = session.current_unit().to_string();
        let measurements: Vec<MeasurementRecord> = session
            .current_measurements()
            .map(|m| MeasurementRecord::from_measurement(m, &unit))
            .collect();
        let totals = Totals::from_records(&measurements);

        Self {
            source_ref: session.source().display_name(),
            page_index: session.page_index(),
            page_count: session.page_count(),
            scale: session.current_scale().map(|scale| scale.value()),
            unit,
            measurements,
            totals,
        }
    }

    pub fn to_json_pretty(&self) -> ExportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Destination for snapshots
pub trait ExportSink {
    fn export(&mut self, snapshot: &TakeoffSnapshot) -> ExportResult<()>;
}

/// Writes snapshots as pretty JSON
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ExportSink for JsonSink<W> {
    fn export(&mut self, snapshot: &TakeoffSnapshot) -> ExportResult<()> {
        serde_json::to_writer_pretty(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Configuration for CSV export
#[derive(Debug, Clone)]
pub struct CsvExportConfig {
    /// Include column headers in the output
    pub include_headers: bool,
    /// CSV delimiter character
    pub delimiter: u8,
    /// Append total rows after the measurements
    pub include_totals: bool,
}

impl Default for CsvExportConfig {
    fn default() -> Self {
        Self {
            include_headers: true,
            delimiter: b',',
            include_totals: true,
        }
    }
}

/// Writes one CSV row per measurement
///
/// Columns: ID, Page, Type, Value, Unit, Formatted, Scale, Created, Geometry.
/// Geometry is the JSON form of the pixel geometry.
pub struct CsvSink<W: Write> {
    writer: W,
    config: CsvExportConfig,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, CsvExportConfig::default())
    }

    pub fn with_config(writer: W, config: CsvExportConfig) -> Self {
        Self { writer, config }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ExportSink for CsvSink<W> {
    fn export(&mut self, snapshot: &TakeoffSnapshot) -> ExportResult<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.config.delimiter)
            .flexible(true)
            .from_writer(&mut self.writer);

        if self.config.include_headers {
            csv_writer.write_record([
                "ID", "Page", "Type", "Value", "Unit", "Formatted", "Scale", "Created", "Geometry",
            ])?;
        }

        let scale = snapshot
            .scale
            .map(|scale| scale.to_string())
            .unwrap_or_default();

        for record in &snapshot.measurements {
            let unit = if record.kind.is_areal() {
                format!("{}²", snapshot.unit)
            } else {
                snapshot.unit.clone()
            };
            csv_writer.write_record(&[
                record.id.to_string(),
                snapshot.page_index.to_string(),
                record.kind.as_str().to_string(),
                format!("{:.4}", record.value),
                unit,
                record.formatted.clone(),
                scale.clone(),
                record.created_at.to_string(),
                serde_json::to_string(&record.geometry)?,
            ])?;
        }

        if self.config.include_totals {
            let totals = &snapshot.totals;
            csv_writer.write_record(&[
                "TOTAL".to_string(),
                snapshot.page_index.to_string(),
                "line".to_string(),
                format!("{:.4}", totals.total_length),
                snapshot.unit.clone(),
                format!("{} lines", totals.line_count),
            ])?;
            csv_writer.write_record(&[
                "TOTAL".to_string(),
                snapshot.page_index.to_string(),
                "area".to_string(),
                format!("{:.4}", totals.total_area),
                format!("{}²", snapshot.unit),
                format!("{} areas", totals.area_count),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::scale::ScaleInput;
    use takeoff_render::{DocumentHandle, RasterSurface, SourceRef};

    fn session_with_measurements() -> DocumentSession {
        let mut session = DocumentSession::new(
            SourceRef::bytes("level-2.pdf", Vec::new()),
            DocumentHandle::from_raw(1),
            2,
            RasterSurface::new(1000, 800),
            "ft",
        );
        session.apply_scale(ScaleInput::Manual(0.1)).unwrap();
        let geometries = [
            MeasurementGeometry::line(Point::new(100.0, 100.0), Point::new(100.0, 300.0)).unwrap(),
            MeasurementGeometry::area(Point::new(0.0, 0.0), Point::new(100.0, 50.0)).unwrap(),
            MeasurementGeometry::polygon(vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(0.0, 100.0),
            ])
            .unwrap(),
        ];
        for geometry in geometries {
            session
                .measurements_mut()
                .add(Measurement::new(0, geometry, 0.1));
        }
        session
    }

    #[test]
    fn test_capture_copies_current_page() {
        let session = session_with_measurements();
        let snapshot = TakeoffSnapshot::capture(&session);

        assert_eq!(snapshot.source_ref, "level-2.pdf");
        assert_eq!(snapshot.page_index, 0);
        assert_eq!(snapshot.page_count, 2);
        assert_eq!(snapshot.scale, Some(0.1));
        let kinds: Vec<_> = snapshot.measurements.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MeasurementKind::Line, MeasurementKind::Area, MeasurementKind::Polygon]
        );
        assert_eq!(snapshot.measurements[0].formatted, "20.00 ft");
    }

    #[test]
    fn test_totals() {
        let snapshot = TakeoffSnapshot::capture(&session_with_measurements());
        let totals = snapshot.totals;
        assert_eq!(totals.line_count, 1);
        assert_eq!(totals.area_count, 2);
        assert!((totals.total_length - 20.0).abs() < 1e-9);
        // 50 (rectangle) + 50 (triangle)
        assert!((totals.total_area - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_uncalibrated_scale_is_null() {
        let session = DocumentSession::new(
            SourceRef::bytes("plan.png", Vec::new()),
            DocumentHandle::from_raw(1),
            1,
            RasterSurface::new(10, 10),
            "ft",
        );
        let json = TakeoffSnapshot::capture(&session).to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["scale"].is_null());
        assert_eq!(value["measurements"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_json_sink() {
        let snapshot = TakeoffSnapshot::capture(&session_with_measurements());
        let mut sink = JsonSink::new(Vec::new());
        sink.export(&snapshot).unwrap();

        let parsed: TakeoffSnapshot = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_csv_sink() {
        let snapshot = TakeoffSnapshot::capture(&session_with_measurements());
        let mut sink = CsvSink::new(Vec::new());
        sink.export(&snapshot).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("ID,Page,Type,Value,Unit"));
        assert!(lines[1].contains(",line,20.0000,ft,20.00 ft,0.1,"));
        assert!(lines[2].contains(",area,50.0000,ft²,"));
        assert!(lines[4].starts_with("TOTAL,0,line,20.0000"));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_csv_without_headers_or_totals() {
        let snapshot = TakeoffSnapshot::capture(&session_with_measurements());
        let config = CsvExportConfig {
            include_headers: false,
            include_totals: false,
            ..CsvExportConfig::default()
        };
        let mut sink = CsvSink::with_config(Vec::new(), config);
        sink.export(&snapshot).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output.lines().count(), 3);
    }
}
