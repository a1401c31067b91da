//! Waveform summary built from ffmpeg's `dumpwave` table.
//!
//! The filter writes a delimited table whose *header row* holds the peak
//! magnitudes (0.0..=1.0), one field per pixel column. Only that row is read.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Quantized waveform delivered to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveformDocument {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<u32>,
}

/// Number of audio samples folded into one waveform column:
/// `floor(duration_ms * sample_rate_hz / 1000 / width)`, never less than 1.
pub fn samples_per_pixel(duration_ms: u64, sample_rate_hz: u32, width: u32) -> u64 {
    if width == 0 {
        return 1;
    }
    let total = u128::from(duration_ms) * u128::from(sample_rate_hz) / 1000;
    let spp = total / u128::from(width);
    u64::try_from(spp).unwrap_or(u64::MAX).max(1)
}

/// Converts raw magnitude tables into [`WaveformDocument`]s.
#[derive(Debug, Clone, Copy)]
pub struct WaveformConverter {
    width: u32,
    height: u32,
}

impl WaveformConverter {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Quantize the header row of `table`.
    ///
    /// Each field becomes `trunc(height * value)`, kept within `0..=height`.
    /// The sample count follows the table, not the configured width.
    ///
    /// # Errors
    ///
    /// [`wc_core::Error::Convert`] if the table is empty or a field is not a
    /// finite number.
    pub fn convert_table(&self, table: &str) -> wc_core::Result<WaveformDocument> {
        let header = table
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .ok_or_else(|| wc_core::Error::Convert("sample table is empty".into()))?;

        let height = f64::from(self.height);
        let samples = header
            .split(',')
            .enumerate()
            .map(|(column, field)| {
                let raw = field.trim().trim_matches('"');
                let value: f64 = raw.parse().map_err(|_| {
                    wc_core::Error::Convert(format!("column {column}: '{raw}' is not a number"))
                })?;
                if !value.is_finite() {
                    return Err(wc_core::Error::Convert(format!(
                        "column {column}: '{raw}' is not finite"
                    )));
                }
                Ok((height * value).trunc().clamp(0.0, height) as u32)
            })
            .collect::<wc_core::Result<Vec<u32>>>()?;

        Ok(WaveformDocument {
            width: self.width,
            height: self.height,
            samples,
        })
    }

    /// Read `table_path`, convert it, and write the JSON document to
    /// `json_path`.
    pub fn convert_file(&self, table_path: &Path, json_path: &Path) -> wc_core::Result<WaveformDocument> {
        let table = std::fs::read_to_string(table_path).map_err(|e| {
            wc_core::Error::Convert(format!("failed to read {}: {e}", table_path.display()))
        })?;
        let document = self.convert_table(&table)?;
        let json = serde_json::to_vec(&document)
            .map_err(|e| wc_core::Error::Convert(format!("failed to serialize waveform: {e}")))?;
        std::fs::write(json_path, json).map_err(|e| {
            wc_core::Error::Convert(format!("failed to write {}: {e}", json_path.display()))
        })?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn samples_per_pixel_reference_value() {
        assert_eq!(samples_per_pixel(10_000, 44_100, 1800), 245);
    }

    #[test]
    fn samples_per_pixel_never_zero() {
        assert_eq!(samples_per_pixel(10, 8000, 1800), 1);
        assert_eq!(samples_per_pixel(10_000, 44_100, 0), 1);
    }

    #[test]
    fn truncates_not_rounds() {
        let converter = WaveformConverter::new(1800, 140);
        let doc = converter.convert_table("0.5,0.9999,0.0,1.0\n").unwrap();
        // 70.0, 139.986, 0.0, 140.0
        assert_eq!(doc.samples, vec![70, 139, 0, 140]);
        assert_eq!(doc.width, 1800);
        assert_eq!(doc.height, 140);
    }

    #[test]
    fn sample_count_follows_table() {
        let converter = WaveformConverter::new(1800, 140);
        let doc = converter.convert_table("0.1,0.2,0.3\n0.4,0.5,0.6\n").unwrap();
        assert_eq!(doc.samples.len(), 3);
        assert_eq!(doc.samples, vec![14, 28, 42]);
    }

    #[test]
    fn out_of_range_values_are_bounded() {
        let converter = WaveformConverter::new(10, 100);
        let doc = converter.convert_table("-0.2,1.5").unwrap();
        assert_eq!(doc.samples, vec![0, 100]);
    }

    #[test]
    fn non_numeric_field_fails() {
        let converter = WaveformConverter::new(1800, 140);
        let err = converter.convert_table("0.1,abc,0.3").unwrap_err();
        assert_matches!(err, wc_core::Error::Convert(ref msg) if msg.contains("column 1"));
    }

    #[test]
    fn empty_field_fails() {
        let converter = WaveformConverter::new(1800, 140);
        assert!(converter.convert_table("0.1,,0.3").is_err());
    }

    #[test]
    fn empty_table_fails() {
        let converter = WaveformConverter::new(1800, 140);
        assert!(converter.convert_table("").is_err());
        assert!(converter.convert_table("\n").is_err());
    }

    #[test]
    fn convert_file_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("samples.csv");
        let json = dir.path().join("waveform.json");
        std::fs::write(&table, "0.25,0.75\n").unwrap();

        let converter = WaveformConverter::new(2, 8);
        converter.convert_file(&table, &json).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({ "width": 2, "height": 8, "samples": [2, 6] })
        );
    }

    #[test]
    fn convert_file_missing_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let converter = WaveformConverter::new(2, 8);
        let result = converter.convert_file(&dir.path().join("nope.csv"), &dir.path().join("w.json"));
        assert_matches!(result, Err(wc_core::Error::Convert(_)));
    }
}
