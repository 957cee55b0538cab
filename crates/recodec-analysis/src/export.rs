//! Export formats for metrics series.
//!
//! Plotting happens outside this workspace; the CSV written here is the
//! hand-off format. One row per sampled iteration, non-finite values written
//! as `inf` / `-inf` / `nan`.

use crate::float_repr::display;
use crate::series::MetricsSeries;
use std::io::Write;
use std::path::Path;

/// CSV header row.
pub const CSV_HEADER: &str = "iteration,psnr,mse,rms_diff,spectral_diff,spectral_flatness,spectral_entropy,temporal_variation";

/// Write a series as CSV to any writer.
pub fn write_series<W: Write>(series: &MetricsSeries, mut out: W) -> std::io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for record in series {
        let m = &record.metrics;
        let p = &m.noise_profile;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            record.iteration,
            display(m.psnr),
            display(m.mse),
            display(m.rms_diff),
            display(m.spectral_diff),
            display(p.spectral_flatness),
            display(p.spectral_entropy),
            display(p.temporal_variation),
        )?;
    }
    Ok(())
}

/// Render a series as a CSV string.
pub fn series_to_csv(series: &MetricsSeries) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_series(series, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Export a series to a CSV file.
///
/// # Example
///
/// ```rust,ignore
/// use recodec_analysis::export::write_series_csv;
///
/// write_series_csv(&series, "metrics.csv")?;
/// ```
pub fn write_series_csv(series: &MetricsSeries, path: impl AsRef<Path>) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_series(series, &mut file)?;
    file.flush()
}
