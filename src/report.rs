//! Report rendering
//!
//! Plain text for terminals, pretty JSON for scripts.

use std::fmt::Write;

use crate::models::Report;
use crate::util::units::{format_bytes, format_nanos, format_speed};
use crate::Result;

/// Render the human-readable report
pub fn render_text(report: &Report) -> String {
    let info = &report.device_info;
    let result = &report.result;

    let speed = result
        .sequential_bytes_per_sec()
        .map(format_speed)
        .unwrap_or_else(|| "n/a".to_string());
    let seeks_per_second = result
        .seeks_per_second()
        .map(|rate| format!("{:.3}", rate))
        .unwrap_or_else(|| "n/a".to_string());

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}:", report.device.display());
    let _ = writeln!(out, " Physical block size: {} bytes", info.physical_block_size);
    let _ = writeln!(
        out,
        " Device size: {} ({} blocks, {} bytes)",
        format_bytes(info.device_size_bytes),
        info.block_count,
        info.device_size_bytes
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        " Sequential read speed: {} ({} in {})",
        speed,
        format_bytes(result.sequential_bytes_read),
        format_nanos(result.sequential_duration_ns)
    );
    let _ = writeln!(
        out,
        " Average time to read 1 physical block: {}",
        format_nanos(result.block_read_duration_ns)
    );
    let _ = writeln!(
        out,
        " Total time spent doing random reads: {} ({} reads)",
        format_nanos(result.total_random_access_duration_ns),
        result.seek_count
    );
    let _ = writeln!(
        out,
        "   estimated time spent actually reading data inside the blocks: {}",
        format_nanos(result.estimated_reading_duration_ns)
    );
    let _ = writeln!(
        out,
        "   estimated time seeking: {}",
        format_nanos(result.estimated_seeking_duration_ns())
    );
    let _ = writeln!(
        out,
        " Random access time: {}",
        format_nanos(result.average_seek_duration_ns)
    );
    let _ = writeln!(out, " Seeks/second: {}", seeks_per_second);
    let _ = writeln!(out, " Random seed: {}", report.seed);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        " Minimum individual time measurement error: ± {}",
        format_nanos(report.measurement_tolerance_ns)
    );

    out
}

/// Render the report as pretty-printed JSON
pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
