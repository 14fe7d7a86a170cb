//! Byte-size formatting and compression ratios.
//!
//! Pure helpers shared by the CLI output and [`OptimizationResult`](crate::optimize::OptimizationResult).
//! Sizes are 1024-based: `1536` bytes is `"1.5 KB"`, `2_621_440` is `"2.50 MB"`.

/// Format a byte count for humans.
///
/// Below one mebibyte the value is shown in KB with one decimal, above it in
/// MB with two.
///
/// ```
/// # use sendfit::size::format_file_size;
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(2 * 1024 * 1024), "2.00 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    if kb < 1024.0 {
        return format!("{:.1} KB", kb);
    }
    format!("{:.2} MB", kb / 1024.0)
}

/// Percentage of bytes saved going from `original` to `compressed`.
///
/// Returns `0.0` for an empty original. Negative when the output grew.
pub fn compression_ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}
