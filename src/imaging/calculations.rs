//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the dimensions of an image scaled down to fit a long-edge bound.
///
/// Images whose longer edge is already within `max_long_edge` come back
/// unchanged; this never upscales. Otherwise both edges are scaled by
/// `max_long_edge / long_edge`, rounded, and clamped to at least one pixel.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `max_long_edge` - Upper bound for the longer edge in pixels
///
/// # Examples
/// ```
/// # use sendfit::imaging::fit_long_edge;
/// // 4000x3000 into 1600 → 1600x1200
/// assert_eq!(fit_long_edge((4000, 3000), 1600), (1600, 1200));
///
/// // Already small enough → untouched
/// assert_eq!(fit_long_edge((800, 600), 1600), (800, 600));
/// ```
pub fn fit_long_edge(source: (u32, u32), max_long_edge: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let long_edge = src_w.max(src_h);

    if long_edge <= max_long_edge {
        return source;
    }

    let scale = max_long_edge as f64 / long_edge as f64;
    let w = ((src_w as f64 * scale).round() as u32).max(1);
    let h = ((src_h as f64 * scale).round() as u32).max(1);
    (w, h)
}
