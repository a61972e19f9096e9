//! Text preparation for narration — script segmentation.
//!
//! Pure functions, no I/O.

/// Split a narration script into synthesis units.
///
/// Each non-blank line becomes one trimmed unit, in source order. Blank and
/// whitespace-only lines are dropped entirely; they do not become pauses.
/// Handles `\n` and `\r\n` line endings.
pub fn narration_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
