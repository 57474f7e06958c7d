//! Single-shot marker handling for already-complete message text.

use super::MarkerSet;

/// Remove every complete reasoning region from `text`.
///
/// The earliest open token of any variant is paired with the first matching
/// close token after it and the whole region is cut. An open token with no
/// close after it truncates the text at the open token. Scanning repeats until
/// no open token remains, so the output is a fixed point.
#[must_use]
pub fn strip_markers(text: &str, markers: &MarkerSet) -> String {
    let mut out = text.to_string();
    while let Some((index, start)) = markers.find_first_open(&out) {
        let Some(pair) = markers.get(index) else {
            break;
        };
        let after_open = start + pair.open.len();
        match out[after_open..].find(pair.close.as_str()) {
            Some(rel_end) => {
                let end = after_open + rel_end + pair.close.len();
                out.replace_range(start..end, "");
            }
            None => {
                out.truncate(start);
                break;
            }
        }
    }
    out
}

/// Return the interior of the earliest reasoning region in `text`.
///
/// An unterminated region yields everything after its open token. Text with no
/// open token yields an empty string.
#[must_use]
pub fn extract_reasoning(text: &str, markers: &MarkerSet) -> String {
    let Some((index, start)) = markers.find_first_open(text) else {
        return String::new();
    };
    let Some(pair) = markers.get(index) else {
        return String::new();
    };
    let interior = &text[start + pair.open.len()..];
    match interior.find(pair.close.as_str()) {
        Some(end) => interior[..end].to_string(),
        None => interior.to_string(),
    }
}
