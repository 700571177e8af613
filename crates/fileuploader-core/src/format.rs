//! Display helpers for file names and byte counts.

/// Names longer than this are shortened for display.
const MAX_NAME_CHARS: usize = 33;
/// Characters kept from the start of a shortened name.
const HEAD_CHARS: usize = 19;
/// Characters kept from the end of a shortened name.
const TAIL_CHARS: usize = 13;

const SIZE_UNITS: [&str; 6] = ["kB", "MB", "GB", "TB", "PB", "EB"];

/// Shorten a file name for display.
///
/// Names of at most 33 characters are returned unchanged. Longer names
/// keep their first 19 and last 13 characters around an ellipsis, so
/// the extension stays visible.
#[must_use]
pub fn format_file_name(name: &str) -> String {
    let count = name.chars().count();
    if count <= MAX_NAME_CHARS {
        return name.to_owned();
    }
    let head: String = name.chars().take(HEAD_CHARS).collect();
    let tail: String = name.chars().skip(count - TAIL_CHARS).collect();
    format!("{head}...{tail}")
}

/// Render a byte count with one decimal and a unit suffix.
///
/// Divides by 1024 at least once and keeps dividing until the value is
/// under 100, so the smallest unit is kB. Values below 0.1 are shown
/// as 0.1, and units stop at EB.
#[must_use]
#[allow(clippy::cast_precision_loss)] // display only
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    value /= 1024.0;
    while value >= 100.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", value.max(0.1), SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_are_unchanged() {
        assert_eq!(format_file_name("photo.png"), "photo.png");
        let exact = "x".repeat(33);
        assert_eq!(format_file_name(&exact), exact);
    }

    #[test]
    fn forty_char_name_is_shortened_to_35() {
        let name = "abcdefghijklmnopqrstuvwxyz0123456789.png";
        assert_eq!(name.len(), 40);
        let shown = format_file_name(name);
        assert_eq!(shown, "abcdefghijklmnopqrs...123456789.png");
        assert_eq!(shown.chars().count(), 35);
    }

    #[test]
    fn shortening_counts_characters_not_bytes() {
        let name = "é".repeat(40);
        let shown = format_file_name(&name);
        assert_eq!(shown.chars().count(), 35);
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(500), "0.5kB");
        assert_eq!(format_size(1024 * 1024), "1.0MB");
        assert_eq!(format_size(0), "0.1kB");
        assert_eq!(format_size(99 * 1024), "99.0kB");
        assert_eq!(format_size(101_888), "99.5kB");
        assert_eq!(format_size(100 * 1024), "0.1MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.0GB");
    }

    #[test]
    fn units_stop_at_exabytes() {
        assert!(format_size(u64::MAX).ends_with("EB"));
    }
}
