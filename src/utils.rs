use number_prefix::NumberPrefix;
use std::path::Path;

#[cfg(not(windows))]
use std::fs;

pub fn format_size(size: u64) -> String {
    match NumberPrefix::binary(size as f64) {
        NumberPrefix::Standalone(bytes) => format!("{} B", bytes),
        NumberPrefix::Prefixed(prefix, n) => format!("{:.1} {}B", n, prefix),
    }
}

/// Render a progress bar using Unicode block characters (1/8 to 8/8 precision)
pub fn render_bar(percent: f64, width: usize) -> String {
    const PARTIAL_CHARS: [char; 7] = ['▏', '▎', '▍', '▌', '▋', '▊', '▉'];

    let fraction = percent.clamp(0.0, 100.0) / 100.0 * width as f64;
    let full_blocks = fraction.floor() as usize;
    let partial = ((fraction - full_blocks as f64) * 8.0).round() as usize;

    let mut bar = "█".repeat(full_blocks.min(width));
    if full_blocks < width && partial > 0
        && let Some(c) = PARTIAL_CHARS.get((partial - 1).min(6)) {
            bar.push(*c);
        }
    bar
}

/// Share of `part` in `whole`, in percent
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

/// Get the drive letter for a path (Windows-specific)
#[cfg(windows)]
pub fn get_drive_letter(path: &Path) -> Option<char> {
    use std::path::Component;
    if let Some(Component::Prefix(prefix)) = path.components().next() {
        prefix.as_os_str().to_str()?.chars().next()
    } else {
        None
    }
}

#[cfg(not(windows))]
pub fn get_volume_id(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    fs::symlink_metadata(path).ok().map(|m| m.dev())
}

/// Get the number of CPUs for parallelism
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_binary_prefixes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(render_bar(100.0, 10).chars().count(), 10);
        assert_eq!(render_bar(50.0, 10), "█████");
        assert_eq!(render_bar(0.0, 10), "");
        assert_eq!(render_bar(250.0, 4).chars().count(), 4);
    }

    #[test]
    fn percent_handles_empty_totals() {
        assert_eq!(percent_of(5, 0), 0.0);
        assert!((percent_of(1, 4) - 25.0).abs() < f64::EPSILON);
    }
}
