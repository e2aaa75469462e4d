/// Format a raw byte count into a human-readable string: "12.5 MB"
pub fn fmt_bytes(bytes: u64) -> String {
    fmt_bytes_f(bytes as f64)
}

fn fmt_bytes_f(b: f64) -> String {
    const TB: f64 = 1_099_511_627_776.0;
    const GB: f64 = 1_073_741_824.0;
    const MB: f64 = 1_048_576.0;
    const KB: f64 = 1_024.0;
    if b >= TB      { format!("{:.1} TB", b / TB) }
    else if b >= GB { format!("{:.1} GB", b / GB) }
    else if b >= MB { format!("{:.1} MB", b / MB) }
    else if b >= KB { format!("{:.1} KB", b / KB) }
    else            { format!("{:.0} B",  b) }
}

/// "41°C", or a dash when unknown.
pub fn fmt_temp(celsius: Option<i32>) -> String {
    match celsius {
        Some(t) => format!("{}°C", t),
        None    => "—".to_string(),
    }
}

/// Show an empty identity string as a dash.
pub fn or_dash(s: &str) -> &str {
    if s.is_empty() { "—" } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_units() {
        assert_eq!(fmt_bytes(0), "0 B");
        assert_eq!(fmt_bytes(1023), "1023 B");
        assert_eq!(fmt_bytes(1536), "1.5 KB");
        assert_eq!(fmt_bytes(500_107_862_016), "465.8 GB");
        assert_eq!(fmt_bytes(2 * 1_099_511_627_776), "2.0 TB");
    }

    #[test]
    fn placeholders() {
        assert_eq!(fmt_temp(Some(38)), "38°C");
        assert_eq!(fmt_temp(None), "—");
        assert_eq!(or_dash(""), "—");
        assert_eq!(or_dash("S3Z9"), "S3Z9");
    }
}
