use crate::models::disk::DiskIoStats;
use std::collections::HashMap;
use std::path::Path;

/// Read `<proc>/diskstats` into a map of device name → cumulative counters.
/// Sector counts are always in 512-byte units, whatever the device's block size.
pub fn read_diskstats(proc_root: &Path) -> HashMap<String, DiskIoStats> {
    let content = std::fs::read_to_string(proc_root.join("diskstats")).unwrap_or_default();
    parse_diskstats(&content)
}

pub fn parse_diskstats(content: &str) -> HashMap<String, DiskIoStats> {
    let mut map = HashMap::new();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 { continue; }

        let entry = DiskIoStats {
            reads:         parse(fields[3]),
            read_bytes:    parse(fields[5]).saturating_mul(512),
            read_time_ms:  parse(fields[6]),
            writes:        parse(fields[7]),
            write_bytes:   parse(fields[9]).saturating_mul(512),
            write_time_ms: parse(fields[10]),
            io_time_ms:    parse(fields[12]),
        };
        map.insert(fields[2].to_string(), entry);
    }
    map
}

fn parse(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}
