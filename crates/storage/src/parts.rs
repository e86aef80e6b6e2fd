//! Part planning and object key generation.
//!
//! Pure logic, no I/O.

use crate::types::PartDescriptor;

/// Split a file of `size` bytes into contiguous parts of at most
/// `max_part_size` bytes, numbered from 1.
///
/// Every part but the last is exactly `max_part_size` long. A zero
/// `size` or zero `max_part_size` yields no parts.
pub fn plan_parts(size: u64, max_part_size: u64) -> Vec<PartDescriptor> {
    if size == 0 || max_part_size == 0 {
        return Vec::new();
    }

    let mut parts = Vec::with_capacity(expected_part_count(size, max_part_size));
    let mut offset = 0u64;
    let mut part_number = 1i32;

    while offset < size {
        let length = std::cmp::min(max_part_size, size - offset);
        parts.push(PartDescriptor {
            part_number,
            offset,
            length,
            e_tag: None,
        });
        offset += length;
        part_number += 1;
    }

    parts
}

/// Number of parts for a file: ⌈size / max_part_size⌉.
pub fn expected_part_count(size: u64, max_part_size: u64) -> usize {
    if max_part_size == 0 {
        return 0;
    }
    size.div_ceil(max_part_size) as usize
}

/// Destination key: `prefix + timestamp + "-" + filename`.
pub fn object_key(prefix: &str, timestamp: &str, filename: &str) -> String {
    format!("{prefix}{timestamp}-{filename}")
}

/// Sortable UTC timestamp used in object keys.
pub fn key_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
