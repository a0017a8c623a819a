//! # Size Units
//!
//! Binary size constants and conversions used by allocator configuration
//! and diagnostics.

/// One kibibyte in bytes.
pub const KIB: usize = 1024;
/// One mebibyte in bytes.
pub const MIB: usize = 1024 * KIB;
/// One gibibyte in bytes.
pub const GIB: usize = 1024 * MIB;

/// Converts kibibytes to bytes.
#[inline]
#[must_use]
pub const fn kib(x: usize) -> usize {
    x * KIB
}

/// Converts mebibytes to bytes.
#[inline]
#[must_use]
pub const fn mib(x: usize) -> usize {
    x * MIB
}

/// Converts gibibytes to bytes.
#[inline]
#[must_use]
pub const fn gib(x: usize) -> usize {
    x * GIB
}

/// Whole kibibytes in `bytes` (truncating).
#[inline]
#[must_use]
pub const fn to_kib(bytes: usize) -> usize {
    bytes / KIB
}

/// Whole mebibytes in `bytes` (truncating).
#[inline]
#[must_use]
pub const fn to_mib(bytes: usize) -> usize {
    bytes / MIB
}

/// Whole gibibytes in `bytes` (truncating).
#[inline]
#[must_use]
pub const fn to_gib(bytes: usize) -> usize {
    bytes / GIB
}

/// Renders a byte count with a binary prefix, e.g. for log lines.
#[must_use]
pub fn readable(bytes: usize) -> String {
    humanize_bytes::humanize_bytes_binary!(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_round_trip() {
        assert_eq!(kib(4), 4096);
        assert_eq!(mib(1), 1_048_576);
        assert_eq!(gib(1), 1_073_741_824);

        assert_eq!(to_kib(kib(7)), 7);
        assert_eq!(to_mib(mib(3) + kib(512)), 3);
        assert_eq!(to_gib(gib(1) - 1), 0);
    }

    #[test]
    fn test_readable_uses_binary_prefix() {
        assert!(readable(mib(2)).contains("Mi"));
        assert!(readable(kib(3)).contains("Ki"));
    }
}
