//! Transfer-reference codes.
//!
//! Every top-up invoice carries a reference the seller must quote in their bank transfer memo.
//! References are allocated from a monotonic sequence held in the database, so collisions are
//! impossible; two ISO 7064 MOD 97-10 check digits let the reconciliation side reject typos
//! before hitting the database. The same allocator serves both invoice issuance and the admin
//! manual-credit path.

/// The fixed prefix on every reference, e.g. `KM-000000004287`.
pub const REFERENCE_PREFIX: &str = "KM-";

const SEQUENCE_WIDTH: usize = 10;

/// Renders the reference for the given sequence number: prefix, zero-padded sequence, two
/// check digits.
pub fn format_reference(seq: u64) -> String {
    let body = format!("{seq:0width$}", width = SEQUENCE_WIDTH);
    format!("{REFERENCE_PREFIX}{body}{:02}", check_digits(&body))
}

/// ISO 7064 MOD 97-10 check digits over a numeric string.
fn check_digits(body: &str) -> u64 {
    let rem = body.bytes().fold(0u64, |acc, b| (acc * 10 + u64::from(b - b'0')) % 97);
    98 - (rem * 100) % 97
}

/// Checks shape, prefix and check digits. Valid references still may not correspond to any
/// issued payment.
pub fn is_valid_reference(reference: &str) -> bool {
    parse_sequence(reference).is_some()
}

/// Extracts the sequence number from a well-formed reference, or `None` if the shape or check
/// digits are off.
pub fn parse_sequence(reference: &str) -> Option<u64> {
    let digits = reference.strip_prefix(REFERENCE_PREFIX)?;
    if digits.len() != SEQUENCE_WIDTH + 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (body, check) = digits.split_at(SEQUENCE_WIDTH);
    if check.parse::<u64>().ok()? != check_digits(body) {
        return None;
    }
    body.parse().ok()
}
