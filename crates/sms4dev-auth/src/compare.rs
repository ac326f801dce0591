//! Constant-time equality for secrets and signatures.

use subtle::ConstantTimeEq;

/// Compare two byte strings without an early exit.
///
/// The loop always runs over the longer input, reading missing bytes as `0`,
/// and the length check is folded into the result instead of short-circuiting.
/// Running time depends only on the input lengths, never on where the first
/// difference is.
///
/// # Examples
///
/// ```
/// use sms4dev_auth::compare::constant_time_eq;
///
/// assert!(constant_time_eq(b"abc", b"abc"));
/// assert!(!constant_time_eq(b"abc", b"abd"));
/// assert!(!constant_time_eq(b"abc", b"abc\0"));
/// ```
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut acc: u8 = 0;
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        acc |= x ^ y;
    }
    let same_len = a.len().ct_eq(&b.len());
    (acc.ct_eq(&0) & same_len).into()
}
