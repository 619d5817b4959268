//! Fractional index strings.
//!
//! A fractional index is a string over the base-62 alphabet `0-9A-Za-z`
//! (which is also ASCII order, so byte-wise string comparison agrees with
//! digit order). [`key_between`] produces a string strictly between two
//! neighbors under lexicographic comparison, or beyond an open end, without
//! renumbering anything else. Generated keys never end in the minimum digit,
//! so there is always room to generate below an existing key.

const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: usize = DIGITS.len();

fn digit_value(digit: u8) -> usize {
    DIGITS
        .iter()
        .position(|d| *d == digit)
        .expect("fractional indexes only contain base-62 digits")
}

/// A key strictly between `lower` and `upper` in lexicographic order.
///
/// `None` bounds are open: `key_between(None, None)` seeds a fresh ordering,
/// `key_between(Some(k), None)` appends after `k`, and
/// `key_between(None, Some(k))` prepends before `k`.
///
/// # Panics
/// Panics if both bounds are present and `lower >= upper`.
///
/// # Example
/// ```
/// use deltaflow::fractional::key_between;
///
/// let first = key_between(None, None);
/// let after = key_between(Some(&first), None);
/// let wedge = key_between(Some(&first), Some(&after));
/// assert!(first < wedge && wedge < after);
/// ```
pub fn key_between(lower: Option<&str>, upper: Option<&str>) -> String {
    if let (Some(lo), Some(hi)) = (lower, upper) {
        assert!(lo < hi, "key_between bounds out of order: {lo:?} >= {hi:?}");
    }
    midpoint(lower.unwrap_or(""), upper.unwrap_or(""))
}

// `b` empty means unbounded above. Returns a key strictly between `a` and
// `b`, never ending in '0'.
fn midpoint(a: &str, b: &str) -> String {
    if !b.is_empty() {
        let common = a
            .bytes()
            .zip(b.bytes())
            .take_while(|(x, y)| x == y)
            .count();
        if common > 0 {
            return format!("{}{}", &b[..common], midpoint(&a[common..], &b[common..]));
        }
    }
    let da = a.bytes().next().map(digit_value).unwrap_or(0);
    let db = b.bytes().next().map(digit_value).unwrap_or(BASE);
    if db - da > 1 {
        let mid = (da + db) / 2;
        return (DIGITS[mid] as char).to_string();
    }
    if db - da == 1 {
        // No digit fits between the two; descend under a's first digit.
        let rest = if a.is_empty() { "" } else { &a[1..] };
        return format!("{}{}", DIGITS[da] as char, midpoint(rest, ""));
    }
    // da == db: only possible when a is exhausted and b continues with the
    // minimum digit; descend under b's first digit instead.
    format!("{}{}", DIGITS[db] as char, midpoint("", &b[1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_open_bounds() {
        let key = key_between(None, None);
        assert!(!key.is_empty());
        assert!(!key.ends_with('0'));
    }

    #[test]
    fn dense_insertion_stays_ordered() {
        let mut keys = vec![key_between(None, None)];
        // Repeatedly wedge a key into the tightest gap and at both ends.
        for _ in 0..100 {
            let first = keys.first().unwrap().clone();
            keys.insert(0, key_between(None, Some(&first)));
            let last = keys.last().unwrap().clone();
            keys.push(key_between(Some(&last), None));
            let mid = keys.len() / 2;
            let wedge = key_between(Some(&keys[mid - 1]), Some(&keys[mid]));
            keys.insert(mid, wedge);
        }
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "keys out of order: {:?} >= {:?}", pair[0], pair[1]);
        }
        assert!(keys.iter().all(|k| !k.ends_with('0')));
    }

    #[test]
    fn adjacent_digits_descend() {
        let key = key_between(Some("A"), Some("B"));
        assert!("A" < key.as_str() && key.as_str() < "B");
    }

    #[test]
    fn below_minimal_key() {
        let key = key_between(None, Some("01"));
        assert!(key.as_str() < "01");
        assert!(!key.ends_with('0'));
    }

    #[test]
    #[should_panic]
    fn rejects_inverted_bounds() {
        key_between(Some("B"), Some("A"));
    }
}
