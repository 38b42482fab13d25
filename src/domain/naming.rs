//! Collision-free sibling naming.

/// Compute a name derived from `base` that is not contained in `existing`.
///
/// A free `base` is returned unchanged. Otherwise the maximal trailing run of
/// ASCII digits is split off as a numeric suffix (starting at 1 when there is
/// none) and counted upward until `prefix + n` is free:
///
/// ```
/// use proptree::domain::naming::increment;
///
/// assert_eq!(increment("Item", ["Item"]), "Item1");
/// assert_eq!(increment("Item3", ["Item3", "Item4"]), "Item5");
/// assert_eq!(increment("B3", ["B"]), "B3");
/// ```
pub fn increment<I, S>(base: &str, existing: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let existing: Vec<S> = existing.into_iter().collect();
    let taken = |candidate: &str| existing.iter().any(|e| e.as_ref() == candidate);

    if !taken(base) {
        return base.to_string();
    }

    let (mut prefix, mut n) = split_numeric_suffix(base);
    loop {
        let candidate = format!("{prefix}{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n = match n.checked_add(1) {
            Some(next) => next,
            // Counter exhausted: count again with the whole name as prefix
            None => {
                prefix = base;
                1
            }
        };
    }
}

/// Split `name` into its prefix and trailing number.
///
/// Names without a trailing number, or with one that overflows `u64`, count
/// from 1 with the whole name as prefix.
fn split_numeric_suffix(name: &str) -> (&str, u64) {
    let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[prefix.len()..];
    if digits.is_empty() {
        return (name, 1);
    }
    match digits.parse::<u64>() {
        Ok(n) => (prefix, n),
        Err(_) => (name, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Item", &["Item"], "Item1")]
    #[case("Item3", &["Item3", "Item4"], "Item5")]
    #[case("B", &[], "B")]
    #[case("B", &["B", "B1"], "B2")]
    #[case("B3", &["B"], "B3")]
    #[case("B3", &["B3"], "B4")]
    #[case("B", &["B", "B2"], "B1")]
    #[case("", &[""], "1")]
    #[case("42", &["42"], "43")]
    #[case("B18446744073709551615", &["B18446744073709551615"], "B184467440737095516151")]
    #[case("B18446744073709551614", &["B18446744073709551614", "B18446744073709551615"], "B184467440737095516141")]
    fn given_base_and_existing_when_incrementing_then_returns_expected(
        #[case] base: &str,
        #[case] existing: &[&str],
        #[case] expected: &str,
    ) {
        assert_eq!(increment(base, existing), expected);
    }

    #[test]
    fn given_huge_suffix_when_incrementing_then_counts_from_one() {
        let base = "N99999999999999999999999";
        let next = increment(base, [base]);
        assert_eq!(next, format!("{base}1"));
    }

    #[test]
    fn given_many_bases_when_incrementing_then_result_is_never_taken() {
        let mut existing: Vec<String> = Vec::new();
        for base in ["A", "A1", "A", "B7", "B7", "B8", "A", "7", "7"] {
            let name = increment(base, &existing);
            assert!(!existing.contains(&name), "{name} already taken");
            existing.push(name);
        }
        assert_eq!(
            existing,
            vec!["A", "A1", "A2", "B7", "B8", "B9", "A3", "7", "8"]
        );
    }
}
