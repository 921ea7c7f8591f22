//! String helpers: label trimming for reports and option cleanup for config

/// Reverse a string by characters
#[inline]
pub fn reverse_chars(s: &str) -> String {
    s.chars().rev().collect()
}

/// Longest suffix shared by every label.
///
/// The reversed labels are ordered lexicographically; every reversed label
/// lies between the min and the max, so the common prefix of those two
/// extremes is the common prefix of the whole set. Fewer than two labels have
/// no common suffix.
pub fn common_suffix<S: AsRef<str>>(labels: &[S]) -> String {
    if labels.len() < 2 {
        return String::new();
    }

    let mut reversed = labels.iter().map(|l| reverse_chars(l.as_ref()));
    let first = reversed.next().unwrap_or_default();
    let (min, max) = reversed.fold((first.clone(), first), |(min, max), rs| {
        if rs < min {
            (rs, max)
        } else if rs > max {
            (min, rs)
        } else {
            (min, max)
        }
    });

    let shared: String =
        min.chars().zip(max.chars()).take_while(|(a, b)| a == b).map(|(a, _)| a).collect();
    reverse_chars(&shared)
}

/// Remove the common suffix from every label.
///
/// A label that is nothing but the suffix is kept whole so it stays readable.
pub fn trim_common_suffix<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let suffix = common_suffix(labels);
    labels
        .iter()
        .map(|label| {
            let label = label.as_ref();
            match label.strip_suffix(suffix.as_str()) {
                Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
                _ => label.to_string(),
            }
        })
        .collect()
}

/// String cleanup extension trait
pub trait StringExt {
    /// Trimmed copy, `None` when blank
    fn clean(&self) -> Option<String>;
}

impl StringExt for str {
    #[inline]
    fn clean(&self) -> Option<String> {
        let trimmed = self.trim();
        if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
    }
}

impl StringExt for String {
    #[inline]
    fn clean(&self) -> Option<String> {
        self.as_str().clean()
    }
}

impl<T: AsRef<str>> StringExt for Option<T> {
    #[inline]
    fn clean(&self) -> Option<String> {
        self.as_ref().and_then(|s| s.as_ref().clean())
    }
}
