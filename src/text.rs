use regex::Regex;

/// Upper bound on replace-all passes. Each pass rewrites at most one match,
/// and the pipelines here strictly shrink their subject, so the bound only
/// matters for a pattern that keeps matching its own replacement.
const MAX_PASSES: usize = 64;

/// Replaces the first match of `re` in `subject` with `replacement`, in
/// place. Returns whether the subject changed. Leaves the subject untouched
/// when nothing matches, when the match already equals the replacement, or
/// when the result would exceed `max_len` bytes. The length guard is
/// silent, not an error.
pub fn replace_first(re: &Regex, replacement: &str, subject: &mut String, max_len: usize) -> bool {
    let range = match re.find(subject) {
        Some(m) => m.range(),
        None => return false,
    };
    if &subject[range.clone()] == replacement {
        return false;
    }
    if subject.len() - range.len() + replacement.len() > max_len {
        return false;
    }
    subject.replace_range(range, replacement);
    true
}

/// Applies [`replace_first`] until a pass produces no change. The result is
/// a fixed point: running it again is a no-op.
pub fn replace_all(re: &Regex, replacement: &str, subject: &mut String, max_len: usize) {
    for _ in 0..MAX_PASSES {
        if !replace_first(re, replacement, subject, max_len) {
            break;
        }
    }
}

/// Collapses every whitespace run in `s` to a single space and strips
/// leading and trailing whitespace, in place.
pub fn trim_in_place(s: &mut String) {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    *s = collapsed;
}
