//! Grade label resolution.
//!
//! Teacher entries carry display labels ("6th Grade", "6th-8th Grade",
//! "6th-11th Elective"), while group grids are keyed by the configured grade
//! names. Resolution maps a label onto the known grade names:
//!
//! 1. Exact match.
//! 2. Ordinal range at the start of the label ("6th-8th", "6–8") → every
//!    known grade whose number lies in the range.
//! 3. First ordinal number ("7th ...") → the known grade with that number.
//! 4. "Kindergarten" (any case) → the known kindergarten grade.
//!
//! Anything else resolves to nothing.

/// Grade number of a grade name: `"6th Grade"` → 6, `"Kindergarten"` → 0.
pub fn grade_number(grade: &str) -> Option<u32> {
    if grade.to_lowercase().contains("kindergarten") {
        return Some(0);
    }
    let start = grade.find(|c: char| c.is_ascii_digit())?;
    leading_number(&grade[start..]).map(|(n, _)| n)
}

/// Resolves a display label to the known grade names it covers.
///
/// Results keep the order of `known`.
pub fn resolve_groups<'a, I>(label: &str, known: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let known: Vec<&str> = known.into_iter().collect();
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if known.contains(&trimmed) {
        return vec![trimmed.to_string()];
    }

    if let Some((start, end)) = ordinal_range(trimmed) {
        let matched: Vec<String> = known
            .iter()
            .filter(|g| grade_number(g).is_some_and(|n| n >= start && n <= end))
            .map(|g| g.to_string())
            .collect();
        if !matched.is_empty() {
            return matched;
        }
    }

    if let Some(n) = first_ordinal(trimmed) {
        if let Some(g) = known.iter().find(|g| grade_number(g) == Some(n)) {
            return vec![g.to_string()];
        }
    }

    if trimmed.to_lowercase().contains("kindergarten") {
        if let Some(g) = known
            .iter()
            .find(|g| g.to_lowercase().contains("kindergarten"))
        {
            return vec![g.to_string()];
        }
    }

    Vec::new()
}

/// Display label for a class covering `grades`.
///
/// A single grade is shown as-is; several grades become a range
/// ("6th-8th Grade") ordered by their position in `order`. Grades missing
/// from `order` come after it, by grade number.
pub fn grade_display(grades: &[String], order: &[String]) -> String {
    match grades {
        [] => String::new(),
        [only] => only.clone(),
        _ => {
            let key = |g: &String| {
                (
                    order.iter().position(|o| o == g).unwrap_or(usize::MAX),
                    grade_number(g).unwrap_or(u32::MAX),
                )
            };
            let mut sorted: Vec<&String> = grades.iter().collect();
            sorted.sort_by_key(|g| key(g));
            let first = sorted[0].replace(" Grade", "");
            let last = sorted[sorted.len() - 1].replace(" Grade", "");
            format!("{first}-{last} Grade")
        }
    }
}

/// Parses leading ASCII digits. Returns the number and the rest.
fn leading_number(s: &str) -> Option<(u32, &str)> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let n = s[..end].parse().ok()?;
    Some((n, &s[end..]))
}

/// Strips an optional ordinal suffix ("st", "nd", "rd", "th"), any case.
fn skip_ordinal_suffix(s: &str) -> &str {
    let lower = s.get(..2).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("st" | "nd" | "rd" | "th") => &s[2..],
        _ => s,
    }
}

fn has_ordinal_suffix(s: &str) -> bool {
    skip_ordinal_suffix(s).len() != s.len()
}

/// `"6th-8th ..."` → (6, 8). Only at the start of the label.
fn ordinal_range(label: &str) -> Option<(u32, u32)> {
    let (start, rest) = leading_number(label)?;
    let rest = skip_ordinal_suffix(rest);
    let rest = rest
        .strip_prefix('-')
        .or_else(|| rest.strip_prefix('\u{2013}'))?;
    let (end, _) = leading_number(rest)?;
    (start > 0 && end > 0 && start <= end).then_some((start, end))
}

/// First number in the label that carries an ordinal suffix.
fn first_ordinal(label: &str) -> Option<u32> {
    let mut rest = label;
    while let Some(pos) = rest.find(|c: char| c.is_ascii_digit()) {
        let (n, after) = leading_number(&rest[pos..])?;
        if has_ordinal_suffix(after) {
            return Some(n);
        }
        rest = after;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<&'static str> {
        vec![
            "Kindergarten",
            "5th Grade",
            "6th Grade",
            "7th Grade",
            "8th Grade",
        ]
    }

    #[test]
    fn test_grade_number() {
        assert_eq!(grade_number("6th Grade"), Some(6));
        assert_eq!(grade_number("Kindergarten"), Some(0));
        assert_eq!(grade_number("Grade 11"), Some(11));
        assert_eq!(grade_number("Seniors"), None);
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(resolve_groups("7th Grade", known()), vec!["7th Grade"]);
    }

    #[test]
    fn test_range_match() {
        assert_eq!(
            resolve_groups("6th-8th Grade", known()),
            vec!["6th Grade", "7th Grade", "8th Grade"]
        );
        assert_eq!(
            resolve_groups("5\u{2013}6 Elective", known()),
            vec!["5th Grade", "6th Grade"]
        );
    }

    #[test]
    fn test_single_ordinal_and_kindergarten() {
        assert_eq!(resolve_groups("6th", known()), vec!["6th Grade"]);
        assert_eq!(resolve_groups("Room 12, 8th", known()), vec!["8th Grade"]);
        assert_eq!(resolve_groups("kindergarten am", known()), vec!["Kindergarten"]);
    }

    #[test]
    fn test_unresolvable() {
        assert!(resolve_groups("Staff", known()).is_empty());
        assert!(resolve_groups("", known()).is_empty());
        assert!(resolve_groups("10th Grade", known()).is_empty());
    }

    #[test]
    fn test_grade_display() {
        let order: Vec<String> = known().into_iter().map(String::from).collect();
        assert_eq!(grade_display(&["6th Grade".into()], &order), "6th Grade");
        assert_eq!(
            grade_display(&["8th Grade".into(), "6th Grade".into()], &order),
            "6th-8th Grade"
        );
        assert_eq!(grade_display(&[], &order), "");
        assert_eq!(
            grade_display(&["8th Grade".into(), "6th Grade".into()], &[]),
            "6th-8th Grade"
        );
    }
}
