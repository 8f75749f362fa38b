use edit_distance::edit_distance;

/// Largest edit distance at which a candidate is still offered as a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Finds the candidate closest to `name`, if any is close enough to be a plausible typo.
pub(crate) fn suggest<'a, I>(name: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (edit_distance(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

/// Formats an optional suggestion as a message suffix.
pub(crate) fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean `{}`?)", s),
        None => String::new(),
    }
}

#[test]
fn test_suggest() {
    let names = ["counter", "total", "index"];

    assert_eq!(suggest("countr", names.iter().copied()), Some("counter".to_string()));
    assert_eq!(suggest("idx", names.iter().copied()), Some("index".to_string()));
    assert_eq!(suggest("sum", names.iter().copied()), None);
}
