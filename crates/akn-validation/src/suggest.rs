//! Nearest-match suggestions for misspelt names

use strsim::levenshtein;

/// Largest edit distance accepted for a name of the given length
fn max_distance(name: &str) -> usize {
    (name.chars().count() / 3).clamp(1, 3)
}

/// Closest candidate within the distance bound, ties broken alphabetically
pub fn nearest<'a, I>(name: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let limit = max_distance(name);
    candidates
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (levenshtein(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= limit)
        .min()
        .map(|(_, candidate)| candidate)
}

/// Message suffix for a suggestion
#[must_use]
pub fn did_you_mean(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" Did you mean '{s}'?"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_within_bound() {
        let names = ["body", "bill", "act", "chapter"];
        assert_eq!(nearest("bdy", names), Some("body"));
        assert_eq!(nearest("chaptr", names), Some("chapter"));
        assert_eq!(nearest("paragraph", names), None);
    }

    #[test]
    fn test_ties_are_alphabetical() {
        assert_eq!(nearest("bct", ["act", "bat"]), Some("act"));
    }

    #[test]
    fn test_did_you_mean() {
        assert_eq!(did_you_mean(Some("body")), " Did you mean 'body'?");
        assert_eq!(did_you_mean(None), "");
    }
}
