//! Tag intersection.

use std::collections::HashMap;

/// Keeps only the provider tags whose keys the caller declared.
///
/// Providers inject their own tags; comparing them against the desired set
/// would report a change on every run. `None` is returned when the provider
/// reported no tag set, and when nothing matched while the caller declared no
/// tags at all, so that an unset desired value compares equal.
#[must_use]
pub fn intersect_tags(
    tags: Option<&HashMap<String, String>>,
    desired: Option<&HashMap<String, String>>,
) -> Option<HashMap<String, String>> {
    let tags = tags?;

    let actual: HashMap<String, String> = tags
        .iter()
        .filter(|(key, _)| desired.is_some_and(|d| d.contains_key(*key)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if actual.is_empty() && desired.is_none() {
        return None;
    }
    Some(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_keeps_only_desired_keys_with_provider_values() {
        let provider = tags(&[("Name", "q"), ("aws:injected", "x"), ("team", "ops")]);
        let desired = tags(&[("Name", "q"), ("team", "infra"), ("missing", "m")]);

        let result = intersect_tags(Some(&provider), Some(&desired)).expect("tags expected");

        assert_eq!(result, tags(&[("Name", "q"), ("team", "ops")]));
    }

    #[test]
    fn test_absent_provider_tags_stay_absent() {
        let desired = tags(&[("Name", "q")]);
        assert_eq!(intersect_tags(None, Some(&desired)), None);
        assert_eq!(intersect_tags(None, None), None);
    }

    #[test]
    fn test_empty_result_without_desired_is_absent() {
        let provider = tags(&[("aws:injected", "x")]);
        assert_eq!(intersect_tags(Some(&provider), None), None);
        assert_eq!(intersect_tags(Some(&HashMap::new()), None), None);
    }

    #[test]
    fn test_empty_result_with_desired_is_empty() {
        let provider = tags(&[("aws:injected", "x")]);
        let desired = tags(&[("Name", "q")]);

        assert_eq!(
            intersect_tags(Some(&provider), Some(&desired)),
            Some(HashMap::new())
        );
        assert_eq!(
            intersect_tags(Some(&provider), Some(&HashMap::new())),
            Some(HashMap::new())
        );
    }
}
