//! Combination of CLI and entrypoint overrides into rendered jobs.

use std::collections::HashSet;

use tracing::debug;

use sg_types::OverrideSet;

/// One job's overrides, rendered as ordered `raw_key=value` strings.
pub type RenderedOverrides = Vec<String>;

/// Builds the flat, ordered list of jobs for a sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchBuilder {
    remove_duplicates: bool,
}

impl BatchBuilder {
    pub fn new(remove_duplicates: bool) -> Self {
        Self { remove_duplicates }
    }

    /// Merge one CLI combination with one entrypoint combination.
    ///
    /// CLI overrides come first and win on normalized-key conflicts;
    /// entrypoint overrides only fill in keys the CLI did not set.
    pub fn merge(cli: &OverrideSet, entry: &OverrideSet) -> OverrideSet {
        let cli_keys = cli.keys();
        let mut merged = cli.clone();
        for item in entry.iter().filter(|item| !cli_keys.contains(item.key())) {
            merged.push(item.clone());
        }
        merged
    }

    /// Outer loop over CLI combinations, inner loop over entrypoint
    /// combinations.
    pub fn build(&self, cli: &[OverrideSet], entry: &[OverrideSet]) -> Vec<RenderedOverrides> {
        let mut batches = Vec::with_capacity(cli.len() * entry.len());
        for cli_set in cli {
            for entry_set in entry {
                batches.push(Self::merge(cli_set, entry_set).render());
            }
        }
        debug!(
            "Built {} jobs from {} CLI x {} entrypoint combinations",
            batches.len(),
            cli.len(),
            entry.len()
        );

        if self.remove_duplicates {
            let before = batches.len();
            batches = remove_duplicates(batches);
            debug!("Removed {} duplicate jobs", before - batches.len());
        }
        batches
    }
}

/// Keep the first occurrence of every rendered job, preserving order.
pub fn remove_duplicates(batches: Vec<RenderedOverrides>) -> Vec<RenderedOverrides> {
    let mut seen: HashSet<RenderedOverrides> = HashSet::with_capacity(batches.len());
    let mut unique = Vec::with_capacity(batches.len());
    for batch in batches {
        if !seen.contains(&batch) {
            seen.insert(batch.clone());
            unique.push(batch);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::AxisExpander;
    use sg_types::OverrideParser;

    fn cli(tokens: &[&str]) -> Vec<OverrideSet> {
        let specs = OverrideParser::create().parse_overrides(tokens).unwrap();
        AxisExpander::new().combinations(&specs)
    }

    fn entry(pairs: &[&[(&str, &str)]]) -> Vec<OverrideSet> {
        pairs
            .iter()
            .map(|set| OverrideSet::from_pairs(set.iter().copied()).unwrap())
            .collect()
    }

    #[test]
    fn cli_with_one_entrypoint() {
        let jobs = BatchBuilder::new(false).build(
            &cli(&["foo=1,2"]),
            &entry(&[&[("+bar", "0")], &[("+bar", "1")]]),
        );
        assert_eq!(
            jobs,
            vec![
                vec!["foo=1", "+bar=0"],
                vec!["foo=1", "+bar=1"],
                vec!["foo=2", "+bar=0"],
                vec!["foo=2", "+bar=1"],
            ]
        );
    }

    #[test]
    fn cli_value_wins_on_conflict() {
        let jobs = BatchBuilder::new(false).build(
            &cli(&["foo=1,2"]),
            &entry(&[&[("foo", "33"), ("+bar", "0")], &[("foo", "33"), ("+bar", "1")]]),
        );
        assert_eq!(jobs.len(), 4);
        for job in &jobs {
            assert!(!job.contains(&"foo=33".to_string()));
            assert_eq!(job.iter().filter(|s| s.starts_with("foo=")).count(), 1);
        }
    }

    #[test]
    fn additive_and_plain_keys_conflict() {
        let merged = BatchBuilder::merge(
            &OverrideSet::from_pairs([("+bar", "cli")]).unwrap(),
            &OverrideSet::from_pairs([("bar", "entry"), ("baz", "1")]).unwrap(),
        );
        assert_eq!(merged.render(), vec!["+bar=cli", "baz=1"]);
    }

    #[test]
    fn entrypoint_only_when_no_cli_overrides() {
        let jobs = BatchBuilder::new(false).build(
            &cli(&[]),
            &entry(&[&[("foo", "33"), ("+bar", "0")], &[("foo", "33"), ("+bar", "1")]]),
        );
        assert_eq!(jobs, vec![vec!["foo=33", "+bar=0"], vec!["foo=33", "+bar=1"]]);
    }

    #[test]
    fn count_is_product_before_dedup() {
        let jobs = BatchBuilder::new(false).build(
            &cli(&["a=1,2,3", "b=x,y"]),
            &entry(&[&[("c", "1")], &[("c", "2")], &[("c", "3")]]),
        );
        assert_eq!(jobs.len(), 3 * 2 * 3);
    }

    #[test]
    fn duplicates_collapse_to_first_occurrence() {
        let cli_sets = cli(&["foo=1,1", "+bar=1,1"]);
        let all = BatchBuilder::new(false).build(&cli_sets, &[OverrideSet::new()]);
        assert_eq!(all.len(), 4);

        let unique = BatchBuilder::new(true).build(&cli_sets, &[OverrideSet::new()]);
        assert_eq!(unique, vec![vec!["foo=1", "+bar=1"]]);
    }

    #[test]
    fn dedup_is_an_ordered_subsequence() {
        let input: Vec<RenderedOverrides> = [["a=1"], ["a=2"], ["a=1"], ["a=3"], ["a=2"]]
            .iter()
            .map(|job| job.iter().map(|s| s.to_string()).collect())
            .collect();
        let unique = remove_duplicates(input);
        assert_eq!(unique, vec![vec!["a=1"], vec!["a=2"], vec!["a=3"]]);
    }
}
