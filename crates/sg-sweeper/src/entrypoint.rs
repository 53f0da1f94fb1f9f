//! Programmatic override generators ("entrypoints").
//!
//! Entrypoints are registered by the host application under a string
//! identifier and looked up by name when a sweep starts. Each one returns a
//! list of override sets; several entrypoints are combined by cartesian
//! product, concatenating the sets in configured order.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use sg_types::{EntrypointError, OverrideSet, SgResult};

use crate::expand::cartesian_product;

/// Signature of an entrypoint generator.
pub type EntrypointFn = dyn Fn() -> anyhow::Result<Vec<OverrideSet>> + Send + Sync;

/// Explicit name → generator mapping, populated at startup.
#[derive(Clone, Default)]
pub struct EntrypointRegistry {
    entries: HashMap<String, Arc<EntrypointFn>>,
}

impl fmt::Debug for EntrypointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntrypointRegistry")
            .field("entries", &self.names())
            .finish()
    }
}

impl EntrypointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, generator: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<Vec<OverrideSet>> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(generator));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<EntrypointFn>, EntrypointError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| EntrypointError::Unresolvable {
                name: name.to_string(),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Invokes configured entrypoints and merges their output.
#[derive(Debug, Clone, Copy)]
pub struct EntrypointRunner<'a> {
    registry: &'a EntrypointRegistry,
}

impl<'a> EntrypointRunner<'a> {
    pub fn new(registry: &'a EntrypointRegistry) -> Self {
        Self { registry }
    }

    /// Run every named entrypoint and return the merged combinations.
    ///
    /// With no entrypoints the result is a single empty set, the identity
    /// for the later CLI merge. All names are resolved before any generator
    /// runs.
    pub fn run(&self, names: &[String]) -> SgResult<Vec<OverrideSet>> {
        if names.is_empty() {
            return Ok(vec![OverrideSet::new()]);
        }

        let generators = names
            .iter()
            .map(|name| self.registry.resolve(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut outputs = Vec::with_capacity(names.len());
        for (name, generator) in names.iter().zip(generators) {
            let sets = (*generator)().map_err(|err| EntrypointError::Generator {
                name: name.clone(),
                message: format!("{err:#}"),
            })?;
            info!("Entrypoint {} produced {} override sets", name, sets.len());
            outputs.push(sets);
        }

        let merged = cartesian_product(&outputs)
            .into_iter()
            .map(|tuple| concat_checked(names, &tuple))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Merged entrypoints into {} combinations", merged.len());
        Ok(merged)
    }
}

/// Concatenate one set per entrypoint, rejecting keys set by two entrypoints.
///
/// Repeats inside a single entrypoint's set pass through untouched; the CLI
/// merge and the batch validators deal with those.
fn concat_checked(
    names: &[String],
    tuple: &[OverrideSet],
) -> Result<OverrideSet, EntrypointError> {
    let mut owners: HashMap<&str, usize> = HashMap::new();
    let mut merged = OverrideSet::new();
    for (idx, set) in tuple.iter().enumerate() {
        for key in set.iter().map(|item| item.key()) {
            let owner = *owners.entry(key).or_insert(idx);
            if owner != idx {
                return Err(EntrypointError::KeyCollision {
                    key: key.to_string(),
                    first: names[owner].clone(),
                    second: names[idx].clone(),
                });
            }
        }
        merged.extend_from(set);
    }
    Ok(merged)
}

/// Cartesian product of several override-set lists, concatenating each tuple.
///
/// Helper for entrypoints assembled from smaller generators; keys are not
/// checked for collisions.
pub fn merge_overrides(groups: &[Vec<OverrideSet>]) -> Vec<OverrideSet> {
    cartesian_product(groups)
        .into_iter()
        .map(|tuple| {
            tuple.iter().fold(OverrideSet::new(), |mut acc, set| {
                acc.extend_from(set);
                acc
            })
        })
        .collect()
}

/// Drop every override whose normalized key already appeared; first wins.
pub fn compress_overrides(set: &OverrideSet) -> OverrideSet {
    let mut seen = HashSet::new();
    set.iter()
        .filter(|item| seen.insert(item.key().to_string()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets(pairs: &[&[(&str, &str)]]) -> Vec<OverrideSet> {
        pairs
            .iter()
            .map(|set| OverrideSet::from_pairs(set.iter().copied()).unwrap())
            .collect()
    }

    fn registry() -> EntrypointRegistry {
        let mut registry = EntrypointRegistry::new();
        registry
            .register("bar", || Ok(sets(&[&[("+bar", "0")], &[("+bar", "1")]])))
            .register("bizz", || Ok(sets(&[&[("+bizz", "1")], &[("+bizz", "11")]])))
            .register("bar_again", || Ok(sets(&[&[("bar", "9")]])))
            .register("broken", || Err(anyhow::anyhow!("generator exploded")));
        registry
    }

    fn render(sets: &[OverrideSet]) -> Vec<Vec<String>> {
        sets.iter().map(OverrideSet::render).collect()
    }

    #[test]
    fn no_entrypoints_is_identity() {
        let registry = registry();
        let merged = EntrypointRunner::new(&registry).run(&[]).unwrap();
        assert_eq!(merged, vec![OverrideSet::new()]);
    }

    #[test]
    fn single_entrypoint_keeps_order() {
        let registry = registry();
        let merged = EntrypointRunner::new(&registry)
            .run(&["bar".to_string()])
            .unwrap();
        assert_eq!(render(&merged), vec![vec!["+bar=0"], vec!["+bar=1"]]);
    }

    #[test]
    fn two_entrypoints_cartesian_in_list_order() {
        let registry = registry();
        let merged = EntrypointRunner::new(&registry)
            .run(&["bar".to_string(), "bizz".to_string()])
            .unwrap();
        assert_eq!(
            render(&merged),
            vec![
                vec!["+bar=0", "+bizz=1"],
                vec!["+bar=0", "+bizz=11"],
                vec!["+bar=1", "+bizz=1"],
                vec!["+bar=1", "+bizz=11"],
            ]
        );
    }

    #[test]
    fn unknown_entrypoint_fails_before_running_others() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = EntrypointRegistry::new();
        registry.register("counted", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });

        let err = EntrypointRunner::new(&registry)
            .run(&["counted".to_string(), "missing".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            sg_types::SgError::Entrypoint(EntrypointError::Unresolvable { ref name }) if name == "missing"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn sibling_key_collision_is_an_error() {
        let registry = registry();
        let err = EntrypointRunner::new(&registry)
            .run(&["bar".to_string(), "bar_again".to_string()])
            .unwrap_err();
        match err {
            sg_types::SgError::Entrypoint(EntrypointError::KeyCollision { key, first, second }) => {
                assert_eq!(key, "bar");
                assert_eq!(first, "bar");
                assert_eq!(second, "bar_again");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn repeated_key_within_one_entrypoint_passes_through() {
        let mut registry = registry();
        registry.register("repeats", || {
            Ok(sets(&[&[("a", "1"), ("+a", "2"), ("b", "3")]]))
        });

        let merged = EntrypointRunner::new(&registry)
            .run(&["repeats".to_string(), "bizz".to_string()])
            .unwrap();
        assert_eq!(
            render(&merged),
            vec![
                vec!["a=1", "+a=2", "b=3", "+bizz=1"],
                vec!["a=1", "+a=2", "b=3", "+bizz=11"],
            ]
        );

        let combined = EntrypointRunner::new(&registry)
            .run(&["bizz".to_string(), "repeats".to_string(), "bar_again".to_string()])
            .unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[1].render(), vec!["+bizz=11", "a=1", "+a=2", "b=3", "bar=9"]);
    }

    #[test]
    fn generator_failure_is_reported() {
        let registry = registry();
        let err = EntrypointRunner::new(&registry)
            .run(&["broken".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("generator exploded"));
    }

    #[test]
    fn merge_and_compress_helpers() {
        let merged = merge_overrides(&[
            sets(&[&[("+bizz", "1")], &[("+bizz", "11")]]),
            sets(&[&[("+dropout", "0.1")], &[("+dropout", "0.5")]]),
        ]);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[1].render(), vec!["+bizz=1", "+dropout=0.5"]);

        let noisy = OverrideSet::from_pairs([("a", "1"), ("+a", "2"), ("b", "3")]).unwrap();
        assert_eq!(compress_overrides(&noisy).render(), vec!["a=1", "b=3"]);
    }

    #[test]
    fn registry_names_are_sorted() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["bar", "bar_again", "bizz", "broken"]);
        assert!(registry.contains("bizz"));
        assert_eq!(registry.len(), 4);
    }
}
