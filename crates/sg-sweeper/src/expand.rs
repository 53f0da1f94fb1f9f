//! Command-line axis expansion.

use sg_types::{Axis, Override, OverrideSet, OverrideSpec};

/// Row-major cartesian product: the first list varies slowest.
///
/// No lists yield a single empty tuple; any empty list yields no tuples.
pub fn cartesian_product<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut result: Vec<Vec<T>> = vec![Vec::new()];
    for list in lists {
        let mut next = Vec::with_capacity(result.len() * list.len());
        for existing in &result {
            for item in list {
                let mut combo = existing.clone();
                combo.push(item.clone());
                next.push(combo);
            }
        }
        result = next;
    }
    result
}

/// Turns parsed override specifications into per-key choice lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisExpander;

impl AxisExpander {
    pub fn new() -> Self {
        Self
    }

    pub fn axes(&self, specs: &[OverrideSpec]) -> Vec<Axis> {
        specs.iter().map(OverrideSpec::to_axis).collect()
    }

    /// Ordered choices for every specification (length 1 for fixed keys).
    pub fn expand(&self, specs: &[OverrideSpec]) -> Vec<Vec<Override>> {
        self.axes(specs).iter().map(Axis::choices).collect()
    }

    /// One override set per combination of axis choices, in declaration
    /// order with each axis iterating its values left to right.
    pub fn combinations(&self, specs: &[OverrideSpec]) -> Vec<OverrideSet> {
        cartesian_product(&self.expand(specs))
            .into_iter()
            .map(OverrideSet::from_iter)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_types::OverrideParser;

    fn specs(tokens: &[&str]) -> Vec<OverrideSpec> {
        OverrideParser::create().parse_overrides(tokens).unwrap()
    }

    #[test]
    fn product_of_counts() {
        let combos = AxisExpander::new().combinations(&specs(&["a=1,2,3", "b=x,y", "c=fixed"]));
        assert_eq!(combos.len(), 6);
        assert!(combos.iter().all(|c| c.len() == 3));
    }

    #[test]
    fn first_axis_varies_slowest() {
        let combos = AxisExpander::new().combinations(&specs(&["foo=1,2", "+bar=a,b"]));
        let rendered: Vec<Vec<String>> = combos.iter().map(OverrideSet::render).collect();
        assert_eq!(
            rendered,
            vec![
                vec!["foo=1", "+bar=a"],
                vec!["foo=1", "+bar=b"],
                vec!["foo=2", "+bar=a"],
                vec!["foo=2", "+bar=b"],
            ]
        );
    }

    #[test]
    fn no_axes_is_one_empty_combination() {
        let combos = AxisExpander::new().combinations(&[]);
        assert_eq!(combos, vec![OverrideSet::new()]);
    }

    #[test]
    fn fixed_keys_have_one_choice() {
        let choices = AxisExpander::new().expand(&specs(&["lr=0.1", "seed=range(4)"]));
        assert_eq!(choices[0].len(), 1);
        assert_eq!(choices[1].len(), 4);
    }

    #[test]
    fn empty_list_yields_nothing() {
        let lists: Vec<Vec<u8>> = vec![vec![1, 2], vec![]];
        assert!(cartesian_product(&lists).is_empty());
    }
}
