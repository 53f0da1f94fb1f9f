//! Splitting the flat job list into launcher-sized chunks.

use sg_types::SgResult;

use crate::config::SweeperConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchChunker {
    /// `None` = a single chunk holding everything.
    max_size: Option<usize>,
}

impl BatchChunker {
    pub fn new(max_size: Option<usize>) -> Self {
        Self {
            max_size: max_size.filter(|n| *n > 0),
        }
    }

    pub fn from_config(config: &SweeperConfig) -> SgResult<Self> {
        Ok(Self::new(config.batch_limit()?))
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Consecutive chunks of at most `max_size`; the last may be smaller.
    pub fn chunk<T>(&self, items: Vec<T>) -> Vec<Vec<T>> {
        if items.is_empty() {
            return Vec::new();
        }
        let size = self.max_size.unwrap_or(items.len());

        let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
        let mut iter = items.into_iter().peekable();
        while iter.peek().is_some() {
            chunks.push(iter.by_ref().take(size).collect());
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split() {
        let chunks = BatchChunker::new(Some(2)).chunk((0..8).collect());
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn last_chunk_is_remainder() {
        for (len, n) in [(7usize, 3usize), (1, 5), (10, 1), (9, 4)] {
            let items: Vec<usize> = (0..len).collect();
            let chunks = BatchChunker::new(Some(n)).chunk(items.clone());
            assert_eq!(chunks.len(), len.div_ceil(n));
            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.len() == n));
            let expected_last = if len % n == 0 { n } else { len % n };
            assert_eq!(last.len(), expected_last);
            assert_eq!(chunks.concat(), items);
        }
    }

    #[test]
    fn unbounded_is_single_chunk() {
        let chunks = BatchChunker::new(None).chunk(vec!["a", "b", "c"]);
        assert_eq!(chunks, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn empty_input_has_no_chunks() {
        assert!(BatchChunker::new(Some(3)).chunk(Vec::<u8>::new()).is_empty());
        assert!(BatchChunker::new(None).chunk(Vec::<u8>::new()).is_empty());
    }

    #[test]
    fn from_config_honours_sentinel() {
        let config = SweeperConfig::default().with_max_batch_size(-1);
        assert_eq!(BatchChunker::from_config(&config).unwrap().max_size(), None);

        let config = SweeperConfig::default().with_max_batch_size(0);
        assert!(BatchChunker::from_config(&config).is_err());
    }
}
