/// Extracts one cost from a candidate. Lower is better.
pub type CostExtractor<T> = Box<dyn Fn(&T) -> i64 + Send + Sync>;

/// Keeps the candidates with the lowest cost. Costs are compared in the order the extractors
/// were given: the second extractor only decides between candidates equal on the first one, and
/// so on. Candidates equal on every cost are all kept.
pub struct MinCostPathTailFilter<T> {
    extractors: Vec<CostExtractor<T>>,
}

impl<T> MinCostPathTailFilter<T> {
    pub fn new(extractors: Vec<CostExtractor<T>>) -> Self {
        Self { extractors }
    }

    pub fn filter(&self, mut candidates: Vec<T>) -> Vec<T> {
        for extractor in &self.extractors {
            if candidates.len() <= 1 {
                break;
            }
            let Some(min) = candidates.iter().map(|c| extractor(c)).min() else {
                break;
            };
            candidates.retain(|c| extractor(c) == min);
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractors_are_applied_in_order() {
        let filter: MinCostPathTailFilter<(i64, i64, &str)> = MinCostPathTailFilter::new(vec![
            Box::new(|c: &(i64, i64, &str)| c.0),
            Box::new(|c: &(i64, i64, &str)| c.1),
        ]);
        let kept = filter.filter(vec![(5, 1, "a"), (3, 9, "b"), (3, 2, "c"), (3, 2, "d"), (4, 0, "e")]);
        assert_eq!(kept, vec![(3, 2, "c"), (3, 2, "d")]);
    }

    #[test]
    fn test_empty_and_single() {
        let filter: MinCostPathTailFilter<i64> = MinCostPathTailFilter::new(vec![Box::new(|c: &i64| *c)]);
        assert!(filter.filter(vec![]).is_empty());
        assert_eq!(filter.filter(vec![7]), vec![7]);
        let no_costs: MinCostPathTailFilter<i64> = MinCostPathTailFilter::new(vec![]);
        assert_eq!(no_costs.filter(vec![2, 1]), vec![2, 1]);
    }
}
