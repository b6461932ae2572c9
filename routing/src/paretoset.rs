//! A set of elements where no element is dominated by another one. The dominance relation is
//! supplied by a [`ParetoComparator`], so the same set is used for stop arrivals, pattern rides,
//! destination paths and optimized path tails.

use std::fmt::Debug;
use std::slice::Iter;

pub trait ParetoComparator<T> {
    /// `true` if `left` is better than `right` in at least one criterion. Two elements are
    /// mutually non-dominated if both have an advantage over the other one.
    fn left_dominance_exist(&self, left: &T, right: &T) -> bool;
}

impl<T, F> ParetoComparator<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    fn left_dominance_exist(&self, left: &T, right: &T) -> bool {
        self(left, right)
    }
}

/// Observer for set events. Never required for correctness.
pub trait ParetoSetEventListener<T> {
    fn accepted(&mut self, _element: &T) {}
    /// `element` was not added, since `by` is at least as good in every criterion
    fn rejected(&mut self, _element: &T, _by: &T) {}
    /// `element` was evicted from the set by the newly accepted `by`
    fn dropped(&mut self, _element: &T, _by: &T) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl<T> ParetoSetEventListener<T> for NoopListener {}

#[derive(Debug, Clone)]
pub struct ParetoSet<T, C, L = NoopListener> {
    elements: Vec<T>,
    comparator: C,
    listener: L,
}

impl<T, C> ParetoSet<T, C, NoopListener>
where
    C: ParetoComparator<T>,
{
    pub fn new(comparator: C) -> Self {
        Self::with_listener(comparator, NoopListener)
    }
}

impl<T, C, L> ParetoSet<T, C, L>
where
    C: ParetoComparator<T>,
    L: ParetoSetEventListener<T>,
{
    pub fn with_listener(comparator: C, listener: L) -> Self {
        Self { elements: Vec::new(), comparator, listener }
    }

    /// Adds `element` unless an existing element is at least as good in every criterion. On
    /// success, all elements dominated by the new one are evicted. Returns whether it was added.
    pub fn add(&mut self, element: T) -> bool {
        let cmp = &self.comparator;

        let mut dominated_any = false;
        for existing in &self.elements {
            if !cmp.left_dominance_exist(&element, existing) {
                self.listener.rejected(&element, existing);
                return false;
            }
            dominated_any |= !cmp.left_dominance_exist(existing, &element);
        }

        if dominated_any {
            let listener = &mut self.listener;
            self.elements.retain(|existing| {
                let keep = cmp.left_dominance_exist(existing, &element);
                if !keep {
                    listener.dropped(existing, &element);
                }
                keep
            });
        }

        self.listener.accepted(&element);
        self.elements.push(element);

        #[cfg(debug_assertions)] { self.debug_assert_antichain(); }

        true
    }

    /// `true` if `element` would be accepted by [`Self::add`]
    pub fn qualify(&self, element: &T) -> bool {
        self.elements.iter().all(|e| self.comparator.left_dominance_exist(element, e))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    pub fn into_vec(self) -> Vec<T> {
        self.elements
    }

    #[cfg(debug_assertions)]
    fn debug_assert_antichain(&self) {
        for (i, a) in self.elements.iter().enumerate() {
            for b in self.elements.iter().skip(i + 1) {
                debug_assert!(
                    self.comparator.left_dominance_exist(a, b) && self.comparator.left_dominance_exist(b, a),
                    "Pareto set contains two elements where one dominates the other"
                );
            }
        }
    }
}

impl<'a, T, C, L> IntoIterator for &'a ParetoSet<T, C, L> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // (time, transfers, cost), smaller is better in every criterion
    type Vector = (i32, u8, i32);

    fn dominance(l: &Vector, r: &Vector) -> bool {
        l.0 < r.0 || l.1 < r.1 || l.2 < r.2
    }

    #[derive(Default)]
    struct Recorder {
        accepted: usize,
        rejected: usize,
        dropped: usize,
    }

    impl ParetoSetEventListener<Vector> for Recorder {
        fn accepted(&mut self, _element: &Vector) {
            self.accepted += 1;
        }
        fn rejected(&mut self, _element: &Vector, _by: &Vector) {
            self.rejected += 1;
        }
        fn dropped(&mut self, _element: &Vector, _by: &Vector) {
            self.dropped += 1;
        }
    }

    #[test]
    fn test_add_and_evict() {
        let mut set = ParetoSet::new(dominance);

        assert!(set.add((10, 1, 100)));
        assert!(set.add((12, 0, 100)));
        // equal to an existing element
        assert!(!set.add((10, 1, 100)));
        // dominated
        assert!(!set.add((11, 1, 100)));
        // dominates both
        assert!(set.add((9, 0, 90)));
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![(9, 0, 90)]);
    }

    #[test]
    fn test_listener_events() {
        let mut set = ParetoSet::with_listener(dominance, Recorder::default());

        set.add((10, 2, 100));
        set.add((11, 1, 100));
        set.add((12, 3, 100));
        set.add((9, 1, 90));

        assert_eq!(set.listener.accepted, 3);
        assert_eq!(set.listener.rejected, 1);
        assert_eq!(set.listener.dropped, 2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_closure_comparator_with_state() {
        // lexicographic "later is better" on the first criterion only
        let forward = false;
        let mut set = ParetoSet::new(move |l: &i32, r: &i32| if forward { l < r } else { l > r });
        set.add(3);
        set.add(5);
        set.add(4);
        assert_eq!(set.into_vec(), vec![5]);
    }

    fn vectors() -> impl Strategy<Value = Vec<Vector>> {
        prop::collection::vec((0..20i32, 0..4u8, 0..20i32), 0..40)
    }

    proptest! {
        #[test]
        fn prop_set_is_antichain(values in vectors()) {
            let mut set = ParetoSet::new(dominance);
            for v in &values {
                set.add(*v);
            }
            let elements: Vec<_> = set.iter().copied().collect();
            for a in &elements {
                for b in &elements {
                    if a != b {
                        prop_assert!(dominance(a, b) && dominance(b, a));
                    }
                }
            }
            // every input is dominated by or equal to some element of the set
            for v in &values {
                prop_assert!(elements.iter().any(|e| !dominance(v, e)));
            }
        }

        #[test]
        fn prop_reinsertion_is_idempotent(values in vectors()) {
            let mut set = ParetoSet::with_listener(dominance, Recorder::default());
            for v in &values {
                set.add(*v);
            }
            let before: Vec<_> = set.iter().copied().collect();
            let (accepted, dropped) = (set.listener.accepted, set.listener.dropped);

            for v in &values {
                prop_assert!(!set.add(*v));
            }

            prop_assert_eq!(set.iter().copied().collect::<Vec<_>>(), before);
            prop_assert_eq!(set.listener.accepted, accepted);
            prop_assert_eq!(set.listener.dropped, dropped);
        }
    }
}
