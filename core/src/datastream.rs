//! Iteration over toggled arrays
//!
//! A [`DataStream`] pairs a list of values with one toggle wire per value.
//! Every operation walks the full list, dummies included, so the emitted
//! constraints depend only on the list length; toggles decide which results
//! count. Operations take the [`CircuitApi`] explicitly and hand it to the
//! caller's closures.

use crate::builder::{CircuitBuilder, Variable};
use crate::circuit_api::CircuitApi;
use crate::data::DataPointVars;
use crate::errors::{CircuitError, Result};
use crate::hints::HintId;
use crate::values::{CircuitValue, Uint248, Unsigned};
use tracing::debug;

/// Values with per-slot validity toggles
#[derive(Debug, Clone)]
pub struct DataStream<T> {
    items: Vec<T>,
    toggles: Vec<Variable>,
}

impl<T: CircuitValue> DataStream<T> {
    /// Panics when the two lists differ in length.
    pub fn new(items: Vec<T>, toggles: Vec<Variable>) -> Self {
        assert_eq!(
            items.len(),
            toggles.len(),
            "data stream needs one toggle per item"
        );
        Self { items, toggles }
    }

    pub fn from_points(points: &DataPointVars<T>) -> Self {
        Self::new(points.raw.clone(), points.toggles.clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn toggles(&self) -> &[Variable] {
        &self.toggles
    }

    /// Log every slot with its toggle, when the backend knows the values.
    pub fn show<B: CircuitBuilder>(&self, api: &CircuitApi<B>) {
        let b = api.builder_ref();
        for (i, (item, toggle)) in self.items.iter().zip(&self.toggles).enumerate() {
            let values: Vec<String> = item
                .values()
                .iter()
                .map(|v| b.value(*v).map(|x| x.to_string()).unwrap_or_else(|| "?".into()))
                .collect();
            let on = b.value(*toggle).map(|t| !t.is_zero());
            debug!(slot = i, toggle = ?on, values = ?values, "data stream");
        }
    }

    /// Item at `index`, asserting its slot is active.
    pub fn get<B: CircuitBuilder>(&self, api: &mut CircuitApi<B>, index: usize) -> Result<T> {
        let item = self.items.get(index).ok_or_else(|| {
            CircuitError::InputShape(format!(
                "index {index} outside a data stream of {}",
                self.len()
            ))
        })?;
        let b = api.builder();
        let one = b.one();
        b.assert_is_equal(self.toggles[index], one);
        Ok(item.clone())
    }

    /// Slots `start..end`, toggles unchanged.
    pub fn range(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.len() {
            return Err(CircuitError::InputShape(format!(
                "range {start}..{end} outside a data stream of {}",
                self.len()
            )));
        }
        Ok(Self::new(
            self.items[start..end].to_vec(),
            self.toggles[start..end].to_vec(),
        ))
    }

    /// Windows of `size` items starting every `step` slots. A window is
    /// active only if all of its members are. The windows must tile the
    /// stream exactly.
    pub fn window<B: CircuitBuilder>(
        &self,
        api: &mut CircuitApi<B>,
        size: usize,
        step: usize,
    ) -> Result<DataStream<Vec<T>>> {
        let len = self.len();
        if size == 0 || step == 0 || size > len || (len - size) % step != 0 {
            return Err(CircuitError::InputShape(format!(
                "cannot window {len} items by size {size} step {step}"
            )));
        }
        let b = api.builder();
        let mut items = Vec::new();
        let mut toggles = Vec::new();
        for start in (0..=len - size).step_by(step) {
            let members = &self.toggles[start..start + size];
            let mut toggle = members[0];
            for t in &members[1..] {
                toggle = b.and(toggle, *t);
            }
            items.push(self.items[start..start + size].to_vec());
            toggles.push(toggle);
        }
        Ok(DataStream::new(items, toggles))
    }

    /// Apply `f` to every slot; toggles are kept.
    pub fn map<B, R, F>(&self, api: &mut CircuitApi<B>, mut f: F) -> DataStream<R>
    where
        B: CircuitBuilder,
        R: CircuitValue,
        F: FnMut(&mut CircuitApi<B>, &T) -> R,
    {
        let items = self.items.iter().map(|item| f(api, item)).collect();
        DataStream::new(items, self.toggles.clone())
    }

    /// Keep slots where `predicate` returns 1: `toggle' = toggle AND predicate`.
    pub fn filter<B, F>(&self, api: &mut CircuitApi<B>, mut predicate: F) -> Self
    where
        B: CircuitBuilder,
        F: FnMut(&mut CircuitApi<B>, &T) -> Uint248,
    {
        let mut toggles = Vec::with_capacity(self.len());
        for (item, toggle) in self.items.iter().zip(&self.toggles) {
            let keep = predicate(api, item).variable();
            let b = api.builder();
            b.assert_is_boolean(keep);
            toggles.push(b.and(*toggle, keep));
        }
        Self::new(self.items.clone(), toggles)
    }

    /// Assert `predicate` holds on every active slot.
    pub fn assert_each<B, F>(&self, api: &mut CircuitApi<B>, mut predicate: F)
    where
        B: CircuitBuilder,
        F: FnMut(&mut CircuitApi<B>, &T) -> Uint248,
    {
        for (item, toggle) in self.items.iter().zip(&self.toggles) {
            let pass = predicate(api, item).variable();
            let b = api.builder();
            let one = b.one();
            let checked = b.select(*toggle, pass, one);
            b.assert_is_equal(checked, one);
        }
    }

    /// Fold active slots in index order; inactive slots leave the
    /// accumulator untouched.
    pub fn reduce<B, R, F>(&self, api: &mut CircuitApi<B>, initial: R, mut f: F) -> R
    where
        B: CircuitBuilder,
        R: CircuitValue,
        F: FnMut(&mut CircuitApi<B>, &R, &T) -> R,
    {
        let mut acc = initial;
        for (item, toggle) in self.items.iter().zip(&self.toggles) {
            let next = f(api, &acc, item);
            acc = crate::values::select(api.builder(), *toggle, &next, &acc);
        }
        acc
    }

    /// Number of active slots.
    pub fn count<B: CircuitBuilder>(&self, api: &mut CircuitApi<B>) -> Uint248 {
        Uint248(api.builder().sum(&self.toggles))
    }

    /// 1 when `in_order(prev, curr)` holds for every pair of consecutive
    /// active items, skipping inactive slots in between.
    pub fn is_sorted<B, F>(&self, api: &mut CircuitApi<B>, mut in_order: F) -> Uint248
    where
        B: CircuitBuilder,
        F: FnMut(&mut CircuitApi<B>, &T, &T) -> Uint248,
    {
        let mut sorted = api.builder().one();
        let Some(first) = self.items.first() else {
            return Uint248(sorted);
        };
        let mut prev = first.clone();
        let mut seen = self.toggles[0];
        for (curr, toggle) in self.items.iter().zip(&self.toggles).skip(1) {
            let ok = in_order(api, &prev, curr).variable();
            let b = api.builder();
            b.assert_is_boolean(ok);
            let both = b.and(seen, *toggle);
            let one = b.one();
            let pair_ok = b.select(both, ok, one);
            sorted = b.and(sorted, pair_ok);
            prev = crate::values::select(b, *toggle, curr, &prev);
            seen = b.or(seen, *toggle);
        }
        Uint248(sorted)
    }

    pub fn assert_sorted<B, F>(&self, api: &mut CircuitApi<B>, in_order: F)
    where
        B: CircuitBuilder,
        F: FnMut(&mut CircuitApi<B>, &T, &T) -> Uint248,
    {
        let sorted = self.is_sorted(api, in_order);
        api.uint248().assert_is_true(sorted);
    }

    /// Smallest active item under `less`, or `initial` when none is active.
    pub fn min_by<B, F>(&self, api: &mut CircuitApi<B>, initial: T, mut less: F) -> T
    where
        B: CircuitBuilder,
        F: FnMut(&mut CircuitApi<B>, &T, &T) -> Uint248,
    {
        self.reduce(api, initial, |api, min, curr| {
            let lt = less(api, curr, min);
            api.select(lt, curr, min)
        })
    }

    /// Largest active item under `greater`, or `initial` when none is active.
    pub fn max_by<B, F>(&self, api: &mut CircuitApi<B>, initial: T, mut greater: F) -> T
    where
        B: CircuitBuilder,
        F: FnMut(&mut CircuitApi<B>, &T, &T) -> Uint248,
    {
        self.reduce(api, initial, |api, max, curr| {
            let gt = greater(api, curr, max);
            api.select(gt, curr, max)
        })
    }

    /// Combine slot `i` with `other[i]`; toggles come from `self`.
    pub fn zip<B, U, R, F>(
        &self,
        api: &mut CircuitApi<B>,
        other: &[U],
        mut f: F,
    ) -> Result<DataStream<R>>
    where
        B: CircuitBuilder,
        R: CircuitValue,
        F: FnMut(&mut CircuitApi<B>, &T, &U) -> R,
    {
        if other.len() != self.len() {
            return Err(CircuitError::InputShape(format!(
                "cannot zip {} items with {}",
                self.len(),
                other.len()
            )));
        }
        let items = self
            .items
            .iter()
            .zip(other)
            .map(|(a, c)| f(api, a, c))
            .collect();
        Ok(DataStream::new(items, self.toggles.clone()))
    }

    /// Group active items by `key` and reduce each group.
    ///
    /// The distinct keys come from a hint and each group is the stream
    /// filtered on its key, so a key that matches nothing yields an empty
    /// group whose result is toggled off. Unused key slots are flagged absent
    /// by the hint and never match. At most `max_groups` groups are
    /// produced (the stream length when `None`).
    pub fn group_by<B, K, R, F>(
        &self,
        api: &mut CircuitApi<B>,
        mut key: K,
        initial: R,
        mut reducer: F,
        max_groups: Option<usize>,
    ) -> DataStream<R>
    where
        B: CircuitBuilder,
        K: FnMut(&mut CircuitApi<B>, &T) -> Uint248,
        R: CircuitValue,
        F: FnMut(&mut CircuitApi<B>, &R, &T) -> R,
    {
        let n = self.len();
        let keys: Vec<Variable> = self
            .items
            .iter()
            .map(|item| key(api, item).variable())
            .collect();
        let b = api.builder();
        let size = b.constant(crate::field::Fr::from(n as u64));
        let mut inputs = vec![size];
        inputs.extend_from_slice(&keys);
        inputs.extend_from_slice(&self.toggles);
        let hinted = b.hint(HintId::GroupValues, &inputs, 2 * n);
        let groups = max_groups.unwrap_or(n).min(n);

        let mut results = Vec::with_capacity(groups);
        let mut toggles = Vec::with_capacity(groups);
        let (group_keys, present) = hinted.split_at(n);
        for (group_key, present) in group_keys.iter().zip(present).take(groups) {
            api.builder().assert_is_boolean(*present);
            let mut members = Vec::with_capacity(n);
            for (k, toggle) in keys.iter().zip(&self.toggles) {
                let b = api.builder();
                let matches = b.is_equal(*k, *group_key);
                let member = b.and(*toggle, matches);
                members.push(b.and(member, *present));
            }
            let group = Self::new(self.items.clone(), members);
            results.push(group.reduce(api, initial.clone(), &mut reducer));
            let count = group.count(api);
            let b = api.builder();
            let empty = b.is_zero(count.variable());
            toggles.push(b.not(empty));
        }
        DataStream::new(results, toggles)
    }
}

impl DataStream<Uint248> {
    pub fn sum<B: CircuitBuilder>(&self, api: &mut CircuitApi<B>) -> Uint248 {
        let zero = api.uint248().zero();
        self.reduce(api, zero, |api, acc, curr| api.uint248().add(*acc, *curr))
    }

    /// `2^248 - 1` when no slot is active.
    pub fn min<B: CircuitBuilder>(&self, api: &mut CircuitApi<B>) -> Uint248 {
        let seed = api.uint248().max_value();
        self.min_by(api, seed, |api, a, c| api.uint248().is_less_than(*a, *c))
    }

    /// 0 when no slot is active.
    pub fn max<B: CircuitBuilder>(&self, api: &mut CircuitApi<B>) -> Uint248 {
        let seed = api.uint248().zero();
        self.max_by(api, seed, |api, a, c| api.uint248().is_greater_than(*a, *c))
    }

    /// Truncated mean; unsatisfiable on an empty stream.
    pub fn mean<B: CircuitBuilder>(&self, api: &mut CircuitApi<B>) -> Uint248 {
        let sum = self.sum(api);
        let count = self.count(api);
        let (quotient, _) = api.uint248().div(sum, count);
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Fr;
    use crate::solver::Solver;

    fn api() -> CircuitApi<Solver> {
        CircuitApi::new(Solver::new(), 64)
    }

    fn stream(api: &mut CircuitApi<Solver>, values: &[u64], toggles: &[bool]) -> DataStream<Uint248> {
        let items = values.iter().map(|v| api.uint248().constant(*v)).collect();
        let toggles = toggles
            .iter()
            .map(|t| api.builder().constant(Fr::from(*t)))
            .collect();
        DataStream::new(items, toggles)
    }

    fn val(api: &CircuitApi<Solver>, v: Uint248) -> u64 {
        api.builder_ref().value(v.variable()).unwrap().low_u64()
    }

    #[test]
    fn test_sum_count_mean() {
        let mut api = api();
        let ds = stream(&mut api, &[4, 100, 8, 6], &[true, false, true, true]);
        let sum = ds.sum(&mut api);
        let count = ds.count(&mut api);
        let mean = ds.mean(&mut api);
        assert_eq!(val(&api, sum), 18);
        assert_eq!(val(&api, count), 3);
        assert_eq!(val(&api, mean), 6);
        assert!(api.builder_ref().is_satisfied());
    }

    #[test]
    fn test_all_inactive() {
        let mut api = api();
        let ds = stream(&mut api, &[1, 2, 3], &[false, false, false]);
        let sum = ds.sum(&mut api);
        let count = ds.count(&mut api);
        let max = ds.max(&mut api);
        let seven = api.uint248().constant(7);
        let reduced = ds.reduce(&mut api, seven, |api, acc, curr| api.uint248().mul(*acc, *curr));
        assert_eq!(val(&api, sum), 0);
        assert_eq!(val(&api, count), 0);
        assert_eq!(val(&api, max), 0);
        assert_eq!(val(&api, reduced), 7);
        assert!(api.builder_ref().is_satisfied());
    }

    #[test]
    fn test_mean_of_empty_stream_is_unsatisfiable() {
        let mut api = api();
        let ds = stream(&mut api, &[1, 2], &[false, false]);
        ds.mean(&mut api);
        assert!(!api.builder_ref().is_satisfied());
    }

    #[test]
    fn test_min_max() {
        let mut api = api();
        let ds = stream(&mut api, &[9, 1, 5, 7], &[true, false, true, true]);
        let min = ds.min(&mut api);
        let max = ds.max(&mut api);
        assert_eq!(val(&api, min), 5);
        assert_eq!(val(&api, max), 9);

        let empty = stream(&mut api, &[3], &[false]);
        let seed = empty.min(&mut api);
        let expected = api.uint248().max_value();
        api.uint248().assert_is_equal(seed, expected);
        assert!(api.builder_ref().is_satisfied());
    }

    #[test]
    fn test_filter_and_map() {
        let mut api = api();
        let ds = stream(&mut api, &[1, 20, 3, 40], &[true, true, false, true]);
        let big = ds.filter(&mut api, |api, v| {
            let ten = api.uint248().constant(10);
            api.uint248().is_greater_than(*v, ten)
        });
        let doubled = big.map(&mut api, |api, v| {
            let two = api.uint248().constant(2);
            api.uint248().mul(*v, two)
        });
        let sum = doubled.sum(&mut api);
        let count = big.count(&mut api);
        assert_eq!(val(&api, sum), 120);
        assert_eq!(val(&api, count), 2);
        assert!(api.builder_ref().is_satisfied());
    }

    #[test]
    fn test_assert_each_ignores_inactive() {
        let mut api = api();
        let ds = stream(&mut api, &[1, 50, 2], &[true, false, true]);
        ds.assert_each(&mut api, |api, v| {
            let limit = api.uint248().constant(10);
            api.uint248().is_less_than(*v, limit)
        });
        assert!(api.builder_ref().is_satisfied());

        let mut api = self::api();
        let ds = stream(&mut api, &[1, 50, 2], &[true, true, true]);
        ds.assert_each(&mut api, |api, v| {
            let limit = api.uint248().constant(10);
            api.uint248().is_less_than(*v, limit)
        });
        assert!(!api.builder_ref().is_satisfied());
    }

    #[test]
    fn test_sorted_skips_gaps() {
        let mut api = api();
        let ds = stream(&mut api, &[1, 99, 5, 0, 8], &[true, false, true, false, true]);
        let sorted = ds.is_sorted(&mut api, |api, a, c| api.uint248().is_less_than(*a, *c));
        assert_eq!(val(&api, sorted), 1);
        ds.assert_sorted(&mut api, |api, a, c| api.uint248().is_less_than(*a, *c));
        assert!(api.builder_ref().is_satisfied());

        let unsorted = stream(&mut api, &[5, 3, 9], &[true, true, true]);
        let sorted = unsorted.is_sorted(&mut api, |api, a, c| api.uint248().is_less_than(*a, *c));
        assert_eq!(val(&api, sorted), 0);
    }

    #[test]
    fn test_get_asserts_active() {
        let mut api = api();
        let ds = stream(&mut api, &[1, 2], &[true, false]);
        let first = ds.get(&mut api, 0).unwrap();
        assert_eq!(val(&api, first), 1);
        assert!(api.builder_ref().is_satisfied());
        ds.get(&mut api, 1).unwrap();
        assert!(!api.builder_ref().is_satisfied());
        assert!(ds.get(&mut api, 2).is_err());
    }

    #[test]
    fn test_range_and_window() {
        let mut api = api();
        let ds = stream(&mut api, &[1, 2, 3, 4, 5, 6], &[true, true, false, true, true, true]);
        let part = ds.range(2, 6).unwrap();
        assert_eq!(part.len(), 4);
        assert!(ds.range(4, 7).is_err());

        let windows = ds.window(&mut api, 2, 2).unwrap();
        assert_eq!(windows.len(), 3);
        let on: Vec<u64> = windows
            .toggles()
            .iter()
            .map(|t| api.builder_ref().value(*t).unwrap().low_u64())
            .collect();
        assert_eq!(on, vec![1, 0, 1]);
        assert!(ds.window(&mut api, 4, 3).is_err());
        let sliding = ds.window(&mut api, 3, 1).unwrap();
        assert_eq!(sliding.len(), 4);
    }

    #[test]
    fn test_group_by_zero_key_is_not_duplicated() {
        let mut api = api();
        let ds = stream(&mut api, &[0, 0, 4], &[true, true, true]);
        let zero = api.uint248().zero();
        let grouped = ds.group_by(
            &mut api,
            |_, v| *v,
            zero,
            |api, acc, _| {
                let one = api.uint248().one();
                api.uint248().add(*acc, one)
            },
            None,
        );
        let sizes: Vec<u64> = grouped.items().iter().map(|v| val(&api, *v)).collect();
        let active: Vec<u64> = grouped
            .toggles()
            .iter()
            .map(|t| api.builder_ref().value(*t).unwrap().low_u64())
            .collect();
        assert_eq!(sizes, vec![2, 1, 0]);
        assert_eq!(active, vec![1, 1, 0]);
    }

    #[test]
    fn test_zip() {
        let mut api = api();
        let ds = stream(&mut api, &[1, 2, 3], &[true, true, false]);
        let weights: Vec<Uint248> = [10u64, 20, 30]
            .iter()
            .map(|w| api.uint248().constant(*w))
            .collect();
        let products = ds
            .zip(&mut api, &weights, |api, a, w| api.uint248().mul(*a, *w))
            .unwrap();
        let sum = products.sum(&mut api);
        assert_eq!(val(&api, sum), 50);
        assert!(ds.zip(&mut api, &weights[..2], |_, a, _| *a).is_err());
    }

    #[test]
    fn test_group_by() {
        let mut api = api();
        // pairs of (key, amount) packed as key * 1000 + amount
        let ds = stream(
            &mut api,
            &[1005, 2007, 1003, 3001, 2002],
            &[true, true, true, false, true],
        );
        let zero = api.uint248().zero();
        let grouped = ds.group_by(
            &mut api,
            |api, v| {
                let k = api.uint248().constant(1000);
                api.uint248().div(*v, k).0
            },
            zero,
            |api, acc, v| {
                let k = api.uint248().constant(1000);
                let amount = api.uint248().div(*v, k).1;
                api.uint248().add(*acc, amount)
            },
            Some(3),
        );
        let totals: Vec<u64> = grouped.items().iter().map(|v| val(&api, *v)).collect();
        let active: Vec<u64> = grouped
            .toggles()
            .iter()
            .map(|t| api.builder_ref().value(*t).unwrap().low_u64())
            .collect();
        assert_eq!(totals, vec![8, 9, 0]);
        assert_eq!(active, vec![1, 1, 0]);
        assert!(api.builder_ref().is_satisfied());
    }
}
