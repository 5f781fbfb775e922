// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A map keyed by dense integer ids. Storage is a vector of optional slots indexed by the key, so
//! iteration is always in ascending key order.

#[cfg(test)]
mod tests;

use std::{
    fmt::{self, Debug, Formatter},
    iter::{Enumerate, FilterMap},
    marker::PhantomData,
    slice, vec,
};

pub struct IndexMap<K, V> {
    _keys: PhantomData<K>,
    values: Vec<Option<V>>,
}

impl<K, V> IndexMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _keys: PhantomData,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            _keys: PhantomData,
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            _keys: PhantomData,
            base: self
                .values
                .iter()
                .enumerate()
                .filter_map(occupied as fn((usize, &Option<V>)) -> Option<(usize, &V)>),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            _keys: PhantomData,
            base: self
                .values
                .iter_mut()
                .enumerate()
                .filter_map(occupied_mut as fn((usize, &mut Option<V>)) -> Option<(usize, &mut V)>),
        }
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.values.iter().filter_map(Option::as_ref)
    }

    pub fn values_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut V> {
        self.values.iter_mut().filter_map(Option::as_mut)
    }

    pub fn drain(&mut self) -> IntoIter<K, V> {
        IntoIter {
            _keys: PhantomData,
            base: std::mem::take(&mut self.values)
                .into_iter()
                .enumerate()
                .filter_map(occupied_owned as fn((usize, Option<V>)) -> Option<(usize, V)>),
        }
    }
}

impl<K: Into<usize>, V> IndexMap<K, V> {
    pub fn insert(&mut self, key: K, value: V) {
        let index = key.into();
        if index >= self.values.len() {
            self.values.resize_with(index + 1, || None);
        }
        self.values[index] = Some(value);
    }

    #[must_use]
    pub fn contains_key(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn get(&self, key: K) -> Option<&V> {
        self.values.get(key.into()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.values.get_mut(key.into()).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        self.values.get_mut(key.into()).and_then(Option::take)
    }
}

impl<K: Into<usize>, V: Default> IndexMap<K, V> {
    pub fn get_mut_or_default(&mut self, key: K) -> &mut V {
        let index = key.into();
        if index >= self.values.len() {
            self.values.resize_with(index + 1, || None);
        }
        self.values[index].get_or_insert_with(V::default)
    }
}

impl<K: From<usize>, V> IndexMap<K, V> {
    pub fn retain(&mut self, mut f: impl FnMut(K, &mut V) -> bool) {
        for (index, slot) in self.values.iter_mut().enumerate() {
            if let Some(value) = slot
                && !f(K::from(index), value)
            {
                *slot = None;
            }
        }
    }
}

impl<K, V> Default for IndexMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V: Clone> Clone for IndexMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            _keys: PhantomData,
            values: self.values.clone(),
        }
    }
}

impl<K: From<usize> + Debug, V: Debug> Debug for IndexMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V: PartialEq> PartialEq for IndexMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        // Trailing empty slots do not make two maps different.
        let len = self.values.len().max(other.values.len());
        (0..len).all(|i| {
            self.values.get(i).and_then(Option::as_ref)
                == other.values.get(i).and_then(Option::as_ref)
        })
    }
}

impl<K: From<usize>, V> FromIterator<(K, V)> for IndexMap<K, V>
where
    K: Into<usize>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<'a, K: From<usize>, V> IntoIterator for &'a IndexMap<K, V> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: From<usize>, V> IntoIterator for IndexMap<K, V> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(mut self) -> Self::IntoIter {
        self.drain()
    }
}

fn occupied<V>((index, value): (usize, &Option<V>)) -> Option<(usize, &V)> {
    Some((index, value.as_ref()?))
}

fn occupied_mut<V>((index, value): (usize, &mut Option<V>)) -> Option<(usize, &mut V)> {
    Some((index, value.as_mut()?))
}

fn occupied_owned<V>((index, value): (usize, Option<V>)) -> Option<(usize, V)> {
    Some((index, value?))
}

type Occupied<'a, V> = FilterMap<
    Enumerate<slice::Iter<'a, Option<V>>>,
    fn((usize, &'a Option<V>)) -> Option<(usize, &'a V)>,
>;

type OccupiedMut<'a, V> = FilterMap<
    Enumerate<slice::IterMut<'a, Option<V>>>,
    fn((usize, &'a mut Option<V>)) -> Option<(usize, &'a mut V)>,
>;

type OccupiedOwned<V> =
    FilterMap<Enumerate<vec::IntoIter<Option<V>>>, fn((usize, Option<V>)) -> Option<(usize, V)>>;

pub struct Iter<'a, K, V> {
    _keys: PhantomData<K>,
    base: Occupied<'a, V>,
}

impl<'a, K: From<usize>, V> Iterator for Iter<'a, K, V> {
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.base.next().map(|(i, v)| (K::from(i), v))
    }
}

impl<K: From<usize>, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.base.next_back().map(|(i, v)| (K::from(i), v))
    }
}

pub struct IterMut<'a, K, V> {
    _keys: PhantomData<K>,
    base: OccupiedMut<'a, V>,
}

impl<'a, K: From<usize>, V> Iterator for IterMut<'a, K, V> {
    type Item = (K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.base.next().map(|(i, v)| (K::from(i), v))
    }
}

impl<K: From<usize>, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.base.next_back().map(|(i, v)| (K::from(i), v))
    }
}

pub struct IntoIter<K, V> {
    _keys: PhantomData<K>,
    base: OccupiedOwned<V>,
}

impl<K: From<usize>, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.base.next().map(|(i, v)| (K::from(i), v))
    }
}

impl<K: From<usize>, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.base.next_back().map(|(i, v)| (K::from(i), v))
    }
}
