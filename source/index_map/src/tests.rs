// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::IndexMap;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Key(usize);

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key(value)
    }
}

impl From<Key> for usize {
    fn from(value: Key) -> Self {
        value.0
    }
}

#[test]
fn iteration_is_in_key_order_and_skips_holes() {
    let mut map = IndexMap::new();
    map.insert(Key(3), "three");
    map.insert(Key(0), "zero");
    let entries = map.iter().collect::<Vec<_>>();
    assert_eq!(entries, vec![(Key(0), &"zero"), (Key(3), &"three")]);
    assert_eq!(map.iter().next_back(), Some((Key(3), &"three")));
    assert_eq!(map.len(), 2);
}

#[test]
fn remove_leaves_other_entries() {
    let mut map = IndexMap::new();
    map.insert(Key(1), 10);
    map.insert(Key(2), 20);
    assert_eq!(map.remove(Key(1)), Some(10));
    assert!(!map.contains_key(Key(1)));
    assert_eq!(map.get(Key(2)), Some(&20));
}

#[test]
fn retain_and_drain() {
    let mut map = (0..5).map(|i| (Key(i), i * 10)).collect::<IndexMap<Key, usize>>();
    map.retain(|key, _| key.0 % 2 == 0);
    let drained = map.drain().collect::<Vec<_>>();
    assert_eq!(drained, vec![(Key(0), 0), (Key(2), 20), (Key(4), 40)]);
    assert!(map.is_empty());
}

#[test]
fn maps_with_trailing_holes_compare_equal() {
    let mut left = IndexMap::new();
    left.insert(Key(0), 'a');
    let mut right = left.clone();
    right.insert(Key(4), 'b');
    right.remove(Key(4));
    assert_eq!(left, right);
}
