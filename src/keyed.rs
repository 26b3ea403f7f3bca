//! Keyed child reconciliation.
//!
//! Matches children by key instead of position so that reordered items keep
//! their render-target subtree. Unchanged prefixes and suffixes are diffed in
//! place; the remaining window is matched through a key lookup and the
//! longest increasing subsequence of matched old indices decides which
//! children stay put. Everything else matched is relocated.

use std::collections::{HashMap, VecDeque};

use crate::diff::Differ;
use crate::patch::{Insert, Move, Reorder};
use crate::VNode;

pub(crate) fn reconcile<Msg: 'static>(
    differ: &mut Differ<Msg>,
    old: &[(String, VNode<Msg>)],
    new: &[(String, VNode<Msg>)],
) -> Reorder<Msg> {
    let mut start = 0;
    while start < old.len() && start < new.len() && old[start].0 == new[start].0 {
        differ.child(start, &old[start].1, &new[start].1);
        start += 1;
    }

    let mut suffix = 0;
    while old.len() - suffix > start
        && new.len() - suffix > start
        && old[old.len() - suffix - 1].0 == new[new.len() - suffix - 1].0
    {
        suffix += 1;
    }
    let old_end = old.len() - suffix;
    let new_end = new.len() - suffix;
    for offset in 0..suffix {
        differ.child(old_end + offset, &old[old_end + offset].1, &new[new_end + offset].1);
    }

    let mut reorder = Reorder::default();

    if start == old_end {
        reorder.inserts = (start..new_end)
            .map(|index| Insert {
                index,
                node: new[index].1.clone(),
            })
            .collect();
        return reorder;
    }
    if start == new_end {
        reorder.removes = (start..old_end).collect();
        return reorder;
    }

    // Old indices per key in document order; the first unconsumed one wins.
    let mut by_key: HashMap<&str, VecDeque<usize>> = HashMap::with_capacity(old_end - start);
    for (index, (key, _)) in old.iter().enumerate().take(old_end).skip(start) {
        let slots = by_key.entry(key.as_str()).or_default();
        if !slots.is_empty() {
            tracing::warn!(key = %key, "duplicate key among keyed children");
        }
        slots.push_back(index);
    }

    let mut consumed = vec![false; old_end - start];
    // (new index, old index) for every matched child, in new order.
    let mut matched = Vec::with_capacity(new_end - start);
    for (index, (key, node)) in new.iter().enumerate().take(new_end).skip(start) {
        match by_key.get_mut(key.as_str()).and_then(VecDeque::pop_front) {
            Some(source) => {
                consumed[source - start] = true;
                differ.child(source, &old[source].1, node);
                matched.push((index, source));
            }
            None => reorder.inserts.push(Insert {
                index,
                node: node.clone(),
            }),
        }
    }

    reorder.removes = consumed
        .iter()
        .enumerate()
        .filter(|(_, used)| !**used)
        .map(|(offset, _)| start + offset)
        .collect();

    let sources: Vec<usize> = matched.iter().map(|&(_, source)| source).collect();
    let stable = longest_increasing(&sources);
    reorder.moves = matched
        .iter()
        .zip(stable)
        .filter(|(_, keep)| !keep)
        .map(|(&(to, from), _)| Move { from, to })
        .collect();

    reorder
}

/// Marks the members of one longest strictly increasing subsequence.
///
/// Patience sorting with predecessor links, O(n log n).
fn longest_increasing(values: &[usize]) -> Vec<bool> {
    // tails[k]: position in `values` of the smallest tail of a run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; values.len()];

    for (position, &value) in values.iter().enumerate() {
        let length = tails.partition_point(|&tail| values[tail] < value);
        if length > 0 {
            previous[position] = Some(tails[length - 1]);
        }
        if length == tails.len() {
            tails.push(position);
        } else {
            tails[length] = position;
        }
    }

    let mut members = vec![false; values.len()];
    let mut cursor = tails.last().copied();
    while let Some(position) = cursor {
        members[position] = true;
        cursor = previous[position];
    }
    members
}
