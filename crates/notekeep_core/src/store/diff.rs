//! Incremental diff between a cached ordered list and one change-set.
//!
//! # Invariants
//! - Operations apply sequentially: each index is valid against the list
//!   produced by the operations before it.
//! - Applying every operation to the old list yields `items`, which equals
//!   a fresh fetch with the same request.
//! - Untouched entities never move. Updated entities stay put when they
//!   keep their place among untouched neighbours and belong to the longest
//!   run that preserves relative order.

use super::change::ChangeSet;
use super::live::{CollectionChange, MoveReporting};
use super::query::FetchRequest;
use crate::model::{Entity, EntityId};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub(crate) struct DiffOutcome<E> {
    pub(crate) changes: Vec<CollectionChange<E>>,
    pub(crate) items: Vec<E>,
}

pub(crate) fn diff<E: Entity>(
    old: &[E],
    change: &ChangeSet,
    request: &FetchRequest<E>,
    moves: MoveReporting,
) -> DiffOutcome<E> {
    let deleted: HashSet<EntityId> = change.deleted_ids(E::KIND).collect();
    let mut changed: HashMap<EntityId, E> = change
        .inserted_of::<E>()
        .chain(change.updated_of::<E>())
        .map(|entity| (entity.id(), entity.clone()))
        .collect();

    let mut updated = HashSet::new();
    let mut items = Vec::with_capacity(old.len());
    for item in old {
        let id = item.id();
        if deleted.contains(&id) {
            continue;
        }
        match changed.remove(&id) {
            Some(next) if request.matches(&next) => {
                updated.insert(id);
                items.push(next);
            }
            Some(_) => {}
            None => items.push(item.clone()),
        }
    }
    let entering: Vec<E> = changed
        .into_values()
        .filter(|entity| request.matches(entity))
        .collect();
    let inserted: HashSet<EntityId> = entering.iter().map(Entity::id).collect();
    items.extend(entering);
    items.sort_by(|left, right| request.compare(left, right));

    let new_index: HashMap<EntityId, usize> = items
        .iter()
        .enumerate()
        .map(|(index, item)| (item.id(), index))
        .collect();
    let stayers = stayers(old, &items, &new_index, &updated, &inserted);

    let mut changes = Vec::new();
    let mut working: Vec<EntityId> = old.iter().map(Entity::id).collect();

    for (index, item) in old.iter().enumerate().rev() {
        let id = item.id();
        let gone = !new_index.contains_key(&id);
        let relocating = moves == MoveReporting::DeleteThenInsert && !gone && !stayers.contains(&id);
        if gone || relocating {
            working.remove(index);
            changes.push(CollectionChange::Removed {
                index,
                item: item.clone(),
            });
        }
    }

    for (at, item) in items.iter().enumerate() {
        let id = item.id();
        if stayers.contains(&id) {
            continue;
        }
        let from = working.iter().position(|current| *current == id);
        if let Some(from) = from {
            working.remove(from);
        }
        let to = match at.checked_sub(1) {
            Some(previous) => {
                let previous_id = items[previous].id();
                working
                    .iter()
                    .position(|current| *current == previous_id)
                    .map_or(0, |position| position + 1)
            }
            None => 0,
        };
        working.insert(to, id);

        let item = item.clone();
        changes.push(match from {
            None => CollectionChange::Inserted { index: to, item },
            Some(from) if from == to => CollectionChange::UpdatedInPlace { index: to, item },
            Some(from) => CollectionChange::Moved { from, to, item },
        });
    }

    for (index, item) in items.iter().enumerate() {
        let id = item.id();
        if stayers.contains(&id) && updated.contains(&id) {
            changes.push(CollectionChange::UpdatedInPlace {
                index,
                item: item.clone(),
            });
        }
    }

    DiffOutcome { changes, items }
}

/// Ids of surviving entities that keep their position.
fn stayers<E: Entity>(
    old: &[E],
    items: &[E],
    new_index: &HashMap<EntityId, usize>,
    updated: &HashSet<EntityId>,
    inserted: &HashSet<EntityId>,
) -> HashSet<EntityId> {
    let mut untouched_before = Vec::with_capacity(items.len());
    let mut count = 0;
    for item in items {
        untouched_before.push(count);
        let id = item.id();
        if !updated.contains(&id) && !inserted.contains(&id) {
            count += 1;
        }
    }

    let mut stayers = HashSet::new();
    let mut group: Vec<(EntityId, usize)> = Vec::new();
    let mut untouched_seen = 0;
    for item in old {
        let id = item.id();
        let Some(&at) = new_index.get(&id) else {
            continue;
        };
        if !updated.contains(&id) {
            settle_group(&mut group, &mut stayers);
            stayers.insert(id);
            untouched_seen += 1;
            continue;
        }
        if untouched_before[at] == untouched_seen {
            group.push((id, at));
        }
    }
    settle_group(&mut group, &mut stayers);
    stayers
}

fn settle_group(group: &mut Vec<(EntityId, usize)>, stayers: &mut HashSet<EntityId>) {
    let positions: Vec<usize> = group.iter().map(|(_, at)| *at).collect();
    let keep = longest_increasing_run(&positions);
    for ((id, _), kept) in group.drain(..).zip(keep) {
        if kept {
            stayers.insert(id);
        }
    }
}

/// Marks one longest strictly increasing subsequence of `values`.
fn longest_increasing_run(values: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut parent: Vec<Option<usize>> = vec![None; values.len()];
    for (index, &value) in values.iter().enumerate() {
        let slot = tails.partition_point(|&tail| values[tail] < value);
        if slot > 0 {
            parent[index] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(index);
        } else {
            tails[slot] = index;
        }
    }

    let mut keep = vec![false; values.len()];
    let mut cursor = tails.last().copied();
    while let Some(index) = cursor {
        keep[index] = true;
        cursor = parent[index];
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Record, Tag, TagSortKey};
    use uuid::Uuid;

    fn tag(seq: i64, name: &str) -> Tag {
        let mut tag = Tag::new(Uuid::new_v4());
        tag.seq = seq;
        tag.name = name.to_string();
        tag
    }

    fn renamed(tag: &Tag, name: &str) -> Tag {
        let mut next = tag.clone();
        next.name = name.to_string();
        next
    }

    fn replay(old: &[Tag], changes: &[CollectionChange<Tag>]) -> Vec<Tag> {
        let mut items = old.to_vec();
        for change in changes {
            change.apply_to(&mut items);
        }
        items
    }

    fn by_name() -> FetchRequest<Tag> {
        FetchRequest::ascending(TagSortKey::Name)
    }

    #[test]
    fn longest_run_prefers_the_longest_ordered_subset() {
        assert_eq!(
            longest_increasing_run(&[3, 0, 1, 4, 2]),
            vec![false, true, true, false, true]
        );
        assert!(longest_increasing_run(&[]).is_empty());
    }

    #[test]
    fn rename_within_place_is_an_in_place_update() {
        let old = vec![tag(1, "alpha"), tag(2, "beta"), tag(3, "gamma")];
        let mut change = ChangeSet::new(1);
        change.push_updated(Record::Tag(renamed(&old[1], "bravo")));

        let outcome = diff(&old, &change, &by_name(), MoveReporting::default());
        assert_eq!(
            outcome.changes,
            vec![CollectionChange::UpdatedInPlace {
                index: 1,
                item: renamed(&old[1], "bravo"),
            }]
        );
        assert_eq!(replay(&old, &outcome.changes), outcome.items);
    }

    #[test]
    fn rename_across_neighbours_is_remove_then_insert() {
        let old = vec![tag(1, "alpha"), tag(2, "beta"), tag(3, "gamma")];
        let mut change = ChangeSet::new(1);
        change.push_updated(Record::Tag(renamed(&old[0], "zulu")));

        let outcome = diff(&old, &change, &by_name(), MoveReporting::DeleteThenInsert);
        assert_eq!(
            outcome.changes,
            vec![
                CollectionChange::Removed {
                    index: 0,
                    item: old[0].clone(),
                },
                CollectionChange::Inserted {
                    index: 2,
                    item: renamed(&old[0], "zulu"),
                },
            ]
        );
        assert_eq!(replay(&old, &outcome.changes), outcome.items);
    }

    #[test]
    fn atomic_reporting_emits_single_move() {
        let old = vec![tag(1, "alpha"), tag(2, "beta"), tag(3, "gamma")];
        let mut change = ChangeSet::new(1);
        change.push_updated(Record::Tag(renamed(&old[2], "aardvark")));

        let outcome = diff(&old, &change, &by_name(), MoveReporting::Atomic);
        assert_eq!(
            outcome.changes,
            vec![CollectionChange::Moved {
                from: 2,
                to: 0,
                item: renamed(&old[2], "aardvark"),
            }]
        );
        assert_eq!(replay(&old, &outcome.changes), outcome.items);
    }

    #[test]
    fn mixed_commit_replays_to_sorted_result() {
        let old = vec![
            tag(1, "alpha"),
            tag(2, "beta"),
            tag(3, "delta"),
            tag(4, "gamma"),
            tag(5, "omega"),
        ];
        let fresh = tag(6, "epsilon");
        let mut change = ChangeSet::new(1);
        change.push_inserted(Record::Tag(fresh));
        change.push_updated(Record::Tag(renamed(&old[4], "able")));
        change.push_updated(Record::Tag(renamed(&old[0], "zeta")));
        change.push_updated(Record::Tag(renamed(&old[2], "delta prime")));
        change.push_deleted(old[1].entity_ref());

        for moves in [MoveReporting::DeleteThenInsert, MoveReporting::Atomic] {
            let outcome = diff(&old, &change, &by_name(), moves);
            let names: Vec<&str> = outcome.items.iter().map(|tag| tag.name.as_str()).collect();
            assert_eq!(names, vec!["able", "delta prime", "epsilon", "gamma", "zeta"]);
            assert_eq!(replay(&old, &outcome.changes), outcome.items);
        }
    }

    #[test]
    fn filtered_out_update_is_a_removal() {
        let old = vec![tag(1, "alpha"), tag(2, "apex")];
        let request = by_name().with_filter(crate::store::Filter::new("starts_with_a", |tag: &Tag| {
            tag.name.starts_with('a')
        }));
        let mut change = ChangeSet::new(1);
        change.push_updated(Record::Tag(renamed(&old[0], "beta")));

        let outcome = diff(&old, &change, &request, MoveReporting::default());
        assert_eq!(
            outcome.changes,
            vec![CollectionChange::Removed {
                index: 0,
                item: old[0].clone(),
            }]
        );
        assert_eq!(outcome.items, vec![old[1].clone()]);
    }

    #[test]
    fn unrelated_kinds_produce_no_operations() {
        let old = vec![tag(1, "alpha")];
        let mut change = ChangeSet::new(1);
        change.push_deleted(crate::model::EntityRef::note(Uuid::new_v4()));

        let outcome = diff(&old, &change, &by_name(), MoveReporting::default());
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.items, old);
    }
}
