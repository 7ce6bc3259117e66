//! Sibling ordering utilities
//!
//! Tabs, blocks, fields, related lists and links each carry a `sequence`
//! number that is dense and zero-based among their siblings. Insertion at a
//! position shifts every sibling at or after that position up by one, so a
//! collection built from N insertions always carries sequences `0..N`.
//! Deletion leaves gaps on purpose: render order only depends on relative
//! order, and renumbering would rewrite persisted sibling rows.

use serde::{Deserialize, Serialize};

/// Implemented by every element kind that is ordered among siblings.
pub trait Sequenced {
    fn sequence(&self) -> u32;
    fn set_sequence(&mut self, sequence: u32);
}

/// Where a new element should land relative to its future siblings.
///
/// `Before(x)` and `After(x)` reference an existing sibling by its label or
/// name; `End` appends (and is also the position used for the very first
/// element of a collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Before(String),
    After(String),
    End,
}

impl Default for Placement {
    fn default() -> Self {
        Placement::End
    }
}

/// Resolve a placement to a concrete position.
///
/// `key` extracts the identifier `Before`/`After` match against (tab and
/// block labels, field names). Returns `None` when the referenced sibling
/// does not exist.
pub fn position_for<T, F>(siblings: &[T], placement: &Placement, key: F) -> Option<u32>
where
    T: Sequenced,
    F: Fn(&T) -> &str,
{
    match placement {
        Placement::End => Some(siblings.len() as u32),
        Placement::Before(target) => siblings
            .iter()
            .find(|element| key(element) == target)
            .map(Sequenced::sequence),
        Placement::After(target) => siblings
            .iter()
            .find(|element| key(element) == target)
            .map(|element| element.sequence() + 1),
    }
}

/// Insert `element` at `position`, shifting every sibling whose sequence is
/// at or after `position` up by one, then sort by sequence. The sort is
/// stable, so equal sequences (which the shift prevents) would keep their
/// insertion order instead of reordering arbitrarily.
pub fn insert_at<T: Sequenced>(siblings: &mut Vec<T>, mut element: T, position: u32) {
    for existing in siblings.iter_mut() {
        if existing.sequence() >= position {
            existing.set_sequence(existing.sequence() + 1);
        }
    }

    element.set_sequence(position);
    siblings.push(element);

    siblings.sort_by_key(Sequenced::sequence);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: String,
        sequence: u32,
    }

    impl Item {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                sequence: 0,
            }
        }
    }

    impl Sequenced for Item {
        fn sequence(&self) -> u32 {
            self.sequence
        }

        fn set_sequence(&mut self, sequence: u32) {
            self.sequence = sequence;
        }
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|item| item.name.as_str()).collect()
    }

    #[test]
    fn test_first_insert_lands_at_zero() {
        let mut items = Vec::new();
        let position = position_for(&items, &Placement::End, |item: &Item| &item.name);
        assert_eq!(position, Some(0));

        insert_at(&mut items, Item::new("a"), 0);
        assert_eq!(items[0].sequence, 0);
    }

    #[test]
    fn test_insert_before_shifts_siblings() {
        let mut items = Vec::new();
        insert_at(&mut items, Item::new("a"), 0);
        insert_at(&mut items, Item::new("b"), 1);

        let position = position_for(&items, &Placement::Before("a".into()), |item| &item.name);
        insert_at(&mut items, Item::new("c"), position.unwrap());

        assert_eq!(names(&items), vec!["c", "a", "b"]);
        let sequences: Vec<u32> = items.iter().map(|item| item.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn test_insert_after_middle() {
        let mut items = Vec::new();
        insert_at(&mut items, Item::new("a"), 0);
        insert_at(&mut items, Item::new("b"), 1);
        insert_at(&mut items, Item::new("c"), 2);

        let position = position_for(&items, &Placement::After("a".into()), |item| &item.name);
        insert_at(&mut items, Item::new("d"), position.unwrap());

        assert_eq!(names(&items), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn test_unknown_target_resolves_to_none() {
        let mut items = Vec::new();
        insert_at(&mut items, Item::new("a"), 0);

        let position = position_for(&items, &Placement::Before("ghost".into()), |item| {
            &item.name
        });
        assert_eq!(position, None);
    }

    proptest! {
        /// N placements always produce dense sequences 0..N, whatever the
        /// mix of before/after/end choices.
        #[test]
        fn prop_sequences_stay_dense(choices in proptest::collection::vec((0usize..3, 0usize..16), 1..24)) {
            let mut items: Vec<Item> = Vec::new();

            for (i, (kind, target)) in choices.into_iter().enumerate() {
                let placement = if items.is_empty() {
                    Placement::End
                } else {
                    let target = &items[target % items.len()];
                    match kind {
                        0 => Placement::Before(target.name.clone()),
                        1 => Placement::After(target.name.clone()),
                        _ => Placement::End,
                    }
                };

                let position = position_for(&items, &placement, |item| item.name.as_str())
                    .expect("placement targets an existing sibling");
                insert_at(&mut items, Item::new(&format!("e{i}")), position);
            }

            let sequences: Vec<u32> = items.iter().map(|item| item.sequence).collect();
            let expected: Vec<u32> = (0..items.len() as u32).collect();
            prop_assert_eq!(sequences, expected);
        }

        /// Inserting before X always lands the new element directly before X;
        /// inserting after X directly after it.
        #[test]
        fn prop_relative_placement_holds(count in 2usize..10, pick in 0usize..10, before in proptest::bool::ANY) {
            let mut items: Vec<Item> = Vec::new();
            for i in 0..count {
                insert_at(&mut items, Item::new(&format!("e{i}")), i as u32);
            }

            let target = items[pick % items.len()].name.clone();
            let placement = if before {
                Placement::Before(target.clone())
            } else {
                Placement::After(target.clone())
            };

            let position = position_for(&items, &placement, |item| item.name.as_str()).unwrap();
            insert_at(&mut items, Item::new("new"), position);

            let target_index = items.iter().position(|item| item.name == target).unwrap();
            let new_index = items.iter().position(|item| item.name == "new").unwrap();
            if before {
                prop_assert_eq!(new_index + 1, target_index);
            } else {
                prop_assert_eq!(new_index, target_index + 1);
            }
        }
    }
}
