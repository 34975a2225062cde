//! Puzzle states: an arena of bottle slots grouped into top-color buckets.
//!
//! Bottles live in reference-counted slots addressed by a stable
//! [`BottleId`]. Applying a pour copies the slot vector (pointer copies
//! only) and allocates fresh bottles for the two touched slots, so a
//! successor never mutates anything reachable from its parent.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::bottle::Bottle;
use crate::error::PuzzleError;
use crate::puzzle::{Color, Palette};

/// Stable handle of a bottle slot within a [`State`] and all its successors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BottleId(usize);

impl BottleId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for BottleId {
    fn from(index: usize) -> Self {
        BottleId(index)
    }
}

impl fmt::Display for BottleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bucket a bottle belongs to: its top color, or `Empty`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKey {
    Empty,
    Top(Color),
}

impl BucketKey {
    pub fn of(bottle: &Bottle) -> Self {
        match bottle.top_color() {
            Some(color) => BucketKey::Top(color),
            None => BucketKey::Empty,
        }
    }
}

/// Immutable data shared by every state of one puzzle
#[derive(Debug, Default)]
pub struct Layout {
    palette: Palette,
    labels: Vec<Option<String>>,
}

impl Layout {
    pub fn new(palette: Palette, labels: Vec<Option<String>>) -> Self {
        Self { palette, labels }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

/// Order-independent fingerprint of a state.
///
/// Buckets in key order, each bucket's bottles sorted by contents.
/// Two states with equal keys are the same search node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey(Box<[Bottle]>);

impl CanonicalKey {
    pub fn bottles(&self) -> &[Bottle] {
        &self.0
    }
}

type Bucket = SmallVec<[BottleId; 4]>;

/// A full puzzle configuration
#[derive(Debug, Clone)]
pub struct State {
    layout: Rc<Layout>,
    slots: Vec<Rc<Bottle>>,
    buckets: BTreeMap<BucketKey, Bucket>,
}

impl State {
    /// Build a state whose slot `i` holds `bottles[i]`.
    pub fn new(layout: Rc<Layout>, bottles: impl IntoIterator<Item = Bottle>) -> Self {
        let mut state = Self {
            layout,
            slots: Vec::new(),
            buckets: BTreeMap::new(),
        };
        for bottle in bottles {
            state.add_bottle(bottle);
        }
        state
    }

    /// State with no palette names or labels (colors render as `#id`)
    pub fn from_bottles(bottles: impl IntoIterator<Item = Bottle>) -> Self {
        Self::new(Rc::new(Layout::default()), bottles)
    }

    /// Append a bottle in a new slot and file it under its bucket.
    pub fn add_bottle(&mut self, bottle: Bottle) -> BottleId {
        let id = BottleId::from(self.slots.len());
        self.slots.push(Rc::new(bottle));
        self.attach(id);
        id
    }

    fn attach(&mut self, id: BottleId) {
        let key = BucketKey::of(&self.slots[id.index()]);
        self.buckets.entry(key).or_default().push(id);
    }

    fn detach(&mut self, id: BottleId) {
        let key = BucketKey::of(&self.slots[id.index()]);
        if let Some(members) = self.buckets.get_mut(&key) {
            members.retain(|member| *member != id);
            if members.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn palette(&self) -> &Palette {
        &self.layout.palette
    }

    /// Reporting label of a slot, if the puzzle gave one
    pub fn label(&self, id: BottleId) -> Option<&str> {
        self.layout
            .labels
            .get(id.index())
            .and_then(|label| label.as_deref())
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn bottle_ids(&self) -> impl Iterator<Item = BottleId> + '_ {
        (0..self.slots.len()).map(BottleId::from)
    }

    pub fn bottle(&self, id: BottleId) -> Result<&Bottle, PuzzleError> {
        self.slots
            .get(id.index())
            .map(|slot| slot.as_ref())
            .ok_or_else(|| PuzzleError::NotFound {
                id,
                slots: self.slots.len(),
            })
    }

    pub fn bottles(&self) -> impl Iterator<Item = (BottleId, &Bottle)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (BottleId::from(i), slot.as_ref()))
    }

    /// Buckets in key order (`Empty` first)
    pub fn buckets(&self) -> impl Iterator<Item = (BucketKey, &[BottleId])> + '_ {
        self.buckets
            .iter()
            .map(|(key, members)| (*key, members.as_slice()))
    }

    pub fn bucket(&self, key: BucketKey) -> &[BottleId] {
        self.buckets
            .get(&key)
            .map(|members| members.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_empty(&self) -> bool {
        self.buckets.contains_key(&BucketKey::Empty)
    }

    /// Pour `source` into `destination`, returning the successor state.
    ///
    /// `self` is left untouched; only the two touched slots are copied.
    pub fn apply_move(&self, source: BottleId, destination: BottleId) -> Result<State, PuzzleError> {
        if source == destination {
            return Err(PuzzleError::invalid_move(format!(
                "bottle {source} cannot pour into itself"
            )));
        }
        let mut poured_into = self.bottle(destination)?.clone();
        let mut poured_from = self.bottle(source)?.clone();
        poured_into.combine(&mut poured_from)?;

        let mut next = self.clone();
        next.detach(source);
        next.detach(destination);
        next.slots[source.index()] = Rc::new(poured_from);
        next.slots[destination.index()] = Rc::new(poured_into);
        next.attach(source);
        next.attach(destination);
        Ok(next)
    }

    /// Every bottle is empty or full of a single color.
    pub fn is_winning_state(&self) -> bool {
        self.slots.iter().all(|bottle| bottle.is_solved())
    }

    /// No two bottles satisfy `can_combine`.
    ///
    /// Bottles in different buckets never combine unless one is empty, so
    /// only same-bucket pairs and the empty bucket's neighbours are checked.
    /// Two empty bottles combine, so they alone keep a state non-terminal.
    pub fn is_terminal_state(&self) -> bool {
        if self.has_empty() && self.buckets.len() > 1 {
            return false;
        }
        for members in self.buckets.values() {
            for &destination in members {
                for &source in members {
                    if source != destination
                        && self.slots[destination.index()].can_combine(&self.slots[source.index()])
                    {
                        return false;
                    }
                }
            }
        }
        true
    }

    pub fn canonical_key(&self) -> CanonicalKey {
        let mut key = Vec::with_capacity(self.slots.len());
        for members in self.buckets.values() {
            let start = key.len();
            key.extend(members.iter().map(|id| (*self.slots[id.index()]).clone()));
            key[start..].sort_unstable();
        }
        CanonicalKey(key.into_boxed_slice())
    }

    /// Units of each color across all bottles
    pub fn color_counts(&self) -> BTreeMap<Color, usize> {
        let mut counts = BTreeMap::new();
        for bottle in &self.slots {
            for &color in bottle.contents() {
                *counts.entry(color).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Renders as `{blue: <red,blue>,<blue>; empty: <>}` in canonical order.
impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let palette = self.palette();
        f.write_str("{")?;
        for (i, (key, members)) in self.buckets.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match key {
                BucketKey::Empty => f.write_str("empty: ")?,
                BucketKey::Top(color) => write!(f, "{}: ", palette.name(*color))?,
            }
            let mut prints: Vec<String> = members
                .iter()
                .map(|id| self.slots[id.index()].fingerprint(palette).to_string())
                .collect();
            prints.sort();
            f.write_str(&prints.join(","))?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bottle::CAPACITY;
    use crate::puzzle::PuzzleConfig;
    use proptest::prelude::*;

    fn state(bottles: &[&[&str]]) -> State {
        PuzzleConfig::from_contents(bottles.iter().map(|b| b.iter().copied()))
            .build_state()
            .unwrap()
    }

    fn id(i: usize) -> BottleId {
        BottleId::from(i)
    }

    fn assert_buckets_consistent(state: &State) {
        let mut seen = 0;
        for (key, members) in state.buckets() {
            assert!(!members.is_empty(), "bucket {key:?} left without members");
            for &member in members {
                assert_eq!(BucketKey::of(state.bottle(member).unwrap()), key);
                seen += 1;
            }
        }
        assert_eq!(seen, state.slot_count());
    }

    #[test]
    fn test_buckets_group_by_top_color() {
        let s = state(&[&["a", "b"], &["b", "a"], &[], &["a"]]);
        let a = s.palette().get("a").unwrap();
        let b = s.palette().get("b").unwrap();

        assert_eq!(s.bucket(BucketKey::Top(b)), &[id(0)]);
        assert_eq!(s.bucket(BucketKey::Top(a)), &[id(1), id(3)]);
        assert_eq!(s.bucket(BucketKey::Empty), &[id(2)]);
        assert_buckets_consistent(&s);
    }

    #[test]
    fn test_apply_move_leaves_parent_untouched() {
        let parent = state(&[&["r", "r", "b", "b"], &["r", "r", "b", "b"], &[]]);
        let child = parent.apply_move(id(0), id(2)).unwrap();

        assert_eq!(parent.to_string(), "{empty: <>; b: <r,r,b,b>,<r,r,b,b>}");
        assert_eq!(child.to_string(), "{b: <b,b>,<r,r,b,b>; r: <r,r>}");
        assert_eq!(child.bottle(id(0)).unwrap().len(), 2);
        assert_eq!(child.bottle(id(2)).unwrap().len(), 2);
        assert_buckets_consistent(&parent);
        assert_buckets_consistent(&child);
    }

    #[test]
    fn test_apply_move_between_identical_bottles() {
        let s = state(&[&["a", "a"], &["a", "a"]]);
        let next = s.apply_move(id(1), id(0)).unwrap();

        assert_eq!(next.bottle(id(0)).unwrap().len(), CAPACITY);
        assert!(next.bottle(id(1)).unwrap().is_empty());
        assert!(next.is_winning_state());
        assert_buckets_consistent(&next);
    }

    #[test]
    fn test_apply_move_errors() {
        let s = state(&[&["a"], &["b"], &[]]);

        assert!(matches!(
            s.apply_move(id(0), id(1)),
            Err(PuzzleError::InvalidMove { .. })
        ));
        assert!(matches!(
            s.apply_move(id(0), id(0)),
            Err(PuzzleError::InvalidMove { .. })
        ));
        assert_eq!(
            s.apply_move(id(0), id(7)).unwrap_err(),
            PuzzleError::NotFound { id: id(7), slots: 3 }
        );
    }

    #[test]
    fn test_winning_state() {
        assert!(state(&[&["a", "a", "a", "a"], &["a", "a", "a", "a"], &[]]).is_winning_state());
        assert!(!state(&[&["a", "a", "a"], &["a"]]).is_winning_state());
        assert!(!state(&[&["a", "a", "b", "b"]]).is_winning_state());
    }

    #[test]
    fn test_terminal_state() {
        // No empty bottle and mismatched tops
        assert!(state(&[&["a", "b"], &["b", "a"]]).is_terminal_state());
        // An empty bottle next to a non-empty one always allows a pour
        assert!(!state(&[&["a", "b"], &[]]).is_terminal_state());
        // Same top color with room to spare
        assert!(!state(&[&["b", "a"], &["a"]]).is_terminal_state());
        // Same top color but the run does not fit
        assert!(state(&[&["b", "b", "b", "a"], &["b", "b", "a", "a"]]).is_terminal_state());
        // Two empty bottles still satisfy can_combine
        assert!(!state(&[&[], &[]]).is_terminal_state());
        assert!(state(&[&[]]).is_terminal_state());
    }

    #[test]
    fn test_canonical_key_ignores_input_order() {
        let first = state(&[&["a", "b"], &["b", "a"], &[], &["a"]]);
        let second = state(&[&["a"], &[], &["b", "a"], &["a", "b"]]);
        assert_eq!(first.canonical_key(), second.canonical_key());

        let different = state(&[&["a", "b"], &["a", "b"], &[], &["a"]]);
        assert_ne!(first.canonical_key(), different.canonical_key());
    }

    #[test]
    fn test_canonical_key_ignores_first_seen_color() {
        // "b" appears first in one input and second in the other
        let first = state(&[&["a"], &["b", "b"]]);
        let second = state(&[&["b", "b"], &["a"]]);
        assert_eq!(first.canonical_key(), second.canonical_key());
        assert_eq!(first.to_string(), second.to_string());

        let swapped = state(&[&["b"], &["a", "a"]]);
        assert_ne!(first.canonical_key(), swapped.canonical_key());
    }

    #[test]
    fn test_bottle_ids_past_u16_range() {
        let count = usize::from(u16::MAX) + 2;
        let s = State::from_bottles((0..count).map(|_| Bottle::empty()));

        assert_eq!(s.slot_count(), count);
        let last = id(count - 1);
        assert_eq!(last.index(), count - 1);
        assert!(s.bottle(last).unwrap().is_empty());
        assert_eq!(s.bucket(BucketKey::Empty).len(), count);
    }

    fn total_units(state: &State) -> usize {
        state.bottles().map(|(_, b)| b.len()).sum()
    }

    fn bottles_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
        prop::collection::vec(prop::collection::vec(0u8..3, 0..=CAPACITY), 2..6)
    }

    fn build(bottles: &[Vec<u8>]) -> State {
        State::from_bottles(
            bottles
                .iter()
                .map(|b| Bottle::new(b.iter().map(|&c| Color::new(c.into()))).unwrap()),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn prop_pours_conserve_units_and_capacity(
            bottles in bottles_strategy(),
            picks in prop::collection::vec((0usize..6, 0usize..6), 0..24),
        ) {
            let mut current = build(&bottles);
            let counts = current.color_counts();
            let units = total_units(&current);

            for (s, d) in picks {
                let slots = current.slot_count();
                let (source, destination) = (id(s % slots), id(d % slots));
                if source == destination {
                    continue;
                }
                let legal = current
                    .bottle(destination)
                    .unwrap()
                    .can_combine(current.bottle(source).unwrap());
                match current.apply_move(source, destination) {
                    Ok(next) => {
                        prop_assert!(legal);
                        current = next;
                    }
                    Err(err) => {
                        prop_assert!(!legal);
                        prop_assert!(matches!(err, PuzzleError::InvalidMove { .. }), "unexpected error");
                    }
                }
                prop_assert_eq!(&current.color_counts(), &counts);
                prop_assert_eq!(total_units(&current), units);
                prop_assert!(current.bottles().all(|(_, b)| b.len() <= CAPACITY));
                assert_buckets_consistent(&current);
            }
        }

        #[test]
        fn prop_canonical_key_stable_under_shuffle(
            bottles in bottles_strategy(),
            rotate in 0usize..6,
        ) {
            let mut shuffled = bottles.clone();
            shuffled.reverse();
            let len = shuffled.len();
            shuffled.rotate_left(rotate % len);

            prop_assert_eq!(build(&bottles).canonical_key(), build(&shuffled).canonical_key());
        }
    }
}
