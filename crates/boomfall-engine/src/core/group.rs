use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{
    block::BlockId,
    position::{Pivot, Position, Rotation},
};

/// Identifier of a live block group.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("group#{_0}")]
pub struct GroupId(pub(crate) u32);

/// Role of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::IsVariant)]
pub enum GroupKind {
    /// The piece currently under player control. Always dissolves when merged.
    Piece,
    /// Landed material, moved only by gravity.
    Settled,
}

/// A set of blocks that move and rotate as one unit.
///
/// Membership is owned by [`Board`](super::board::Board), which keeps every
/// block in exactly one group and drops a group the moment it becomes empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGroup {
    id: GroupId,
    kind: GroupKind,
    members: BTreeSet<BlockId>,
    anchor: Position,
    pivot: Pivot,
    quarter_turns: u8,
    modified: bool,
    fall_distance: u32,
}

impl BlockGroup {
    pub(crate) fn new(id: GroupId, kind: GroupKind, anchor: Position, pivot: Pivot) -> Self {
        Self {
            id,
            kind,
            members: BTreeSet::new(),
            anchor,
            pivot,
            quarter_turns: 0,
            modified: false,
            fall_distance: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    #[must_use]
    pub fn is_piece(&self) -> bool {
        self.kind.is_piece()
    }

    pub fn members(&self) -> impl ExactSizeIterator<Item = BlockId> + '_ {
        self.members.iter().copied()
    }

    #[must_use]
    pub fn contains(&self, block: BlockId) -> bool {
        self.members.contains(&block)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Translation target: where the group's reference cell currently is.
    #[must_use]
    pub fn anchor(&self) -> Position {
        self.anchor
    }

    #[must_use]
    pub fn pivot(&self) -> Pivot {
        self.pivot
    }

    /// Accumulated rotation in quarter turns (`0..4`, clockwise).
    #[must_use]
    pub fn quarter_turns(&self) -> u8 {
        self.quarter_turns
    }

    /// Whether the group lost members since the last reconciliation pass.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Rows fallen since the group last came to rest.
    #[must_use]
    pub fn fall_distance(&self) -> u32 {
        self.fall_distance
    }

    pub(crate) fn insert(&mut self, block: BlockId) {
        self.members.insert(block);
    }

    pub(crate) fn remove(&mut self, block: BlockId) -> bool {
        self.members.remove(&block)
    }

    pub(crate) fn set_kind(&mut self, kind: GroupKind) {
        self.kind = kind;
    }

    pub(crate) fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    pub(crate) fn translate(&mut self, dx: i32, dy: i32) {
        self.anchor = self.anchor.offset(dx, dy);
        self.pivot = self.pivot.offset(dx, dy);
    }

    pub(crate) fn rotate(&mut self, rotation: Rotation) {
        self.anchor = self.anchor.rotated_about(self.pivot, rotation);
        self.quarter_turns = (self.quarter_turns + rotation.quarter_turns()) % 4;
    }

    pub(crate) fn add_fall(&mut self) {
        self.fall_distance += 1;
    }

    pub(crate) fn take_fall_distance(&mut self) -> u32 {
        std::mem::take(&mut self.fall_distance)
    }
}
