use std::collections::{BTreeMap, BTreeSet};

use arrayvec::ArrayVec;

use crate::{MoveRejected, SpawnBlockedError};

use super::{
    block::{Block, BlockId, BlockPoints, NewBlock},
    event::BoardEvent,
    grid::GridStore,
    group::{BlockGroup, GroupId, GroupKind},
    position::{Direction, Pivot, Position, Rotation},
};

/// Broken invariant found by [`Board::check_consistency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ConsistencyError {
    #[display("{block} is not recorded at {position}")]
    GridMismatch { block: BlockId, position: Position },
    #[display("cell {position} refers to missing {block}")]
    DanglingCell { position: Position, block: BlockId },
    #[display("{block} refers to missing {group}")]
    MissingGroup { block: BlockId, group: GroupId },
    #[display("{block} is not a member of {group}")]
    NotAMember { block: BlockId, group: GroupId },
    #[display("{group} lists {block} which it does not own")]
    ForeignMember { group: GroupId, block: BlockId },
    #[display("{group} has no members")]
    EmptyGroup { group: GroupId },
}

/// Outcome of one gravity step over every settled group.
#[derive(Debug, Clone, Default)]
pub struct SettleStep {
    /// Groups that moved down one row.
    pub moved: Vec<GroupId>,
    /// Blocks destroyed by landing impacts.
    pub destroyed: Vec<Block>,
}

/// Cell grid together with the blocks and groups occupying it.
///
/// The board is the only owner of blocks and groups. It keeps three facts in
/// step at all times:
///
/// - every live block is recorded in the grid at its position,
/// - every live block is a member of exactly one live group,
/// - no live group is empty.
///
/// # Example
///
/// ```
/// use boomfall_engine::{Board, BlockKind, Direction, GroupKind, NewBlock, Pivot, Position};
///
/// let mut board = Board::new(4, 4);
/// let block = |x, y| NewBlock {
///     position: Position::new(x, y),
///     kind: BlockKind::Plain,
///     health: 1,
///     facing: Direction::Up,
/// };
/// let a = board.add_group(GroupKind::Settled, Pivot::default(), &[block(0, 0)]).unwrap();
/// let b = board.add_group(GroupKind::Settled, Pivot::default(), &[block(1, 0)]).unwrap();
///
/// board.reconcile();
/// assert_eq!(board.group_at(Position::new(0, 0)), board.group_at(Position::new(1, 0)));
/// assert_eq!(board.group_count(), 1);
/// # let _ = (a, b);
/// ```
#[derive(Debug, Clone)]
pub struct Board {
    grid: GridStore,
    blocks: BTreeMap<BlockId, Block>,
    groups: BTreeMap<GroupId, BlockGroup>,
    points: BlockPoints,
    next_block: u32,
    next_group: u32,
    events: Vec<BoardEvent>,
}

impl Board {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            grid: GridStore::new(width, height),
            blocks: BTreeMap::new(),
            groups: BTreeMap::new(),
            points: BlockPoints::default(),
            next_block: 0,
            next_group: 0,
            events: vec![],
        }
    }

    #[must_use]
    pub fn with_points(mut self, points: BlockPoints) -> Self {
        self.points = points;
        self
    }

    #[must_use]
    pub fn grid(&self) -> &GridStore {
        &self.grid
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.grid.width()
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.grid.height()
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    #[must_use]
    pub fn block_at(&self, position: Position) -> Option<&Block> {
        self.grid.get(position).and_then(|id| self.blocks.get(&id))
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&BlockGroup> {
        self.groups.get(&id)
    }

    #[must_use]
    pub fn group_at(&self, position: Position) -> Option<GroupId> {
        self.block_at(position).map(Block::group)
    }

    pub fn groups(&self) -> impl Iterator<Item = &BlockGroup> {
        self.groups.values()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns every event queued since the last call.
    pub fn take_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: BoardEvent) {
        self.events.push(event);
    }

    /// Creates a group holding the given blocks.
    ///
    /// Fails without touching the board when any cell is outside the grid,
    /// already occupied or listed twice, or when `blocks` is empty.
    pub fn add_group(
        &mut self,
        kind: GroupKind,
        pivot: Pivot,
        blocks: &[NewBlock],
    ) -> Result<GroupId, SpawnBlockedError> {
        let mut cells = BTreeSet::new();
        for desc in blocks {
            if !self.grid.is_in_bounds(desc.position)
                || self.grid.is_occupied(desc.position)
                || !cells.insert(desc.position)
            {
                return Err(SpawnBlockedError);
            }
        }
        let anchor = blocks.first().ok_or(SpawnBlockedError)?.position;
        let group = self.alloc_group(kind, anchor, pivot);
        for desc in blocks {
            self.insert_block(group, *desc);
        }
        Ok(group)
    }

    /// Creates a block in a fresh single-block settled group.
    pub fn add_block(&mut self, desc: NewBlock) -> Result<BlockId, SpawnBlockedError> {
        if !self.grid.is_in_bounds(desc.position) || self.grid.is_occupied(desc.position) {
            return Err(SpawnBlockedError);
        }
        let group = self.alloc_group(
            GroupKind::Settled,
            desc.position,
            Pivot::cell_center(desc.position),
        );
        Ok(self.insert_block(group, desc))
    }

    fn alloc_group(&mut self, kind: GroupKind, anchor: Position, pivot: Pivot) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group += 1;
        self.groups
            .insert(id, BlockGroup::new(id, kind, anchor, pivot));
        id
    }

    fn insert_block(&mut self, group: GroupId, desc: NewBlock) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.grid.set(desc.position, Some(id));
        self.blocks.insert(id, Block::new(id, group, desc));
        if let Some(group) = self.groups.get_mut(&group) {
            group.insert(id);
        }
        id
    }

    /// Hands a group over to gravity.
    pub fn settle_group(&mut self, id: GroupId) {
        if let Some(group) = self.groups.get_mut(&id) {
            group.set_kind(GroupKind::Settled);
        }
    }

    /// Computes the destination of every member; fails if any destination is
    /// outside the grid or held by a block of another group.
    fn plan_move<F>(
        &self,
        id: GroupId,
        destination: F,
    ) -> Result<Vec<(BlockId, Position, Direction)>, MoveRejected>
    where
        F: Fn(&Block) -> (Position, Direction),
    {
        let group = self.groups.get(&id).ok_or(MoveRejected)?;
        group
            .members()
            .map(|member| {
                let block = self.blocks.get(&member).ok_or(MoveRejected)?;
                let (position, facing) = destination(block);
                if !self.grid.is_in_bounds(position) {
                    return Err(MoveRejected);
                }
                match self.grid.get(position) {
                    Some(occupant) if !group.contains(occupant) => Err(MoveRejected),
                    _ => Ok((member, position, facing)),
                }
            })
            .collect()
    }

    fn apply_move(&mut self, plan: &[(BlockId, Position, Direction)]) {
        for (id, _, _) in plan {
            if let Some(block) = self.blocks.get(id) {
                self.grid.set(block.position(), None);
            }
        }
        for &(id, position, facing) in plan {
            self.grid.set(position, Some(id));
            if let Some(block) = self.blocks.get_mut(&id) {
                block.set_position(position);
                block.set_facing(facing);
            }
        }
    }

    #[must_use]
    pub fn can_translate(&self, id: GroupId, dx: i32, dy: i32) -> bool {
        self.plan_move(id, |b| (b.position().offset(dx, dy), b.facing()))
            .is_ok()
    }

    /// Moves every member of the group by `(dx, dy)`, or nothing at all.
    pub fn try_translate(&mut self, id: GroupId, dx: i32, dy: i32) -> Result<(), MoveRejected> {
        let plan = self.plan_move(id, |b| (b.position().offset(dx, dy), b.facing()))?;
        self.apply_move(&plan);
        if let Some(group) = self.groups.get_mut(&id) {
            group.translate(dx, dy);
        }
        Ok(())
    }

    /// Rotates every member a quarter turn about the group pivot, or nothing
    /// at all.
    pub fn try_rotate(&mut self, id: GroupId, rotation: Rotation) -> Result<(), MoveRejected> {
        let pivot = self.groups.get(&id).ok_or(MoveRejected)?.pivot();
        let plan = self.plan_move(id, |b| {
            (
                b.position().rotated_about(pivot, rotation),
                b.facing().rotated(rotation),
            )
        })?;
        self.apply_move(&plan);
        if let Some(group) = self.groups.get_mut(&id) {
            group.rotate(rotation);
        }
        Ok(())
    }

    /// Merges two groups and returns the surviving one.
    ///
    /// The smaller group is moved into the larger one; on equal sizes `b`
    /// moves into `a`. A piece group always dissolves, whatever its size.
    /// Merging a group with itself returns it untouched.
    pub fn merge_groups(&mut self, a: GroupId, b: GroupId) -> GroupId {
        if a == b {
            return a;
        }
        let (Some(group_a), Some(group_b)) = (self.groups.get(&a), self.groups.get(&b)) else {
            return if self.groups.contains_key(&a) { a } else { b };
        };
        let (into, from) = match (group_a.is_piece(), group_b.is_piece()) {
            (true, false) => (b, a),
            (false, true) => (a, b),
            _ if group_b.len() > group_a.len() => (b, a),
            _ => (a, b),
        };
        let Some(source) = self.groups.remove(&from) else {
            return into;
        };
        if let Some(target) = self.groups.get_mut(&into) {
            for member in source.members() {
                target.insert(member);
            }
            if source.is_modified() {
                target.set_modified(true);
            }
        }
        for member in source.members() {
            if let Some(block) = self.blocks.get_mut(&member) {
                block.set_group(into);
            }
        }
        self.events.push(BoardEvent::GroupsMerged {
            into,
            dissolved: from,
            transferred: source.len(),
        });
        into
    }

    fn transfer_block(&mut self, id: BlockId, to: GroupId) {
        let Some(block) = self.blocks.get_mut(&id) else {
            return;
        };
        let from = block.group();
        if from == to {
            return;
        }
        block.set_group(to);
        if let Some(target) = self.groups.get_mut(&to) {
            target.insert(id);
        }
        let emptied = self.groups.get_mut(&from).is_some_and(|source| {
            source.remove(id);
            source.is_empty()
        });
        if emptied {
            self.groups.remove(&from);
        }
    }

    /// Rebuilds the group partition so that cardinally adjacent blocks share
    /// a group.
    ///
    /// Groups that lost members since the previous pass may have been split,
    /// so they are never trusted as connected: their blocks are re-homed one
    /// cell at a time.
    pub fn reconcile(&mut self) {
        let cells: Vec<_> = self.grid.occupied().collect();
        for (position, id) in cells {
            let mut gathered = ArrayVec::<GroupId, 5>::new();
            for cell in std::iter::once(position).chain(position.neighbors()) {
                let Some(group) = self.group_at(cell) else {
                    continue;
                };
                let trusted = self.groups.get(&group).is_some_and(|g| !g.is_modified());
                if trusted && !gathered.contains(&group) {
                    gathered.push(group);
                }
            }
            let target = match gathered.split_first() {
                Some((&first, rest)) => rest
                    .iter()
                    .fold(first, |into, &other| self.merge_groups(into, other)),
                None => self.alloc_group(
                    GroupKind::Settled,
                    position,
                    Pivot::cell_center(position),
                ),
            };
            self.transfer_block(id, target);
        }
        for group in self.groups.values_mut() {
            group.set_modified(false);
        }
    }

    /// Removes a block: clears its cell, drops it from its group (dropping the
    /// group too when it empties) and awards its points.
    pub fn destroy_block(&mut self, id: BlockId) -> Option<Block> {
        let block = self.blocks.remove(&id)?;
        self.grid.set(block.position(), None);
        let group = block.group();
        let emptied = self.groups.get_mut(&group).is_some_and(|g| {
            g.remove(id);
            g.set_modified(true);
            g.is_empty()
        });
        if emptied {
            self.groups.remove(&group);
        }
        self.events.push(BoardEvent::BlockDestroyed {
            block: id,
            position: block.position(),
            kind: block.kind(),
            points: self.points.for_kind(block.kind()),
        });
        Some(block)
    }

    /// Damages a block and destroys it when its health reaches zero.
    ///
    /// Returns the destroyed block, if any.
    pub fn damage_block(&mut self, id: BlockId, amount: u32) -> Option<Block> {
        let block = self.blocks.get_mut(&id)?;
        let position = block.position();
        let health = block.take_damage(amount);
        if health == 0 {
            return self.destroy_block(id);
        }
        self.events.push(BoardEvent::BlockDamaged {
            block: id,
            position,
            health,
        });
        None
    }

    fn lowest_row(&self, group: &BlockGroup) -> i32 {
        group
            .members()
            .filter_map(|id| self.blocks.get(&id))
            .map(|b| b.position().y)
            .min()
            .unwrap_or(i32::MAX)
    }

    /// Foreign blocks directly under the members of `id`.
    fn blocks_beneath(&self, id: GroupId) -> BTreeSet<BlockId> {
        let Some(group) = self.groups.get(&id) else {
            return BTreeSet::new();
        };
        group
            .members()
            .filter_map(|member| self.blocks.get(&member))
            .filter_map(|b| self.grid.get(b.position().step(Direction::Down)))
            .filter(|below| !group.contains(*below))
            .collect()
    }

    /// Moves every settled group down one row where possible.
    ///
    /// Groups are processed lowest first so a stack of groups falls together.
    /// A group that comes to rest after falling at least `impact_rows` rows
    /// deals one point of damage to each foreign block beneath it.
    pub fn settle_step(&mut self, impact_rows: Option<u32>) -> SettleStep {
        let mut order: Vec<_> = self
            .groups
            .values()
            .filter(|g| !g.is_piece())
            .map(|g| (self.lowest_row(g), g.id()))
            .collect();
        order.sort_unstable();

        let mut step = SettleStep::default();
        for (_, id) in order {
            if !self.groups.contains_key(&id) {
                continue;
            }
            if self.try_translate(id, 0, -1).is_ok() {
                if let Some(group) = self.groups.get_mut(&id) {
                    group.add_fall();
                }
                step.moved.push(id);
                continue;
            }
            let fallen = self
                .groups
                .get_mut(&id)
                .map_or(0, BlockGroup::take_fall_distance);
            if impact_rows.is_some_and(|rows| fallen >= rows) {
                for below in self.blocks_beneath(id) {
                    step.destroyed.extend(self.damage_block(below, 1));
                }
            }
        }
        step
    }

    /// Selects the boom blocks among `candidates` that touch another block,
    /// whichever group it belongs to.
    pub fn armed_booms<I>(&self, candidates: I) -> Vec<BlockId>
    where
        I: IntoIterator<Item = BlockId>,
    {
        candidates
            .into_iter()
            .filter(|id| {
                self.blocks.get(id).is_some_and(|block| {
                    block.kind().is_boom()
                        && block
                            .position()
                            .neighbors()
                            .into_iter()
                            .any(|cell| self.grid.is_occupied(cell))
                })
            })
            .collect()
    }

    /// Pairs of horizontally or vertically adjacent occupied cells owned by
    /// different groups. Empty right after [`Board::reconcile`].
    pub fn unreconciled_pairs(&self) -> impl Iterator<Item = (Position, Position)> + '_ {
        self.grid.occupied().flat_map(move |(position, _)| {
            let group = self.group_at(position);
            [position.step(Direction::Right), position.step(Direction::Up)]
                .into_iter()
                .filter_map(move |other| {
                    let other_group = self.group_at(other)?;
                    (Some(other_group) != group).then_some((position, other))
                })
        })
    }

    /// Verifies the grid/block/group bookkeeping.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        for (position, id) in self.grid.occupied() {
            if !self.blocks.contains_key(&id) {
                return Err(ConsistencyError::DanglingCell { position, block: id });
            }
        }
        for block in self.blocks.values() {
            let (id, position, group) = (block.id(), block.position(), block.group());
            if self.grid.get(position) != Some(id) {
                return Err(ConsistencyError::GridMismatch { block: id, position });
            }
            let owner = self
                .groups
                .get(&group)
                .ok_or(ConsistencyError::MissingGroup { block: id, group })?;
            if !owner.contains(id) {
                return Err(ConsistencyError::NotAMember { block: id, group });
            }
        }
        for group in self.groups.values() {
            if group.is_empty() {
                return Err(ConsistencyError::EmptyGroup { group: group.id() });
            }
            for member in group.members() {
                if self.blocks.get(&member).map(Block::group) != Some(group.id()) {
                    return Err(ConsistencyError::ForeignMember {
                        group: group.id(),
                        block: member,
                    });
                }
            }
        }
        Ok(())
    }
}
