use serde::{Deserialize, Serialize};

use super::{
    group::GroupId,
    position::{Direction, Position},
};

/// Identifier of a live block.
///
/// Identifiers are never reused within a board.
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
#[display("block#{_0}")]
pub struct BlockId(pub(crate) u32);

/// Explosion shape of a boom block.
///
/// Every pattern contains its own origin, so the trigger cell of a cascade is
/// always within range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoomPattern {
    /// Straight line along the block's facing axis, both ways.
    #[display("line({range})")]
    Line { range: u32 },
    /// Disc of the given Euclidean radius.
    #[display("surround({radius})")]
    Surround { radius: u32 },
    /// Cone opening in the facing direction; the lateral offset never exceeds
    /// the forward distance.
    #[display("cone({range})")]
    Cone { range: u32 },
}

impl BoomPattern {
    /// Returns whether `candidate` is reached by an explosion at `origin`
    /// facing `facing`.
    #[must_use]
    pub fn is_within_range(self, origin: Position, facing: Direction, candidate: Position) -> bool {
        let dx = i64::from(candidate.x) - i64::from(origin.x);
        let dy = i64::from(candidate.y) - i64::from(origin.y);
        match self {
            BoomPattern::Line { range } => {
                let range = i64::from(range);
                if facing.is_horizontal() {
                    dy == 0 && dx.abs() <= range
                } else {
                    dx == 0 && dy.abs() <= range
                }
            }
            BoomPattern::Surround { radius } => {
                let radius = i64::from(radius);
                dx * dx + dy * dy <= radius * radius
            }
            BoomPattern::Cone { range } => {
                let (fx, fy) = facing.delta();
                let forward = dx * i64::from(fx) + dy * i64::from(fy);
                let lateral = (dx * i64::from(fy) - dy * i64::from(fx)).abs();
                (0..=i64::from(range)).contains(&forward) && lateral <= forward
            }
        }
    }
}

/// Kind of a block together with its kind-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display, derive_more::IsVariant)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKind {
    #[display("plain")]
    Plain,
    /// Generated wall material; the crack stage counts survived hits.
    #[display("wall")]
    Wall { crack_stage: u8 },
    #[display("boom[{_0}]")]
    Boom(BoomPattern),
}

impl BlockKind {
    #[must_use]
    pub const fn wall() -> Self {
        BlockKind::Wall { crack_stage: 0 }
    }

    #[must_use]
    pub const fn boom_pattern(self) -> Option<BoomPattern> {
        match self {
            BlockKind::Boom(pattern) => Some(pattern),
            BlockKind::Plain | BlockKind::Wall { .. } => None,
        }
    }
}

/// Points awarded when a block of each kind is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockPoints {
    pub plain: u64,
    pub wall: u64,
    pub boom: u64,
}

impl Default for BlockPoints {
    fn default() -> Self {
        Self {
            plain: 10,
            wall: 25,
            boom: 5,
        }
    }
}

impl BlockPoints {
    #[must_use]
    pub const fn for_kind(&self, kind: BlockKind) -> u64 {
        match kind {
            BlockKind::Plain => self.plain,
            BlockKind::Wall { .. } => self.wall,
            BlockKind::Boom(_) => self.boom,
        }
    }
}

/// Description of a block to be created on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewBlock {
    pub position: Position,
    pub kind: BlockKind,
    pub health: u32,
    pub facing: Direction,
}

/// A single occupied cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    position: Position,
    health: u32,
    facing: Direction,
    group: GroupId,
    kind: BlockKind,
}

impl Block {
    pub(crate) fn new(id: BlockId, group: GroupId, desc: NewBlock) -> Self {
        Self {
            id,
            position: desc.position,
            health: desc.health,
            facing: desc.facing,
            group,
            kind: desc.kind,
        }
    }

    #[must_use]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn health(&self) -> u32 {
        self.health
    }

    #[must_use]
    pub fn facing(&self) -> Direction {
        self.facing
    }

    #[must_use]
    pub fn group(&self) -> GroupId {
        self.group
    }

    #[must_use]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub(crate) fn set_facing(&mut self, facing: Direction) {
        self.facing = facing;
    }

    pub(crate) fn set_group(&mut self, group: GroupId) {
        self.group = group;
    }

    /// Applies damage and returns the remaining health.
    ///
    /// Walls that survive a hit advance their crack stage.
    pub(crate) fn take_damage(&mut self, amount: u32) -> u32 {
        self.health = self.health.saturating_sub(amount);
        if self.health > 0 {
            if let BlockKind::Wall { crack_stage } = &mut self.kind {
                *crack_stage = crack_stage.saturating_add(1);
            }
        }
        self.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Position {
        Position::new(5, 5)
    }

    #[test]
    fn test_surround_is_euclidean_disc() {
        let pattern = BoomPattern::Surround { radius: 1 };
        assert!(pattern.is_within_range(origin(), Direction::Up, origin()));
        assert!(pattern.is_within_range(origin(), Direction::Up, Position::new(5, 6)));
        assert!(pattern.is_within_range(origin(), Direction::Up, Position::new(4, 5)));
        assert!(!pattern.is_within_range(origin(), Direction::Up, Position::new(6, 6)));

        let pattern = BoomPattern::Surround { radius: 2 };
        assert!(pattern.is_within_range(origin(), Direction::Up, Position::new(6, 6)));
        assert!(!pattern.is_within_range(origin(), Direction::Up, Position::new(7, 6)));
    }

    #[test]
    fn test_line_follows_facing_axis() {
        let pattern = BoomPattern::Line { range: 3 };
        assert!(pattern.is_within_range(origin(), Direction::Right, Position::new(2, 5)));
        assert!(pattern.is_within_range(origin(), Direction::Left, Position::new(8, 5)));
        assert!(!pattern.is_within_range(origin(), Direction::Right, Position::new(9, 5)));
        assert!(!pattern.is_within_range(origin(), Direction::Right, Position::new(5, 6)));
        assert!(pattern.is_within_range(origin(), Direction::Down, Position::new(5, 8)));
        assert!(!pattern.is_within_range(origin(), Direction::Down, Position::new(6, 5)));
    }

    #[test]
    fn test_cone_opens_forward() {
        let pattern = BoomPattern::Cone { range: 2 };
        let facing = Direction::Down;
        assert!(pattern.is_within_range(origin(), facing, origin()));
        assert!(pattern.is_within_range(origin(), facing, Position::new(5, 4)));
        assert!(pattern.is_within_range(origin(), facing, Position::new(4, 4)));
        assert!(pattern.is_within_range(origin(), facing, Position::new(7, 3)));
        assert!(!pattern.is_within_range(origin(), facing, Position::new(5, 6)));
        assert!(!pattern.is_within_range(origin(), facing, Position::new(6, 5)));
        assert!(!pattern.is_within_range(origin(), facing, Position::new(5, 2)));

        let facing = Direction::Right;
        assert!(pattern.is_within_range(origin(), facing, Position::new(7, 6)));
        assert!(!pattern.is_within_range(origin(), facing, Position::new(4, 5)));
    }

    #[test]
    fn test_wall_cracks_when_surviving() {
        let desc = NewBlock {
            position: origin(),
            kind: BlockKind::wall(),
            health: 3,
            facing: Direction::Up,
        };
        let mut block = Block::new(BlockId(0), GroupId(0), desc);
        assert_eq!(block.take_damage(1), 2);
        assert_eq!(block.kind(), BlockKind::Wall { crack_stage: 1 });
        assert_eq!(block.take_damage(5), 0);
        assert_eq!(block.kind(), BlockKind::Wall { crack_stage: 1 });
    }

    #[test]
    fn test_block_kind_serialization() {
        let kind = BlockKind::Boom(BoomPattern::Cone { range: 3 });
        let json = serde_json::to_string(&kind).unwrap();
        let back: BlockKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
        assert_eq!(kind.to_string(), "boom[cone(3)]");
    }
}
