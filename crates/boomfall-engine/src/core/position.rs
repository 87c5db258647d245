use serde::{Deserialize, Serialize};

/// Integer cell coordinate.
///
/// `(0, 0)` is the bottom-left cell; `x` grows rightward and `y` grows upward,
/// so gravity moves blocks toward smaller `y`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("({x}, {y})")]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Returns the adjacent cell in the given direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    /// Returns the four cardinal neighbors in [`Direction::ALL`] order.
    #[must_use]
    pub const fn neighbors(self) -> [Self; 4] {
        [
            self.step(Direction::Up),
            self.step(Direction::Right),
            self.step(Direction::Down),
            self.step(Direction::Left),
        ]
    }

    /// Rotates the cell a quarter turn about `pivot`.
    ///
    /// The rotation is exact for every valid pivot (cell centers and cell
    /// corners), see [`Pivot`].
    #[must_use]
    pub fn rotated_about(self, pivot: Pivot, rotation: Rotation) -> Self {
        let rx = 2 * self.x + 1 - pivot.x2;
        let ry = 2 * self.y + 1 - pivot.y2;
        let (rx, ry) = rotation.apply(rx, ry);
        Self::new(
            (pivot.x2 + rx - 1).div_euclid(2),
            (pivot.y2 + ry - 1).div_euclid(2),
        )
    }
}

/// Rotation center of a group, in half-cell units.
///
/// The center of cell `(x, y)` is `(2x + 1, 2y + 1)`; its bottom-left corner is
/// `(2x, 2y)`. A pivot must have both coordinates odd (a cell center) or both
/// even (a cell corner) for quarter turns to map cells onto cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pivot {
    pub x2: i32,
    pub y2: i32,
}

impl Pivot {
    #[must_use]
    pub const fn new(x2: i32, y2: i32) -> Self {
        Self { x2, y2 }
    }

    #[must_use]
    pub const fn cell_center(position: Position) -> Self {
        Self::new(2 * position.x + 1, 2 * position.y + 1)
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.x2.rem_euclid(2) == self.y2.rem_euclid(2)
    }

    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x2 + 2 * dx, self.y2 + 2 * dy)
    }
}

/// Facing of a block.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    #[display("up")]
    Up,
    #[display("right")]
    Right,
    #[display("down")]
    Down,
    #[display("left")]
    Left,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::Right => (1, 0),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
        }
    }

    #[must_use]
    pub const fn rotated(self, rotation: Rotation) -> Self {
        match (self, rotation) {
            (Self::Up, Rotation::Clockwise) | (Self::Down, Rotation::CounterClockwise) => {
                Self::Right
            }
            (Self::Right, Rotation::Clockwise) | (Self::Left, Rotation::CounterClockwise) => {
                Self::Down
            }
            (Self::Down, Rotation::Clockwise) | (Self::Up, Rotation::CounterClockwise) => {
                Self::Left
            }
            (Self::Left, Rotation::Clockwise) | (Self::Right, Rotation::CounterClockwise) => {
                Self::Up
            }
        }
    }

    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

/// A quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Rotates a vector a quarter turn (y axis pointing up).
    const fn apply(self, x: i32, y: i32) -> (i32, i32) {
        match self {
            Self::Clockwise => (y, -x),
            Self::CounterClockwise => (-y, x),
        }
    }

    /// Quarter-turn delta in the range `0..4`, clockwise positive.
    #[must_use]
    pub const fn quarter_turns(self) -> u8 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => 3,
        }
    }
}

/// Player-requested translation of the active piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Left,
    Right,
    Down,
}

impl MoveDirection {
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Left => Direction::Left.delta(),
            Self::Right => Direction::Right.delta(),
            Self::Down => Direction::Down.delta(),
        }
    }
}
