use std::{collections::BTreeSet, time::Duration};

use serde::{Deserialize, Serialize};

use crate::core::{BlockPoints, BoomPattern, Direction, Pivot};

use super::serde_duration;

/// Reason a [`BoardConfig`] was refused.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("board must be at least one cell wide and high")]
    EmptyBoard,
    #[display("retention factor {value} is outside [0, 1]")]
    InvalidRetention { value: f64 },
    #[display("wall gap chance {value} is outside [0, 1]")]
    InvalidGapChance { value: f64 },
    #[display("fall speedup {value} is outside (0, 1]")]
    InvalidSpeedup { value: f64 },
    #[display("{name} interval must be greater than zero")]
    ZeroInterval { name: &'static str },
    #[display("impact damage threshold must be at least one row")]
    ZeroImpactRows,
    #[display("no piece is enabled")]
    NoEnabledPieces,
    #[display("piece #{index} has no cells")]
    EmptyPiece { index: usize },
    #[display("piece #{index} has a cell with a negative coordinate")]
    NegativeCell { index: usize },
    #[display("piece #{index} has a pivot outside its bounding box or off the half-cell grid")]
    InvalidPivot { index: usize },
    #[display("piece #{index} is not a single edge-connected shape")]
    DisconnectedPiece { index: usize },
    #[display("piece #{index} has a negative or non-finite weight")]
    InvalidWeight { index: usize },
    #[display("piece #{index} marks a boom cell that does not exist")]
    BoomCellOutOfRange { index: usize },
    #[display("piece #{index} does not fit in the spawn area")]
    PieceTooLarge { index: usize },
    #[display("wall band of {rows} rows does not fit in {buffer_rows} buffer rows")]
    WallDoesNotFit { rows: u16, buffer_rows: u16 },
    #[display("breakthrough zone lies outside the board")]
    ZoneOutsideBoard,
}

/// Time each unit of work takes while the session is advanced by wall-clock
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Delay before the next piece appears. May be zero.
    #[serde(with = "serde_duration")]
    pub spawn_delay: Duration,
    /// Gravity interval of the active piece at level zero.
    #[serde(with = "serde_duration")]
    pub fall_interval: Duration,
    /// Interval between settle steps.
    #[serde(with = "serde_duration")]
    pub settle_interval: Duration,
    #[serde(with = "serde_duration")]
    pub cascade_frame_interval: Duration,
    #[serde(with = "serde_duration")]
    pub wall_row_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            spawn_delay: Duration::from_millis(200),
            fall_interval: Duration::from_millis(600),
            settle_interval: Duration::from_millis(50),
            cascade_frame_interval: Duration::from_millis(80),
            wall_row_interval: Duration::from_millis(40),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    pub plain: u64,
    pub wall: u64,
    pub boom: u64,
    /// Base award for clearing the breakthrough zone, multiplied by
    /// `level + 1`.
    pub breakthrough: u64,
}

impl Default for ScoreTable {
    fn default() -> Self {
        let BlockPoints { plain, wall, boom } = BlockPoints::default();
        Self {
            plain,
            wall,
            boom,
            breakthrough: 1000,
        }
    }
}

impl ScoreTable {
    #[must_use]
    pub const fn block_points(&self) -> BlockPoints {
        BlockPoints {
            plain: self.plain,
            wall: self.wall,
            boom: self.boom,
        }
    }
}

/// How the game hardens with each breakthrough.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Factor applied to the fall interval once per level.
    pub fall_speedup: f64,
    #[serde(with = "serde_duration")]
    pub min_fall_interval: Duration,
    /// Levels needed for wall blocks to gain one extra health point. Zero
    /// keeps wall health constant.
    pub wall_health_every: u32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            fall_speedup: 0.9,
            min_fall_interval: Duration::from_millis(100),
            wall_health_every: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    /// Rows generated per wall band, counted down from the top of the buffer.
    pub rows: u16,
    pub base_health: u32,
    /// Probability that a wall cell is left empty.
    pub gap_chance: f64,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            base_health: 1,
            gap_chance: 0.1,
        }
    }
}

/// Band of rows that must be cleared for a breakthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakthroughZone {
    pub bottom_row: u16,
    pub rows: u16,
}

impl Default for BreakthroughZone {
    fn default() -> Self {
        Self {
            bottom_row: 8,
            rows: 8,
        }
    }
}

/// Boom block carried by a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoomCell {
    /// Index into [`PieceShape::cells`].
    pub cell: usize,
    pub pattern: BoomPattern,
    #[serde(default)]
    pub facing: Direction,
}

/// Shape table entry for one piece kind.
///
/// Cells are offsets from the bottom-left corner of the shape's bounding box.
/// The pivot is expressed in half cells relative to the same corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceShape {
    pub name: String,
    pub cells: Vec<(i32, i32)>,
    pub pivot: Pivot,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Relative initial draw weight among enabled pieces.
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boom: Option<BoomCell>,
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

impl PieceShape {
    #[must_use]
    pub fn new(name: &str, cells: &[(i32, i32)], pivot: Pivot) -> Self {
        Self {
            name: name.to_owned(),
            cells: cells.to_vec(),
            pivot,
            enabled: true,
            weight: 1.0,
            boom: None,
        }
    }

    #[must_use]
    pub fn with_boom(mut self, cell: usize, pattern: BoomPattern, facing: Direction) -> Self {
        self.boom = Some(BoomCell {
            cell,
            pattern,
            facing,
        });
        self
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Bounding box size as `(width, height)`.
    #[must_use]
    pub fn size(&self) -> (i32, i32) {
        let width = self.cells.iter().map(|&(x, _)| x + 1).max().unwrap_or(0);
        let height = self.cells.iter().map(|&(_, y)| y + 1).max().unwrap_or(0);
        (width, height)
    }

    /// The seven tetrominoes.
    #[must_use]
    pub fn tetrominoes() -> Vec<Self> {
        let center = Pivot::new(3, 1);
        vec![
            Self::new("I", &[(0, 0), (1, 0), (2, 0), (3, 0)], center),
            Self::new("O", &[(0, 0), (1, 0), (0, 1), (1, 1)], Pivot::new(2, 2)),
            Self::new("T", &[(0, 0), (1, 0), (2, 0), (1, 1)], center),
            Self::new("S", &[(0, 0), (1, 0), (1, 1), (2, 1)], center),
            Self::new("Z", &[(1, 0), (2, 0), (0, 1), (1, 1)], center),
            Self::new("J", &[(0, 0), (1, 0), (2, 0), (0, 1)], center),
            Self::new("L", &[(0, 0), (1, 0), (2, 0), (2, 1)], center),
        ]
    }

    /// Pieces carrying a boom block.
    #[must_use]
    pub fn boom_pieces() -> Vec<Self> {
        let center = Pivot::new(3, 1);
        vec![
            Self::new("bomb", &[(0, 0)], Pivot::new(1, 1))
                .with_boom(0, BoomPattern::Surround { radius: 2 }, Direction::Up)
                .with_weight(0.5),
            Self::new("T-boom", &[(0, 0), (1, 0), (2, 0), (1, 1)], center)
                .with_boom(1, BoomPattern::Surround { radius: 1 }, Direction::Up)
                .with_weight(0.5),
            Self::new("I-boom", &[(0, 0), (1, 0), (2, 0), (3, 0)], center)
                .with_boom(3, BoomPattern::Line { range: 5 }, Direction::Right)
                .with_weight(0.5),
            Self::new("L-cone", &[(0, 0), (1, 0), (2, 0), (2, 1)], center)
                .with_boom(0, BoomPattern::Cone { range: 3 }, Direction::Down)
                .with_weight(0.5),
        ]
    }
}

/// Everything a [`GameSession`](super::GameSession) needs to know up front.
///
/// Loaded from JSON by the command line; every field falls back to its
/// default when missing.
///
/// # Example
///
/// ```
/// use boomfall_engine::BoardConfig;
///
/// let config: BoardConfig = serde_json::from_str(r#"{ "width": 8, "retention": 0.25 }"#).unwrap();
/// assert_eq!(config.width, 8);
/// assert_eq!(config.height, BoardConfig::default().height);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub width: u16,
    /// Rows of the nominal board.
    pub height: u16,
    /// Rows above the nominal board where pieces spawn and walls are built.
    pub buffer_rows: u16,
    /// Build a wall band before the first piece.
    pub initial_wall: bool,
    pub timing: Timing,
    pub score: ScoreTable,
    pub difficulty: DifficultyConfig,
    pub wall: WallConfig,
    pub breakthrough: BreakthroughZone,
    /// Share of its weight a piece keeps after being drawn.
    pub retention: f64,
    /// Minimum fall, in rows, for a landing group to damage what it lands on.
    /// `None` disables impact damage.
    pub impact_damage_rows: Option<u32>,
    pub pieces: Vec<PieceShape>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        let mut pieces = PieceShape::tetrominoes();
        pieces.extend(PieceShape::boom_pieces());
        Self {
            width: 10,
            height: 16,
            buffer_rows: 10,
            initial_wall: true,
            timing: Timing::default(),
            score: ScoreTable::default(),
            difficulty: DifficultyConfig::default(),
            wall: WallConfig::default(),
            breakthrough: BreakthroughZone::default(),
            retention: 0.5,
            impact_damage_rows: Some(4),
            pieces,
        }
    }
}

impl BoardConfig {
    /// Height of the grid including the buffer rows.
    #[must_use]
    pub fn total_height(&self) -> u16 {
        self.height.saturating_add(self.buffer_rows)
    }

    /// Gravity interval of the active piece at `level`.
    #[must_use]
    pub fn fall_interval(&self, level: u32) -> Duration {
        let exponent = i32::try_from(level).unwrap_or(i32::MAX);
        let factor = self.difficulty.fall_speedup.powi(exponent);
        self.timing
            .fall_interval
            .mul_f64(factor)
            .max(self.difficulty.min_fall_interval)
    }

    /// Health of a wall block generated at `level`.
    #[must_use]
    pub fn wall_health(&self, level: u32) -> u32 {
        let bonus = level
            .checked_div(self.difficulty.wall_health_every)
            .unwrap_or(0);
        self.wall.base_health.max(1).saturating_add(bonus)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyBoard);
        }
        if !(0.0..=1.0).contains(&self.retention) {
            return Err(ConfigError::InvalidRetention {
                value: self.retention,
            });
        }
        if !(0.0..=1.0).contains(&self.wall.gap_chance) {
            return Err(ConfigError::InvalidGapChance {
                value: self.wall.gap_chance,
            });
        }
        let speedup = self.difficulty.fall_speedup;
        if !(speedup > 0.0 && speedup <= 1.0) {
            return Err(ConfigError::InvalidSpeedup { value: speedup });
        }
        self.validate_timing()?;
        if self.impact_damage_rows == Some(0) {
            return Err(ConfigError::ZeroImpactRows);
        }
        if self.wall.rows > self.buffer_rows {
            return Err(ConfigError::WallDoesNotFit {
                rows: self.wall.rows,
                buffer_rows: self.buffer_rows,
            });
        }
        let zone = self.breakthrough;
        if zone.rows == 0 || u32::from(zone.bottom_row) + u32::from(zone.rows) > u32::from(self.height)
        {
            return Err(ConfigError::ZoneOutsideBoard);
        }
        self.validate_pieces()
    }

    fn validate_timing(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("fall", self.timing.fall_interval),
            ("minimum fall", self.difficulty.min_fall_interval),
            ("settle", self.timing.settle_interval),
            ("cascade frame", self.timing.cascade_frame_interval),
            ("wall row", self.timing.wall_row_interval),
        ];
        match intervals.iter().find(|(_, interval)| interval.is_zero()) {
            Some(&(name, _)) => Err(ConfigError::ZeroInterval { name }),
            None => Ok(()),
        }
    }

    fn validate_pieces(&self) -> Result<(), ConfigError> {
        let width = i32::from(self.width);
        let buffer = i32::from(self.buffer_rows);
        for (index, piece) in self.pieces.iter().enumerate() {
            if piece.cells.is_empty() {
                return Err(ConfigError::EmptyPiece { index });
            }
            if piece.cells.iter().any(|&(x, y)| x < 0 || y < 0) {
                return Err(ConfigError::NegativeCell { index });
            }
            if piece.cells.iter().any(|&(x, y)| x >= width || y >= buffer) {
                return Err(ConfigError::PieceTooLarge { index });
            }
            if !is_connected(&piece.cells) {
                return Err(ConfigError::DisconnectedPiece { index });
            }
            let (w, h) = piece.size();
            let pivot = piece.pivot;
            let in_box = (0..=2 * w).contains(&pivot.x2) && (0..=2 * h).contains(&pivot.y2);
            if !in_box || !pivot.is_valid() {
                return Err(ConfigError::InvalidPivot { index });
            }
            if !piece.weight.is_finite() || piece.weight < 0.0 {
                return Err(ConfigError::InvalidWeight { index });
            }
            if piece.boom.is_some_and(|boom| boom.cell >= piece.cells.len()) {
                return Err(ConfigError::BoomCellOutOfRange { index });
            }
        }
        if !self.pieces.iter().any(|p| p.enabled && p.weight > 0.0) {
            return Err(ConfigError::NoEnabledPieces);
        }
        Ok(())
    }
}

/// Whether `cells` form one shape through shared edges.
fn is_connected(cells: &[(i32, i32)]) -> bool {
    let cells: BTreeSet<_> = cells.iter().copied().collect();
    let Some(&start) = cells.first() else {
        return false;
    };
    let mut seen = BTreeSet::from([start]);
    let mut stack = vec![start];
    while let Some((x, y)) = stack.pop() {
        for next in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
            if cells.contains(&next) && seen.insert(next) {
                stack.push(next);
            }
        }
    }
    seen.len() == cells.len()
}
