use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::{
    block::{Block, BlockId, BoomPattern},
    board::Board,
    event::BoardEvent,
    grid::GridStore,
    position::{Direction, Position},
};

/// A boom explosion waiting to be played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detonation {
    pub origin: Position,
    pub facing: Direction,
    pub pattern: BoomPattern,
    /// Boom block that set the explosion off, if it is still on the board.
    pub trigger: Option<BlockId>,
}

impl Detonation {
    /// Returns the detonation of a boom block, or `None` for other kinds.
    #[must_use]
    pub fn of_block(block: &Block) -> Option<Self> {
        block.kind().boom_pattern().map(|pattern| Self {
            origin: block.position(),
            facing: block.facing(),
            pattern,
            trigger: Some(block.id()),
        })
    }
}

/// Frame-by-frame playback of one explosion.
///
/// Frames are computed once, from the grid as it is when the explosion starts.
/// Frame `0` is the origin; frame `i + 1` holds the in-range cardinal neighbors
/// of frame `i` that no earlier frame contains. Empty cells propagate the wave
/// like occupied ones. Trailing frames without a live block are dropped.
///
/// # Example
///
/// ```
/// use boomfall_engine::{Cascade, GridStore, Position};
///
/// let grid = GridStore::new(5, 5);
/// let origin = Position::new(2, 2);
/// // Nothing on the grid, so every frame is trimmed away.
/// let cascade = Cascade::compute(&grid, origin, |p| p == origin);
/// assert!(cascade.is_complete());
/// ```
#[derive(Debug, Clone)]
pub struct Cascade {
    origin: Position,
    trigger: Option<BlockId>,
    frames: VecDeque<Vec<Position>>,
    resolved: usize,
}

impl Cascade {
    /// Computes the frames of an explosion at `origin` reaching every cell for
    /// which `in_range` holds.
    pub fn compute<F>(grid: &GridStore, origin: Position, in_range: F) -> Self
    where
        F: Fn(Position) -> bool,
    {
        let mut seen = HashSet::from([origin]);
        let mut frames = vec![vec![origin]];
        loop {
            let next: Vec<_> = frames
                .last()
                .into_iter()
                .flatten()
                .flat_map(|p| p.neighbors())
                .filter(|&p| grid.is_in_bounds(p) && in_range(p) && seen.insert(p))
                .collect();
            if next.is_empty() {
                break;
            }
            frames.push(next);
        }
        while frames
            .last()
            .is_some_and(|frame| frame.iter().all(|&p| !grid.is_occupied(p)))
        {
            frames.pop();
        }
        Self {
            origin,
            trigger: None,
            frames: frames.into(),
            resolved: 0,
        }
    }

    /// Computes the frames of a detonation using its boom pattern.
    #[must_use]
    pub fn from_detonation(grid: &GridStore, detonation: Detonation) -> Self {
        let Detonation {
            origin,
            facing,
            pattern,
            trigger,
        } = detonation;
        let mut cascade =
            Self::compute(grid, origin, |p| pattern.is_within_range(origin, facing, p));
        cascade.trigger = trigger;
        cascade
    }

    #[must_use]
    pub fn origin(&self) -> Position {
        self.origin
    }

    /// Frames not played back yet, next frame first.
    pub fn frames(&self) -> impl ExactSizeIterator<Item = &[Position]> {
        self.frames.iter().map(Vec::as_slice)
    }

    /// Number of frames already played back.
    #[must_use]
    pub fn resolved_frames(&self) -> usize {
        self.resolved
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.frames.is_empty()
    }

    /// Plays back the next frame: every live block in it is destroyed,
    /// whatever its health.
    ///
    /// Returns the blocks destroyed by this frame; empty once complete.
    pub fn step(&mut self, board: &mut Board) -> Vec<Block> {
        let Some(frame) = self.frames.pop_front() else {
            return vec![];
        };
        let live: Vec<_> = frame.iter().filter_map(|&p| board.grid().get(p)).collect();
        let destroyed: Vec<_> = live
            .into_iter()
            .filter_map(|id| board.destroy_block(id))
            .collect();
        board.push_event(BoardEvent::CascadeFrameResolved {
            frame: self.resolved,
            cells: frame.len(),
            destroyed: destroyed.len(),
        });
        self.resolved += 1;
        destroyed
    }

    /// Detonations set off by boom blocks this cascade destroyed.
    pub fn chained<'a>(&self, destroyed: &'a [Block]) -> impl Iterator<Item = Detonation> + 'a {
        let trigger = self.trigger;
        destroyed
            .iter()
            .filter(move |block| Some(block.id()) != trigger)
            .filter_map(Detonation::of_block)
    }
}
