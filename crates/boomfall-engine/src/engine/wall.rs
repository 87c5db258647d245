use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::core::{BlockKind, Board, BoardEvent, Direction, NewBlock, Position};

use super::config::BoardConfig;

/// Resumable generation of a wall band, one row per [`WallBuilder::step`].
///
/// Every wall block starts in a group of its own; the next reconciliation
/// pass fuses the band.
#[derive(Debug, Clone)]
pub struct WallBuilder {
    next_row: i32,
    end_row: i32,
    health: u32,
    gap_chance: f64,
    rng: Pcg32,
}

impl WallBuilder {
    /// Creates a builder for the rows `bottom..bottom + rows`.
    #[must_use]
    pub fn new(bottom: i32, rows: u16, health: u32, gap_chance: f64, seed: u64) -> Self {
        Self {
            next_row: bottom,
            end_row: bottom + i32::from(rows),
            health: health.max(1),
            gap_chance: gap_chance.clamp(0.0, 1.0),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Builder for the configured band at the top of the buffer.
    #[must_use]
    pub fn for_level(config: &BoardConfig, level: u32, seed: u64) -> Self {
        let top = i32::from(config.total_height());
        Self::new(
            top - i32::from(config.wall.rows),
            config.wall.rows,
            config.wall_health(level),
            config.wall.gap_chance,
            seed,
        )
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next_row >= self.end_row
    }

    #[must_use]
    pub fn rows_remaining(&self) -> usize {
        usize::try_from(self.end_row - self.next_row).unwrap_or(0)
    }

    /// Fills the next row, skipping gaps and occupied cells.
    ///
    /// Returns the number of blocks placed, or `None` once complete.
    pub fn step(&mut self, board: &mut Board) -> Option<usize> {
        if self.is_complete() {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;

        let mut placed = 0;
        for x in 0..board.width() {
            let position = Position::new(x, row);
            if self.rng.random_bool(self.gap_chance) || board.grid().is_occupied(position) {
                continue;
            }
            let block = NewBlock {
                position,
                kind: BlockKind::wall(),
                health: self.health,
                facing: Direction::Up,
            };
            if board.add_block(block).is_ok() {
                placed += 1;
            }
        }
        board.push_event(BoardEvent::WallRowGenerated {
            row,
            blocks: placed,
        });
        Some(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_one_row_per_step() {
        let mut board = Board::new(4, 7);
        let mut builder = WallBuilder::new(4, 3, 2, 0.0, 1);
        assert_eq!(builder.rows_remaining(), 3);
        assert_eq!(builder.step(&mut board), Some(4));
        assert_eq!(board.block_count(), 4);
        assert_eq!(board.group_count(), 4);
        assert!(board.grid().is_band_empty(5, 2));
        assert_eq!(builder.step(&mut board), Some(4));
        assert_eq!(builder.step(&mut board), Some(4));
        assert!(builder.is_complete());
        assert_eq!(builder.step(&mut board), None);

        let wall = board.block_at(Position::new(2, 6)).unwrap();
        assert_eq!(wall.kind(), BlockKind::wall());
        assert_eq!(wall.health(), 2);
        assert_eq!(board.take_events().len(), 3);
    }

    #[test]
    fn test_skips_occupied_cells() {
        let mut board = Board::new(3, 2);
        board
            .add_block(NewBlock {
                position: Position::new(1, 1),
                kind: BlockKind::Plain,
                health: 1,
                facing: Direction::Up,
            })
            .unwrap();
        let mut builder = WallBuilder::new(1, 1, 1, 0.0, 0);
        assert_eq!(builder.step(&mut board), Some(2));
        assert_eq!(board.block_at(Position::new(1, 1)).unwrap().kind(), BlockKind::Plain);
    }

    #[test]
    fn test_all_gaps() {
        let mut board = Board::new(5, 3);
        let mut builder = WallBuilder::new(0, 3, 1, 1.0, 0);
        while builder.step(&mut board).is_some() {}
        assert_eq!(board.block_count(), 0);
    }

    #[test]
    fn test_band_sits_at_top_of_buffer() {
        let config = BoardConfig::default();
        let mut board = Board::new(config.width, config.total_height());
        let mut builder = WallBuilder::for_level(&config, 4, 3);
        assert_eq!(builder.rows_remaining(), 10);
        builder.step(&mut board);
        assert!(board.grid().is_band_empty(0, 16));
        assert!(
            board
                .blocks()
                .all(|b| b.position().y == 16 && b.health() == 3)
        );
    }
}
