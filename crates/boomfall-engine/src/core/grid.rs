use super::{block::BlockId, position::Position};

/// Bounded occupancy table mapping cells to the block occupying them.
///
/// Rows are stored bottom-up. Every query outside the table answers "no
/// block" instead of failing, and writes outside it are ignored.
///
/// # Example
///
/// ```
/// use boomfall_engine::{GridStore, Position};
///
/// let grid = GridStore::new(4, 6);
/// assert!(grid.is_in_bounds(Position::new(3, 5)));
/// assert!(!grid.is_in_bounds(Position::new(-1, 0)));
/// assert_eq!(grid.get(Position::new(9, 9)), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridStore {
    width: i32,
    height: i32,
    cells: Vec<Option<BlockId>>,
}

impl GridStore {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: i32::from(width),
            height: i32::from(height),
            cells: vec![None; usize::from(width) * usize::from(height)],
        }
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[must_use]
    pub fn is_in_bounds(&self, position: Position) -> bool {
        (0..self.width).contains(&position.x) && (0..self.height).contains(&position.y)
    }

    fn index(&self, position: Position) -> Option<usize> {
        if !self.is_in_bounds(position) {
            return None;
        }
        usize::try_from(position.y * self.width + position.x).ok()
    }

    /// Returns the block occupying `position`, if any.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<BlockId> {
        self.index(position).and_then(|i| self.cells[i])
    }

    #[must_use]
    pub fn is_occupied(&self, position: Position) -> bool {
        self.get(position).is_some()
    }

    /// Writes the occupant of `position` and returns the previous one.
    ///
    /// Callers clear the previous occupant before placing another block.
    pub fn set(&mut self, position: Position, block: Option<BlockId>) -> Option<BlockId> {
        let index = self.index(position)?;
        debug_assert!(
            block.is_none() || self.cells[index].is_none() || self.cells[index] == block,
            "cell {position} already holds another block"
        );
        std::mem::replace(&mut self.cells[index], block)
    }

    /// Iterates over occupied cells, row by row from the bottom.
    pub fn occupied(&self) -> impl Iterator<Item = (Position, BlockId)> + '_ {
        let width = usize::try_from(self.width).unwrap_or(0).max(1);
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            let id = (*cell)?;
            let x = i32::try_from(i % width).ok()?;
            let y = i32::try_from(i / width).ok()?;
            Some((Position::new(x, y), id))
        })
    }

    /// Returns whether every cell of the rows `bottom..bottom + rows` is empty.
    #[must_use]
    pub fn is_band_empty(&self, bottom: i32, rows: i32) -> bool {
        (bottom..bottom + rows)
            .flat_map(|y| (0..self.width).map(move |x| Position::new(x, y)))
            .all(|p| !self.is_occupied(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_is_empty() {
        let mut grid = GridStore::new(3, 3);
        assert_eq!(grid.get(Position::new(3, 0)), None);
        assert_eq!(grid.get(Position::new(0, -1)), None);
        assert_eq!(grid.set(Position::new(5, 5), Some(BlockId(1))), None);
        assert_eq!(grid.occupied().count(), 0);
    }

    #[test]
    fn test_set_and_clear() {
        let mut grid = GridStore::new(3, 4);
        let p = Position::new(2, 3);
        assert_eq!(grid.set(p, Some(BlockId(7))), None);
        assert_eq!(grid.get(p), Some(BlockId(7)));
        assert_eq!(grid.set(p, None), Some(BlockId(7)));
        assert!(!grid.is_occupied(p));
    }

    #[test]
    fn test_occupied_order_is_bottom_up() {
        let mut grid = GridStore::new(2, 2);
        grid.set(Position::new(1, 1), Some(BlockId(1)));
        grid.set(Position::new(0, 0), Some(BlockId(2)));
        grid.set(Position::new(1, 0), Some(BlockId(3)));
        let cells: Vec<_> = grid.occupied().collect();
        assert_eq!(
            cells,
            vec![
                (Position::new(0, 0), BlockId(2)),
                (Position::new(1, 0), BlockId(3)),
                (Position::new(1, 1), BlockId(1)),
            ]
        );
    }

    #[test]
    fn test_band_empty() {
        let mut grid = GridStore::new(3, 5);
        grid.set(Position::new(1, 1), Some(BlockId(0)));
        assert!(grid.is_band_empty(2, 3));
        assert!(!grid.is_band_empty(0, 2));
        // Rows outside the table count as empty.
        assert!(grid.is_band_empty(5, 10));
    }
}
