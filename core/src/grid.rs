//! Owned, bounds-checked dense grids.

/// Dense row-major grid with explicit dimensions.
///
/// Coordinates are signed so callers can probe neighbours across the border;
/// out-of-range lookups simply return `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenseGrid<T> {
    width: u32,
    height: u32,
    cells: Vec<T>,
}

impl<T: Clone> DenseGrid<T> {
    /// Creates a grid filled with copies of `fill`.
    #[must_use]
    pub fn new(width: u32, height: u32, fill: T) -> Self {
        let capacity_u64 = u64::from(width) * u64::from(height);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![fill; capacity],
        }
    }
}

impl<T> DenseGrid<T> {
    /// Creates a grid by evaluating `cell` for every column and row.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut cell: impl FnMut(u32, u32) -> T) -> Self {
        let mut cells = Vec::new();
        for row in 0..height {
            for column in 0..width {
                cells.push(cell(column, row));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Row-major index of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, column: i32, row: i32) -> Option<usize> {
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        if column >= self.width || row >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        Some(row * width + column)
    }

    /// Returns the cell at the provided coordinates.
    #[must_use]
    pub fn get(&self, column: i32, row: i32) -> Option<&T> {
        self.index(column, row).and_then(|index| self.cells.get(index))
    }

    /// Returns a mutable reference to the cell at the provided coordinates.
    pub fn get_mut(&mut self, column: i32, row: i32) -> Option<&mut T> {
        let index = self.index(column, row)?;
        self.cells.get_mut(index)
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// All cells in row-major order, mutably.
    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }
}
