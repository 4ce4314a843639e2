use crate::geom::coord::GridCoord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout dimensions must be non-zero (got {width}x{height})")]
    EmptyGrid { width: u32, height: u32 },

    #[error("grid has {actual} cells, expected {expected}")]
    CellCount { expected: usize, actual: usize },

    #[error("expected exactly one depot, found {0}")]
    DepotCount(usize),

    #[error("bin '{bin}' at {cell} is outside the grid")]
    BinOutOfBounds { bin: String, cell: GridCoord },

    #[error("bin '{bin}' sits on a shelf cell {cell}")]
    BinOnShelf { bin: String, cell: GridCoord },

    #[error("duplicate bin id '{0}'")]
    DuplicateBin(String),

    #[error("bins '{first}' and '{second}' share cell {cell}")]
    SharedBinCell {
        first: String,
        second: String,
        cell: GridCoord,
    },

    #[error("line {line}: {msg}")]
    Syntax { line: usize, msg: String },
}

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("bin '{0}' is not part of the current layout")]
    UnresolvedBin(String),

    #[error("no traversable path from {from} to {to}")]
    Unreachable { from: GridCoord, to: GridCoord },

    #[error("service not ready: no layout published")]
    LayoutUnavailable,

    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WarehouseError>;
