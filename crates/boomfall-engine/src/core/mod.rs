pub use self::{block::*, board::*, cascade::*, event::*, grid::*, group::*, position::*, state::*};

pub(crate) mod block;
pub(crate) mod board;
pub(crate) mod cascade;
pub(crate) mod event;
pub(crate) mod grid;
pub(crate) mod group;
pub(crate) mod position;
pub(crate) mod state;
