use serde::{Deserialize, Serialize};

use super::{
    block::{BlockId, BlockKind, BoomPattern},
    group::GroupId,
    position::Position,
    state::BoardState,
};

/// Notification emitted while the simulation mutates the board.
///
/// Events are queued during one discrete unit of work and delivered to every
/// listener when that unit completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BoardEvent {
    #[display("phase {from} -> {to}")]
    PhaseChanged { from: BoardState, to: BoardState },
    #[display("piece {kind} spawned as {group}")]
    PieceSpawned { group: GroupId, kind: usize },
    #[display("piece {group} locked with {blocks} blocks")]
    PieceLocked { group: GroupId, blocks: usize },
    #[display("{block} at {position} damaged, {health} health left")]
    BlockDamaged {
        block: BlockId,
        position: Position,
        health: u32,
    },
    #[display("{block} ({kind}) destroyed at {position} for {points} points")]
    BlockDestroyed {
        block: BlockId,
        position: Position,
        kind: BlockKind,
        points: u64,
    },
    #[display("{dissolved} merged into {into} ({transferred} blocks)")]
    GroupsMerged {
        into: GroupId,
        dissolved: GroupId,
        transferred: usize,
    },
    #[display("{pattern} cascade at {origin} with {frames} frames")]
    CascadeStarted {
        origin: Position,
        pattern: BoomPattern,
        frames: usize,
    },
    #[display("cascade frame {frame} hit {cells} cells, destroyed {destroyed}")]
    CascadeFrameResolved {
        frame: usize,
        cells: usize,
        destroyed: usize,
    },
    #[display("wall row {row} generated with {blocks} blocks")]
    WallRowGenerated { row: i32, blocks: usize },
    #[display("breakthrough to level {level} for {points} points")]
    Breakthrough { level: u32, points: u64 },
    #[display("game over with {score} points")]
    GameOver { score: u64 },
}
