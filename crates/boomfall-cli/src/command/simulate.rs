use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use boomfall_engine::{
    Block, BlockKind, Board, BoardConfig, BoardEvent, GameSession, MoveDirection, Position,
    Rotation, SessionSeed,
};
use chrono::Utc;
use rand::{Rng as _, SeedableRng as _, rngs::StdRng};

use crate::{
    schema::report::{SessionReport, SimulationReport},
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Number of sessions to run
    #[arg(long, default_value_t = 1)]
    sessions: usize,
    /// Seed of the first session (32 hex digits); later sessions derive theirs from it
    #[arg(long)]
    seed: Option<SessionSeed>,
    /// Board configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Simulated time limit per session, in seconds
    #[arg(long, default_value_t = 600)]
    max_seconds: u64,
    /// Simulation frames per simulated second
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Print every event to stderr
    #[arg(long)]
    trace: bool,
    /// Print the final board of each session to stderr
    #[arg(long)]
    show_board: bool,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Default for SimulateArg {
    fn default() -> Self {
        Self {
            sessions: 1,
            seed: None,
            config: None,
            max_seconds: 600,
            fps: 60,
            trace: false,
            show_board: false,
            output: None,
        }
    }
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let config = match &arg.config {
        Some(path) => util::read_json_file::<BoardConfig, _>("board config", path)?,
        None => BoardConfig::default(),
    };
    config.validate().context("Invalid board configuration")?;

    let first = arg.seed.unwrap_or_else(|| rand::rng().random());
    let mut seed_rng = StdRng::seed_from_u64(seed_to_u64(first));
    let seeds = std::iter::once(first).chain(std::iter::repeat_with(|| seed_rng.random()));

    let mut sessions = Vec::with_capacity(arg.sessions);
    for (index, seed) in seeds.take(arg.sessions).enumerate() {
        let report = simulate_session(arg, &config, index, seed)?;
        eprintln!(
            "Session {}/{} (seed {}): {} after {:.1}s, score {}, level {}, {} pieces",
            index + 1,
            arg.sessions,
            report.seed,
            report.final_state,
            report.stats.simulated_time().as_secs_f64(),
            report.stats.score(),
            report.stats.level(),
            report.stats.pieces_placed(),
        );
        sessions.push(report);
    }

    let report = SimulationReport {
        generated_at: Utc::now(),
        config,
        sessions,
    };
    Output::save_json(&report, arg.output.clone())?;
    Ok(())
}

fn simulate_session(
    arg: &SimulateArg,
    config: &BoardConfig,
    index: usize,
    seed: SessionSeed,
) -> anyhow::Result<SessionReport> {
    let mut session = GameSession::with_seed(config.clone(), seed)
        .with_context(|| format!("Failed to start session {}", index + 1))?;
    if arg.trace {
        session.subscribe(move |event: &BoardEvent| eprintln!("[{}] {event}", index + 1));
    }

    let fps = arg.fps.max(1);
    let dt = Duration::from_secs(1) / fps;
    let mut player = RandomPlayer::new(seed_to_u64(seed));
    for _ in 0..arg.max_seconds * u64::from(fps) {
        if session.state().is_game_over() {
            break;
        }
        player.act(&mut session);
        session.advance(dt);
    }

    if arg.show_board {
        eprintln!(
            "{}",
            render_board(session.board(), i32::from(config.height))
        );
    }
    Ok(SessionReport {
        seed,
        final_state: session.state(),
        stats: session.stats().clone(),
        remaining_blocks: session.board().block_count(),
    })
}

#[expect(clippy::cast_possible_truncation)]
fn seed_to_u64(seed: SessionSeed) -> u64 {
    u128::from_be_bytes(seed.to_bytes()) as u64
}

/// Scripted player making random moves and dropping after a random while.
#[derive(Debug)]
struct RandomPlayer {
    rng: StdRng,
    frames: u32,
    drop_after: u32,
}

impl RandomPlayer {
    fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let drop_after = rng.random_range(10..90);
        Self {
            rng,
            frames: 0,
            drop_after,
        }
    }

    fn act(&mut self, session: &mut GameSession) {
        if session.active_group().is_none() {
            self.frames = 0;
            return;
        }
        self.frames += 1;
        if self.frames >= self.drop_after {
            self.frames = 0;
            self.drop_after = self.rng.random_range(10..90);
            let _ = session.hard_drop();
            return;
        }
        // Rejected moves are ordinary; the player just tries something else
        // on a later frame.
        let _ = match self.rng.random_range(0..16) {
            0 => session.try_move(MoveDirection::Left),
            1 => session.try_move(MoveDirection::Right),
            2 => session.try_rotate(Rotation::Clockwise),
            3 => session.try_rotate(Rotation::CounterClockwise),
            4 => session.try_move(MoveDirection::Down),
            _ => Ok(()),
        };
    }
}

/// Draws the board top row first, with a rule between the buffer and the
/// nominal board.
fn render_board(board: &Board, visible_height: i32) -> String {
    let width = usize::try_from(board.width()).unwrap_or(0);
    let mut out = String::new();
    for y in (0..board.height()).rev() {
        if y == visible_height - 1 {
            out.push_str(&"-".repeat(width));
            out.push('\n');
        }
        for x in 0..board.width() {
            out.push(match board.block_at(Position::new(x, y)).map(Block::kind) {
                None => '.',
                Some(BlockKind::Plain) => '#',
                Some(BlockKind::Wall { .. }) => 'W',
                Some(BlockKind::Boom(_)) => '*',
            });
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use boomfall_engine::{Direction, NewBlock};

    use super::*;

    #[test]
    fn test_render_board_marks_kinds() {
        let mut board = Board::new(3, 3);
        board
            .add_block(NewBlock {
                position: Position::new(0, 0),
                kind: BlockKind::wall(),
                health: 1,
                facing: Direction::Up,
            })
            .unwrap();
        board
            .add_block(NewBlock {
                position: Position::new(2, 2),
                kind: BlockKind::Plain,
                health: 1,
                facing: Direction::Up,
            })
            .unwrap();
        assert_eq!(render_board(&board, 2), "..#\n---\n...\nW..\n");
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let arg = SimulateArg {
            max_seconds: 30,
            ..SimulateArg::default()
        };
        let config = BoardConfig::default();
        let seed = SessionSeed::from(42_u128);
        let a = simulate_session(&arg, &config, 0, seed).unwrap();
        let b = simulate_session(&arg, &config, 0, seed).unwrap();
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.remaining_blocks, b.remaining_blocks);
        assert!(a.stats.simulated_time() > Duration::ZERO);
    }
}
