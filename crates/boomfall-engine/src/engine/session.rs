use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
    time::Duration,
};

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::{
    InputError,
    core::{
        BlockId, BlockKind, Board, BoardEvent, BoardState, Cascade, Detonation, Direction,
        GroupId, GroupKind, MoveDirection, NewBlock, Position, Rotation,
    },
};

use super::{
    config::{BoardConfig, ConfigError, PieceShape},
    piece_selector::WeightedPieceSelector,
    seed::SessionSeed,
    stats::GameStats,
    wall::WallBuilder,
};

/// Receiver of the events a [`GameSession`] fires.
///
/// Any `FnMut(&BoardEvent)` closure is a listener.
pub trait EventListener {
    fn on_event(&mut self, event: &BoardEvent);
}

impl<F> EventListener for F
where
    F: FnMut(&BoardEvent),
{
    fn on_event(&mut self, event: &BoardEvent) {
        self(event);
    }
}

/// One game: a board driven through its phases by elapsed time and player
/// requests.
///
/// Every phase performs its work in discrete units: one piece spawn, one
/// gravity row, one settle step, one cascade frame, one wall row. The
/// reconciliation and breakthrough phases finish as soon as they are entered.
/// [`GameSession::advance`] runs as many units as the elapsed time pays for;
/// [`GameSession::step`] runs exactly one, ignoring timers.
///
/// Events queued by a unit are delivered to [`GameStats`] and then to every
/// subscribed listener once the unit completes.
pub struct GameSession {
    config: BoardConfig,
    seed: SessionSeed,
    rng: Pcg32,
    board: Board,
    state: BoardState,
    selector: WeightedPieceSelector,
    next_kind: Option<usize>,
    active: Option<GroupId>,
    landed: BTreeSet<BlockId>,
    moved_while_settling: bool,
    detonations: VecDeque<Detonation>,
    cascade: Option<Cascade>,
    wall: Option<WallBuilder>,
    level: u32,
    pending: Duration,
    stats: GameStats,
    listeners: Vec<Box<dyn EventListener>>,
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("seed", &self.seed)
            .field("state", &self.state)
            .field("level", &self.level)
            .field("active", &self.active)
            .field("next_kind", &self.next_kind)
            .field("board", &self.board)
            .field("cascade", &self.cascade)
            .field("detonations", &self.detonations)
            .field("wall", &self.wall)
            .field("pending", &self.pending)
            .field("stats", &self.stats)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Creates a session with a random seed.
    pub fn new(config: BoardConfig) -> Result<Self, ConfigError> {
        Self::with_seed(config, rand::rng().random())
    }

    /// Like [`Self::new`], but reproducible.
    pub fn with_seed(config: BoardConfig, seed: SessionSeed) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = Pcg32::from_seed(seed.to_bytes());
        let mut selector =
            WeightedPieceSelector::from_pieces(&config.pieces, config.retention, rng.random());
        let next_kind = selector.draw();
        let board = Board::new(config.width, config.total_height())
            .with_points(config.score.block_points());
        let mut this = Self {
            config,
            seed,
            rng,
            board,
            state: BoardState::SpawningPiece,
            selector,
            next_kind,
            active: None,
            landed: BTreeSet::new(),
            moved_while_settling: false,
            detonations: VecDeque::new(),
            cascade: None,
            wall: None,
            level: 0,
            pending: Duration::ZERO,
            stats: GameStats::new(),
            listeners: vec![],
        };
        if this.config.initial_wall {
            this.start_wall();
            this.state = BoardState::WallGeneration;
        }
        Ok(this)
    }

    /// Registers a listener for every event fired from now on.
    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: EventListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    #[must_use]
    pub fn seed(&self) -> SessionSeed {
        self.seed
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn state(&self) -> BoardState {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn selector(&self) -> &WeightedPieceSelector {
        &self.selector
    }

    /// Group of the piece under player control, if one is falling.
    #[must_use]
    pub fn active_group(&self) -> Option<GroupId> {
        self.active
    }

    /// Index into [`BoardConfig::pieces`] of the piece spawned next.
    #[must_use]
    pub fn next_piece(&self) -> Option<usize> {
        self.next_kind
    }

    #[must_use]
    pub fn next_piece_shape(&self) -> Option<&PieceShape> {
        self.next_kind.and_then(|kind| self.config.pieces.get(kind))
    }

    /// Explosion currently being played back.
    #[must_use]
    pub fn cascade(&self) -> Option<&Cascade> {
        self.cascade.as_ref()
    }

    /// Explosions waiting behind the current one.
    pub fn queued_detonations(&self) -> impl ExactSizeIterator<Item = &Detonation> {
        self.detonations.iter()
    }

    #[must_use]
    pub fn wall_builder(&self) -> Option<&WallBuilder> {
        self.wall.as_ref()
    }

    /// Interval paid per unit of work in the current phase; `None` when the
    /// phase is instantaneous or the game is over.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        let timing = &self.config.timing;
        match self.state {
            BoardState::SpawningPiece => Some(timing.spawn_delay),
            BoardState::FallingPiece => Some(self.config.fall_interval(self.level)),
            BoardState::GroupSettling => Some(timing.settle_interval),
            BoardState::CascadeResolve => Some(timing.cascade_frame_interval),
            BoardState::WallGeneration => Some(timing.wall_row_interval),
            BoardState::MergeReconcile | BoardState::BreakthroughCheck | BoardState::GameOver => {
                None
            }
        }
    }

    /// Advances the simulation by `dt` of game time.
    pub fn advance(&mut self, dt: Duration) {
        if self.state.is_game_over() {
            return;
        }
        self.stats.add_time(dt);
        self.pending += dt;
        loop {
            if self.state.is_game_over() {
                self.pending = Duration::ZERO;
                break;
            }
            if !self.state.is_instant() {
                let Some(interval) = self.interval() else {
                    break;
                };
                if self.pending < interval {
                    break;
                }
                self.pending -= interval;
            }
            self.step();
        }
    }

    /// Runs one unit of work of the current phase, regardless of timers.
    pub fn step(&mut self) {
        match self.state {
            BoardState::SpawningPiece => self.spawn_piece(),
            BoardState::FallingPiece => self.fall_piece(),
            BoardState::MergeReconcile => self.merge_reconcile(),
            BoardState::GroupSettling => self.settle_groups(),
            BoardState::CascadeResolve => self.resolve_cascade_frame(),
            BoardState::BreakthroughCheck => self.check_breakthrough(),
            BoardState::WallGeneration => self.generate_wall_row(),
            BoardState::GameOver => return,
        }
        self.flush_events();
        debug_assert!(
            self.board.check_consistency().is_ok(),
            "{:?}",
            self.board.check_consistency()
        );
    }

    fn active_piece(&self) -> Result<GroupId, InputError> {
        match (self.state, self.active) {
            (BoardState::FallingPiece, Some(group)) => Ok(group),
            (state, _) => Err(InputError::NotAccepting { state }),
        }
    }

    /// Moves the falling piece one cell. Blocked moves change nothing.
    pub fn try_move(&mut self, direction: MoveDirection) -> Result<(), InputError> {
        let group = self.active_piece()?;
        let (dx, dy) = direction.delta();
        self.board
            .try_translate(group, dx, dy)
            .map_err(|_| InputError::Rejected)
    }

    /// Rotates the falling piece a quarter turn about its pivot.
    pub fn try_rotate(&mut self, rotation: Rotation) -> Result<(), InputError> {
        let group = self.active_piece()?;
        self.board
            .try_rotate(group, rotation)
            .map_err(|_| InputError::Rejected)
    }

    /// Drops the falling piece as far as it goes and locks it.
    pub fn hard_drop(&mut self) -> Result<(), InputError> {
        let group = self.active_piece()?;
        while self.board.try_translate(group, 0, -1).is_ok() {}
        self.lock_piece();
        self.flush_events();
        Ok(())
    }

    /// Spawns the next piece now instead of waiting out the spawn delay.
    pub fn request_next_piece(&mut self) -> Result<(), InputError> {
        if !self.state.is_spawning_piece() {
            return Err(InputError::NotAccepting { state: self.state });
        }
        self.step();
        Ok(())
    }

    /// Ends the game immediately.
    ///
    /// A cascade, wall band or detonation queue in progress is dropped where
    /// it stands; blocks already placed or destroyed stay that way and the
    /// group partition is not rebuilt.
    pub fn force_game_over(&mut self) {
        if self.state.is_game_over() {
            return;
        }
        self.cascade = None;
        self.wall = None;
        self.detonations.clear();
        self.landed.clear();
        self.active = None;
        self.game_over();
        self.flush_events();
    }

    fn set_state(&mut self, to: BoardState) {
        if self.state != to {
            self.board.push_event(BoardEvent::PhaseChanged {
                from: self.state,
                to,
            });
            self.state = to;
        }
    }

    fn game_over(&mut self) {
        // Stats must see every destruction before the final score is taken.
        self.flush_events();
        self.set_state(BoardState::GameOver);
        self.board.push_event(BoardEvent::GameOver {
            score: self.stats.score(),
        });
    }

    fn flush_events(&mut self) {
        for event in self.board.take_events() {
            self.stats.record(&event);
            for listener in &mut self.listeners {
                listener.on_event(&event);
            }
        }
    }

    fn spawn_piece(&mut self) {
        let Some(kind) = self.next_kind.take() else {
            self.game_over();
            return;
        };
        self.next_kind = self.selector.draw();
        let Some(shape) = self.config.pieces.get(kind) else {
            self.game_over();
            return;
        };

        let (width, height) = shape.size();
        let origin = Position::new(
            (self.board.width() - width) / 2,
            self.board.height() - height,
        );
        let blocks: Vec<_> = shape
            .cells
            .iter()
            .enumerate()
            .map(|(index, &(x, y))| {
                let boom = shape.boom.filter(|boom| boom.cell == index);
                NewBlock {
                    position: origin.offset(x, y),
                    kind: boom.map_or(BlockKind::Plain, |boom| BlockKind::Boom(boom.pattern)),
                    health: 1,
                    facing: boom.map_or(Direction::Up, |boom| boom.facing),
                }
            })
            .collect();
        let pivot = shape.pivot.offset(origin.x, origin.y);

        match self.board.add_group(GroupKind::Piece, pivot, &blocks) {
            Ok(group) => {
                self.active = Some(group);
                self.board
                    .push_event(BoardEvent::PieceSpawned { group, kind });
                self.set_state(BoardState::FallingPiece);
            }
            Err(_) => self.game_over(),
        }
    }

    fn fall_piece(&mut self) {
        let Some(group) = self.active else {
            self.set_state(BoardState::MergeReconcile);
            return;
        };
        if self.board.try_translate(group, 0, -1).is_err() {
            self.lock_piece();
        }
    }

    fn lock_piece(&mut self) {
        if let Some(group) = self.active.take() {
            if let Some(piece) = self.board.group(group) {
                let blocks = piece.len();
                self.landed.extend(piece.members());
                self.board
                    .push_event(BoardEvent::PieceLocked { group, blocks });
            }
        }
        self.set_state(BoardState::MergeReconcile);
    }

    fn merge_reconcile(&mut self) {
        let landed = std::mem::take(&mut self.landed);
        for id in self.board.armed_booms(landed) {
            if let Some(detonation) = self.board.block(id).and_then(Detonation::of_block) {
                self.queue_detonation(detonation);
            }
        }
        self.board.reconcile();
        let pieces: Vec<_> = self
            .board
            .groups()
            .filter(|group| group.is_piece())
            .map(|group| group.id())
            .collect();
        for group in pieces {
            self.board.settle_group(group);
        }
        self.moved_while_settling = false;
        if self.start_next_cascade() {
            self.set_state(BoardState::CascadeResolve);
        } else {
            self.set_state(BoardState::GroupSettling);
        }
    }

    /// Queues an explosion unless the same boom block is already queued.
    fn queue_detonation(&mut self, detonation: Detonation) {
        let duplicate = detonation.trigger.is_some()
            && self
                .detonations
                .iter()
                .any(|queued| queued.trigger == detonation.trigger);
        if !duplicate {
            self.detonations.push_back(detonation);
        }
    }

    /// Starts the next queued explosion that reaches at least one block.
    fn start_next_cascade(&mut self) -> bool {
        while let Some(detonation) = self.detonations.pop_front() {
            let cascade = Cascade::from_detonation(self.board.grid(), detonation);
            if cascade.is_complete() {
                continue;
            }
            self.board.push_event(BoardEvent::CascadeStarted {
                origin: detonation.origin,
                pattern: detonation.pattern,
                frames: cascade.frames().len(),
            });
            self.cascade = Some(cascade);
            return true;
        }
        false
    }

    fn resolve_cascade_frame(&mut self) {
        let (chained, complete) = match self.cascade.as_mut() {
            Some(cascade) => {
                let destroyed = cascade.step(&mut self.board);
                let chained: Vec<_> = cascade.chained(&destroyed).collect();
                (chained, cascade.is_complete())
            }
            None => (vec![], true),
        };
        for detonation in chained {
            self.queue_detonation(detonation);
        }
        if complete {
            self.cascade = None;
            if !self.start_next_cascade() {
                self.set_state(BoardState::MergeReconcile);
            }
        }
    }

    fn settle_groups(&mut self) {
        let step = self.board.settle_step(self.config.impact_damage_rows);
        for block in &step.destroyed {
            if let Some(detonation) = Detonation::of_block(block) {
                self.queue_detonation(detonation);
            }
        }
        if !step.moved.is_empty() {
            self.moved_while_settling = true;
            for group in step.moved {
                if let Some(group) = self.board.group(group) {
                    self.landed.extend(group.members());
                }
            }
            return;
        }
        if self.moved_while_settling || !self.detonations.is_empty() {
            self.set_state(BoardState::MergeReconcile);
        } else {
            self.set_state(BoardState::BreakthroughCheck);
        }
    }

    fn check_breakthrough(&mut self) {
        let zone = self.config.breakthrough;
        if !self
            .board
            .grid()
            .is_band_empty(i32::from(zone.bottom_row), i32::from(zone.rows))
        {
            self.set_state(BoardState::SpawningPiece);
            return;
        }
        let points = self
            .config
            .score
            .breakthrough
            .saturating_mul(u64::from(self.level) + 1);
        self.level += 1;
        self.board.push_event(BoardEvent::Breakthrough {
            level: self.level,
            points,
        });
        self.start_wall();
        self.set_state(BoardState::WallGeneration);
    }

    fn start_wall(&mut self) {
        self.wall = Some(WallBuilder::for_level(
            &self.config,
            self.level,
            self.rng.random(),
        ));
    }

    fn generate_wall_row(&mut self) {
        let complete = match self.wall.as_mut() {
            Some(builder) => {
                builder.step(&mut self.board);
                builder.is_complete()
            }
            None => true,
        };
        if complete {
            self.wall = None;
            self.set_state(BoardState::MergeReconcile);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::core::BoomPattern;

    fn seed() -> SessionSeed {
        SessionSeed::from(0x0123_4567_89ab_cdef_u128)
    }

    fn config_with(pieces: Vec<PieceShape>) -> BoardConfig {
        BoardConfig {
            initial_wall: false,
            pieces,
            ..BoardConfig::default()
        }
    }

    fn o_piece() -> PieceShape {
        PieceShape::tetrominoes()[1].clone()
    }

    fn bomb() -> PieceShape {
        PieceShape::new("bomb", &[(0, 0)], crate::core::Pivot::new(1, 1)).with_boom(
            0,
            BoomPattern::Surround { radius: 1 },
            Direction::Up,
        )
    }

    fn plain(x: i32, y: i32) -> NewBlock {
        NewBlock {
            position: Position::new(x, y),
            kind: BlockKind::Plain,
            health: 1,
            facing: Direction::Up,
        }
    }

    fn record(session: &mut GameSession) -> Rc<RefCell<Vec<BoardEvent>>> {
        let events = Rc::new(RefCell::new(vec![]));
        let sink = Rc::clone(&events);
        session.subscribe(move |event: &BoardEvent| sink.borrow_mut().push(event.clone()));
        events
    }

    fn phases(events: &[BoardEvent]) -> Vec<BoardState> {
        events
            .iter()
            .filter_map(|event| match event {
                BoardEvent::PhaseChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    fn step_while(session: &mut GameSession, state: BoardState) {
        for _ in 0..1000 {
            if session.state() != state {
                return;
            }
            session.step();
        }
        panic!("stuck in {state}");
    }

    #[test]
    fn test_initial_phase() {
        let session = GameSession::with_seed(BoardConfig::default(), seed()).unwrap();
        assert_eq!(session.state(), BoardState::WallGeneration);
        assert!(session.wall_builder().is_some());

        let session = GameSession::with_seed(config_with(vec![o_piece()]), seed()).unwrap();
        assert_eq!(session.state(), BoardState::SpawningPiece);
        assert_eq!(session.next_piece(), Some(0));
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = BoardConfig {
            width: 0,
            ..BoardConfig::default()
        };
        assert_eq!(
            GameSession::new(config).unwrap_err(),
            ConfigError::EmptyBoard
        );
    }

    #[test]
    fn test_spawn_and_fall_follow_timers() {
        let mut session = GameSession::with_seed(config_with(vec![o_piece()]), seed()).unwrap();
        session.advance(Duration::from_millis(150));
        assert_eq!(session.state(), BoardState::SpawningPiece);
        session.advance(Duration::from_millis(50));
        assert_eq!(session.state(), BoardState::FallingPiece);

        let group = session.active_group().unwrap();
        assert_eq!(session.board().group(group).unwrap().anchor(), Position::new(4, 24));
        session.advance(Duration::from_millis(599));
        assert_eq!(session.board().group(group).unwrap().anchor(), Position::new(4, 24));
        session.advance(Duration::from_millis(1));
        assert_eq!(session.board().group(group).unwrap().anchor(), Position::new(4, 23));
        assert_eq!(session.stats().simulated_time(), Duration::from_millis(800));
    }

    #[test]
    fn test_input_outside_falling_phase() {
        let mut session = GameSession::with_seed(BoardConfig::default(), seed()).unwrap();
        let expected = Err(InputError::NotAccepting {
            state: BoardState::WallGeneration,
        });
        assert_eq!(session.try_move(MoveDirection::Left), expected);
        assert_eq!(session.try_rotate(Rotation::Clockwise), expected);
        assert_eq!(session.hard_drop(), expected);
        assert_eq!(session.request_next_piece(), expected);
    }

    #[test]
    fn test_blocked_move_is_rejected() {
        let mut session = GameSession::with_seed(config_with(vec![o_piece()]), seed()).unwrap();
        session.request_next_piece().unwrap();
        for _ in 0..4 {
            session.try_move(MoveDirection::Left).unwrap();
        }
        assert_eq!(
            session.try_move(MoveDirection::Left),
            Err(InputError::Rejected)
        );
        let group = session.active_group().unwrap();
        assert_eq!(session.board().group(group).unwrap().anchor(), Position::new(0, 24));
        session.try_rotate(Rotation::Clockwise).unwrap();
    }

    #[test]
    fn test_landing_on_empty_board_breaks_through() {
        let mut session = GameSession::with_seed(config_with(vec![o_piece()]), seed()).unwrap();
        let events = record(&mut session);
        session.request_next_piece().unwrap();
        session.hard_drop().unwrap();
        assert_eq!(session.state(), BoardState::MergeReconcile);
        step_while(&mut session, BoardState::MergeReconcile);
        step_while(&mut session, BoardState::GroupSettling);
        step_while(&mut session, BoardState::BreakthroughCheck);

        assert_eq!(session.state(), BoardState::WallGeneration);
        assert_eq!(session.level(), 1);
        assert_eq!(session.stats().score(), 1000);
        assert_eq!(session.stats().pieces_placed(), 1);
        assert!(
            events
                .borrow()
                .contains(&BoardEvent::Breakthrough { level: 1, points: 1000 })
        );
        assert_eq!(
            phases(&events.borrow()),
            vec![
                BoardState::FallingPiece,
                BoardState::MergeReconcile,
                BoardState::GroupSettling,
                BoardState::BreakthroughCheck,
                BoardState::WallGeneration,
            ]
        );
    }

    #[test]
    fn test_wall_band_falls_and_play_resumes() {
        let mut session = GameSession::with_seed(BoardConfig::default(), seed()).unwrap();
        for _ in 0..10 {
            assert_eq!(session.state(), BoardState::WallGeneration);
            session.step();
        }
        assert_eq!(session.state(), BoardState::MergeReconcile);
        for _ in 0..1000 {
            if session.state().is_spawning_piece() {
                break;
            }
            session.step();
        }
        assert_eq!(session.state(), BoardState::SpawningPiece);
        let board = session.board();
        assert!(board.block_count() > 0);
        assert!(board.blocks().all(|b| b.kind().is_wall()));
        // Every wall block rests on the floor or on another block.
        assert!(board.blocks().all(|b| {
            let below = b.position().step(Direction::Down);
            below.y < 0 || board.grid().is_occupied(below)
        }));
        assert_eq!(board.unreconciled_pairs().count(), 0);
    }

    #[test]
    fn test_blocked_spawn_ends_game() {
        let mut session = GameSession::with_seed(config_with(vec![o_piece()]), seed()).unwrap();
        let events = record(&mut session);
        session.board.add_block(plain(5, 25)).unwrap();
        session.step();
        assert_eq!(session.state(), BoardState::GameOver);
        assert!(events.borrow().contains(&BoardEvent::GameOver { score: 0 }));

        session.advance(Duration::from_secs(10));
        assert_eq!(session.stats().simulated_time(), Duration::ZERO);
        assert_eq!(
            session.try_move(MoveDirection::Down),
            Err(InputError::NotAccepting {
                state: BoardState::GameOver
            })
        );
    }

    #[test]
    fn test_force_game_over_abandons_wall() {
        let mut session = GameSession::with_seed(BoardConfig::default(), seed()).unwrap();
        session.step();
        session.step();
        let blocks = session.board().block_count();
        session.force_game_over();
        assert_eq!(session.state(), BoardState::GameOver);
        assert!(session.wall_builder().is_none());
        assert_eq!(session.board().block_count(), blocks);
        session.step();
        assert_eq!(session.board().block_count(), blocks);
    }

    #[test]
    fn test_landed_bomb_explodes() {
        let mut session = GameSession::with_seed(config_with(vec![bomb()]), seed()).unwrap();
        let events = record(&mut session);
        session.board.add_block(plain(4, 0)).unwrap();
        session.request_next_piece().unwrap();
        session.hard_drop().unwrap();
        session.step();
        assert_eq!(session.state(), BoardState::CascadeResolve);
        assert_eq!(session.cascade().unwrap().frames().len(), 2);

        step_while(&mut session, BoardState::CascadeResolve);
        assert_eq!(session.board().block_count(), 0);
        assert_eq!(session.stats().cascades(), 1);
        assert_eq!(session.stats().destroyed().total(), 2);
        assert_eq!(session.stats().score(), 15);
        let started = events
            .borrow()
            .iter()
            .filter(|event| matches!(event, BoardEvent::CascadeStarted { .. }))
            .count();
        assert_eq!(started, 1);
    }

    #[test]
    fn test_boom_piece_explodes_on_empty_floor() {
        let t_boom = PieceShape::boom_pieces()[1].clone();
        let mut session = GameSession::with_seed(config_with(vec![t_boom]), seed()).unwrap();
        session.request_next_piece().unwrap();
        session.hard_drop().unwrap();
        session.step();
        assert_eq!(session.state(), BoardState::CascadeResolve);
        assert_eq!(session.cascade().unwrap().origin(), Position::new(4, 0));

        step_while(&mut session, BoardState::CascadeResolve);
        assert_eq!(session.board().block_count(), 0);
        assert_eq!(session.stats().destroyed().boom, 1);
        assert_eq!(session.stats().destroyed().plain, 3);
        assert_eq!(session.state(), BoardState::MergeReconcile);
    }

    #[test]
    fn test_only_timed_phases_have_intervals() {
        let mut session = GameSession::with_seed(config_with(vec![o_piece()]), seed()).unwrap();
        for state in [
            BoardState::SpawningPiece,
            BoardState::FallingPiece,
            BoardState::MergeReconcile,
            BoardState::GroupSettling,
            BoardState::CascadeResolve,
            BoardState::BreakthroughCheck,
            BoardState::WallGeneration,
        ] {
            session.state = state;
            assert_eq!(session.interval().is_none(), state.is_instant(), "{state}");
        }
        session.state = BoardState::GameOver;
        assert!(session.interval().is_none());
    }

    #[test]
    fn test_isolated_bomb_does_not_explode() {
        let mut session = GameSession::with_seed(config_with(vec![bomb()]), seed()).unwrap();
        session.request_next_piece().unwrap();
        session.hard_drop().unwrap();
        session.step();
        assert_eq!(session.state(), BoardState::GroupSettling);
        assert_eq!(session.board().block_count(), 1);
        let block = session.board().block_at(Position::new(4, 0)).unwrap();
        assert!(!session.board().group(block.group()).unwrap().is_piece());
    }

    #[test]
    fn test_destroyed_boom_chains() {
        let mut session = GameSession::with_seed(config_with(vec![bomb()]), seed()).unwrap();
        let floor = [
            NewBlock {
                kind: BlockKind::Boom(BoomPattern::Surround { radius: 1 }),
                ..plain(4, 0)
            },
            plain(5, 0),
        ];
        session
            .board
            .add_group(GroupKind::Settled, crate::core::Pivot::default(), &floor)
            .unwrap();
        session.request_next_piece().unwrap();
        session.hard_drop().unwrap();
        session.step();
        step_while(&mut session, BoardState::CascadeResolve);

        assert_eq!(session.stats().cascades(), 2);
        assert_eq!(session.board().block_count(), 0);
        assert_eq!(session.state(), BoardState::MergeReconcile);
    }

    #[test]
    fn test_falling_fragment_remerges() {
        let mut session = GameSession::with_seed(config_with(vec![o_piece()]), seed()).unwrap();
        let events = record(&mut session);
        session.board.add_block(plain(0, 0)).unwrap();
        session.board.add_block(plain(3, 3)).unwrap();
        session.state = BoardState::MergeReconcile;
        session.step();
        step_while(&mut session, BoardState::GroupSettling);
        assert_eq!(session.state(), BoardState::MergeReconcile);
        session.step();
        assert_eq!(session.state(), BoardState::GroupSettling);
        session.step();
        assert_eq!(session.state(), BoardState::BreakthroughCheck);

        assert!(session.board().block_at(Position::new(3, 0)).is_some());
        assert!(phases(&events.borrow()).starts_with(&[
            BoardState::GroupSettling,
            BoardState::MergeReconcile,
            BoardState::GroupSettling,
        ]));
    }

    #[test]
    fn test_same_seed_same_game() {
        let run = || {
            let mut session = GameSession::with_seed(BoardConfig::default(), seed()).unwrap();
            for frame in 0..2000_u32 {
                let _ = match frame % 7 {
                    0 => session.try_move(MoveDirection::Left),
                    3 => session.try_rotate(Rotation::Clockwise),
                    5 => session.try_move(MoveDirection::Right),
                    _ => Ok(()),
                };
                session.advance(Duration::from_millis(16));
            }
            let cells: Vec<_> = session
                .board()
                .blocks()
                .map(|b| (b.position(), b.kind(), b.health()))
                .collect();
            (session.stats().clone(), cells, session.state())
        };
        assert_eq!(run(), run());
    }
}
