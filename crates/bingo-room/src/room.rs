//! Room actor: the one Tokio task that owns the game.
//!
//! Participants' connection handlers and the draw scheduler both reach
//! the game through [`RoomHandle`], which is a thin wrapper around the
//! actor's command channel. Commands are processed one at a time, so the
//! decision to start a scheduler, the recording of a draw, and the
//! acceptance of a winning claim are each atomic.

use std::collections::HashMap;

use bingo_game::{DrawHistory, DrawPool, GameError, WinningLine, generate_card_with, winning_line};
use bingo_protocol::{
    BingoCard, CardLayout, ClaimRejection, Draw, PlayerId, Recipient, ServerMessage,
};
use bingo_scheduler::{DrawScheduler, DrawSource, DrawStep, SchedulerHandle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::{GameState, RoomConfig, RoomError};

const WINNER_MESSAGE: &str = "You won!";
const ALREADY_WON_MESSAGE: &str = "Someone else already won.";

/// Channel sender for delivering room events to a participant.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// What a participant needs to catch up with a game in progress.
///
/// Taken in the same step as the join, so nothing drawn in between can
/// be missed or duplicated by the live event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchUpSnapshot {
    /// Most recent draw, if any.
    pub last_draw: Option<Draw>,
    /// Every draw of the current game, oldest first.
    pub history: Vec<Draw>,
    pub state: GameState,
    pub winner: Option<PlayerId>,
}

impl CatchUpSnapshot {
    /// The messages a joining participant receives after its card, in order.
    pub fn messages(&self) -> Vec<ServerMessage> {
        let mut msgs = Vec::new();
        if let Some(draw) = self.last_draw {
            msgs.push(ServerMessage::LastNumber {
                letter: draw.letter,
                number: draw.number,
            });
        }
        if !self.history.is_empty() {
            msgs.push(ServerMessage::DrawHistory {
                draws: self.history.clone(),
            });
        }
        match self.state {
            GameState::Won => msgs.push(ServerMessage::GameOver {
                winner: self.winner,
            }),
            GameState::Exhausted => msgs.push(ServerMessage::DrawsExhausted {
                draws: self.history.len(),
            }),
            GameState::Idle | GameState::Drawing => {}
        }
        msgs
    }
}

/// Result of a win claim that reached the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claimant is the winner of this game.
    Winner,
    /// The claim was turned down; the claimant has been told why.
    Rejected(ClaimRejection),
}

impl ClaimOutcome {
    /// `true` for [`ClaimOutcome::Winner`].
    pub fn is_win(&self) -> bool {
        matches!(self, Self::Winner)
    }
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub state: GameState,
    pub player_count: usize,
    /// Draws made in the current game.
    pub draws: usize,
    /// Whether a scheduler is currently attached to the game.
    pub scheduler_running: bool,
    /// Schedulers started since the room was created, across all games.
    pub schedulers_started: u64,
    pub winner: Option<PlayerId>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands sent to the room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(BingoCard, CatchUpSnapshot), RoomError>>,
    },

    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    IsDrawn {
        number: i64,
        reply: oneshot::Sender<bool>,
    },

    Claim {
        player_id: PlayerId,
        card: CardLayout,
        reply: oneshot::Sender<Result<ClaimOutcome, RoomError>>,
    },

    /// Sent only by the scheduler of game `generation`.
    DrawNext {
        generation: u64,
        reply: oneshot::Sender<DrawStep>,
    },

    NewGame {
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    Shutdown,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to the running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Registers a participant and deals its card.
    ///
    /// The first join of an idle room starts the draw scheduler. The
    /// returned snapshot lets a late joiner catch up.
    pub async fn join(
        &self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<(BingoCard, CatchUpSnapshot), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_id,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Removes a participant. Never stops the scheduler.
    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            player_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Whether `number` has been drawn in the current game.
    ///
    /// Numbers outside 1..=75 are never drawn, so they answer `false`.
    pub async fn is_drawn(&self, number: i64) -> Result<bool, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::IsDrawn {
            number,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Submits a win claim for `card`.
    ///
    /// At most one claim per game ever returns [`ClaimOutcome::Winner`].
    pub async fn submit_win_claim(
        &self,
        player_id: PlayerId,
        card: CardLayout,
    ) -> Result<ClaimOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Claim {
            player_id,
            card,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Resets a finished game. Participants keep their cards.
    ///
    /// # Errors
    /// [`RoomError::InvalidState`] unless the game is `Won` or `Exhausted`.
    pub async fn new_game(&self) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::NewGame { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Current state, participant count and draw progress.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Stops the actor and cancels any running scheduler.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Draw source
// ---------------------------------------------------------------------------

/// The scheduler's view of the room.
///
/// Holds a weak sender so a running scheduler never keeps the room alive
/// on its own.
struct RoomDrawSource {
    sender: mpsc::WeakSender<RoomCommand>,
    generation: u64,
}

impl DrawSource for RoomDrawSource {
    async fn next_draw(&self) -> DrawStep {
        let Some(sender) = self.sender.upgrade() else {
            return DrawStep::Stopped;
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = sender
            .send(RoomCommand::DrawNext {
                generation: self.generation,
                reply: reply_tx,
            })
            .await;
        drop(sender);
        if sent.is_err() {
            return DrawStep::Stopped;
        }
        reply_rx.await.unwrap_or(DrawStep::Stopped)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct Participant {
    card: BingoCard,
    sender: PlayerSender,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    config: RoomConfig,
    state: GameState,
    players: HashMap<PlayerId, Participant>,
    pool: DrawPool,
    history: DrawHistory,
    winner: Option<PlayerId>,
    scheduler: Option<SchedulerHandle>,
    schedulers_started: u64,
    /// Bumped per game; stale schedulers are refused draws.
    generation: u64,
    rng: StdRng,
    receiver: mpsc::Receiver<RoomCommand>,
    weak_self: mpsc::WeakSender<RoomCommand>,
}

impl RoomActor {
    fn new(
        config: RoomConfig,
        receiver: mpsc::Receiver<RoomCommand>,
        weak_self: mpsc::WeakSender<RoomCommand>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            state: GameState::Idle,
            players: HashMap::new(),
            pool: DrawPool::full(),
            history: DrawHistory::new(),
            winner: None,
            scheduler: None,
            schedulers_started: 0,
            generation: 0,
            rng,
            receiver,
            weak_self,
        }
    }

    /// Runs the actor loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(
            interval_ms = self.config.draw_interval.as_millis() as u64,
            max_players = self.config.max_players,
            "room actor started"
        );

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(player_id, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { player_id, reply } => {
                    let _ = reply.send(self.handle_leave(player_id));
                }
                RoomCommand::IsDrawn { number, reply } => {
                    let drawn = u8::try_from(number).is_ok_and(|n| self.history.contains(n));
                    let _ = reply.send(drawn);
                }
                RoomCommand::Claim {
                    player_id,
                    card,
                    reply,
                } => {
                    let result = self.handle_claim(player_id, card);
                    let _ = reply.send(result);
                }
                RoomCommand::DrawNext { generation, reply } => {
                    let _ = reply.send(self.handle_draw_next(generation));
                }
                RoomCommand::NewGame { reply } => {
                    let _ = reply.send(self.handle_new_game());
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => {
                    tracing::info!("room shutting down");
                    break;
                }
            }
        }

        self.stop_scheduler();
        tracing::info!("room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<(BingoCard, CatchUpSnapshot), RoomError> {
        if self.players.contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id));
        }
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.config.max_players));
        }

        let card = generate_card_with(&mut self.rng);
        self.players.insert(
            player_id,
            Participant {
                card: card.clone(),
                sender,
            },
        );
        tracing::info!(
            %player_id,
            players = self.players.len(),
            state = %self.state,
            "player joined"
        );

        if self.state == GameState::Idle {
            self.start_game();
        }

        Ok((card, self.snapshot()))
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if self.players.remove(&player_id).is_none() {
            return Err(RoomError::NotInRoom(player_id));
        }
        tracing::info!(
            %player_id,
            players = self.players.len(),
            "player left"
        );
        Ok(())
    }

    fn handle_claim(
        &mut self,
        player_id: PlayerId,
        layout: CardLayout,
    ) -> Result<ClaimOutcome, RoomError> {
        let Some(participant) = self.players.get(&player_id) else {
            return Err(RoomError::NotInRoom(player_id));
        };

        if !self.state.is_drawing() {
            return Ok(self.reject(player_id, ClaimRejection::GameOver));
        }

        let card = match BingoCard::try_from(layout) {
            Ok(card) => card,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "malformed card in claim");
                return Ok(self.reject(player_id, ClaimRejection::MalformedCard));
            }
        };

        if self.config.verify_issued_card && card != participant.card {
            return Ok(self.reject(player_id, ClaimRejection::CardMismatch));
        }

        match winning_line(&card, self.history.drawn_numbers()) {
            Some(line) => {
                self.declare_winner(player_id, line);
                Ok(ClaimOutcome::Winner)
            }
            None => Ok(self.reject(player_id, ClaimRejection::NotAWin)),
        }
    }

    fn handle_draw_next(&mut self, generation: u64) -> DrawStep {
        if generation != self.generation || !self.state.is_drawing() {
            return DrawStep::Stopped;
        }

        if !self.pool.has_remaining() {
            tracing::info!(
                draws = self.history.len(),
                "draw pool exhausted, game over without a winner"
            );
            return self.end_without_winner();
        }

        let recorded = self
            .pool
            .draw_one(&mut self.rng)
            .and_then(|draw| self.record_draw(draw).map(|_| draw));
        match recorded {
            Ok(draw) => DrawStep::Drawn(draw),
            Err(e) => {
                // Pool and history disagree; nothing further can be drawn safely.
                tracing::warn!(error = %e, "draw failed, ending game without a winner");
                self.end_without_winner()
            }
        }
    }

    /// Moves to `Exhausted` and tells everyone. The scheduler ends on its
    /// own once it sees the returned step.
    fn end_without_winner(&mut self) -> DrawStep {
        self.transition(GameState::Exhausted);
        self.scheduler = None;
        let draws = self.history.len();
        self.dispatch(Recipient::All, ServerMessage::DrawsExhausted { draws });
        DrawStep::Exhausted
    }

    fn handle_new_game(&mut self) -> Result<(), RoomError> {
        if !self.state.is_over() {
            return Err(RoomError::InvalidState(format!(
                "cannot start a new game while {}",
                self.state
            )));
        }

        self.stop_scheduler();
        self.pool = DrawPool::full();
        self.history.clear();
        self.winner = None;
        self.transition(GameState::Idle);
        tracing::info!(players = self.players.len(), "game reset");
        self.dispatch(Recipient::All, ServerMessage::NewGame);

        if !self.players.is_empty() {
            self.start_game();
        }
        Ok(())
    }

    /// Starts drawing for the current game. Called with the room `Idle`.
    fn start_game(&mut self) {
        if self.scheduler.is_some() {
            return;
        }
        self.generation += 1;
        let source = RoomDrawSource {
            sender: self.weak_self.clone(),
            generation: self.generation,
        };
        self.scheduler = Some(DrawScheduler::new(self.config.scheduler_config(), source).spawn());
        self.schedulers_started += 1;
        self.transition(GameState::Drawing);
        tracing::info!(
            generation = self.generation,
            players = self.players.len(),
            "game started"
        );
    }

    /// Appends a draw to the history and announces it.
    fn record_draw(&mut self, draw: Draw) -> Result<usize, GameError> {
        let sequence = self.history.record(draw)?;
        tracing::debug!(%draw, sequence, "number drawn");
        self.dispatch(
            Recipient::All,
            ServerMessage::DrawAnnounced {
                letter: draw.letter,
                number: draw.number,
                sequence,
            },
        );
        Ok(sequence)
    }

    fn declare_winner(&mut self, player_id: PlayerId, line: WinningLine) {
        self.winner = Some(player_id);
        self.transition(GameState::Won);
        self.stop_scheduler();
        tracing::info!(
            %player_id,
            %line,
            draws = self.history.len(),
            "bingo! winner declared"
        );

        self.dispatch(
            Recipient::Player(player_id),
            ServerMessage::BingoWinner {
                winner: player_id,
                message: WINNER_MESSAGE.to_string(),
                is_winner: true,
            },
        );
        self.dispatch(
            Recipient::AllExcept(player_id),
            ServerMessage::BingoWinner {
                winner: player_id,
                message: ALREADY_WON_MESSAGE.to_string(),
                is_winner: false,
            },
        );
    }

    fn reject(&self, player_id: PlayerId, reason: ClaimRejection) -> ClaimOutcome {
        tracing::debug!(%player_id, %reason, "win claim rejected");
        self.dispatch(
            Recipient::Player(player_id),
            ServerMessage::ClaimRejected { reason },
        );
        ClaimOutcome::Rejected(reason)
    }

    /// Cancels and forgets the current scheduler. Safe to call repeatedly.
    fn stop_scheduler(&mut self) {
        if let Some(handle) = self.scheduler.take() {
            handle.cancel();
        }
    }

    fn transition(&mut self, to: GameState) {
        if !self.state.can_transition_to(to) {
            tracing::warn!(from = %self.state, %to, "unexpected game state transition");
        }
        self.state = to;
    }

    fn snapshot(&self) -> CatchUpSnapshot {
        CatchUpSnapshot {
            last_draw: self.history.last(),
            history: self.history.draws().to_vec(),
            state: self.state,
            winner: self.winner,
        }
    }

    /// Delivers a message to its recipients. Participants whose
    /// receiver is gone are skipped.
    fn dispatch(&self, recipient: Recipient, msg: ServerMessage) {
        match recipient {
            Recipient::All => {
                for participant in self.players.values() {
                    let _ = participant.sender.send(msg.clone());
                }
            }
            Recipient::Player(pid) => {
                if let Some(participant) = self.players.get(&pid) {
                    let _ = participant.sender.send(msg);
                }
            }
            Recipient::AllExcept(excluded) => {
                for (pid, participant) in &self.players {
                    if *pid != excluded {
                        let _ = participant.sender.send(msg.clone());
                    }
                }
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            state: self.state,
            player_count: self.players.len(),
            draws: self.history.len(),
            scheduler_running: self.scheduler.is_some(),
            schedulers_started: self.schedulers_started,
            winner: self.winner,
        }
    }
}

/// Spawns the room actor and returns a handle to it.
///
/// The actor stops on [`RoomHandle::shutdown`] or once every handle has
/// been dropped.
pub fn spawn_room(config: RoomConfig) -> RoomHandle {
    let config = config.validated();
    let (tx, rx) = mpsc::channel(config.channel_size);
    let actor = RoomActor::new(config, rx, tx.downgrade());
    tokio::spawn(actor.run());
    RoomHandle { sender: tx }
}
