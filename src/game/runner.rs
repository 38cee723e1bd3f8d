//! Match task: drives one `MatchState` from inputs, verdicts and frame ticks

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::verify::{verify_or_miss, VerificationGateway, VerificationResult};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::constants::ANIMATION_FRAME;
use super::r#match::{MatchState, PendingVerification};
use super::trajectory::Point;
use super::PlayerInput;

/// Matches nobody watches for this long shut down
pub const IDLE_SHUTDOWN: Duration = Duration::from_secs(300);

/// Verification answer routed back into the match task
#[derive(Debug, Clone, Copy)]
struct Verdict {
    shot_id: u64,
    result: VerificationResult,
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub event_tx: broadcast::Sender<ServerMsg>,
}

impl MatchHandle {
    /// Connected presentation clients
    pub fn connections(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_connections(&self) -> usize {
        self.matches.iter().map(|m| m.value().connections()).sum()
    }

    /// Start a new match task and register it until it finishes
    pub fn spawn_match(
        self: &Arc<Self>,
        gateway: Arc<dyn VerificationGateway>,
        verify_timeout: Option<Duration>,
    ) -> MatchHandle {
        let (game_match, handle) = GameMatch::new(Uuid::new_v4(), gateway, verify_timeout);
        self.insert(handle.clone());

        let registry = Arc::clone(self);
        let id = handle.id;
        tokio::spawn(async move {
            game_match.run().await;
            registry.remove(&id);
        });

        handle
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative duel match
pub struct GameMatch {
    state: MatchState,
    input_rx: mpsc::Receiver<PlayerInput>,
    event_tx: broadcast::Sender<ServerMsg>,
    verdict_tx: mpsc::Sender<Verdict>,
    verdict_rx: mpsc::Receiver<Verdict>,
    gateway: Arc<dyn VerificationGateway>,
    verify_timeout: Option<Duration>,
}

impl GameMatch {
    /// Create a new match
    pub fn new(
        id: Uuid,
        gateway: Arc<dyn VerificationGateway>,
        verify_timeout: Option<Duration>,
    ) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (event_tx, _) = broadcast::channel(256);
        let (verdict_tx, verdict_rx) = mpsc::channel(4);

        let handle = MatchHandle {
            id,
            input_tx,
            event_tx: event_tx.clone(),
        };

        let game_match = Self {
            state: MatchState::new(id),
            input_rx,
            event_tx,
            verdict_tx,
            verdict_rx,
            gateway,
            verify_timeout,
        };

        (game_match, handle)
    }

    /// Run the match loop until every handle is gone or nobody has watched
    /// for `IDLE_SHUTDOWN`
    pub async fn run(mut self) {
        info!(match_id = %self.state.id, "Match started");

        let mut frames = interval(ANIMATION_FRAME);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut unwatched_since: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = frames.tick() => {
                    self.state.tick(ANIMATION_FRAME);

                    if self.event_tx.receiver_count() == 0 {
                        let since = *unwatched_since.get_or_insert_with(Instant::now);
                        if since.elapsed() >= IDLE_SHUTDOWN {
                            info!(match_id = %self.state.id, "No viewers left, closing match");
                            break;
                        }
                    } else {
                        unwatched_since = None;
                    }
                }
                input = self.input_rx.recv() => match input {
                    Some(input) => self.process_input(input),
                    None => {
                        info!(match_id = %self.state.id, "All handles dropped, closing match");
                        break;
                    }
                },
                Some(verdict) = self.verdict_rx.recv() => {
                    self.state.on_verification(verdict.shot_id, verdict.result);
                }
            }

            self.flush_events();
        }

        info!(match_id = %self.state.id, "Match ended");
    }

    /// Apply one presentation command
    fn process_input(&mut self, input: PlayerInput) {
        trace!(
            match_id = %self.state.id,
            connection_id = %input.connection_id,
            received_at = input.received_at,
            msg = ?input.msg,
            "Input"
        );

        match input.msg {
            ClientMsg::BeginDrag => self.state.begin_drag(),
            ClientMsg::UpdateDrag {
                pointer_x,
                pointer_y,
            } => self.state.update_drag(Point::new(pointer_x, pointer_y)),
            ClientMsg::EndDrag => {
                if let Some(pending) = self.state.end_drag() {
                    self.dispatch_verification(pending);
                }
            }
            ClientMsg::CommitShot => {
                if let Some(pending) = self.state.commit_shot() {
                    self.dispatch_verification(pending);
                }
            }
            ClientMsg::MovePlayer { delta } => self.state.move_player(delta),
            ClientMsg::RestartMatch => self.state.restart(),
            ClientMsg::RequestState => {
                let state = ServerMsg::State {
                    match_id: self.state.id,
                    snapshot: self.state.snapshot(),
                };
                self.reply(input.connection_id, &input.reply_tx, state);
            }
            ClientMsg::Ping { t } => {
                self.reply(input.connection_id, &input.reply_tx, ServerMsg::Pong { t });
            }
        }
    }

    /// Answer one connection without broadcasting
    fn reply(&self, connection_id: Uuid, reply_tx: &mpsc::Sender<ServerMsg>, msg: ServerMsg) {
        if reply_tx.try_send(msg).is_err() {
            debug!(match_id = %self.state.id, connection_id = %connection_id, "Reply dropped");
        }
    }

    /// Ask the gateway off-task; the answer comes back as a verdict.
    /// Faults are already a miss by the time they reach the channel.
    fn dispatch_verification(&self, pending: PendingVerification) {
        let gateway = Arc::clone(&self.gateway);
        let verdict_tx = self.verdict_tx.clone();
        let timeout = self.verify_timeout;
        let match_id = self.state.id;

        tokio::spawn(async move {
            let result = verify_or_miss(gateway.as_ref(), pending.request, timeout).await;
            let verdict = Verdict {
                shot_id: pending.shot_id,
                result,
            };
            if verdict_tx.send(verdict).await.is_err() {
                debug!(match_id = %match_id, shot_id = pending.shot_id, "Match gone before verdict");
            }
        });
    }

    /// Broadcast events produced by the last step
    fn flush_events(&mut self) {
        let events = self.state.take_events();
        if !events.is_empty() {
            let _ = self.event_tx.send(ServerMsg::Events { events });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::ShotOutcome;
    use crate::game::r#match::MatchPhase;
    use crate::verify::gateway::GatewayError;
    use crate::verify::UnavailableGateway;
    use crate::ws::protocol::GameEvent;
    use futures::future::{self, BoxFuture, FutureExt};

    struct FixedGateway(bool);

    impl VerificationGateway for FixedGateway {
        fn verify_hit(
            &self,
            _request: crate::verify::VerificationRequest,
        ) -> BoxFuture<'_, Result<VerificationResult, GatewayError>> {
            future::ready(Ok(VerificationResult { hit: self.0 })).boxed()
        }
    }

    fn input_with_reply(msg: ClientMsg, reply_tx: mpsc::Sender<ServerMsg>) -> PlayerInput {
        PlayerInput {
            connection_id: Uuid::new_v4(),
            msg,
            received_at: 0,
            reply_tx,
        }
    }

    /// Input whose replies nobody reads
    fn input(msg: ClientMsg) -> PlayerInput {
        let (reply_tx, _) = mpsc::channel(1);
        input_with_reply(msg, reply_tx)
    }

    /// Drag from player one's position so the shot is accepted
    async fn drag_and_release(handle: &MatchHandle) {
        for msg in [
            ClientMsg::BeginDrag,
            ClientMsg::UpdateDrag {
                pointer_x: 250.0,
                pointer_y: 635.0,
            },
            ClientMsg::EndDrag,
        ] {
            handle.input_tx.send(input(msg)).await.unwrap();
        }
    }

    /// Collect events until one matches `stop`
    async fn events_until(
        rx: &mut broadcast::Receiver<ServerMsg>,
        stop: impl Fn(&GameEvent) -> bool,
    ) -> Vec<GameEvent> {
        let mut seen = Vec::new();
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(60), rx.recv())
                .await
                .expect("match went quiet")
                .expect("event channel closed");
            if let ServerMsg::Events { events } = msg {
                let done = events.iter().any(&stop);
                seen.extend(events);
                if done {
                    return seen;
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_round_trip_through_gateway() {
        let (game_match, handle) = GameMatch::new(Uuid::new_v4(), Arc::new(FixedGateway(true)), None);
        let mut rx = handle.event_tx.subscribe();
        tokio::spawn(game_match.run());

        drag_and_release(&handle).await;
        let events = events_until(&mut rx, |e| matches!(e, GameEvent::TurnChanged { .. })).await;

        assert!(events.iter().any(|e| matches!(e, GameEvent::ShotCommitted { .. })));
        assert!(events.iter().any(|e| matches!(e, GameEvent::ProjectileMoved { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::ShotOutcome { outcome: ShotOutcome::Hit, .. }
        )));
        assert!(events.contains(&GameEvent::HealthChanged {
            player_id: 1,
            health: 2,
            max_health: 3,
        }));
        assert_eq!(events.last(), Some(&GameEvent::TurnChanged { player_id: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_faulty_gateway_still_advances_turn() {
        let (game_match, handle) = GameMatch::new(Uuid::new_v4(), Arc::new(UnavailableGateway), None);
        let mut rx = handle.event_tx.subscribe();
        tokio::spawn(game_match.run());

        drag_and_release(&handle).await;
        let events = events_until(&mut rx, |e| matches!(e, GameEvent::TurnChanged { .. })).await;

        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::ShotOutcome { outcome: ShotOutcome::Miss, .. }
        )));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::HealthChanged { .. })));

        let (reply_tx, mut reply_rx) = mpsc::channel(4);
        handle
            .input_tx
            .send(input_with_reply(ClientMsg::RequestState, reply_tx))
            .await
            .unwrap();
        match reply_rx.recv().await.unwrap() {
            ServerMsg::State { snapshot, .. } => {
                assert_eq!(snapshot.phase, MatchPhase::Idle);
                assert_eq!(snapshot.active_player, Some(1));
                assert_eq!(snapshot.players[1].health, 3);
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_and_pong_go_to_requester_only() {
        let (game_match, handle) = GameMatch::new(Uuid::new_v4(), Arc::new(FixedGateway(false)), None);
        let mut bystander = handle.event_tx.subscribe();
        tokio::spawn(game_match.run());

        let (reply_tx, mut reply_rx) = mpsc::channel(4);
        for msg in [ClientMsg::RequestState, ClientMsg::Ping { t: 42 }] {
            handle
                .input_tx
                .send(input_with_reply(msg, reply_tx.clone()))
                .await
                .unwrap();
        }

        assert!(matches!(reply_rx.recv().await, Some(ServerMsg::State { match_id, .. }) if match_id == handle.id));
        assert!(matches!(reply_rx.recv().await, Some(ServerMsg::Pong { t: 42 })));

        // A drag makes the match broadcast; nothing but events reaches others
        drag_and_release(&handle).await;
        let msg = tokio::time::timeout(Duration::from_secs(1), bystander.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(msg, ServerMsg::Events { .. }), "got {:?}", msg);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unwatched_match_leaves_registry() {
        let registry = Arc::new(MatchRegistry::new());
        let handle = registry.spawn_match(Arc::new(FixedGateway(false)), None);
        assert!(registry.get(&handle.id).is_some());
        assert_eq!(registry.active_matches(), 1);

        tokio::time::sleep(IDLE_SHUTDOWN + Duration::from_secs(1)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(registry.get(&handle.id).is_none());
        assert_eq!(registry.active_matches(), 0);
    }
}
