//! Duel state machine
//!
//! One `MatchState` per match, mutated by a single owner. Every public
//! operation is total: input that the current phase does not accept is
//! ignored, and verification faults arrive here already degraded to a miss.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::verify::{VerificationRequest, VerificationResult};
use crate::ws::protocol::{GameEvent, MatchSnapshot, PlayerSnapshot};

use super::aim::{compute_aim, AimVector};
use super::combat::{CombatSystem, Hitbox, ShotOutcome};
use super::constants::{
    ANIMATION_FRAME, BOARD_CEILING, BOARD_HEIGHT, BOARD_WIDTH, LAUNCH_HEIGHT_OFFSET,
    MAX_DRAG_DISTANCE, MAX_HEALTH, MIN_SHOT_VELOCITY, PLAYER_LAYOUT, TURN_TRANSITION_DELAY,
};
use super::trajectory::{ImpactPoint, LaunchParameters, Point, TrajectoryModel};

/// Player index, 0 or 1
pub type PlayerId = u8;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Turn started, no aim yet
    Idle,
    /// Active player has an aim
    Aiming,
    /// Shot accepted (transient)
    ShotCommitted,
    /// Waiting on the verification authority
    AwaitingVerification,
    /// Projectile in flight
    Animating,
    /// Applying the outcome (transient)
    Resolving,
    /// Pause before the turn flips
    TurnTransition,
    /// A player ran out of health
    GameOver,
}

impl MatchPhase {
    /// Aim, commit and movement are only accepted between shots
    pub fn accepts_input(self) -> bool {
        matches!(self, MatchPhase::Idle | MatchPhase::Aiming)
    }
}

/// Player state in a match (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub health: u32,
    pub max_health: u32,
    pub position: Point,
    pub min_x: f32,
    pub max_x: f32,
}

impl PlayerState {
    pub fn spawn(id: PlayerId) -> Self {
        let (name, x, y, min_x, max_x) = PLAYER_LAYOUT[id as usize];
        Self {
            id,
            name: name.to_string(),
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            position: Point::new(x, y),
            min_x,
            max_x,
        }
    }

    pub fn hitbox(&self) -> Hitbox {
        Hitbox::around(self.position)
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            health: self.health,
            max_health: self.max_health,
            x: self.position.x,
            y: self.position.y,
            min_x: self.min_x,
            max_x: self.max_x,
        }
    }
}

/// Player 0 fires rightward, player 1 leftward
pub fn direction_for(player: PlayerId) -> f32 {
    if player == 0 {
        1.0
    } else {
        -1.0
    }
}

fn opponent_of(player: PlayerId) -> PlayerId {
    1 - player
}

/// Everything fixed at the moment a shot is committed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommittedShot {
    pub shot_id: u64,
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub launch: LaunchParameters,
    pub impact: ImpactPoint,
    /// Defender hitbox latched at commit
    pub target: Hitbox,
}

/// A verification request the owner must dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingVerification {
    pub shot_id: u64,
    pub request: VerificationRequest,
}

#[derive(Debug, Clone, Copy)]
struct Flight {
    /// Flight time, one unit per animation frame
    t: f32,
    hit: bool,
}

/// Match state (owned by the match task)
pub struct MatchState {
    pub id: Uuid,
    players: [PlayerState; 2],
    active: PlayerId,
    phase: MatchPhase,
    aim: Option<AimVector>,
    dragging: bool,
    shot: Option<CommittedShot>,
    flight: Option<Flight>,
    transition_remaining: Duration,
    winner: Option<PlayerId>,
    next_shot_id: u64,
    events: Vec<GameEvent>,
}

impl MatchState {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            players: [PlayerState::spawn(0), PlayerState::spawn(1)],
            active: 0,
            phase: MatchPhase::Idle,
            aim: None,
            dragging: false,
            shot: None,
            flight: None,
            transition_remaining: Duration::ZERO,
            winner: None,
            next_shot_id: 0,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// The player whose turn it is; None once the match is over
    pub fn active_player(&self) -> Option<PlayerId> {
        (self.phase != MatchPhase::GameOver).then_some(self.active)
    }

    pub fn player(&self, id: PlayerId) -> &PlayerState {
        &self.players[id as usize]
    }

    pub fn aim(&self) -> Option<AimVector> {
        self.aim
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// The shot currently in verification or flight
    #[cfg(test)]
    pub fn committed_shot(&self) -> Option<&CommittedShot> {
        self.shot.as_ref()
    }

    /// Drain events produced since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            phase: self.phase(),
            active_player: self.active_player(),
            players: [0, 1].map(|id| self.player(id).snapshot()).to_vec(),
            aim: self.aim(),
            winner: self.winner(),
        }
    }

    // ========================================================================
    // Aiming
    // ========================================================================

    pub fn begin_drag(&mut self) {
        if !self.phase.accepts_input() {
            debug!(match_id = %self.id, phase = ?self.phase, "Drag ignored");
            return;
        }
        self.dragging = true;
    }

    /// Pointer moved; re-aims from the active player's position
    pub fn update_drag(&mut self, pointer: Point) {
        if !self.dragging || !self.phase.accepts_input() {
            return;
        }
        let origin = self.players[self.active as usize].position;
        self.update_aim(compute_aim(origin, pointer, MAX_DRAG_DISTANCE));
    }

    /// Pointer released; commits whatever aim is current
    pub fn end_drag(&mut self) -> Option<PendingVerification> {
        if !self.dragging || !self.phase.accepts_input() {
            return None;
        }
        self.dragging = false;
        self.events.push(GameEvent::TrajectoryCleared);
        self.commit_shot()
    }

    /// Replace the active player's aim and publish the preview
    pub fn update_aim(&mut self, aim: AimVector) {
        if !self.phase.accepts_input() {
            debug!(match_id = %self.id, phase = ?self.phase, "Aim ignored");
            return;
        }

        self.aim = Some(aim);
        self.phase = MatchPhase::Aiming;

        let preview = TrajectoryModel::preview(&self.launch_for(aim));
        self.events.push(GameEvent::AimUpdated {
            player_id: self.active,
            power_percent: aim.power_percent,
            angle_degrees: aim.angle_degrees,
        });
        self.events.push(GameEvent::TrajectoryPreview {
            player_id: self.active,
            points: preview,
        });
    }

    fn launch_for(&self, aim: AimVector) -> LaunchParameters {
        let attacker = &self.players[self.active as usize];
        LaunchParameters {
            origin_x: attacker.position.x,
            origin_y: attacker.position.y - LAUNCH_HEIGHT_OFFSET,
            velocity: aim.power_percent,
            angle_degrees: aim.angle_degrees,
            direction: direction_for(self.active),
        }
    }

    // ========================================================================
    // Shot lifecycle
    // ========================================================================

    /// Fix the current aim into a shot and produce its verification request.
    ///
    /// Returns None (and changes nothing) when the match is busy or the aim
    /// is missing or too weak.
    pub fn commit_shot(&mut self) -> Option<PendingVerification> {
        if !self.phase.accepts_input() {
            debug!(match_id = %self.id, phase = ?self.phase, "Shot rejected, match busy");
            return None;
        }

        let aim = match self.aim {
            Some(aim) if aim.power_percent >= MIN_SHOT_VELOCITY => aim,
            _ => {
                debug!(match_id = %self.id, aim = ?self.aim, "Shot rejected, not enough power");
                return None;
            }
        };

        let attacker = self.active;
        let defender = opponent_of(attacker);
        let launch = self.launch_for(aim);
        let defender_state = &self.players[defender as usize];
        let target = defender_state.hitbox();
        let impact = TrajectoryModel::solve_impact_at_x(&launch, defender_state.position.x);

        self.next_shot_id += 1;
        let shot = CommittedShot {
            shot_id: self.next_shot_id,
            attacker,
            defender,
            launch,
            impact,
            target,
        };

        self.phase = MatchPhase::ShotCommitted;
        self.dragging = false;
        self.aim = None;
        self.shot = Some(shot);
        self.events.push(GameEvent::ShotCommitted {
            shot_id: shot.shot_id,
            player_id: attacker,
            launch,
            impact,
        });

        info!(
            match_id = %self.id,
            shot_id = shot.shot_id,
            player_id = attacker,
            power = aim.power_percent,
            angle = aim.angle_degrees,
            impact_y = impact.y,
            "Shot committed"
        );

        self.phase = MatchPhase::AwaitingVerification;
        Some(PendingVerification {
            shot_id: shot.shot_id,
            request: VerificationRequest::new(&impact, target),
        })
    }

    /// Verification answered; starts the flight animation.
    /// Returns false for answers that do not belong to the outstanding shot.
    pub fn on_verification(&mut self, shot_id: u64, result: VerificationResult) -> bool {
        let outstanding = self.shot.map(|s| s.shot_id);
        if self.phase != MatchPhase::AwaitingVerification || outstanding != Some(shot_id) {
            debug!(
                match_id = %self.id,
                shot_id,
                ?outstanding,
                phase = ?self.phase,
                "Stale verification ignored"
            );
            return false;
        }

        info!(match_id = %self.id, shot_id, hit = result.hit, "Shot verified");
        self.flight = Some(Flight { t: 0.0, hit: result.hit });
        self.phase = MatchPhase::Animating;
        true
    }

    /// Advance time-driven phases by `dt`
    pub fn tick(&mut self, dt: Duration) {
        match self.phase {
            MatchPhase::Animating => self.advance_flight(dt),
            MatchPhase::TurnTransition => {
                self.transition_remaining = self.transition_remaining.saturating_sub(dt);
                if self.transition_remaining.is_zero() {
                    self.finish_turn();
                }
            }
            _ => {}
        }
    }

    fn advance_flight(&mut self, dt: Duration) {
        let (Some(shot), Some(flight)) = (self.shot, self.flight.as_mut()) else {
            return;
        };

        flight.t += dt.as_secs_f32() / ANIMATION_FRAME.as_secs_f32();
        let position = TrajectoryModel::position_at(&shot.launch, flight.t);
        let hit = flight.hit;

        self.events.push(GameEvent::ProjectileMoved {
            shot_id: shot.shot_id,
            x: position.x,
            y: position.y,
        });

        if shot.target.contains(position) || out_of_bounds(position) {
            self.flight = None;
            self.phase = MatchPhase::Resolving;
            self.apply_verification_result(VerificationResult { hit });
        }
    }

    /// Apply a verified outcome to the defender and decide what comes next
    fn apply_verification_result(&mut self, result: VerificationResult) {
        if self.phase != MatchPhase::Resolving {
            return;
        }
        let Some(shot) = self.shot.take() else {
            return;
        };

        self.events.push(GameEvent::ShotOutcome {
            shot_id: shot.shot_id,
            outcome: ShotOutcome::from_hit(result.hit),
        });

        let defender = &mut self.players[shot.defender as usize];
        if result.hit {
            let (health, _) = CombatSystem::apply_hit(defender.health);
            defender.health = health;
            self.events.push(GameEvent::HealthChanged {
                player_id: defender.id,
                health,
                max_health: defender.max_health,
            });
        }

        if defender.health == 0 {
            self.phase = MatchPhase::GameOver;
            self.winner = Some(shot.attacker);
            self.aim = None;
            self.events.push(GameEvent::GameOver {
                winner_id: shot.attacker,
            });
            info!(match_id = %self.id, winner = shot.attacker, "Game over");
        } else {
            self.phase = MatchPhase::TurnTransition;
            self.transition_remaining = TURN_TRANSITION_DELAY;
        }
    }

    fn finish_turn(&mut self) {
        self.active = opponent_of(self.active);
        self.aim = None;
        self.dragging = false;
        self.phase = MatchPhase::Idle;
        self.events.push(GameEvent::TurnChanged {
            player_id: self.active,
        });
        debug!(match_id = %self.id, player_id = self.active, "Turn changed");
    }

    // ========================================================================
    // Other commands
    // ========================================================================

    /// Shift the active player horizontally within their bounds
    pub fn move_player(&mut self, delta: f32) {
        if !self.phase.accepts_input() {
            debug!(match_id = %self.id, phase = ?self.phase, "Move ignored");
            return;
        }

        let player = &mut self.players[self.active as usize];
        player.position.x = (player.position.x + delta).clamp(player.min_x, player.max_x);
        self.events.push(GameEvent::PlayerMoved {
            player_id: player.id,
            x: player.position.x,
        });
    }

    /// Full reset; only valid after game over
    pub fn restart(&mut self) {
        if self.phase != MatchPhase::GameOver {
            debug!(match_id = %self.id, phase = ?self.phase, "Restart ignored");
            return;
        }

        self.players = [PlayerState::spawn(0), PlayerState::spawn(1)];
        self.active = 0;
        self.phase = MatchPhase::Idle;
        self.aim = None;
        self.dragging = false;
        self.shot = None;
        self.flight = None;
        self.transition_remaining = Duration::ZERO;
        self.winner = None;

        self.events.push(GameEvent::MatchRestarted);
        self.events.push(GameEvent::TurnChanged { player_id: 0 });
        info!(match_id = %self.id, "Match restarted");
    }
}

fn out_of_bounds(p: Point) -> bool {
    p.x < 0.0 || p.x > BOARD_WIDTH || p.y < BOARD_CEILING || p.y > BOARD_HEIGHT
}
