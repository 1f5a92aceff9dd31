use super::backend::{Membership, NetError, RoomBackend};
use super::{
    normalize_player_name, normalize_room_players, remote_snake_players, PlayerPayload, RoomPlayer,
    Segment,
};
use crate::game::{RemotePlayer, RunSnapshot};
use std::fmt;
use tracing::{info, warn};

/// A player's presence in a multiplayer room: joining & leaving, publishing
/// the local run's state, and tracking the other players in the room.
///
/// Failures of operations that the game fires and forgets (leaving and
/// pushing state) are logged instead of being returned.
pub(crate) struct MultiplayerSession<B> {
    backend: B,
    max_players: usize,
    membership: Option<Membership>,
    player_name: String,
    players: Vec<RoomPlayer>,
    /// Serialized form of the last payload sent, used to skip duplicates
    last_signature: Option<String>,
}

impl<B: RoomBackend> MultiplayerSession<B> {
    pub(crate) fn new(backend: B, max_players: usize) -> Self {
        MultiplayerSession {
            backend,
            max_players,
            membership: None,
            player_name: String::new(),
            players: Vec::new(),
            last_signature: None,
        }
    }

    pub(crate) fn is_joined(&self) -> bool {
        self.membership.is_some()
    }

    /// Join a room under the given name.  If already in a room, the current
    /// membership is returned unchanged.
    pub(crate) fn join(&mut self, raw_name: &str) -> Result<Membership, NetError> {
        let name = normalize_player_name(raw_name).ok_or(NetError::NameRequired)?;
        if let Some(ref m) = self.membership {
            return Ok(m.clone());
        }
        let m = self.backend.join_room(&name, self.max_players)?;
        info!(room_id = %m.room_id, player_id = %m.player_id, name, "Joined multiplayer room");
        self.membership = Some(m.clone());
        self.player_name = name;
        self.players.clear();
        self.last_signature = None;
        if let Err(e) = self.poll() {
            report(&e);
        }
        Ok(m)
    }

    /// Leave the current room, if any, recording `reason` as why
    pub(crate) fn leave(&mut self, reason: &str) {
        let Some(m) = self.membership.take() else {
            return;
        };
        self.players.clear();
        self.last_signature = None;
        info!(room_id = %m.room_id, reason, "Leaving multiplayer room");
        if let Err(e) = self.backend.leave_room(&m, reason) {
            report(&e);
        }
    }

    /// Publish the state of the local run.  Nothing is sent if not in a room
    /// or if the state is unchanged since the last push.
    pub(crate) fn push_state(&mut self, snapshot: &RunSnapshot) {
        let Some(ref m) = self.membership else {
            return;
        };
        let running = snapshot.running && !snapshot.game_over;
        let payload = PlayerPayload {
            name: self.player_name.clone(),
            score: snapshot.score,
            stage: snapshot.stage.max(1),
            game_over: snapshot.game_over,
            game_over_reason: snapshot.game_over_reason.map(|r| r.as_str().to_owned()),
            running,
            snake: if running {
                snapshot.snake.iter().copied().map(Segment::from).collect()
            } else {
                Vec::new()
            },
        };
        let signature = match serde_json::to_string(&payload) {
            Ok(sig) => sig,
            Err(e) => {
                report(&NetError::Serialize(e));
                return;
            }
        };
        if self.last_signature.as_ref() == Some(&signature) {
            return;
        }
        self.last_signature = Some(signature);
        if let Err(e) = self.backend.update_player_state(m, &payload) {
            report(&e);
        }
    }

    /// Refresh the roster of the current room
    pub(crate) fn poll(&mut self) -> Result<(), NetError> {
        let Some(ref m) = self.membership else {
            return Ok(());
        };
        let docs = self.backend.room_players(&m.room_id)?;
        self.players = normalize_room_players(&docs);
        Ok(())
    }

    /// The other players in the room whose snakes are on the board
    pub(crate) fn remote_snake_players(&self) -> Vec<RemotePlayer> {
        remote_snake_players(
            &self.players,
            self.membership.as_ref().map(|m| m.player_id.as_str()),
        )
    }
}

fn report(e: &NetError) {
    warn!(error = %e, "Multiplayer operation failed");
}

impl<B: fmt::Debug> fmt::Debug for MultiplayerSession<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiplayerSession")
            .field("backend", &self.backend)
            .field("max_players", &self.max_players)
            .field("membership", &self.membership)
            .field("player_name", &self.player_name)
            .field("players", &self.players)
            .field("last_signature", &self.last_signature)
            .finish_non_exhaustive()
    }
}
