use super::{choose_room_for_join, PlayerDoc, PlayerPayload, PlayerStatus, RoomSummary};
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

/// How many times to try finding a room with a free seat before giving up
const JOIN_RETRY_ATTEMPTS: usize = 6;

/// Identifies a player's seat in a room
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct Membership {
    pub(crate) room_id: String,
    pub(crate) player_id: String,
}

/// Storage for rooms & the documents of the players in them
pub(crate) trait RoomBackend {
    /// Allocate a seat for a new player named `name` in a room holding fewer
    /// than `max_players` active players, creating a room if necessary
    fn join_room(&mut self, name: &str, max_players: usize) -> Result<Membership, NetError>;

    /// Fetch the documents of all players who have ever been in a room,
    /// including those who have left
    fn room_players(&mut self, room_id: &str) -> Result<Vec<PlayerDoc>, NetError>;

    fn update_player_state(
        &mut self,
        membership: &Membership,
        payload: &PlayerPayload,
    ) -> Result<(), NetError>;

    /// Mark a player as gone, recording `reason` as why their run ended
    fn leave_room(&mut self, membership: &Membership, reason: &str) -> Result<(), NetError>;
}

/// A [`RoomBackend`] that keeps rooms in a shared directory: one
/// subdirectory per room, holding one JSON document per player.  Documents
/// are replaced atomically by writing a temporary file and renaming it over
/// the previous document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct DirBackend {
    root: PathBuf,
}

impl DirBackend {
    pub(crate) fn new(root: PathBuf) -> DirBackend {
        DirBackend { root }
    }

    fn room_dir(&self, room_id: &str) -> PathBuf {
        self.root.join(room_id)
    }

    /// Summarize every room under the root directory
    fn rooms(&self) -> Result<Vec<RoomSummary>, NetError> {
        let entries = match fs_err::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(NetError::ReadRooms(e)),
        };
        let mut rooms = Vec::new();
        for entry in entries {
            let entry = entry.map_err(NetError::ReadRooms)?;
            if !entry.file_type().map_err(NetError::ReadRooms)?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if id.starts_with('.') {
                continue;
            }
            let docs = read_players(&entry.path())?;
            rooms.push(RoomSummary {
                id,
                active_count: docs
                    .iter()
                    .filter(|d| d.status == PlayerStatus::Active)
                    .count(),
                updated_at: docs.iter().map(|d| d.updated_at).max().unwrap_or(0),
            });
        }
        Ok(rooms)
    }
}

impl RoomBackend for DirBackend {
    fn join_room(&mut self, name: &str, max_players: usize) -> Result<Membership, NetError> {
        let player_id = new_id("player");
        for attempt in 0..JOIN_RETRY_ATTEMPTS {
            let rooms = self.rooms()?;
            let room_id = match choose_room_for_join(&rooms, max_players) {
                Some(room) => room.id.clone(),
                None => new_id("room"),
            };
            let dir = self.room_dir(&room_id);
            fs_err::create_dir_all(&dir).map_err(NetError::WritePlayer)?;
            let now = now_millis();
            let doc = PlayerDoc {
                id: player_id.clone(),
                payload: PlayerPayload {
                    name: name.to_owned(),
                    stage: 1,
                    ..PlayerPayload::default()
                },
                status: PlayerStatus::Active,
                joined_at: now,
                updated_at: now,
            };
            write_doc(&dir, &doc)?;
            // Someone else may have taken the last seat in the meantime.
            let active = read_players(&dir)?
                .iter()
                .filter(|d| d.status == PlayerStatus::Active)
                .count();
            if active <= max_players {
                debug!(%room_id, %player_id, "Joined room");
                return Ok(Membership { room_id, player_id });
            }
            debug!(%room_id, attempt, "Room filled up during join; retrying");
            match fs_err::remove_file(doc_path(&dir, &player_id)) {
                Ok(()) => (),
                Err(e) if e.kind() == ErrorKind::NotFound => (),
                Err(e) => return Err(NetError::WritePlayer(e)),
            }
        }
        Err(NetError::JoinFailed)
    }

    fn room_players(&mut self, room_id: &str) -> Result<Vec<PlayerDoc>, NetError> {
        read_players(&self.room_dir(room_id))
    }

    fn update_player_state(
        &mut self,
        membership: &Membership,
        payload: &PlayerPayload,
    ) -> Result<(), NetError> {
        let dir = self.room_dir(&membership.room_id);
        let now = now_millis();
        let mut doc = read_doc(&doc_path(&dir, &membership.player_id))?.unwrap_or_else(|| {
            PlayerDoc {
                id: membership.player_id.clone(),
                joined_at: now,
                ..PlayerDoc::default()
            }
        });
        doc.payload = payload.clone();
        doc.status = PlayerStatus::Active;
        doc.updated_at = now;
        write_doc(&dir, &doc)
    }

    fn leave_room(&mut self, membership: &Membership, reason: &str) -> Result<(), NetError> {
        let dir = self.room_dir(&membership.room_id);
        let now = now_millis();
        let mut doc = read_doc(&doc_path(&dir, &membership.player_id))?.unwrap_or_else(|| {
            PlayerDoc {
                id: membership.player_id.clone(),
                joined_at: now,
                ..PlayerDoc::default()
            }
        });
        doc.status = PlayerStatus::Left;
        doc.payload.game_over = true;
        doc.payload.game_over_reason = Some(reason.to_owned());
        doc.payload.running = false;
        doc.payload.snake.clear();
        doc.updated_at = now;
        debug!(
            room_id = %membership.room_id,
            player_id = %membership.player_id,
            reason,
            "Leaving room"
        );
        write_doc(&dir, &doc)
    }
}

#[derive(Debug, Error)]
pub(crate) enum NetError {
    #[error("player name is required")]
    NameRequired,
    #[error("failed to read room directory")]
    ReadRooms(#[source] std::io::Error),
    #[error("failed to read player document")]
    ReadPlayer(#[source] std::io::Error),
    #[error("failed to write player document")]
    WritePlayer(#[source] std::io::Error),
    #[error("failed to serialize player document")]
    Serialize(#[source] serde_json::Error),
    #[error("unable to assign player to a room")]
    JoinFailed,
}

fn doc_path(dir: &Path, player_id: &str) -> PathBuf {
    dir.join(format!("{player_id}.json"))
}

/// Read the player document at `path`.  Returns `None` if the file does not
/// exist or does not hold a valid document.
fn read_doc(path: &Path) -> Result<Option<PlayerDoc>, NetError> {
    let src = match fs_err::read_to_string(path) {
        Ok(src) => src,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(NetError::ReadPlayer(e)),
    };
    match serde_json::from_str::<PlayerDoc>(&src) {
        Ok(doc) => Ok(Some(doc)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed player document");
            Ok(None)
        }
    }
}

/// Read every player document in a room directory, ordered by join time
fn read_players(dir: &Path) -> Result<Vec<PlayerDoc>, NetError> {
    let entries = match fs_err::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(NetError::ReadRooms(e)),
    };
    let mut docs = Vec::new();
    for entry in entries {
        let path = entry.map_err(NetError::ReadRooms)?.path();
        let is_doc = path.extension().is_some_and(|ext| ext == "json")
            && !path
                .file_name()
                .and_then(std::ffi::OsStr::to_str)
                .is_some_and(|name| name.starts_with('.'));
        if is_doc {
            docs.extend(read_doc(&path)?);
        }
    }
    docs.sort_by(|a, b| (a.joined_at, &a.id).cmp(&(b.joined_at, &b.id)));
    Ok(docs)
}

fn write_doc(dir: &Path, doc: &PlayerDoc) -> Result<(), NetError> {
    let mut src = serde_json::to_string(doc).map_err(NetError::Serialize)?;
    src.push('\n');
    let tmp = dir.join(format!(".{}.json.tmp", doc.id));
    fs_err::write(&tmp, &src).map_err(NetError::WritePlayer)?;
    fs_err::rename(&tmp, doc_path(dir, &doc.id)).map_err(NetError::WritePlayer)?;
    Ok(())
}

fn new_id(prefix: &str) -> String {
    let n = rand::rng().random::<u64>();
    format!("{prefix}-{n:016x}")
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Segment;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn join_creates_room_and_document() {
        let tmp = tempdir().unwrap();
        let mut backend = DirBackend::new(tmp.path().join("rooms"));
        let m = backend.join_room("Alice", 5).unwrap();
        assert!(m.room_id.starts_with("room-"));
        assert!(m.player_id.starts_with("player-"));
        let docs = backend.room_players(&m.room_id).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, m.player_id);
        assert_eq!(docs[0].payload.name, "Alice");
        assert_eq!(docs[0].payload.stage, 1);
        assert_eq!(docs[0].status, PlayerStatus::Active);
        assert!(docs[0].joined_at > 0);
    }

    #[test]
    fn joins_fill_rooms_up_to_capacity() {
        let tmp = tempdir().unwrap();
        let mut backend = DirBackend::new(tmp.path().to_owned());
        let a = backend.join_room("A", 2).unwrap();
        let b = backend.join_room("B", 2).unwrap();
        let c = backend.join_room("C", 2).unwrap();
        assert_eq!(a.room_id, b.room_id);
        assert_ne!(a.room_id, c.room_id);
        let mut rooms = backend.rooms().unwrap();
        rooms.sort_by_key(|r| r.active_count);
        assert_eq!(
            rooms.iter().map(|r| r.active_count).collect::<Vec<_>>(),
            [1, 2]
        );
    }

    #[test]
    fn update_then_leave() {
        let tmp = tempdir().unwrap();
        let mut backend = DirBackend::new(tmp.path().to_owned());
        let m = backend.join_room("Alice", 5).unwrap();
        let payload = PlayerPayload {
            name: String::from("Alice"),
            score: 40,
            stage: 2,
            game_over: false,
            game_over_reason: None,
            running: true,
            snake: vec![Segment { x: 3, y: 4 }, Segment { x: 2, y: 4 }],
        };
        backend.update_player_state(&m, &payload).unwrap();
        let docs = backend.room_players(&m.room_id).unwrap();
        assert_eq!(docs[0].payload, payload);

        backend.leave_room(&m, "player").unwrap();
        let docs = backend.room_players(&m.room_id).unwrap();
        assert_eq!(docs[0].status, PlayerStatus::Left);
        assert!(docs[0].payload.game_over);
        assert!(!docs[0].payload.running);
        assert_eq!(docs[0].payload.game_over_reason.as_deref(), Some("player"));
        assert!(docs[0].payload.snake.is_empty());
        assert_eq!(backend.rooms().unwrap()[0].active_count, 0);

        // The emptied room is reused by the next player
        let next = backend.join_room("Bob", 5).unwrap();
        assert_eq!(next.room_id, m.room_id);
    }

    #[test]
    fn stray_files_are_skipped() {
        let tmp = tempdir().unwrap();
        let mut backend = DirBackend::new(tmp.path().to_owned());
        let m = backend.join_room("Alice", 5).unwrap();
        let dir = tmp.path().join(&m.room_id);
        fs_err::write(dir.join("garbage.json"), "{not json").unwrap();
        fs_err::write(dir.join(".partial.json.tmp"), "{}").unwrap();
        fs_err::write(dir.join("notes.txt"), "hello").unwrap();
        fs_err::write(tmp.path().join("README"), "rooms live here").unwrap();
        let docs = backend.room_players(&m.room_id).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(backend.rooms().unwrap().len(), 1);
    }

    #[test]
    fn missing_room_has_no_players() {
        let tmp = tempdir().unwrap();
        let mut backend = DirBackend::new(tmp.path().join("nowhere"));
        assert!(backend.room_players("room-x").unwrap().is_empty());
        assert!(backend.rooms().unwrap().is_empty());
    }
}
