//! Sharing snake positions between players in the same room
mod backend;
mod session;
pub(crate) use self::backend::DirBackend;
pub(crate) use self::session::MultiplayerSession;
use crate::game::RemotePlayer;
use ratatui::layout::Position;
use serde::{Deserialize, Serialize};

pub(crate) const MAX_PLAYERS_PER_ROOM: usize = 5;

/// Longest player name, in characters
const MAX_NAME_CHARS: usize = 20;

/// Name given to players whose stored name is blank
const ANONYMOUS: &str = "anonymous";

/// A snake cell as stored in a player document
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub(crate) struct Segment {
    pub(crate) x: u16,
    pub(crate) y: u16,
}

impl From<Position> for Segment {
    fn from(pos: Position) -> Segment {
        Segment { x: pos.x, y: pos.y }
    }
}

impl From<Segment> for Position {
    fn from(seg: Segment) -> Position {
        Position::new(seg.x, seg.y)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PlayerStatus {
    #[default]
    Active,
    Left,
}

/// The part of a player's document that the player itself keeps up to date
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct PlayerPayload {
    pub(crate) name: String,
    pub(crate) score: u32,
    pub(crate) stage: u32,
    pub(crate) game_over: bool,
    pub(crate) game_over_reason: Option<String>,
    pub(crate) running: bool,
    pub(crate) snake: Vec<Segment>,
}

/// A player's stored document.  Missing fields take their defaults so that
/// documents written by older or newer clients can still be read.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct PlayerDoc {
    pub(crate) id: String,
    #[serde(flatten)]
    pub(crate) payload: PlayerPayload,
    pub(crate) status: PlayerStatus,
    /// Milliseconds since the Unix epoch
    pub(crate) joined_at: u64,
    /// Milliseconds since the Unix epoch
    pub(crate) updated_at: u64,
}

/// A room as considered when choosing where to put a joining player
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RoomSummary {
    pub(crate) id: String,
    pub(crate) active_count: usize,
    /// Milliseconds since the Unix epoch; zero if unknown
    pub(crate) updated_at: u64,
}

/// A cleaned-up entry of a room's roster
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RoomPlayer {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) score: u32,
    pub(crate) stage: u32,
    pub(crate) game_over: bool,
    pub(crate) snake: Vec<Position>,
}

/// Trim `input`, collapse internal whitespace runs to single spaces, and
/// truncate to twenty characters.  Returns `None` if nothing is left.
pub(crate) fn normalize_player_name(input: &str) -> Option<String> {
    let cleaned = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.chars().take(MAX_NAME_CHARS).collect())
    }
}

/// Pick the room a joining player should go into: among rooms with fewer
/// than `max_players` active players, the least populated, with ties going
/// to the least recently updated.  Returns `None` if every room is full.
pub(crate) fn choose_room_for_join(
    rooms: &[RoomSummary],
    max_players: usize,
) -> Option<&RoomSummary> {
    rooms
        .iter()
        .filter(|r| r.active_count < max_players)
        .min_by_key(|r| (r.active_count, r.updated_at))
}

/// Drop players who have left and fill in defaults for the rest
pub(crate) fn normalize_room_players(docs: &[PlayerDoc]) -> Vec<RoomPlayer> {
    docs.iter()
        .filter(|doc| doc.status != PlayerStatus::Left)
        .map(|doc| RoomPlayer {
            id: doc.id.clone(),
            name: normalize_player_name(&doc.payload.name)
                .unwrap_or_else(|| String::from(ANONYMOUS)),
            score: doc.payload.score,
            stage: doc.payload.stage.max(1),
            game_over: doc.payload.game_over,
            snake: doc.payload.snake.iter().copied().map(Position::from).collect(),
        })
        .collect()
}

/// Return the players whose snakes should be drawn on & collided with
/// locally: everyone other than `local_id` who is still in play and has a
/// snake on the board
pub(crate) fn remote_snake_players(
    players: &[RoomPlayer],
    local_id: Option<&str>,
) -> Vec<RemotePlayer> {
    players
        .iter()
        .filter(|p| Some(p.id.as_str()) != local_id)
        .filter(|p| !p.game_over && !p.snake.is_empty())
        .map(|p| RemotePlayer {
            name: p.name.clone(),
            score: p.score,
            stage: p.stage,
            snake: p.snake.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("   ", None)]
    #[case("", None)]
    #[case("  Alice   Bob  ", Some("Alice Bob"))]
    #[case("tab\tand\nnewline", Some("tab and newline"))]
    #[case("abcdefghijklmnopqrstuvwxyz", Some("abcdefghijklmnopqrst"))]
    #[case("ÄÖÜäöüßÄÖÜäöüßÄÖÜäöüß", Some("ÄÖÜäöüßÄÖÜäöüßÄÖÜäöü"))]
    fn test_normalize_player_name(#[case] input: &str, #[case] name: Option<&str>) {
        assert_eq!(normalize_player_name(input).as_deref(), name);
    }

    fn room(id: &str, active_count: usize, updated_at: u64) -> RoomSummary {
        RoomSummary {
            id: id.to_owned(),
            active_count,
            updated_at,
        }
    }

    #[test]
    fn choose_least_populated_room() {
        let rooms = [room("room-1", 4, 10), room("room-2", 1, 20), room("room-3", 3, 15)];
        let chosen = choose_room_for_join(&rooms, 5).map(|r| r.id.as_str());
        assert_eq!(chosen, Some("room-2"));
    }

    #[test]
    fn choose_oldest_room_on_tie() {
        let rooms = [room("room-1", 2, 30), room("room-2", 2, 20), room("room-3", 2, 25)];
        let chosen = choose_room_for_join(&rooms, 5).map(|r| r.id.as_str());
        assert_eq!(chosen, Some("room-2"));
    }

    #[test]
    fn choose_none_when_all_full() {
        let rooms = [room("room-1", 5, 0), room("room-2", 8, 0)];
        assert_eq!(choose_room_for_join(&rooms, 5), None);
        assert_eq!(choose_room_for_join(&[], 5), None);
    }

    fn doc(id: &str, name: &str, status: PlayerStatus, snake: &[(u16, u16)]) -> PlayerDoc {
        PlayerDoc {
            id: id.to_owned(),
            payload: PlayerPayload {
                name: name.to_owned(),
                score: 7,
                snake: snake.iter().map(|&(x, y)| Segment { x, y }).collect(),
                ..PlayerPayload::default()
            },
            status,
            ..PlayerDoc::default()
        }
    }

    #[test]
    fn normalize_drops_left_players_and_fills_defaults() {
        let players = normalize_room_players(&[
            doc("1", " Alice ", PlayerStatus::Active, &[(1, 1)]),
            doc("2", "Bob", PlayerStatus::Left, &[(2, 2)]),
            doc("3", "", PlayerStatus::Active, &[]),
        ]);
        assert_eq!(
            players,
            [
                RoomPlayer {
                    id: String::from("1"),
                    name: String::from("Alice"),
                    score: 7,
                    stage: 1,
                    game_over: false,
                    snake: vec![Position::new(1, 1)],
                },
                RoomPlayer {
                    id: String::from("3"),
                    name: String::from("anonymous"),
                    score: 7,
                    stage: 1,
                    game_over: false,
                    snake: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn remote_players_exclude_self_dead_and_empty() {
        let mut dead = doc("r2", "R2", PlayerStatus::Active, &[(3, 3)]);
        dead.payload.game_over = true;
        let players = normalize_room_players(&[
            doc("self", "Me", PlayerStatus::Active, &[(1, 1)]),
            doc("r1", "R1", PlayerStatus::Active, &[(2, 2)]),
            dead,
            doc("r3", "R3", PlayerStatus::Active, &[]),
        ]);
        assert_eq!(
            remote_snake_players(&players, Some("self")),
            [RemotePlayer {
                name: String::from("R1"),
                score: 7,
                stage: 1,
                snake: vec![Position::new(2, 2)],
            }]
        );
        assert_eq!(remote_snake_players(&players, None).len(), 2);
    }

    #[test]
    fn player_doc_json_layout() {
        let mut d = doc("p1", "Alice", PlayerStatus::Left, &[(4, 5)]);
        d.payload.game_over_reason = Some(String::from("player"));
        d.joined_at = 1;
        d.updated_at = 2;
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "p1",
                "name": "Alice",
                "score": 7,
                "stage": 0,
                "gameOver": false,
                "gameOverReason": "player",
                "running": false,
                "snake": [{"x": 4, "y": 5}],
                "status": "left",
                "joinedAt": 1,
                "updatedAt": 2,
            })
        );
    }

    #[test]
    fn partial_player_doc_parses() {
        let d = serde_json::from_str::<PlayerDoc>(r#"{"id": "p9", "score": 3}"#).unwrap();
        assert_eq!(d.id, "p9");
        assert_eq!(d.payload.score, 3);
        assert_eq!(d.status, PlayerStatus::Active);
        assert!(d.payload.snake.is_empty());
    }
}
