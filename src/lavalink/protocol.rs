//! Lavalink v4 wire types (REST and WebSocket).

use serde::{Deserialize, Serialize};

/// An encoded track plus its metadata, as returned by `/v4/loadtracks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub encoded: String,
    pub info: TrackInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub is_seekable: bool,
    pub author: String,
    /// Duration in milliseconds. Meaningless for streams.
    pub length: u64,
    pub is_stream: bool,
    pub position: u64,
    pub title: String,
    #[serde(default)]
    pub uri: Option<String>,
    pub source_name: String,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub isrc: Option<String>,
}

impl TrackInfo {
    /// Duration for display: `None` for live streams.
    pub fn duration_ms(&self) -> Option<u64> {
        if self.is_stream {
            None
        } else {
            Some(self.length)
        }
    }
}

/// Result of a `/v4/loadtracks` call, keyed by `loadType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "loadType", content = "data", rename_all = "camelCase")]
pub enum LoadResult {
    Track(Track),
    Playlist(PlaylistData),
    Search(Vec<Track>),
    Empty(serde_json::Value),
    Error(LoadException),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistData {
    pub info: PlaylistInfo,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    pub name: String,
    #[serde(default)]
    pub selected_track: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadException {
    #[serde(default)]
    pub message: Option<String>,
    pub severity: String,
    #[serde(default)]
    pub cause: String,
}

impl LoadException {
    pub fn describe(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.severity.clone())
    }
}

/// Voice server credentials forwarded to the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    pub token: String,
    pub endpoint: String,
    pub session_id: String,
}

/// Body of a `PATCH /v4/sessions/{session}/players/{guild}` request.
/// Unset fields are left untouched by the node.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<UpdateTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceState>,
}

/// The track portion of a player update. `encoded: None` serializes as an
/// explicit `null`, which tells the node to stop playback.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateTrack {
    pub encoded: Option<String>,
}

impl PlayerUpdate {
    pub fn play(encoded: String) -> Self {
        Self {
            track: Some(UpdateTrack {
                encoded: Some(encoded),
            }),
            ..Default::default()
        }
    }

    pub fn stop() -> Self {
        Self {
            track: Some(UpdateTrack { encoded: None }),
            ..Default::default()
        }
    }

    pub fn pause(paused: bool) -> Self {
        Self {
            paused: Some(paused),
            ..Default::default()
        }
    }

    pub fn voice(voice: VoiceState) -> Self {
        Self {
            voice: Some(voice),
            ..Default::default()
        }
    }
}

/// Messages the node pushes over `/v4/websocket`, keyed by `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum SocketMessage {
    #[serde(rename_all = "camelCase")]
    Ready { resumed: bool, session_id: String },
    #[serde(rename_all = "camelCase")]
    PlayerUpdate {
        guild_id: String,
        state: PlayerState,
    },
    Stats(StatsData),
    Event(EventPayload),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub time: u64,
    #[serde(default)]
    pub position: u64,
    pub connected: bool,
    pub ping: i64,
}

/// Node statistics, pushed periodically and available via `GET /v4/stats`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub players: u32,
    pub playing_players: u32,
    pub uptime: u64,
    pub memory: MemoryStats,
    pub cpu: CpuStats,
    #[serde(default)]
    pub frame_stats: Option<FrameStats>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub free: u64,
    pub used: u64,
    pub allocated: u64,
    pub reservable: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub cores: u32,
    pub system_load: f64,
    pub lavalink_load: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    pub sent: i64,
    pub nulled: i64,
    pub deficit: i64,
}

/// Player events, keyed by `type` inside an `op: event` frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename_all = "camelCase")]
    TrackStartEvent { guild_id: String, track: Track },
    #[serde(rename_all = "camelCase")]
    TrackEndEvent {
        guild_id: String,
        track: Track,
        reason: TrackEndReason,
    },
    #[serde(rename_all = "camelCase")]
    TrackExceptionEvent {
        guild_id: String,
        track: Track,
        exception: LoadException,
    },
    #[serde(rename_all = "camelCase")]
    TrackStuckEvent {
        guild_id: String,
        track: Track,
        threshold_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    WebSocketClosedEvent {
        guild_id: String,
        code: u16,
        reason: String,
        by_remote: bool,
    },
}

impl EventPayload {
    pub fn guild_id(&self) -> &str {
        match self {
            Self::TrackStartEvent { guild_id, .. }
            | Self::TrackEndEvent { guild_id, .. }
            | Self::TrackExceptionEvent { guild_id, .. }
            | Self::TrackStuckEvent { guild_id, .. }
            | Self::WebSocketClosedEvent { guild_id, .. } => guild_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackEndReason {
    Finished,
    LoadFailed,
    Stopped,
    Replaced,
    Cleanup,
}

impl TrackEndReason {
    /// Whether the queue should advance after this end reason.
    pub fn may_start_next(&self) -> bool {
        matches!(self, Self::Finished | Self::LoadFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_track_json() -> serde_json::Value {
        json!({
            "encoded": "QAAAjQIA...",
            "info": {
                "identifier": "dQw4w9WgXcQ",
                "isSeekable": true,
                "author": "Rick Astley",
                "length": 212_000,
                "isStream": false,
                "position": 0,
                "title": "Never Gonna Give You Up",
                "uri": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "sourceName": "youtube",
                "artworkUrl": null,
                "isrc": null
            }
        })
    }

    #[test]
    fn test_load_result_track() {
        let payload = json!({ "loadType": "track", "data": sample_track_json() });
        match serde_json::from_value::<LoadResult>(payload).unwrap() {
            LoadResult::Track(track) => {
                assert_eq!(track.info.title, "Never Gonna Give You Up");
                assert_eq!(track.info.duration_ms(), Some(212_000));
            }
            other => panic!("expected track, got {:?}", other),
        }
    }

    #[test]
    fn test_load_result_search() {
        let payload = json!({ "loadType": "search", "data": [sample_track_json()] });
        match serde_json::from_value::<LoadResult>(payload).unwrap() {
            LoadResult::Search(tracks) => assert_eq!(tracks.len(), 1),
            other => panic!("expected search, got {:?}", other),
        }
    }

    #[test]
    fn test_load_result_playlist() {
        let payload = json!({
            "loadType": "playlist",
            "data": {
                "info": { "name": "Mix", "selectedTrack": -1 },
                "pluginInfo": {},
                "tracks": [sample_track_json(), sample_track_json()]
            }
        });
        match serde_json::from_value::<LoadResult>(payload).unwrap() {
            LoadResult::Playlist(playlist) => {
                assert_eq!(playlist.info.name, "Mix");
                assert_eq!(playlist.tracks.len(), 2);
            }
            other => panic!("expected playlist, got {:?}", other),
        }
    }

    #[test]
    fn test_load_result_empty_and_error() {
        let empty = json!({ "loadType": "empty", "data": {} });
        assert!(matches!(
            serde_json::from_value::<LoadResult>(empty).unwrap(),
            LoadResult::Empty(_)
        ));

        let error = json!({
            "loadType": "error",
            "data": { "message": "video unavailable", "severity": "common", "cause": "..." }
        });
        match serde_json::from_value::<LoadResult>(error).unwrap() {
            LoadResult::Error(exception) => {
                assert_eq!(exception.describe(), "video unavailable");
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_socket_ready_frame() {
        let payload = json!({ "op": "ready", "resumed": false, "sessionId": "abc123" });
        match serde_json::from_value::<SocketMessage>(payload).unwrap() {
            SocketMessage::Ready { resumed, session_id } => {
                assert!(!resumed);
                assert_eq!(session_id, "abc123");
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_socket_player_update_frame() {
        let payload = json!({
            "op": "playerUpdate",
            "guildId": "987",
            "state": { "time": 1_500_467_109, "position": 60_000, "connected": true, "ping": 50 }
        });
        match serde_json::from_value::<SocketMessage>(payload).unwrap() {
            SocketMessage::PlayerUpdate { guild_id, state } => {
                assert_eq!(guild_id, "987");
                assert_eq!(state.position, 60_000);
            }
            other => panic!("expected playerUpdate, got {:?}", other),
        }
    }

    #[test]
    fn test_socket_stats_frame() {
        let payload = json!({
            "op": "stats",
            "players": 2,
            "playingPlayers": 1,
            "uptime": 123_456,
            "memory": { "free": 1, "used": 2, "allocated": 3, "reservable": 4 },
            "cpu": { "cores": 4, "systemLoad": 0.5, "lavalinkLoad": 0.1 },
            "frameStats": { "sent": 6000, "nulled": 10, "deficit": -1 }
        });
        match serde_json::from_value::<SocketMessage>(payload).unwrap() {
            SocketMessage::Stats(stats) => {
                assert_eq!(stats.playing_players, 1);
                assert_eq!(stats.frame_stats.unwrap().sent, 6000);
            }
            other => panic!("expected stats, got {:?}", other),
        }
    }

    #[test]
    fn test_socket_event_frames() {
        let end = json!({
            "op": "event",
            "type": "TrackEndEvent",
            "guildId": "987",
            "track": sample_track_json(),
            "reason": "finished"
        });
        match serde_json::from_value::<SocketMessage>(end).unwrap() {
            SocketMessage::Event(EventPayload::TrackEndEvent { guild_id, reason, .. }) => {
                assert_eq!(guild_id, "987");
                assert!(reason.may_start_next());
            }
            other => panic!("expected TrackEndEvent, got {:?}", other),
        }

        let closed = json!({
            "op": "event",
            "type": "WebSocketClosedEvent",
            "guildId": "987",
            "code": 4006,
            "reason": "Session no longer valid",
            "byRemote": true
        });
        match serde_json::from_value::<SocketMessage>(closed).unwrap() {
            SocketMessage::Event(event) => assert_eq!(event.guild_id(), "987"),
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_op_tolerated() {
        let payload = json!({ "op": "somethingNew", "field": 1 });
        assert!(matches!(
            serde_json::from_value::<SocketMessage>(payload).unwrap(),
            SocketMessage::Unknown
        ));
    }

    #[test]
    fn test_track_end_reasons() {
        assert!(TrackEndReason::Finished.may_start_next());
        assert!(TrackEndReason::LoadFailed.may_start_next());
        assert!(!TrackEndReason::Stopped.may_start_next());
        assert!(!TrackEndReason::Replaced.may_start_next());
    }

    #[test]
    fn test_player_update_stop_serializes_null_track() {
        let body = serde_json::to_value(PlayerUpdate::stop()).unwrap();
        assert_eq!(body, json!({ "track": { "encoded": null } }));
    }

    #[test]
    fn test_player_update_play_skips_unset_fields() {
        let body = serde_json::to_value(PlayerUpdate::play("enc".to_string())).unwrap();
        assert_eq!(body, json!({ "track": { "encoded": "enc" } }));
    }

    #[test]
    fn test_voice_state_field_names() {
        let voice = VoiceState {
            token: "t".to_string(),
            endpoint: "e".to_string(),
            session_id: "s".to_string(),
        };
        let body = serde_json::to_value(PlayerUpdate::voice(voice)).unwrap();
        assert_eq!(
            body,
            json!({ "voice": { "token": "t", "endpoint": "e", "sessionId": "s" } })
        );
    }
}
