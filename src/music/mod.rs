//! Music playback orchestration on top of a Lavalink node.
//!
//! The controller owns per-guild sessions (current track, pending queue,
//! idle timer), the REST client, and the node's socket session id. Voice
//! channel joins happen through the gateway voice manager; the resulting
//! session/token/endpoint triple is forwarded to the node so it can stream
//! into the channel.

pub mod queue;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serenity::model::id::GuildId;
use songbird::Songbird;
use tokio::sync::{mpsc, Mutex, OnceCell, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::common::error::{LavalinkError, MusicError};
use crate::config::types::{LavalinkConfig, MusicConfig};
use crate::lavalink::protocol::{
    EventPayload, LoadResult, PlayerUpdate, SocketMessage, StatsData, Track, UpdateTrack,
    VoiceState,
};
use crate::lavalink::{rest::RestClient, socket};
use queue::QueuedTrack;

/// Whether a member may use music commands. Holders of the configured
/// blocked role are rejected; everyone is allowed when no role is set.
pub fn has_music_control(member_roles: &[u64], blocked_role: Option<u64>) -> bool {
    match blocked_role {
        None => true,
        Some(blocked) => member_roles.iter().all(|role| *role != blocked),
    }
}

/// Result of resolving a play query.
pub enum Loaded {
    Single(Track),
    Playlist { name: String, tracks: Vec<Track> },
}

/// Queries that aren't URLs get a YouTube search prefix.
pub fn normalize_query(query: &str) -> Result<String, MusicError> {
    let normalized = query.trim();
    if normalized.is_empty() {
        return Err(MusicError::EmptyQuery);
    }
    if normalized.starts_with("http://") || normalized.starts_with("https://") {
        Ok(normalized.to_string())
    } else {
        Ok(format!("ytsearch:{}", normalized))
    }
}

struct GuildSession {
    channel_id: u64,
    current: Option<QueuedTrack>,
    queue: VecDeque<QueuedTrack>,
    paused: bool,
    idle_task: Option<JoinHandle<()>>,
}

impl GuildSession {
    fn new(channel_id: u64) -> Self {
        Self {
            channel_id,
            current: None,
            queue: VecDeque::new(),
            paused: false,
            idle_task: None,
        }
    }

    fn cancel_idle(&mut self) {
        if let Some(task) = self.idle_task.take() {
            task.abort();
        }
    }
}

impl Drop for GuildSession {
    fn drop(&mut self) {
        self.cancel_idle();
    }
}

/// Shared music subsystem state.
pub struct MusicController {
    rest: RestClient,
    lavalink: LavalinkConfig,
    music: MusicConfig,
    session_id: RwLock<Option<String>>,
    sessions: Mutex<HashMap<u64, GuildSession>>,
    last_stats: RwLock<Option<StatsData>>,
    voice: OnceCell<Arc<Songbird>>,
    socket_started: AtomicBool,
}

impl MusicController {
    pub fn new(lavalink: LavalinkConfig, music: MusicConfig) -> Result<Arc<Self>, LavalinkError> {
        Ok(Arc::new(Self {
            rest: RestClient::new(&lavalink)?,
            lavalink,
            music,
            session_id: RwLock::new(None),
            sessions: Mutex::new(HashMap::new()),
            last_stats: RwLock::new(None),
            voice: OnceCell::new(),
            socket_started: AtomicBool::new(false),
        }))
    }

    /// Attach the voice manager and open the node socket. Called once the
    /// gateway is ready and the bot's user id is known; later calls are
    /// no-ops so gateway resumes don't spawn duplicate sockets.
    pub fn start(self: &Arc<Self>, voice: Arc<Songbird>, user_id: u64) {
        let _ = self.voice.set(voice);
        if self.socket_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        tokio::spawn(socket::run(self.lavalink.clone(), user_id, events_tx));

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = events_rx.recv().await {
                controller.handle_message(message).await;
            }
            info!("Lavalink event loop ended");
        });
    }

    async fn handle_message(self: &Arc<Self>, message: SocketMessage) {
        match message {
            SocketMessage::Ready { resumed, session_id } => {
                info!(resumed, "Lavalink session ready: {}", session_id);
                *self.session_id.write().await = Some(session_id);
            }
            SocketMessage::Stats(stats) => {
                *self.last_stats.write().await = Some(stats);
            }
            SocketMessage::PlayerUpdate { guild_id, state } => {
                debug!(
                    %guild_id,
                    position = state.position,
                    connected = state.connected,
                    "Player update"
                );
            }
            SocketMessage::Event(event) => {
                let guild_id = match event.guild_id().parse::<u64>() {
                    Ok(id) => id,
                    Err(_) => {
                        debug!("Event with unparsable guild id: {:?}", event);
                        return;
                    }
                };
                self.handle_event(guild_id, event).await;
            }
            SocketMessage::Unknown => {}
        }
    }

    async fn handle_event(self: &Arc<Self>, guild_id: u64, event: EventPayload) {
        match event {
            EventPayload::TrackStartEvent { track, .. } => {
                info!(guild_id, "Track started: {}", track.info.title);
                self.cancel_idle(guild_id).await;
            }
            EventPayload::TrackEndEvent { reason, track, .. } => {
                debug!(guild_id, ?reason, "Track ended: {}", track.info.title);
                if reason.may_start_next() {
                    self.advance(guild_id).await;
                }
            }
            EventPayload::TrackExceptionEvent { exception, track, .. } => {
                // The node follows up with a loadFailed end event, which
                // drives the queue advance.
                warn!(
                    guild_id,
                    "Track exception on {}: {}",
                    track.info.title,
                    exception.describe()
                );
            }
            EventPayload::TrackStuckEvent { track, threshold_ms, .. } => {
                warn!(guild_id, threshold_ms, "Track stuck: {}", track.info.title);
            }
            EventPayload::WebSocketClosedEvent { code, reason, by_remote, .. } => {
                warn!(guild_id, code, by_remote, "Voice websocket closed: {}", reason);
            }
        }
    }

    /// Play the next queued track, or schedule an idle disconnect when the
    /// queue has drained.
    async fn advance(self: &Arc<Self>, guild_id: u64) {
        let next = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get_mut(&guild_id) {
                Some(session) => {
                    session.current = session.queue.pop_front();
                    session.paused = false;
                    session
                        .current
                        .as_ref()
                        .map(|entry| (entry.track.encoded.clone(), entry.track.info.title.clone()))
                }
                None => return,
            }
        };

        match next {
            Some((encoded, title)) => {
                info!(guild_id, "Advancing queue to: {}", title);
                if let Err(e) = self.send_update(guild_id, &PlayerUpdate::play(encoded)).await {
                    error!(guild_id, "Failed to start next track: {}", e);
                }
            }
            None => self.schedule_idle(guild_id).await,
        }
    }

    async fn send_update(&self, guild_id: u64, update: &PlayerUpdate) -> Result<(), MusicError> {
        let session_id = self
            .session_id
            .read()
            .await
            .clone()
            .ok_or(MusicError::Node(LavalinkError::NoSession))?;
        self.rest
            .update_player(&session_id, guild_id, update, false)
            .await
            .map_err(MusicError::Node)
    }

    /// Forward freshly negotiated voice credentials to the node.
    pub async fn connect_voice(
        &self,
        guild_id: u64,
        channel_id: u64,
        voice: VoiceState,
    ) -> Result<(), MusicError> {
        {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .entry(guild_id)
                .or_insert_with(|| GuildSession::new(channel_id));
            session.channel_id = channel_id;
            session.cancel_idle();
        }
        self.send_update(guild_id, &PlayerUpdate::voice(voice)).await
    }

    /// The voice channel the guild session is bound to, if any.
    pub async fn connected_channel(&self, guild_id: u64) -> Option<u64> {
        let sessions = self.sessions.lock().await;
        sessions.get(&guild_id).map(|s| s.channel_id)
    }

    /// Resolve a play query into tracks.
    pub async fn resolve(&self, query: &str) -> Result<Loaded, MusicError> {
        let identifier = normalize_query(query)?;
        let result = self
            .rest
            .load_tracks(&identifier)
            .await
            .map_err(MusicError::Node)?;

        match result {
            LoadResult::Track(track) => Ok(Loaded::Single(track)),
            LoadResult::Playlist(playlist) => {
                if playlist.tracks.is_empty() {
                    return Err(MusicError::NoMatches);
                }
                Ok(Loaded::Playlist {
                    name: playlist.info.name,
                    tracks: playlist.tracks,
                })
            }
            LoadResult::Search(tracks) => match tracks.into_iter().next() {
                Some(track) => Ok(Loaded::Single(track)),
                None => Err(MusicError::NoMatches),
            },
            LoadResult::Empty(_) => Err(MusicError::NoMatches),
            LoadResult::Error(exception) => Err(MusicError::LoadFailed {
                message: exception.describe(),
            }),
        }
    }

    /// Append tracks to the guild queue, starting playback when idle.
    /// Returns true when playback started with this call.
    pub async fn enqueue(
        &self,
        guild_id: u64,
        channel_id: u64,
        tracks: Vec<QueuedTrack>,
    ) -> Result<bool, MusicError> {
        let to_start = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .entry(guild_id)
                .or_insert_with(|| GuildSession::new(channel_id));
            session.channel_id = channel_id;
            session.cancel_idle();
            session.queue.extend(tracks);
            if session.current.is_none() {
                session.current = session.queue.pop_front();
                session.paused = false;
                session
                    .current
                    .as_ref()
                    .map(|entry| entry.track.encoded.clone())
            } else {
                None
            }
        };

        match to_start {
            Some(encoded) => {
                let update = PlayerUpdate {
                    track: Some(UpdateTrack {
                        encoded: Some(encoded),
                    }),
                    paused: Some(false),
                    volume: Some(self.music.volume),
                    voice: None,
                };
                self.send_update(guild_id, &update).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the current track and start the next one, stopping playback
    /// when the queue is empty.
    pub async fn skip(self: &Arc<Self>, guild_id: u64) -> Result<(), MusicError> {
        let next = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .get_mut(&guild_id)
                .ok_or(MusicError::NothingPlaying)?;
            if session.current.is_none() {
                return Err(MusicError::NothingPlaying);
            }
            session.current = session.queue.pop_front();
            session.paused = false;
            session
                .current
                .as_ref()
                .map(|entry| entry.track.encoded.clone())
        };

        match next {
            Some(encoded) => self.send_update(guild_id, &PlayerUpdate::play(encoded)).await,
            None => {
                self.send_update(guild_id, &PlayerUpdate::stop()).await?;
                self.schedule_idle(guild_id).await;
                Ok(())
            }
        }
    }

    pub async fn pause(&self, guild_id: u64) -> Result<(), MusicError> {
        {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .get_mut(&guild_id)
                .ok_or(MusicError::NothingToPause)?;
            if session.current.is_none() || session.paused {
                return Err(MusicError::NothingToPause);
            }
            session.paused = true;
        }
        self.send_update(guild_id, &PlayerUpdate::pause(true)).await
    }

    pub async fn resume(&self, guild_id: u64) -> Result<(), MusicError> {
        {
            let mut sessions = self.sessions.lock().await;
            let session = sessions.get_mut(&guild_id).ok_or(MusicError::NotPaused)?;
            if !session.paused {
                return Err(MusicError::NotPaused);
            }
            session.paused = false;
        }
        self.send_update(guild_id, &PlayerUpdate::pause(false)).await
    }

    /// Tear down the guild session: clear the queue, destroy the node
    /// player, and leave the voice channel.
    pub async fn stop(&self, guild_id: u64) -> Result<(), MusicError> {
        let existed = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(&guild_id).is_some()
        };
        if !existed {
            return Err(MusicError::NoActiveSession);
        }

        if let Some(session_id) = self.session_id.read().await.clone() {
            if let Err(e) = self.rest.destroy_player(&session_id, guild_id).await {
                warn!(guild_id, "Failed to destroy Lavalink player: {}", e);
            }
        }
        self.leave_voice(guild_id).await;
        Ok(())
    }

    async fn leave_voice(&self, guild_id: u64) {
        if let Some(manager) = self.voice.get() {
            if manager.get(GuildId::new(guild_id)).is_some() {
                if let Err(e) = manager.remove(GuildId::new(guild_id)).await {
                    warn!(guild_id, "Failed to leave voice channel: {}", e);
                }
            }
        }
    }

    /// Current track and pending queue for `/queue`, cloned out.
    pub async fn queue_snapshot(&self, guild_id: u64) -> (Option<QueuedTrack>, Vec<QueuedTrack>) {
        let sessions = self.sessions.lock().await;
        match sessions.get(&guild_id) {
            Some(session) => (
                session.current.clone(),
                session.queue.iter().cloned().collect(),
            ),
            None => (None, Vec::new()),
        }
    }

    /// Last stats frame from the socket, falling back to a REST fetch.
    pub async fn node_stats(&self) -> Result<StatsData, MusicError> {
        if let Some(stats) = self.last_stats.read().await.clone() {
            return Ok(stats);
        }
        self.rest.stats().await.map_err(MusicError::Node)
    }

    async fn cancel_idle(&self, guild_id: u64) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&guild_id) {
            session.cancel_idle();
        }
    }

    /// Leave voice after the idle timeout unless playback resumes first.
    async fn schedule_idle(self: &Arc<Self>, guild_id: u64) {
        let controller = Arc::clone(self);
        let timeout = self.music.idle_timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            controller.disconnect_if_idle(guild_id).await;
        });

        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&guild_id) {
            Some(session) => {
                session.cancel_idle();
                session.idle_task = Some(handle);
            }
            None => handle.abort(),
        }
    }

    async fn disconnect_if_idle(self: &Arc<Self>, guild_id: u64) {
        let idle = {
            let mut sessions = self.sessions.lock().await;
            let is_idle = sessions
                .get(&guild_id)
                .map(|session| session.current.is_none() && session.queue.is_empty());
            match is_idle {
                Some(true) => {
                    if let Some(mut removed) = sessions.remove(&guild_id) {
                        // The stored handle is this very task; detach it so
                        // dropping the session doesn't cancel the teardown.
                        removed.idle_task.take();
                    }
                    true
                }
                Some(false) => {
                    info!(guild_id, "Idle timer aborted because playback resumed");
                    false
                }
                None => false,
            }
        };
        if !idle {
            return;
        }

        info!(guild_id, "Idle timeout reached, leaving voice channel");
        if let Some(session_id) = self.session_id.read().await.clone() {
            if let Err(e) = self.rest.destroy_player(&session_id, guild_id).await {
                warn!(guild_id, "Failed to destroy idle player: {}", e);
            }
        }
        self.leave_voice(guild_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everyone_allowed_without_blocked_role() {
        assert!(has_music_control(&[], None));
        assert!(has_music_control(&[1, 2, 3], None));
    }

    #[test]
    fn test_blocked_role_holder_rejected() {
        assert!(!has_music_control(&[10, 20], Some(20)));
        assert!(has_music_control(&[10, 30], Some(20)));
        assert!(has_music_control(&[], Some(20)));
    }

    #[test]
    fn test_normalize_query_prefixes_searches() {
        assert_eq!(
            normalize_query("never gonna give you up").unwrap(),
            "ytsearch:never gonna give you up"
        );
        assert_eq!(
            normalize_query("  spaced out  ").unwrap(),
            "ytsearch:spaced out"
        );
    }

    #[test]
    fn test_normalize_query_passes_urls_through() {
        assert_eq!(
            normalize_query("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "https://youtu.be/dQw4w9WgXcQ"
        );
        assert_eq!(
            normalize_query("http://example.org/track").unwrap(),
            "http://example.org/track"
        );
    }

    #[test]
    fn test_normalize_query_rejects_empty() {
        assert!(matches!(normalize_query("   "), Err(MusicError::EmptyQuery)));
    }
}
