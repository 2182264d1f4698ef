//! Lavalink v4 node client: wire types, REST calls, event socket.

pub mod protocol;
pub mod rest;
pub mod socket;

pub use protocol::{
    EventPayload, LoadResult, PlayerUpdate, SocketMessage, StatsData, Track, TrackEndReason,
    VoiceState,
};
pub use rest::RestClient;
