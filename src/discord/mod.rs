//! Discord bot integration: client construction, event handling, and
//! slash command dispatch.

pub mod client;
pub mod commands;
pub mod handler;

pub use client::{BotState, DiscordBotBuilder};
