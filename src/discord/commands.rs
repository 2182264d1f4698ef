//! Slash command definitions and dispatch.
//!
//! Commands register on gateway ready (guild-scoped when `GUILD_ID` is set)
//! and arrive as interactions; each handler validates, delegates to the
//! relevant service, and maps the outcome to a user-visible reply.

use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    Permissions, ReactionType, ResolvedValue, Role, User,
};
use tracing::{error, info, warn};

use crate::common::error::MusicError;
use crate::common::format::{format_bytes, format_duration, format_uptime};
use crate::discord::client::BotState;
use crate::lavalink::StatsData;
use crate::mcstatus;
use crate::moderation::format_warns;
use crate::music::queue::{render_queue, QueuedTrack};
use crate::music::{has_music_control, Loaded};
use crate::roles::{prompt_message, ReactionRoleEntry};

/// Every slash command the bot registers.
pub fn definitions(state: &BotState) -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("version").description("My first command :)"),
        CreateCommand::new("mcstatus").description(format!(
            "Check the status of {}",
            state.config.minecraft.server_address
        )),
        CreateCommand::new("play")
            .description("Queue music from YouTube or YouTube Music")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "query",
                    "YouTube or YouTube Music link, or search terms",
                )
                .required(true),
            ),
        CreateCommand::new("skip").description("Skip the currently playing track"),
        CreateCommand::new("pause").description("Pause the current track"),
        CreateCommand::new("resume").description("Resume playback if paused"),
        CreateCommand::new("queue").description("Show the current music queue"),
        CreateCommand::new("stop").description("Stop playback and clear the queue"),
        CreateCommand::new("lavalinkstats").description("Show Lavalink node statistics"),
        CreateCommand::new("ban")
            .description("Ban a user from the server.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to ban.")
                    .required(true),
            )
            .default_member_permissions(Permissions::BAN_MEMBERS),
        CreateCommand::new("unban")
            .description("Unban a user from the server.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to unban.")
                    .required(true),
            )
            .default_member_permissions(Permissions::BAN_MEMBERS),
        CreateCommand::new("warn")
            .description("Warn a user.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to warn.")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "warning", "Warning reason.")
                    .required(true),
            )
            .default_member_permissions(Permissions::BAN_MEMBERS),
        CreateCommand::new("warns")
            .description("Show a user's warnings.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to inspect.")
                    .required(true),
            )
            .default_member_permissions(Permissions::BAN_MEMBERS),
        CreateCommand::new("reaction")
            .description("Create a reaction role message in this channel.")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Role,
                    "role",
                    "Role to grant when members react.",
                )
                .required(true),
            )
            .default_member_permissions(Permissions::MANAGE_ROLES),
    ]
}

/// Route one command interaction to its handler.
pub async fn dispatch(ctx: &Context, interaction: &CommandInteraction, state: &BotState) {
    let name = interaction.data.name.clone();
    let result = match name.as_str() {
        "version" => version(ctx, interaction, state).await,
        "mcstatus" => mcstatus_command(ctx, interaction, state).await,
        "play" => play(ctx, interaction, state).await,
        "skip" => skip(ctx, interaction, state).await,
        "pause" => pause(ctx, interaction, state).await,
        "resume" => resume(ctx, interaction, state).await,
        "queue" => queue(ctx, interaction, state).await,
        "stop" => stop(ctx, interaction, state).await,
        "lavalinkstats" => lavalink_stats(ctx, interaction, state).await,
        "ban" => ban(ctx, interaction, state).await,
        "unban" => unban(ctx, interaction, state).await,
        "warn" => warn_user(ctx, interaction, state).await,
        "warns" => show_warns(ctx, interaction, state).await,
        "reaction" => reaction_role(ctx, interaction, state).await,
        other => {
            warn!("Unknown command: {}", other);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Command '{}' failed: {}", name, e);
    }
}

async fn respond(
    ctx: &Context,
    interaction: &CommandInteraction,
    content: impl Into<String>,
) -> anyhow::Result<()> {
    interaction
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await?;
    Ok(())
}

async fn respond_ephemeral(
    ctx: &Context,
    interaction: &CommandInteraction,
    content: impl Into<String>,
) -> anyhow::Result<()> {
    interaction
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

async fn edit_reply(
    ctx: &Context,
    interaction: &CommandInteraction,
    content: impl Into<String>,
) -> anyhow::Result<()> {
    interaction
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await?;
    Ok(())
}

fn string_option(interaction: &CommandInteraction, name: &str) -> Option<String> {
    interaction.data.options().iter().find_map(|option| {
        match (option.name == name, &option.value) {
            (true, ResolvedValue::String(value)) => Some(value.to_string()),
            _ => None,
        }
    })
}

fn user_option(interaction: &CommandInteraction, name: &str) -> Option<User> {
    interaction.data.options().iter().find_map(|option| {
        match (option.name == name, &option.value) {
            (true, ResolvedValue::User(user, _member)) => Some((*user).clone()),
            _ => None,
        }
    })
}

fn role_option(interaction: &CommandInteraction, name: &str) -> Option<Role> {
    interaction.data.options().iter().find_map(|option| {
        match (option.name == name, &option.value) {
            (true, ResolvedValue::Role(role)) => Some((*role).clone()),
            _ => None,
        }
    })
}

fn member_role_ids(interaction: &CommandInteraction) -> Vec<u64> {
    interaction
        .member
        .as_ref()
        .map(|member| member.roles.iter().map(|role| role.get()).collect())
        .unwrap_or_default()
}

/// DJ-role gate. Replies and returns false when the member is blocked.
async fn require_music_permission(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<bool> {
    let roles = member_role_ids(interaction);
    if has_music_control(&roles, state.config.music.dj_role_id) {
        return Ok(true);
    }
    respond_ephemeral(
        ctx,
        interaction,
        "You can't use music commands while holding the blocked DJ role.",
    )
    .await?;
    Ok(false)
}

/// Lavalink gate. Replies and returns None when music is unconfigured.
async fn require_lavalink<'a>(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &'a BotState,
) -> anyhow::Result<Option<&'a std::sync::Arc<crate::music::MusicController>>> {
    match state.music.as_ref() {
        Some(controller) => Ok(Some(controller)),
        None => {
            respond_ephemeral(ctx, interaction, MusicError::NotConfigured.to_string()).await?;
            Ok(None)
        }
    }
}

async fn version(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    respond(
        ctx,
        interaction,
        format!("version: {}", state.config.discord.environment.as_str()),
    )
    .await
}

async fn mcstatus_command(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    interaction.defer(&ctx.http).await?;
    let content = match state.status.fetch().await {
        Ok(status) => mcstatus::format_reply(state.status.address(), &status),
        Err(e) => mcstatus::failure_reply(&e),
    };
    edit_reply(ctx, interaction, content).await
}

async fn play(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    if !require_music_permission(ctx, interaction, state).await? {
        return Ok(());
    }
    let Some(controller) = require_lavalink(ctx, interaction, state).await? else {
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return respond_ephemeral(
            ctx,
            interaction,
            "This command can only be used inside a server.",
        )
        .await;
    };
    let Some(query) = string_option(interaction, "query") else {
        return respond_ephemeral(ctx, interaction, MusicError::EmptyQuery.to_string()).await;
    };

    // The cache guard must not live across an await point.
    let voice_channel = {
        ctx.cache.guild(guild_id).and_then(|guild| {
            guild
                .voice_states
                .get(&interaction.user.id)
                .and_then(|voice| voice.channel_id)
        })
    };
    let Some(channel_id) = voice_channel else {
        return respond_ephemeral(ctx, interaction, MusicError::NotInVoice.to_string()).await;
    };

    interaction.defer(&ctx.http).await?;

    if controller.connected_channel(guild_id.get()).await != Some(channel_id.get()) {
        let Some(manager) = songbird::get(ctx).await else {
            return edit_reply(ctx, interaction, MusicError::JoinFailed.to_string()).await;
        };
        match manager.join_gateway(guild_id, channel_id).await {
            Ok((info, _call)) => {
                let voice = crate::lavalink::VoiceState {
                    token: info.token,
                    endpoint: info.endpoint,
                    session_id: info.session_id,
                };
                if let Err(e) = controller
                    .connect_voice(guild_id.get(), channel_id.get(), voice)
                    .await
                {
                    error!("Unable to hand voice session to Lavalink: {}", e);
                    return edit_reply(ctx, interaction, e.to_string()).await;
                }
            }
            Err(e) => {
                error!("Failed to connect to voice channel {}: {}", channel_id, e);
                return edit_reply(ctx, interaction, MusicError::JoinFailed.to_string()).await;
            }
        }
    }

    let loaded = match controller.resolve(&query).await {
        Ok(loaded) => loaded,
        Err(e) => {
            return edit_reply(ctx, interaction, format!("I couldn't load that track: {}", e))
                .await;
        }
    };

    let requester = interaction.user.id.get();
    let reply = match loaded {
        Loaded::Single(track) => {
            let title = track.info.title.clone();
            let duration = format_duration(track.info.duration_ms());
            let uri = track.info.uri.clone().unwrap_or_default();
            controller
                .enqueue(
                    guild_id.get(),
                    channel_id.get(),
                    vec![QueuedTrack { track, requester }],
                )
                .await?;
            format!(
                "Queued **{}** (`{}`) for <@{}>\n<{}>",
                title, duration, requester, uri
            )
        }
        Loaded::Playlist { name, tracks } => {
            let count = tracks.len();
            let entries = tracks
                .into_iter()
                .map(|track| QueuedTrack { track, requester })
                .collect();
            controller
                .enqueue(guild_id.get(), channel_id.get(), entries)
                .await?;
            format!(
                "Queued playlist **{}** with {} tracks for <@{}>",
                name, count, requester
            )
        }
    };
    info!("Play request in guild {}: {}", guild_id, query);
    edit_reply(ctx, interaction, reply).await
}

async fn skip(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    if !require_music_permission(ctx, interaction, state).await? {
        return Ok(());
    }
    let Some(controller) = require_lavalink(ctx, interaction, state).await? else {
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return respond_ephemeral(ctx, interaction, "This only works inside a server.").await;
    };

    match controller.skip(guild_id.get()).await {
        Ok(()) => respond(ctx, interaction, "Skipped the current track.").await,
        Err(e) => respond_ephemeral(ctx, interaction, e.to_string()).await,
    }
}

async fn pause(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    if !require_music_permission(ctx, interaction, state).await? {
        return Ok(());
    }
    let Some(controller) = require_lavalink(ctx, interaction, state).await? else {
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return respond_ephemeral(ctx, interaction, "This only works inside a server.").await;
    };

    match controller.pause(guild_id.get()).await {
        Ok(()) => respond(ctx, interaction, "Paused the music.").await,
        Err(e) => respond_ephemeral(ctx, interaction, e.to_string()).await,
    }
}

async fn resume(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    if !require_music_permission(ctx, interaction, state).await? {
        return Ok(());
    }
    let Some(controller) = require_lavalink(ctx, interaction, state).await? else {
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return respond_ephemeral(ctx, interaction, "This only works inside a server.").await;
    };

    match controller.resume(guild_id.get()).await {
        Ok(()) => respond(ctx, interaction, "Resumed playback.").await,
        Err(e) => respond_ephemeral(ctx, interaction, e.to_string()).await,
    }
}

async fn queue(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    let Some(controller) = require_lavalink(ctx, interaction, state).await? else {
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return respond_ephemeral(
            ctx,
            interaction,
            "This command must be used inside a server.",
        )
        .await;
    };

    let (current, pending) = controller.queue_snapshot(guild_id.get()).await;
    if current.is_none() && pending.is_empty() {
        return respond(ctx, interaction, "Nothing is queued up right now.").await;
    }
    respond(ctx, interaction, render_queue(current.as_ref(), &pending)).await
}

async fn stop(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    if !require_music_permission(ctx, interaction, state).await? {
        return Ok(());
    }
    let Some(controller) = require_lavalink(ctx, interaction, state).await? else {
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return respond_ephemeral(ctx, interaction, "Use this inside a server.").await;
    };

    match controller.stop(guild_id.get()).await {
        Ok(()) => {
            respond(
                ctx,
                interaction,
                "Music stopped and the bot left the voice channel.",
            )
            .await
        }
        Err(e) => respond_ephemeral(ctx, interaction, e.to_string()).await,
    }
}

/// Render one node's statistics for `/lavalinkstats`.
fn format_node_stats(host: &str, stats: &StatsData) -> String {
    let mut lines = vec![
        format!("**{}** (Online)", host),
        format!(
            "Players: {}/{} playing",
            stats.playing_players, stats.players
        ),
        format!("Uptime: {}", format_uptime(Some(stats.uptime))),
        format!(
            "CPU: {} cores | system {:.1}% | lavalink {:.1}%",
            stats.cpu.cores,
            stats.cpu.system_load * 100.0,
            stats.cpu.lavalink_load * 100.0
        ),
        format!(
            "Memory: {} used / {} allocated (free {})",
            format_bytes(Some(stats.memory.used)),
            format_bytes(Some(stats.memory.allocated)),
            format_bytes(Some(stats.memory.free))
        ),
    ];
    if let Some(ref frames) = stats.frame_stats {
        lines.push(format!(
            "Frames: sent {} | nulled {} | deficit {}",
            frames.sent, frames.nulled, frames.deficit
        ));
    }
    lines.join("\n")
}

async fn lavalink_stats(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    let Some(controller) = require_lavalink(ctx, interaction, state).await? else {
        return Ok(());
    };
    interaction.defer_ephemeral(&ctx.http).await?;

    let host = state
        .config
        .lavalink
        .as_ref()
        .map(|l| l.host.clone())
        .unwrap_or_else(|| "Lavalink Node".to_string());
    let content = match controller.node_stats().await {
        Ok(stats) => format_node_stats(&host, &stats),
        Err(e) => format!("Statistics are not available yet ({}). Try again shortly.", e),
    };
    edit_reply(ctx, interaction, content).await
}

async fn ban(
    ctx: &Context,
    interaction: &CommandInteraction,
    _state: &BotState,
) -> anyhow::Result<()> {
    let Some(guild_id) = interaction.guild_id else {
        return respond_ephemeral(ctx, interaction, "Use this command inside a server.").await;
    };
    let Some(user) = user_option(interaction, "user") else {
        return respond_ephemeral(ctx, interaction, "No user provided.").await;
    };

    let self_id = ctx.cache.current_user().id;
    if user.id == self_id {
        return respond(ctx, interaction, ":x: You cannot ban me!").await;
    }

    let reason = format!("Banned by {}", interaction.user.display_name());
    match guild_id
        .ban_with_reason(&ctx.http, user.id, 0, &reason)
        .await
    {
        Ok(()) => {
            respond(
                ctx,
                interaction,
                format!(":white_check_mark: Banned <@{}>.", user.id),
            )
            .await
        }
        Err(e) => {
            respond(
                ctx,
                interaction,
                format!(":x: Failed to ban <@{}>: {}", user.id, e),
            )
            .await
        }
    }
}

async fn unban(
    ctx: &Context,
    interaction: &CommandInteraction,
    _state: &BotState,
) -> anyhow::Result<()> {
    let Some(guild_id) = interaction.guild_id else {
        return respond_ephemeral(ctx, interaction, "Use this command inside a server.").await;
    };
    let Some(user) = user_option(interaction, "user") else {
        return respond_ephemeral(ctx, interaction, "No user provided.").await;
    };

    match guild_id.unban(&ctx.http, user.id).await {
        Ok(()) => {
            respond(
                ctx,
                interaction,
                format!(":white_check_mark: Unbanned <@{}>.", user.id),
            )
            .await
        }
        Err(e) => {
            respond(
                ctx,
                interaction,
                format!(":x: Failed to unban <@{}>: {}", user.id, e),
            )
            .await
        }
    }
}

async fn warn_user(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    let Some(user) = user_option(interaction, "user") else {
        return respond_ephemeral(ctx, interaction, "No user provided.").await;
    };
    let Some(warning) = string_option(interaction, "warning") else {
        return respond_ephemeral(ctx, interaction, "No warning text provided.").await;
    };

    let warns = state.warns.add_warn(user.id.get(), warning);
    info!("User {} warned ({} total)", user.id, warns.len());
    respond(
        ctx,
        interaction,
        format!(":white_check_mark: Warned <@{}>.", user.id),
    )
    .await
}

async fn show_warns(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    let Some(user) = user_option(interaction, "user") else {
        return respond_ephemeral(ctx, interaction, "No user provided.").await;
    };

    let warns = state.warns.get_warns(user.id.get());
    respond(
        ctx,
        interaction,
        format!("Warnings for <@{}>:\n{}", user.id, format_warns(&warns)),
    )
    .await
}

async fn reaction_role(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
) -> anyhow::Result<()> {
    let Some(guild_id) = interaction.guild_id else {
        return respond_ephemeral(ctx, interaction, "Use this command inside a server.").await;
    };
    let Some(role) = role_option(interaction, "role") else {
        return respond_ephemeral(ctx, interaction, "No role provided.").await;
    };

    if let Some(admin_role) = state.config.roles.admin_role_id {
        if !member_role_ids(interaction).contains(&admin_role) {
            return respond_ephemeral(
                ctx,
                interaction,
                format!(
                    "You need the <@&{}> role to create reaction role messages.",
                    admin_role
                ),
            )
            .await;
        }
    }

    interaction.defer_ephemeral(&ctx.http).await?;

    let emoji = state.config.roles.emoji.clone();
    let channel_id = interaction.channel_id;
    let prompt = prompt_message(&emoji, role.id.get());
    let message = match channel_id.say(&ctx.http, prompt).await {
        Ok(message) => message,
        Err(e) => {
            error!(
                "Failed to send reaction role message in channel {}: {}",
                channel_id, e
            );
            return edit_reply(
                ctx,
                interaction,
                "I couldn't post the reaction role message. Double-check my permissions and try again.",
            )
            .await;
        }
    };
    if let Err(e) = message
        .react(&ctx.http, ReactionType::Unicode(emoji.clone()))
        .await
    {
        warn!("Failed to seed reaction on message {}: {}", message.id, e);
    }

    state.reaction_roles.set_entry(
        message.id.get(),
        ReactionRoleEntry {
            guild_id: guild_id.get(),
            channel_id: channel_id.get(),
            role_id: role.id.get(),
            emoji,
        },
    );

    let message_url = format!(
        "https://discord.com/channels/{}/{}/{}",
        guild_id, channel_id, message.id
    );
    edit_reply(
        ctx,
        interaction,
        format!(
            "Reaction role message created in <#{}> for <@&{}>.\n<{}>",
            channel_id, role.id, message_url
        ),
    )
    .await
}
