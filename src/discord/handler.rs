//! Discord gateway event handling.
//!
//! Wires gateway events to the bot's services: slash command dispatch,
//! the mention responder, link rewriting, audit logging, reaction roles,
//! and the music subsystem bootstrap.

use std::sync::Arc;

use serenity::all::{
    ChannelId, Command, Context, EditMember, EventHandler, GuildId, Interaction, Member, Message,
    MessageId, Reaction, ReactionType, Ready, RoleId, VoiceState,
};
use serenity::async_trait;
use tracing::{debug, error, info, warn};

use crate::audit::{
    classify_transition, join_message, leave_message, render_deleted, DeletedMessageRecord,
    VoiceTransition,
};
use crate::chat;
use crate::common::format::chunk_message;
use crate::discord::client::BotState;
use crate::discord::commands;

pub struct Handler;

async fn bot_state(ctx: &Context) -> Option<Arc<BotState>> {
    let data = ctx.data.read().await;
    let state = data.get::<BotState>().cloned();
    if state.is_none() {
        error!("Bot state missing from context data");
    }
    state
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
        let Some(state) = bot_state(&ctx).await else {
            return;
        };

        let definitions = commands::definitions(&state);
        let registered = match state.config.discord.guild_id {
            Some(guild_id) => {
                GuildId::new(guild_id)
                    .set_commands(&ctx.http, definitions)
                    .await
            }
            None => Command::set_global_commands(&ctx.http, definitions).await,
        };
        match registered {
            Ok(commands) => info!("Registered {} slash commands", commands.len()),
            Err(e) => error!("Failed to register slash commands: {}", e),
        }

        if let Some(ref controller) = state.music {
            match songbird::get(&ctx).await {
                Some(manager) => controller.start(manager, ready.user.id.get()),
                None => error!("Voice manager missing, music playback disabled"),
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        let Some(state) = bot_state(&ctx).await else {
            return;
        };
        debug!(
            "Processing /{} from {} ({})",
            command.data.name, command.user.name, command.user.id
        );
        commands::dispatch(&ctx, &command, &state).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.content.is_empty() {
            return;
        }
        let Some(state) = bot_state(&ctx).await else {
            return;
        };

        // x.com -> fixupx.com replies
        let links = state.rewriter.rewrite_all(&msg.content);
        if !links.is_empty() {
            match msg.reply(&ctx.http, links.join("\n")).await {
                Ok(_) => info!("Replied with fixupx links for message {}", msg.id),
                Err(e) => error!("Failed to reply with fixupx links: {}", e),
            }
        }

        // Mention responder
        let Some(ref chat_service) = state.chat else {
            return;
        };
        let bot_id = ctx.cache.current_user().id.get();
        if !chat::mentioned(&msg.content, bot_id) {
            return;
        }

        let text = {
            let stripped = chat::strip_mentions(&msg.content, bot_id);
            if stripped.is_empty() {
                "Hello!".to_string()
            } else {
                stripped
            }
        };
        info!(
            "Incoming mention from {} ({}): {}",
            msg.author.name, msg.author.id, text
        );

        match chat_service.respond(msg.author.id.get(), &text).await {
            Ok(reply) => {
                let mut first = true;
                for chunk in chunk_message(&reply, chat::CHUNK_LIMIT) {
                    let sent = if first {
                        msg.reply(&ctx.http, &chunk).await
                    } else {
                        msg.channel_id.say(&ctx.http, &chunk).await
                    };
                    first = false;
                    if let Err(e) = sent {
                        error!("Failed to deliver AI reply chunk: {}", e);
                        break;
                    }
                }
            }
            Err(e) => {
                error!("Failed to fetch AI response for {}: {}", msg.author.id, e);
                if let Err(send_error) = msg.reply(&ctx.http, chat::APOLOGY).await {
                    error!("Failed to deliver AI apology: {}", send_error);
                }
            }
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(state) = bot_state(&ctx).await else {
            return;
        };

        let old_channel = old.as_ref().and_then(|v| v.channel_id).map(|c| c.get());
        let new_channel = new.channel_id.map(|c| c.get());
        let Some(transition) = classify_transition(old_channel, new_channel) else {
            return;
        };

        let user = new
            .member
            .as_ref()
            .map(|member| member.user.name.clone())
            .unwrap_or_else(|| format!("<@{}>", new.user_id));

        let channel_id = match transition {
            VoiceTransition::Joined { channel_id } | VoiceTransition::Left { channel_id } => {
                channel_id
            }
        };
        let channel_name = {
            ctx.cache
                .channel(ChannelId::new(channel_id))
                .map(|channel| channel.name.clone())
        }
        .unwrap_or_else(|| format!("<#{}>", channel_id));

        let text = match transition {
            VoiceTransition::Joined { .. } => join_message(&user, &channel_name),
            VoiceTransition::Left { .. } => leave_message(&user, &channel_name),
        };
        state.audit.send(&ctx.http, &text).await;
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        _guild_id: Option<GuildId>,
    ) {
        let Some(state) = bot_state(&ctx).await else {
            return;
        };
        // Deletions in the audit channel itself would loop.
        if channel_id.get() == state.config.discord.log_channel_id {
            return;
        }

        let record = {
            match ctx.cache.message(channel_id, deleted_message_id) {
                Some(message) => DeletedMessageRecord {
                    channel_id: channel_id.get(),
                    message_id: deleted_message_id.get(),
                    author_mention: Some(format!("<@{}>", message.author.id)),
                    author_id: Some(message.author.id.get()),
                    content: Some(message.content.clone()),
                    attachments: message
                        .attachments
                        .iter()
                        .map(|attachment| attachment.url.clone())
                        .collect(),
                },
                None => DeletedMessageRecord {
                    channel_id: channel_id.get(),
                    message_id: deleted_message_id.get(),
                    ..Default::default()
                },
            }
        };
        state.audit.send(&ctx.http, &render_deleted(&record)).await;
    }

    async fn guild_member_addition(&self, ctx: Context, member: Member) {
        let Some(state) = bot_state(&ctx).await else {
            return;
        };
        let Some(ref prefix) = state.config.greeter.nickname_prefix else {
            return;
        };

        let nickname = format!("{} {}", prefix, member.user.name);
        match member
            .guild_id
            .edit_member(
                &ctx.http,
                member.user.id,
                EditMember::new().nickname(&nickname),
            )
            .await
        {
            Ok(_) => info!(
                "Renamed new member {} ({}) in guild {} to '{}'",
                member.user.name, member.user.id, member.guild_id, nickname
            ),
            Err(e) => error!(
                "Failed to set nickname for new member in guild {}: {}",
                member.guild_id, e
            ),
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        apply_reaction_role(&ctx, &reaction, true).await;
    }

    async fn reaction_remove(&self, ctx: Context, reaction: Reaction) {
        apply_reaction_role(&ctx, &reaction, false).await;
    }
}

/// Grant or revoke a reaction role for a matching reaction event.
async fn apply_reaction_role(ctx: &Context, reaction: &Reaction, grant: bool) {
    let Some(state) = bot_state(ctx).await else {
        return;
    };
    let Some(entry) = state.reaction_roles.get_entry(reaction.message_id.get()) else {
        return;
    };
    if !emoji_matches(&reaction.emoji, &entry.emoji) {
        debug!(
            "Reaction emoji did not match configured {} for message {}",
            entry.emoji, reaction.message_id
        );
        return;
    }
    let Some(user_id) = reaction.user_id else {
        return;
    };
    {
        if user_id == ctx.cache.current_user().id {
            return;
        }
    }
    if let Some(ref member) = reaction.member {
        if member.user.bot {
            return;
        }
    }
    let Some(guild_id) = reaction.guild_id else {
        return;
    };

    let role_id = RoleId::new(entry.role_id);
    let reason = if grant {
        "Reaction role opt-in"
    } else {
        "Reaction role opt-out"
    };
    let result = if grant {
        ctx.http
            .add_member_role(guild_id, user_id, role_id, Some(reason))
            .await
    } else {
        ctx.http
            .remove_member_role(guild_id, user_id, role_id, Some(reason))
            .await
    };
    match result {
        Ok(()) => info!(
            "{} role {} for {} via reaction message {}",
            if grant { "Granted" } else { "Removed" },
            role_id,
            user_id,
            reaction.message_id
        ),
        Err(e) => error!(
            "Failed to update reaction role {} for {}: {}",
            role_id, user_id, e
        ),
    }
}

fn emoji_matches(emoji: &ReactionType, target: &str) -> bool {
    match emoji {
        ReactionType::Unicode(name) => name == target,
        ReactionType::Custom { id, name, .. } => {
            id.to_string() == target || name.as_deref() == Some(target)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_emoji_match() {
        let emoji = ReactionType::Unicode("\u{2705}".to_string());
        assert!(emoji_matches(&emoji, "\u{2705}"));
        assert!(!emoji_matches(&emoji, "\u{274c}"));
    }

    #[test]
    fn test_custom_emoji_matches_by_id_or_name() {
        let emoji = ReactionType::Custom {
            animated: false,
            id: serenity::all::EmojiId::new(1234),
            name: Some("gem".to_string()),
        };
        assert!(emoji_matches(&emoji, "1234"));
        assert!(emoji_matches(&emoji, "gem"));
        assert!(!emoji_matches(&emoji, "other"));
    }
}
