//! Listing of the stored reaction-roles of a guild.

use std::collections::HashSet;

use twilight_mention::Mention;
use twilight_model::channel::message::Embed;
use twilight_model::id::marker::ChannelMarker;
use twilight_model::id::Id;
use twilight_util::builder::embed::EmbedBuilder;

use crate::config::ReactionRoleBinding;
use crate::utils;
use crate::utils::consts::EMBED_COLOR;

/// Maximum length of a single overview embed description.
pub const MAX_DESCRIPTION_LEN: usize = 2048;

pub const OVERVIEW_TITLE: &str = "Reaction Role Setup";

/// Group bindings by channel, dropping channels that are not visible.
///
/// Channels are in the order they are first seen, bindings keep their order within a channel.
pub fn group_by_channel<'a>(
    bindings: &'a [ReactionRoleBinding],
    visible: &HashSet<Id<ChannelMarker>>,
) -> Vec<(Id<ChannelMarker>, Vec<&'a ReactionRoleBinding>)> {
    let mut groups: Vec<(Id<ChannelMarker>, Vec<&ReactionRoleBinding>)> = Vec::new();

    for binding in bindings.iter().filter(|b| visible.contains(&b.channel_id)) {
        match groups.iter_mut().find(|(id, _)| *id == binding.channel_id) {
            Some((_, group)) => group.push(binding),
            None => groups.push((binding.channel_id, vec![binding])),
        }
    }

    groups
}

/// Render the overview text of a single channel.
pub fn channel_block(channel_id: Id<ChannelMarker>, bindings: &[&ReactionRoleBinding]) -> String {
    let mut text = format!("**Channel:** {}\n", channel_id.mention());

    for b in bindings {
        text.push_str(&format!(
            "🆔 **Message ID:** {}\n🎭 **Role:** {} | **Emoji:** {}\n🔗 **Custom ID:** `{}`\n\n",
            b.message_id,
            b.role_id.mention(),
            b.label,
            b.custom_id
        ));
    }

    text
}

/// Split text into chunks of at most `limit` long, along line boundaries.
///
/// A line longer than `limit` gets a chunk of its own.
/// Chunks with only whitespace are dropped.
pub fn split_description(text: &str, limit: usize) -> Vec<String> {
    if utils::text_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut chunk = String::new();
    let mut chunk_len = 0;

    for line in text.split_terminator('\n') {
        let len = utils::text_len(line) + 1;

        if chunk_len + len > limit && !chunk.is_empty() {
            chunks.push(std::mem::take(&mut chunk));
            chunk_len = 0;
        }

        chunk.push_str(line);
        chunk.push('\n');
        chunk_len += len;
    }

    chunks.push(chunk);
    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

/// Build the overview embeds, one or more per visible channel.
pub fn overview_embeds(
    bindings: &[ReactionRoleBinding],
    visible: &HashSet<Id<ChannelMarker>>,
) -> Vec<Embed> {
    group_by_channel(bindings, visible)
        .into_iter()
        .flat_map(|(channel_id, group)| {
            split_description(&channel_block(channel_id, &group), MAX_DESCRIPTION_LEN)
        })
        .map(|description| {
            EmbedBuilder::new()
                .title(OVERVIEW_TITLE)
                .description(description)
                .color(EMBED_COLOR)
                .build()
        })
        .collect()
}
