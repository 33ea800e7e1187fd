//! Parsing and rendering of a new reaction-role message.

use twilight_mention::{Mention, ParseMention};
use twilight_model::channel::message::component::{ActionRow, Button, ButtonStyle, Component};
use twilight_model::channel::message::Embed;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker};
use twilight_model::id::Id;
use twilight_util::builder::embed::EmbedBuilder;

use super::ReactionRoleError;
use crate::config::{reaction_role_custom_id, ReactionRoleBinding};
use crate::utils;
use crate::utils::consts::EMBED_COLOR;

/// Maximum number of role and label pairs on a single message.
pub const MAX_PAIRS: usize = 5;

/// Visual style of every reaction-role button.
pub const BUTTON_STYLE: ButtonStyle = ButtonStyle::Secondary;

/// A validated role and label pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePair {
    /// 1-based slot of the pair in the command options.
    pub index: usize,
    pub role_id: Id<RoleMarker>,
    pub label: String,
    pub custom_id: String,
}

/// Parse role and label inputs into pairs.
///
/// A slot is used only if both its role and label are present, blank text counts as absent.
/// Labels are kept as given. Custom ids keep the slot index, so skipped slots leave gaps.
pub fn parse_pairs<'a>(
    channel_id: Id<ChannelMarker>,
    slots: impl IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>,
) -> Result<Vec<RolePair>, ReactionRoleError> {
    let present = |s: Option<&'a str>| s.filter(|s| !s.trim().is_empty());

    let mut pairs = Vec::new();

    for (i, (role, label)) in slots.into_iter().take(MAX_PAIRS).enumerate() {
        let (Some(role), Some(label)) = (present(role), present(label)) else {
            continue;
        };
        let role = role.trim();

        let role_id =
            parse_role(role).ok_or_else(|| ReactionRoleError::InvalidRole(role.to_string()))?;

        let index = i + 1;
        pairs.push(RolePair {
            index,
            role_id,
            label: label.to_string(),
            custom_id: reaction_role_custom_id(channel_id, index),
        });
    }

    if pairs.is_empty() {
        return Err(ReactionRoleError::NoPairs);
    }

    Ok(pairs)
}

/// Parse a role from a raw id or a role mention.
fn parse_role(text: &str) -> Option<Id<RoleMarker>> {
    text.parse()
        .ok()
        .and_then(Id::new_checked)
        .or_else(|| Id::<RoleMarker>::parse(text).ok())
}

/// Build the public reaction-role embed.
pub fn setup_embed(title: &str, description: &str, pairs: &[RolePair]) -> Embed {
    let lines = pairs
        .iter()
        .map(|p| format!("{} → {}", p.label, p.role_id.mention()))
        .collect::<Vec<_>>()
        .join("\n");

    EmbedBuilder::new()
        .title(title)
        .description(format!("{description}\n\n{lines}"))
        .color(EMBED_COLOR)
        .build()
}

/// Build a single row of buttons, one for each pair.
pub fn setup_components(pairs: &[RolePair]) -> Vec<Component> {
    let buttons = pairs
        .iter()
        .map(|p| {
            Component::Button(Button {
                custom_id: Some(p.custom_id.to_owned()),
                disabled: false,
                emoji: Some(utils::parse_emoji(&p.label)),
                label: None,
                style: BUTTON_STYLE,
                url: None,
            })
        })
        .collect();

    vec![Component::ActionRow(ActionRow {
        components: buttons,
    })]
}

/// Create the bindings to store for a published message.
pub fn bindings(
    guild_id: Id<GuildMarker>,
    channel_id: Id<ChannelMarker>,
    message_id: Id<MessageMarker>,
    pairs: &[RolePair],
) -> Vec<ReactionRoleBinding> {
    pairs
        .iter()
        .map(|p| ReactionRoleBinding {
            guild_id,
            channel_id,
            message_id,
            role_id: p.role_id,
            custom_id: p.custom_id.to_owned(),
            label: p.label.to_owned(),
            style: BUTTON_STYLE,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use twilight_model::channel::message::ReactionType;

    use super::*;

    const CHANNEL: Id<ChannelMarker> = Id::new(555);

    fn slots<'a>(
        pairs: &[(Option<&'a str>, Option<&'a str>)],
    ) -> Vec<(Option<&'a str>, Option<&'a str>)> {
        pairs.to_vec()
    }

    #[test]
    fn single_pair() {
        let pairs = parse_pairs(CHANNEL, slots(&[(Some("111"), Some("🔥"))])).unwrap();

        assert_eq!(
            pairs,
            vec![RolePair {
                index: 1,
                role_id: Id::new(111),
                label: "🔥".to_string(),
                custom_id: "reaction_role_555_1".to_string(),
            }]
        );
    }

    #[test]
    fn incomplete_slots_are_skipped_without_reindexing() {
        let pairs = parse_pairs(
            CHANNEL,
            slots(&[
                (Some("1"), Some("🍎")),
                (Some("2"), None),
                (None, Some("🍐")),
                (Some("  "), Some("🍋")),
                (Some("5"), Some("🍇")),
            ]),
        )
        .unwrap();

        let ids: Vec<_> = pairs.iter().map(|p| p.custom_id.as_str()).collect();
        assert_eq!(ids, ["reaction_role_555_1", "reaction_role_555_5"]);
        assert_eq!(pairs[1].index, 5);
        assert_eq!(pairs[1].role_id, Id::new(5));
    }

    #[test]
    fn role_mentions_and_whitespace() {
        let pairs = parse_pairs(CHANNEL, slots(&[(Some(" <@&42> "), Some("🔥"))])).unwrap();
        assert_eq!(pairs[0].role_id, Id::new(42));
    }

    #[test]
    fn labels_are_stored_as_given() {
        let pairs = parse_pairs(CHANNEL, slots(&[(Some("111"), Some(" 🔥 "))])).unwrap();
        assert_eq!(pairs[0].label, " 🔥 ");

        let stored = bindings(Id::new(1), CHANNEL, Id::new(77), &pairs);
        assert_eq!(stored[0].label, " 🔥 ");

        // The button emoji itself has no padding.
        let Component::ActionRow(row) = &setup_components(&pairs)[0] else {
            panic!("Expected an action row");
        };
        let Component::Button(button) = &row.components[0] else {
            panic!("Expected a button");
        };
        assert_eq!(
            button.emoji,
            Some(ReactionType::Unicode {
                name: "🔥".to_string()
            })
        );
    }

    #[test]
    fn no_usable_pairs() {
        assert!(matches!(
            parse_pairs(CHANNEL, slots(&[(Some("1"), None), (None, Some("🔥"))])),
            Err(ReactionRoleError::NoPairs)
        ));
        assert!(matches!(
            parse_pairs(CHANNEL, Vec::new()),
            Err(ReactionRoleError::NoPairs)
        ));
    }

    #[test]
    fn invalid_role() {
        assert!(matches!(
            parse_pairs(CHANNEL, slots(&[(Some("admins"), Some("🔥"))])),
            Err(ReactionRoleError::InvalidRole(r)) if r == "admins"
        ));
        assert!(matches!(
            parse_pairs(CHANNEL, slots(&[(Some("0"), Some("🔥"))])),
            Err(ReactionRoleError::InvalidRole(_))
        ));
    }

    #[test]
    fn extra_slots_are_ignored() {
        let six = vec![(Some("1"), Some("🔥")); MAX_PAIRS + 1];
        assert_eq!(parse_pairs(CHANNEL, six).unwrap().len(), MAX_PAIRS);
    }

    #[test]
    fn embed_description() {
        let pairs = parse_pairs(
            CHANNEL,
            slots(&[(Some("111"), Some("🔥")), (Some("222"), Some("<:blob:9>"))]),
        )
        .unwrap();
        let embed = setup_embed("Roles", "Pick one", &pairs[..1]);

        assert_eq!(embed.title.as_deref(), Some("Roles"));
        assert_eq!(embed.description.as_deref(), Some("Pick one\n\n🔥 → <@&111>"));
        assert_eq!(embed.color, Some(EMBED_COLOR));

        let embed = setup_embed("Roles", "Pick", &pairs);
        assert_eq!(
            embed.description.as_deref(),
            Some("Pick\n\n🔥 → <@&111>\n<:blob:9> → <@&222>")
        );
    }

    #[test]
    fn buttons_in_one_row() {
        let pairs = parse_pairs(
            CHANNEL,
            slots(&[(Some("111"), Some("🔥")), (Some("222"), Some("<a:blob:9>"))]),
        )
        .unwrap();

        let components = setup_components(&pairs);
        assert_eq!(components.len(), 1);

        let Component::ActionRow(row) = &components[0] else {
            panic!("Expected an action row");
        };
        assert_eq!(row.components.len(), 2);

        let Component::Button(button) = &row.components[1] else {
            panic!("Expected a button");
        };
        assert_eq!(button.custom_id.as_deref(), Some("reaction_role_555_2"));
        assert_eq!(button.style, ButtonStyle::Secondary);
        assert_eq!(
            button.emoji,
            Some(ReactionType::Custom {
                animated: true,
                id: Id::new(9),
                name: Some("blob".to_string()),
            })
        );
    }

    #[test]
    fn bindings_share_message() {
        let pairs = parse_pairs(
            CHANNEL,
            slots(&[(Some("111"), Some("🔥")), (Some("222"), Some("🍎"))]),
        )
        .unwrap();
        let bindings = bindings(Id::new(1), CHANNEL, Id::new(77), &pairs);

        assert_eq!(bindings.len(), 2);
        assert!(bindings
            .iter()
            .all(|b| b.message_id == Id::new(77) && b.channel_id == CHANNEL));
        assert_eq!(bindings[1].role_id, Id::new(222));
        assert_eq!(bindings[1].custom_id, "reaction_role_555_2");
        assert_eq!(bindings[1].style, ButtonStyle::Secondary);
    }
}
