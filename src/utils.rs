use twilight_http::request::guild::{GetGuild, GetGuildChannels};
use twilight_model::channel::message::ReactionType;
use twilight_model::channel::Channel;
use twilight_model::guild::Guild;
use twilight_model::id::Id;

use crate::utils::prelude::*;

/// Common imports.
pub mod prelude {
    pub use anyhow::{Context as _, Result as AnyResult};
    pub use async_trait::async_trait;
    pub use tracing::{debug, error, info, warn};

    pub use crate::utils::ExecModelExt;
}

/// Universal constants.
pub mod consts {
    /// Embed color used by reaction role messages.
    pub const EMBED_COLOR: u32 = 0xFF00FF;

    /// Embed color used for error replies.
    pub const ERROR_COLOR: u32 = 0xFF0000;
}

/// A trait to simplify `.await?.model().await` chain.
#[async_trait]
pub trait ExecModelExt {
    type Value;

    /// Send the request and deserialize the response model.
    async fn send(self) -> AnyResult<Self::Value>;
}

/// Macro to implement `ExecModelExt` in a one-liner.
macro_rules! impl_exec_model_ext {
    ($req:ty, $val:ty) => {
        #[async_trait]
        impl ExecModelExt for $req {
            type Value = $val;

            async fn send(self) -> AnyResult<Self::Value> {
                self.await?.model().await.map_err(Into::into)
            }
        }
    };
}

impl_exec_model_ext!(GetGuild<'_>, Guild);
impl_exec_model_ext!(GetGuildChannels<'_>, Vec<Channel>);

/// Generates `Option` getters for enum variants.
macro_rules! impl_variant_option {
    ( $( $v:vis fn $func:ident ( &self: $var:ident ( $tok:tt ) ) -> $ret:ty { $out:expr } )* ) => {
        $(
            /// Returns `Some` if `self` matches variant, else `None`.
            $v fn $func(&self) -> Option<$ret> {
                match self {
                    Self::$var($tok) => Some($out),
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        )*
    };
}

pub(crate) use impl_variant_option;

/// Returns the length of the text as Discord counts it, in UTF-16 code units.
pub fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Parse emoji text into a reaction type.
///
/// Custom emojis in `<:name:id>` or `<a:name:id>` form become [`ReactionType::Custom`],
/// anything else is treated as a unicode emoji.
pub fn parse_emoji(text: &str) -> ReactionType {
    let text = text.trim();

    let custom = text
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .and_then(|inner| {
            let (animated, rest) = match inner.strip_prefix("a:") {
                Some(rest) => (true, rest),
                None => (false, inner.strip_prefix(':')?),
            };
            let (name, id) = rest.rsplit_once(':')?;
            let id = id.parse().ok().and_then(Id::new_checked)?;
            let name = (!name.is_empty()).then(|| name.to_string());

            Some(ReactionType::Custom { animated, id, name })
        });

    custom.unwrap_or_else(|| ReactionType::Unicode {
        name: text.to_string(),
    })
}
