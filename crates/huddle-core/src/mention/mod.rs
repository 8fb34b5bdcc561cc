pub mod autocomplete;
pub mod index;
pub mod parser;

pub use autocomplete::{
    filter_mentions, pending_query, AutocompleteState, KeyOutcome, MentionAutocomplete, MentionKey,
};
pub use index::{Mention, MentionIndex, MentionKind};
pub use parser::{parse_mentions, resolve_mentions, ResolvedMentions};
