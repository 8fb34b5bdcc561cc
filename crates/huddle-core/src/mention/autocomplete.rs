use super::index::{Mention, MentionIndex};

/// Keys the popup may claim before the input line sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKey {
    Up,
    Down,
    Enter,
    Tab,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Consumed,
    PassThrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AutocompleteState {
    #[default]
    Idle,
    /// `anchor` is the byte offset of the triggering `@`.
    Composing { anchor: usize, query: String },
}

/// Finds the `@query` being typed right before `cursor`.
///
/// Returns the byte offset of the `@` and the text between it and the
/// cursor. None when that text contains whitespace or there is no `@`.
pub fn pending_query(text: &str, cursor: usize) -> Option<(usize, &str)> {
    let before = text.get(..cursor)?;
    let at = before.rfind('@')?;
    let query = &before[at + 1..];
    if query.chars().any(char::is_whitespace) {
        return None;
    }
    Some((at, query))
}

/// Mentions whose label or display contains `query`, ignoring case.
pub fn filter_mentions(mentions: &[Mention], query: &str) -> Vec<Mention> {
    mentions.iter().filter(|m| m.matches(query)).cloned().collect()
}

/// `@mention` popup state for one text input.
///
/// Call [`update`](Self::update) after every edit or cursor move, and route
/// navigation keys through [`handle_key`](Self::handle_key) first.
#[derive(Debug, Default)]
pub struct MentionAutocomplete {
    state: AutocompleteState,
    candidates: Vec<Mention>,
    selected: usize,
}

impl MentionAutocomplete {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, text: &str, cursor: usize, index: &MentionIndex) {
        self.selected = 0;
        match pending_query(text, cursor) {
            Some((anchor, query)) => {
                self.candidates = filter_mentions(index.mentions(), query);
                self.state = AutocompleteState::Composing {
                    anchor,
                    query: query.to_string(),
                };
            }
            None => self.dismiss(),
        }
    }

    /// Navigation and commit keys are consumed only while composing with
    /// at least one candidate.
    pub fn handle_key(&mut self, key: MentionKey, text: &mut String, cursor: &mut usize) -> KeyOutcome {
        if !self.is_open() {
            return KeyOutcome::PassThrough;
        }
        let len = self.candidates.len();
        match key {
            MentionKey::Down => self.selected = (self.selected + 1) % len,
            MentionKey::Up => self.selected = (self.selected + len - 1) % len,
            MentionKey::Enter | MentionKey::Tab => {
                self.accept(text, cursor);
            }
            MentionKey::Escape => self.dismiss(),
        }
        KeyOutcome::Consumed
    }

    pub fn accept(&mut self, text: &mut String, cursor: &mut usize) -> bool {
        self.accept_at(self.selected, text, cursor)
    }

    /// Replace `@query` with the candidate's display plus a space and move
    /// the cursor past it.
    pub fn accept_at(&mut self, i: usize, text: &mut String, cursor: &mut usize) -> bool {
        let AutocompleteState::Composing { anchor, .. } = self.state else {
            return false;
        };
        let Some(mention) = self.candidates.get(i) else {
            return false;
        };
        if anchor > *cursor || !text.is_char_boundary(*cursor) {
            return false;
        }

        let inserted = format!("{} ", mention.display);
        text.replace_range(anchor..*cursor, &inserted);
        *cursor = anchor + inserted.len();
        self.dismiss();
        true
    }

    pub fn dismiss(&mut self) {
        self.state = AutocompleteState::Idle;
        self.candidates.clear();
        self.selected = 0;
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, AutocompleteState::Composing { .. }) && !self.candidates.is_empty()
    }

    pub fn state(&self) -> &AutocompleteState {
        &self.state
    }

    pub fn candidates(&self) -> &[Mention] {
        &self.candidates
    }

    pub fn selected(&self) -> usize {
        self.selected
    }
}
