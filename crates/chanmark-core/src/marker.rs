//! Marker emojis and the name toggle they drive.

use std::fmt;

/// Command name of the marker configured through `MARK_EMOJI`.
pub const DEFAULT_MARKER: &str = "mark";

/// Slash command names that can never be used for a marker.
pub const RESERVED_COMMANDS: &[&str] = &["about", "help", "checkmark", "setemoji", "markinfo"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkAction {
    Added,
    Removed,
}

impl MarkAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for MarkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Marker {
    pub name: String,
    pub emoji: String,
}

impl Marker {
    pub fn new(name: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            emoji: emoji.into(),
        }
    }

    fn prefix(&self) -> String {
        format!("{}-", self.emoji)
    }

    /// The name `current_name` should get, and whether the marker is being
    /// added or removed.
    pub fn toggle(&self, current_name: &str) -> (String, MarkAction) {
        let prefix = self.prefix();
        match current_name.strip_prefix(prefix.as_str()) {
            Some(rest) => (rest.to_string(), MarkAction::Removed),
            None => (format!("{prefix}{current_name}"), MarkAction::Added),
        }
    }

}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetEmojiError {
    #[error("unknown marker command `/{0}`")]
    UnknownMarker(String),

    #[error("emoji must be non-empty and may not contain `,`")]
    InvalidEmoji,
}

/// Marker name → emoji, in registration order.
///
/// Built once from configuration; each entry becomes one slash command served
/// by the same handler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkerTable {
    markers: Vec<Marker>,
}

impl MarkerTable {
    /// `default_emoji` becomes the `mark` marker; `extra` entries follow in order.
    ///
    /// Entries that reuse an existing name or a reserved command name, or that
    /// have an empty name or emoji, are skipped.
    pub fn new(default_emoji: &str, extra: &[(String, String)]) -> Self {
        let mut table = Self::default();
        table.insert(Marker::new(DEFAULT_MARKER, default_emoji));
        for (name, emoji) in extra {
            table.insert(Marker::new(name.as_str(), emoji.as_str()));
        }
        table
    }

    fn insert(&mut self, marker: Marker) -> bool {
        if !is_valid_marker_name(&marker.name) || marker.emoji.trim().is_empty() {
            return false;
        }
        if self.get(&marker.name).is_some() {
            return false;
        }
        self.markers.push(marker);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }

    /// Replace the emoji of `name`, returning the previous one.
    ///
    /// Emojis must survive a `MARKERS` round trip, so `,` is rejected.
    pub fn set_emoji(&mut self, name: &str, emoji: &str) -> Result<String, SetEmojiError> {
        if !is_valid_marker_emoji(emoji) {
            return Err(SetEmojiError::InvalidEmoji);
        }
        let marker = self
            .markers
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| SetEmojiError::UnknownMarker(name.to_string()))?;
        Ok(std::mem::replace(&mut marker.emoji, emoji.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    /// Extra markers in `MARKERS` env format (`name=emoji,...`), without `mark`.
    pub fn extras_env_value(&self) -> String {
        self.markers
            .iter()
            .filter(|m| m.name != DEFAULT_MARKER)
            .map(|m| format!("{}={}", m.name, m.emoji))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Discord command names: 1-32 chars, lowercase letters, digits, `-` or `_`.
pub fn is_valid_marker_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 32
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        && !RESERVED_COMMANDS.contains(&name)
}

/// Non-blank, already trimmed, and free of the `MARKERS` pair separator.
pub fn is_valid_marker_emoji(emoji: &str) -> bool {
    !emoji.is_empty() && emoji.trim() == emoji && !emoji.contains(',')
}
