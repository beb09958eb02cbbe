use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of record a match was found in.
///
/// Declaration order is the presentation order: entities, then narrative
/// events, then chronicles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Entity,
    Event,
    Chronicle,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Event => "event",
            Self::Chronicle => "chronicle",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a text field holds narrative prose or a short label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Narrative,
    Metadata,
}

/// A rewritable text field on one of the record types.
///
/// Indexed variants address an entry in a chronicle's cast or an event's
/// participant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TextField {
    Name,
    Title,
    Headline,
    Summary,
    Description,
    Body,
    Action,
    CastName(usize),
    ParticipantName(usize),
}

impl TextField {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Name
            | Self::Title
            | Self::Headline
            | Self::CastName(_)
            | Self::ParticipantName(_) => FieldKind::Metadata,
            Self::Summary | Self::Description | Self::Body | Self::Action => FieldKind::Narrative,
        }
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Title => f.write_str("title"),
            Self::Headline => f.write_str("headline"),
            Self::Summary => f.write_str("summary"),
            Self::Description => f.write_str("description"),
            Self::Body => f.write_str("body"),
            Self::Action => f.write_str("action"),
            Self::CastName(i) => write!(f, "cast[{i}].entity_name"),
            Self::ParticipantName(i) => write!(f, "participants[{i}].entity_name"),
        }
    }
}

/// An id-valued field that points at an entity. Never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StructuralRef {
    /// A relationship edge of the given kind touching the renamed entity.
    Relationship { kind: String },
    /// A chronicle cast slot with the given role.
    Cast { role: String },
    /// A narrative event's subject.
    Subject,
    /// A narrative event participant slot.
    Participant { index: usize },
}

impl fmt::Display for StructuralRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relationship { kind } => write!(f, "relationship:{kind}"),
            Self::Cast { role } => write!(f, "cast:{role}"),
            Self::Subject => f.write_str("subject"),
            Self::Participant { index } => write!(f, "participants[{index}]"),
        }
    }
}

/// The field a match was found in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchField {
    Text(TextField),
    Reference(StructuralRef),
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(field) => field.fmt(f),
            Self::Reference(r) => r.fmt(f),
        }
    }
}

/// Uniform text access over entities, chronicles and narrative events.
///
/// The scanner reads through `text_fields`, the patch builder re-reads a
/// single field through `field` and records writes through `set_field`.
pub trait TextSource {
    fn source_type(&self) -> SourceType;
    fn source_id(&self) -> &str;
    fn display_name(&self) -> &str;

    /// Every rewritable text field, in a fixed order.
    fn text_fields(&self) -> Vec<(TextField, &str)>;

    fn field(&self, field: TextField) -> Option<&str> {
        self.text_fields()
            .into_iter()
            .find(|(f, _)| *f == field)
            .map(|(_, text)| text)
    }

    /// Overwrite a field. Returns false if the record has no such field.
    fn set_field(&mut self, field: TextField, value: String) -> bool;
}
