/// Text interpolation — `{player.*}`, `{location.*}`, `{world.*}` references.
///
/// Unknown or malformed references are emitted verbatim, braces included,
/// so partially specified templates still render.

use crate::schema::npc::Npc;
use crate::schema::player::Player;
use crate::schema::scene::Location;
use crate::schema::state::WorldState;

/// A recognized variable reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    PlayerName,
    PlayerArchetype,
    /// `{player.stats.<name>}`: any name, zero when the stat is unknown.
    PlayerStat(String),
    /// `{player.background.<field>}`
    PlayerBackground(String),
    LocationName,
    LocationDescription,
    LocationKind,
    WorldTime,
    WorldWeather,
    WorldDanger,
    NpcName,
    NpcDisposition,
}

impl Reference {
    /// Parse the content between braces. `None` for anything outside the
    /// closed grammar.
    pub fn parse(content: &str) -> Option<Reference> {
        let content = content.strip_prefix("scene.").unwrap_or(content);
        let reference = match content {
            "player.name" => Self::PlayerName,
            "player.archetype" => Self::PlayerArchetype,
            "location.name" => Self::LocationName,
            "location.description" => Self::LocationDescription,
            "location.type" | "location.kind" => Self::LocationKind,
            "world.time" => Self::WorldTime,
            "world.weather" => Self::WorldWeather,
            "world.danger" => Self::WorldDanger,
            "npc.name" => Self::NpcName,
            "npc.type" => Self::NpcDisposition,
            _ => {
                if let Some(stat) = content.strip_prefix("player.stats.") {
                    return is_word(stat).then(|| Self::PlayerStat(stat.to_string()));
                }
                if let Some(field) = content.strip_prefix("player.background.") {
                    return is_word(field).then(|| Self::PlayerBackground(field.to_string()));
                }
                return None;
            }
        };
        Some(reference)
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// A segment of a parsed text template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Ref { reference: Reference, raw: String },
}

/// Split a template string into literal text and references.
///
/// Never fails: unclosed braces, nested braces, and unrecognized content all
/// become literal text.
pub fn parse(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}');
        let nested = after.find('{');
        match close {
            Some(end) if nested.map_or(true, |n| n > end) => {
                let content = &after[..end];
                match Reference::parse(content) {
                    Some(reference) => {
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(Segment::Ref {
                            reference,
                            raw: format!("{{{}}}", content),
                        });
                    }
                    None => {
                        tracing::debug!(reference = content, "unresolved template reference");
                        literal.push('{');
                        literal.push_str(content);
                        literal.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                // Unclosed or nested: keep the brace and move on
                literal.push('{');
                rest = after;
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// What references resolve against.
#[derive(Debug, Clone, Copy)]
pub struct TextContext<'a> {
    pub player: &'a Player,
    pub location: Option<&'a Location>,
    pub world: Option<&'a WorldState>,
    pub npc: Option<&'a Npc>,
}

impl<'a> TextContext<'a> {
    pub fn new(player: &'a Player) -> Self {
        Self {
            player,
            location: None,
            world: None,
            npc: None,
        }
    }

    pub fn at(mut self, location: &'a Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_world(mut self, world: &'a WorldState) -> Self {
        self.world = Some(world);
        self
    }

    pub fn with_npc(mut self, npc: &'a Npc) -> Self {
        self.npc = Some(npc);
        self
    }

    /// Resolve one reference. `None` when the context lacks the data.
    pub fn resolve(&self, reference: &Reference) -> Option<String> {
        let value = match reference {
            Reference::PlayerName => self.player.name.clone(),
            Reference::PlayerArchetype => self.player.archetype.name().to_string(),
            Reference::PlayerStat(stat) => self.player.stats().get(stat).unwrap_or(0).to_string(),
            Reference::PlayerBackground(field) => self.player.background.field(field)?.to_string(),
            Reference::LocationName => self.location?.name.clone(),
            Reference::LocationDescription => self.location?.description.clone(),
            Reference::LocationKind => self.location?.kind.clone(),
            Reference::WorldTime => self.world?.time.clone(),
            Reference::WorldWeather => self.world?.weather.clone(),
            Reference::WorldDanger => self.world?.danger.clone(),
            Reference::NpcName => self.npc?.name.clone(),
            Reference::NpcDisposition => format!("{:?}", self.npc?.disposition).to_lowercase(),
        };
        Some(value)
    }

    /// Substitute every reference in `text`.
    pub fn render(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for segment in parse(text) {
            match segment {
                Segment::Literal(s) => out.push_str(&s),
                Segment::Ref { reference, raw } => match self.resolve(&reference) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&raw),
                },
            }
        }
        out
    }
}
