use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed player class category. Unrecognized names are kept verbatim and
/// level up with a balanced bonus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Archetype {
    Warrior,
    Mage,
    Rogue,
    Diplomat,
    Other(String),
}

impl Archetype {
    pub fn name(&self) -> &str {
        match self {
            Self::Warrior => "warrior",
            Self::Mage => "mage",
            Self::Rogue => "rogue",
            Self::Diplomat => "diplomat",
            Self::Other(name) => name,
        }
    }

    /// Abilities a fresh character of this archetype starts with.
    pub fn default_abilities(&self) -> Vec<String> {
        let names: &[&str] = match self {
            Self::Warrior => &["Powerful Strike", "Shield Block", "Intimidate"],
            Self::Mage => &["Fireball", "Arcane Shield", "Teleport"],
            Self::Rogue => &["Backstab", "Evade", "Pickpocket"],
            Self::Diplomat => &["Persuade", "Bribe", "Gather Information"],
            Self::Other(_) => &["Basic Attack"],
        };
        names.iter().map(|s| s.to_string()).collect()
    }
}

impl From<String> for Archetype {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "warrior" => Self::Warrior,
            "mage" => Self::Mage,
            "rogue" => Self::Rogue,
            "diplomat" => Self::Diplomat,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Archetype {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Archetype> for String {
    fn from(a: Archetype) -> Self {
        a.name().to_string()
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names of the fields in a [`Stats`] block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatName {
    Health,
    MaxHealth,
    Mana,
    MaxMana,
    Strength,
    Intelligence,
    Dexterity,
    Charisma,
    Defense,
    Resistance,
    Level,
    Experience,
    ExperienceToLevel,
}

impl StatName {
    /// Parse an authored stat name. Accepts camelCase and snake_case.
    pub fn parse(name: &str) -> Option<Self> {
        let stat = match name {
            "health" => Self::Health,
            "maxHealth" | "max_health" => Self::MaxHealth,
            "mana" => Self::Mana,
            "maxMana" | "max_mana" => Self::MaxMana,
            "strength" => Self::Strength,
            "intelligence" => Self::Intelligence,
            "dexterity" => Self::Dexterity,
            "charisma" => Self::Charisma,
            "defense" => Self::Defense,
            "resistance" => Self::Resistance,
            "level" => Self::Level,
            "experience" => Self::Experience,
            "experienceToLevel" | "experience_to_level" => Self::ExperienceToLevel,
            _ => return None,
        };
        Some(stat)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub health: i64,
    pub max_health: i64,
    pub mana: i64,
    pub max_mana: i64,
    pub strength: i64,
    pub intelligence: i64,
    pub dexterity: i64,
    pub charisma: i64,
    pub defense: i64,
    pub resistance: i64,
    pub level: i64,
    pub experience: i64,
    pub experience_to_level: i64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            health: 100,
            max_health: 100,
            mana: 50,
            max_mana: 50,
            strength: 10,
            intelligence: 10,
            dexterity: 10,
            charisma: 10,
            defense: 5,
            resistance: 5,
            level: 1,
            experience: 0,
            experience_to_level: 100,
        }
    }
}

impl Stats {
    pub fn value(&self, stat: StatName) -> i64 {
        *self.slot(stat)
    }

    /// Dynamic lookup by authored name.
    pub fn get(&self, name: &str) -> Option<i64> {
        StatName::parse(name).map(|s| self.value(s))
    }

    fn slot(&self, stat: StatName) -> &i64 {
        match stat {
            StatName::Health => &self.health,
            StatName::MaxHealth => &self.max_health,
            StatName::Mana => &self.mana,
            StatName::MaxMana => &self.max_mana,
            StatName::Strength => &self.strength,
            StatName::Intelligence => &self.intelligence,
            StatName::Dexterity => &self.dexterity,
            StatName::Charisma => &self.charisma,
            StatName::Defense => &self.defense,
            StatName::Resistance => &self.resistance,
            StatName::Level => &self.level,
            StatName::Experience => &self.experience,
            StatName::ExperienceToLevel => &self.experience_to_level,
        }
    }

    fn slot_mut(&mut self, stat: StatName) -> &mut i64 {
        match stat {
            StatName::Health => &mut self.health,
            StatName::MaxHealth => &mut self.max_health,
            StatName::Mana => &mut self.mana,
            StatName::MaxMana => &mut self.max_mana,
            StatName::Strength => &mut self.strength,
            StatName::Intelligence => &mut self.intelligence,
            StatName::Dexterity => &mut self.dexterity,
            StatName::Charisma => &mut self.charisma,
            StatName::Defense => &mut self.defense,
            StatName::Resistance => &mut self.resistance,
            StatName::Level => &mut self.level,
            StatName::Experience => &mut self.experience,
            StatName::ExperienceToLevel => &mut self.experience_to_level,
        }
    }

    /// Re-establish `0 <= health <= max_health` and `0 <= mana <= max_mana`.
    fn clamp_pools(&mut self) {
        self.max_health = self.max_health.max(0);
        self.max_mana = self.max_mana.max(0);
        self.health = self.health.clamp(0, self.max_health);
        self.mana = self.mana.clamp(0, self.max_mana);
    }
}

/// Where the character comes from. Read by `{player.background.*}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    pub hometown: String,
    pub backstory: String,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            hometown: "Unknown".to_string(),
            backstory: "A mysterious adventurer with an unknown past.".to_string(),
        }
    }
}

impl Background {
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "hometown" => Some(&self.hometown),
            "backstory" => Some(&self.backstory),
            _ => None,
        }
    }
}

/// The player character.
///
/// Stats are private to the crate's mutation contract: outside code reads
/// them through [`Player::stats`] and changes them only via
/// [`Player::modify_stat`], which keeps the health and mana pools clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub archetype: Archetype,
    stats: Stats,
    pub abilities: Vec<String>,
    pub background: Background,
}

impl Player {
    /// A fresh level-1 character with default stats and archetype abilities.
    pub fn new(name: impl Into<String>, archetype: impl Into<Archetype>) -> Self {
        let archetype = archetype.into();
        Self {
            name: name.into(),
            abilities: archetype.default_abilities(),
            archetype,
            stats: Stats::default(),
            background: Background::default(),
        }
    }

    /// Build a character from an explicit stat block. Pools are clamped.
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self.stats.clamp_pools();
        self
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Pull health and mana back inside their pools. Used on deserialized
    /// characters, which skip the mutation methods.
    pub fn normalize(&mut self) {
        let before = (self.stats.health, self.stats.mana);
        self.stats.clamp_pools();
        if before != (self.stats.health, self.stats.mana) {
            tracing::debug!(player = self.name.as_str(), "clamped imported health/mana");
        }
    }

    /// Add `delta` to the named stat.
    ///
    /// Returns false (and changes nothing) when the name is not a known stat.
    /// Health and mana stay within `[0, max]`; gaining experience may level
    /// the character up one or more times.
    pub fn modify_stat(&mut self, name: &str, delta: i64) -> bool {
        let Some(stat) = StatName::parse(name) else {
            tracing::debug!(stat = name, "unknown stat, not applied");
            return false;
        };
        self.apply_delta(stat, delta);
        true
    }

    pub(crate) fn apply_delta(&mut self, stat: StatName, delta: i64) {
        *self.stats.slot_mut(stat) += delta;
        self.stats.clamp_pools();
        if stat == StatName::Experience {
            self.check_level_up();
        }
    }

    /// Overwrite current health, clamped. Used when combat hands health back.
    pub(crate) fn set_health(&mut self, health: i64) {
        self.stats.health = health;
        self.stats.clamp_pools();
    }

    /// Level up while experience covers the threshold. Returns levels gained.
    fn check_level_up(&mut self) -> u32 {
        let mut gained = 0;
        while self.stats.experience_to_level > 0
            && self.stats.experience >= self.stats.experience_to_level
        {
            let s = &mut self.stats;
            s.level += 1;
            s.experience -= s.experience_to_level;
            s.experience_to_level = s.experience_to_level * 3 / 2;
            s.max_health += 10;
            s.max_mana += 5;

            match self.archetype {
                Archetype::Warrior => {
                    s.strength += 3;
                    s.defense += 2;
                    s.dexterity += 1;
                }
                Archetype::Mage => {
                    s.intelligence += 3;
                    s.resistance += 2;
                    s.max_mana += 5;
                }
                Archetype::Rogue => {
                    s.dexterity += 3;
                    s.charisma += 1;
                    s.strength += 1;
                }
                Archetype::Diplomat => {
                    s.charisma += 3;
                    s.intelligence += 2;
                    s.resistance += 1;
                }
                Archetype::Other(_) => {
                    s.strength += 1;
                    s.intelligence += 1;
                    s.dexterity += 1;
                    s.charisma += 1;
                    s.defense += 1;
                }
            }

            s.health = s.max_health;
            s.mana = s.max_mana;
            gained += 1;
            tracing::info!(level = s.level, "level up");
        }
        gained
    }

    /// Learn an ability. Returns false if it was already known.
    pub fn add_ability(&mut self, ability: impl Into<String>) -> bool {
        let ability = ability.into();
        if self.abilities.contains(&ability) {
            return false;
        }
        self.abilities.push(ability);
        true
    }
}
