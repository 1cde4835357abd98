use std::fmt;

/// Token written for an unknown parent unless configured otherwise.
pub const UNKNOWN_TOKEN: &str = "0";

/// An individual identifier as read from a pedigree table.
///
/// Any raw token of one byte or less (`"0"`, `"."`, `""`) means the
/// parent is unknown and is never expanded during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    Unknown,
    Known(String),
}

impl Identifier {
    /// Normalise a raw field into an identifier.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.len() <= 1 {
            Identifier::Unknown
        } else {
            Identifier::Known(trimmed.to_string())
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Identifier::Known(_))
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            Identifier::Known(id) => Some(id),
            Identifier::Unknown => None,
        }
    }

    /// Render with a caller-chosen token for unknown.
    pub fn render<'a>(&'a self, missing: &'a str) -> &'a str {
        match self {
            Identifier::Known(id) => id,
            Identifier::Unknown => missing,
        }
    }

    /// Whether this identifier is the known individual `id`.
    pub fn is(&self, id: &str) -> bool {
        self.as_known() == Some(id)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render(UNKNOWN_TOKEN))
    }
}

impl From<&str> for Identifier {
    fn from(raw: &str) -> Self {
        Identifier::parse(raw)
    }
}

/// Sire and dam of one individual.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentLink {
    pub sire: Identifier,
    pub dam: Identifier,
}

impl ParentLink {
    pub fn new(sire: Identifier, dam: Identifier) -> Self {
        Self { sire, dam }
    }

    /// A link with both parents unknown.
    pub fn unknown() -> Self {
        Self::new(Identifier::Unknown, Identifier::Unknown)
    }

    /// Known parents, sire first.
    pub fn known_parents(&self) -> impl Iterator<Item = &str> {
        self.sire.as_known().into_iter().chain(self.dam.as_known())
    }

    pub fn has_parent(&self, id: &str) -> bool {
        self.sire.is(id) || self.dam.is(id)
    }

    pub fn is_founder(&self) -> bool {
        !self.sire.is_known() && !self.dam.is_known()
    }
}

impl Default for ParentLink {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Sex inferred from which parent column an identifier is used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    pub fn code(self) -> char {
        match self {
            Sex::Male => 'M',
            Sex::Female => 'F',
            Sex::Unknown => 'U',
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// How `id,sire,dam` lines are rendered on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFormat {
    pub delimiter: char,
    pub missing: String,
}

impl RecordFormat {
    pub fn new(delimiter: char, missing: &str) -> Self {
        Self {
            delimiter,
            missing: missing.to_string(),
        }
    }

    pub fn render(&self, id: &str, link: &ParentLink) -> String {
        format!(
            "{id}{d}{sire}{d}{dam}",
            d = self.delimiter,
            sire = link.sire.render(&self.missing),
            dam = link.dam.render(&self.missing),
        )
    }
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self::new(',', UNKNOWN_TOKEN)
    }
}
