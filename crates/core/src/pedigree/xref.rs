use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;

use crate::error::{RefineError, Result};
use crate::types::Identifier;

/// Which column(s) a cross-reference rule rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XrefScope {
    /// `A`: individual, sire and dam columns.
    Any,
    /// `S`: sire column only.
    Sire,
    /// `D`: dam column only.
    Dam,
}

impl XrefScope {
    /// Parse the command token of an xref line.
    pub fn from_command(token: &str) -> Option<Self> {
        match token {
            "A" => Some(XrefScope::Any),
            "S" => Some(XrefScope::Sire),
            "D" => Some(XrefScope::Dam),
            _ => None,
        }
    }

    pub fn command(self) -> &'static str {
        match self {
            XrefScope::Any => "A",
            XrefScope::Sire => "S",
            XrefScope::Dam => "D",
        }
    }
}

/// One `command from to` line of an xref file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefRule {
    pub scope: XrefScope,
    pub from: String,
    pub to: Identifier,
}

impl XrefRule {
    pub fn new(scope: XrefScope, from: &str, to: Identifier) -> Self {
        Self {
            scope,
            from: from.to_string(),
            to,
        }
    }
}

impl fmt::Display for XrefRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.scope.command(), self.from, self.to)
    }
}

/// ID cross-reference rules applied to every pedigree line before it is
/// stored.
///
/// Rules for the same `from` and scope overwrite each other; the last one
/// read wins.
#[derive(Debug, Clone, Default)]
pub struct XrefRules {
    any: HashMap<String, Identifier>,
    sire: HashMap<String, Identifier>,
    dam: HashMap<String, Identifier>,
}

impl XrefRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rules across all scopes.
    pub fn len(&self) -> usize {
        self.any.len() + self.sire.len() + self.dam.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a rule. Rules whose `from` is itself an unknown token never
    /// match a known identifier and are ignored.
    pub fn insert(&mut self, rule: XrefRule) {
        if !Identifier::parse(&rule.from).is_known() {
            log::warn!("xref rule '{}' rewrites an unknown-parent token, ignored", rule);
            return;
        }
        let table = match rule.scope {
            XrefScope::Any => &mut self.any,
            XrefScope::Sire => &mut self.sire,
            XrefScope::Dam => &mut self.dam,
        };
        table.insert(rule.from, rule.to);
    }

    /// Read rules from whitespace-delimited `command from to` lines.
    ///
    /// Blank lines and lines whose first token starts with `#` are skipped.
    /// Unknown commands are logged and skipped.
    ///
    /// # Errors
    /// Returns [`RefineError::Parse`] for the first non-comment line that
    /// does not have exactly 3 fields; no rules are returned in that case.
    pub fn from_reader<R: BufRead>(reader: R, input: &str) -> Result<Self> {
        let mut rules = Self::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.first() {
                None => continue,
                Some(first) if first.starts_with('#') => continue,
                Some(_) => {}
            }
            if fields.len() != 3 {
                return Err(RefineError::Parse {
                    input: input.to_string(),
                    line: n + 1,
                    found: fields.len(),
                    content: line.clone(),
                });
            }
            match XrefScope::from_command(fields[0]) {
                Some(scope) => {
                    rules.insert(XrefRule::new(scope, fields[1], Identifier::parse(fields[2])))
                }
                None => log::warn!("unknown xref command \"{}\", ignored", line.trim()),
            }
        }
        log::debug!(
            "loaded {} xref rules (A={}, S={}, D={})",
            rules.len(),
            rules.any.len(),
            rules.sire.len(),
            rules.dam.len()
        );
        Ok(rules)
    }

    /// Rewrite the three fields of a line: the any-column rules go first,
    /// then the sire-only and dam-only rules, so a column rule can
    /// re-target an already rewritten value.
    pub fn apply(&self, id: Identifier, sire: Identifier, dam: Identifier) -> [Identifier; 3] {
        let id = rewrite(&self.any, id);
        let sire = rewrite(&self.sire, rewrite(&self.any, sire));
        let dam = rewrite(&self.dam, rewrite(&self.any, dam));
        [id, sire, dam]
    }
}

fn rewrite(table: &HashMap<String, Identifier>, id: Identifier) -> Identifier {
    match id.as_known().and_then(|known| table.get(known)) {
        Some(target) => target.clone(),
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(id: &str, sire: &str, dam: &str) -> [Identifier; 3] {
        [id.into(), sire.into(), dam.into()]
    }

    fn rules(text: &str) -> XrefRules {
        XrefRules::from_reader(text.as_bytes(), "xref").unwrap()
    }

    #[test]
    fn test_parse_commands_and_comments() {
        let r = rules("# header line\n\nA OLD1 NEW1\nS SX SY\nD DX DY\n#A IGN IGN\n");
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let r = rules("X AB CD\nA OLD1 NEW1\n");
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_wrong_field_count_is_fatal() {
        let result = XrefRules::from_reader("A OLD1 NEW1\nA ONLY2\n".as_bytes(), "fix.xref");
        match result {
            Err(RefineError::Parse {
                input, line, found, ..
            }) => {
                assert_eq!(input, "fix.xref");
                assert_eq!(line, 2);
                assert_eq!(found, 2);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_any_rule_applies_to_every_column() {
        let r = rules("A OLD1 NEW1\n");
        let [id, sire, dam] = r.apply("OLD1".into(), "OLD1".into(), "OLD1".into());
        assert!(id.is("NEW1"));
        assert!(sire.is("NEW1"));
        assert!(dam.is("NEW1"));
    }

    #[test]
    fn test_column_rules_are_scoped() {
        let r = rules("S XX1 SS1\nD XX1 DD1\n");
        assert_eq!(
            r.apply("XX1".into(), "XX1".into(), "XX1".into()),
            ids("XX1", "SS1", "DD1")
        );
    }

    #[test]
    fn test_column_rule_retargets_global_rewrite() {
        let r = rules("A OLD1 MID1\nS MID1 FIN1\n");
        let [_, sire, dam] = r.apply("C1".into(), "OLD1".into(), "OLD1".into());
        assert!(sire.is("FIN1"));
        assert!(dam.is("MID1"));
    }

    #[test]
    fn test_rule_to_zero_clears_parent() {
        let r = rules("D Q1 0\n");
        let [_, sire, dam] = r.apply("C1".into(), "Q1".into(), "Q1".into());
        assert!(sire.is("Q1"));
        assert_eq!(dam, Identifier::Unknown);
    }

    #[test]
    fn test_rule_on_unknown_token_is_ignored() {
        let r = rules("A 0 SOMEONE\n");
        assert!(r.is_empty());
        assert_eq!(r.apply("C1".into(), "0".into(), "0".into()), ids("C1", "0", "0"));
    }

    #[test]
    fn test_rule_display_round_trips_as_xref_line() {
        let rule = XrefRule::new(XrefScope::Sire, "Q1", Identifier::Unknown);
        assert_eq!(rule.to_string(), "S Q1 0");
        let r = rules(&format!("{}\n", rule));
        assert_eq!(r.len(), 1);
    }
}
