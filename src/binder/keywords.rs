//==================================================
// File: binder/keywords.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Static keyword descriptors for native routines
// Objective: Parse compact descriptor strings and match (abbreviated,
//            optionally `no`-prefixed) keyword names against them
//==================================================

/// One recognised keyword of a native routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordEntry {
    /// Binds the value to a positional slot. `preserve` passes the argument
    /// symbol through without evaluating it.
    Slot {
        name: String,
        slot: usize,
        preserve: bool,
    },
    /// Sets (or clears) `mask` in the call's mode word; takes no slot.
    Mode { name: String, mask: u32 },
}

impl KeywordEntry {
    pub fn name(&self) -> &str {
        match self {
            KeywordEntry::Slot { name, .. } | KeywordEntry::Mode { name, .. } => name,
        }
    }
}

/// Result of matching a keyword name against a list of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordMatch {
    pub position: usize,
    pub inverted: bool,
}

/// Match `given` against `candidates`: `given` may abbreviate a candidate,
/// and a leading `NO` may be stripped to select the inverted form. Direct
/// matches win over inverted ones.
pub fn match_keyword<'a, I>(candidates: I, given: &str) -> Option<KeywordMatch>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    let given = given.to_ascii_uppercase();
    if given.is_empty() {
        return None;
    }
    let find = |needle: &str| {
        candidates
            .clone()
            .into_iter()
            .position(|candidate| candidate.to_ascii_uppercase().starts_with(needle))
    };
    if let Some(position) = find(&given) {
        return Some(KeywordMatch {
            position,
            inverted: false,
        });
    }
    let stripped = given.strip_prefix("NO").filter(|rest| !rest.is_empty())?;
    find(stripped).map(|position| KeywordMatch {
        position,
        inverted: true,
    })
}

/// Keyword descriptor of a native routine, built once from a descriptor
/// string of whitespace-separated entries:
///
/// * `NAME`   a positional slot (slots are numbered in order of appearance)
/// * `NAME*`  a positional slot whose value is passed unevaluated
/// * `4NAME`  a mode keyword OR-ing mask `4` into the mode word
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    entries: Vec<KeywordEntry>,
    slots: usize,
}

impl KeywordTable {
    pub fn parse(descriptor: &str) -> Self {
        let mut table = KeywordTable::default();
        for token in descriptor.split_whitespace() {
            let digits: String = token.chars().take_while(char::is_ascii_digit).collect();
            let rest = &token[digits.len()..];
            if !digits.is_empty() {
                let mask = digits.parse().unwrap_or(0);
                table.entries.push(KeywordEntry::Mode {
                    name: rest.to_ascii_uppercase(),
                    mask,
                });
                continue;
            }
            let (name, preserve) = match rest.strip_suffix('*') {
                Some(name) => (name, true),
                None => (rest, false),
            };
            table.entries.push(KeywordEntry::Slot {
                name: name.to_ascii_uppercase(),
                slot: table.slots,
                preserve,
            });
            table.slots += 1;
        }
        table
    }

    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    /// Number of named positional slots.
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    pub fn slot_name(&self, slot: usize) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            KeywordEntry::Slot { name, slot: s, .. } if *s == slot => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn slot_preserved(&self, slot: usize) -> bool {
        self.entries.iter().any(|entry| {
            matches!(entry, KeywordEntry::Slot { slot: s, preserve: true, .. } if *s == slot)
        })
    }

    pub fn lookup(&self, given: &str) -> Option<(&KeywordEntry, bool)> {
        let names = self.entries.iter().map(KeywordEntry::name);
        match_keyword(names, given).map(|found| (&self.entries[found.position], found.inverted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_parses_slots_modes_and_preserve_markers() {
        let table = KeywordTable::parse("x y* 4inner 8outer");
        assert_eq!(table.slot_count(), 2);
        assert_eq!(table.slot_name(1), Some("Y"));
        assert!(table.slot_preserved(1));
        assert!(!table.slot_preserved(0));
        assert_eq!(
            table.lookup("outer").map(|(entry, _)| entry.clone()),
            Some(KeywordEntry::Mode {
                name: "OUTER".into(),
                mask: 8
            })
        );
    }

    #[test]
    fn abbreviations_and_no_prefix_resolve() {
        let table = KeywordTable::parse("value 2double 1mean");
        let (entry, inverted) = table.lookup("DOUB").expect("abbreviation");
        assert_eq!(entry.name(), "DOUBLE");
        assert!(!inverted);

        let (entry, inverted) = table.lookup("nomean").expect("inverted");
        assert_eq!(entry.name(), "MEAN");
        assert!(inverted);

        assert!(table.lookup("no").is_none());
        assert!(table.lookup("median").is_none());
    }

    #[test]
    fn direct_match_beats_inversion() {
        let found = match_keyword(["NORMAL", "RMAL"], "norm").expect("match");
        assert_eq!(found, KeywordMatch { position: 0, inverted: false });
    }
}

//==================================================
// End of file
//==================================================
