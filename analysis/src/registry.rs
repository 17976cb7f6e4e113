use std::collections::BTreeMap;
use tracing::info;

const FIRST_LETTER: u32 = 'A' as u32;

#[derive(Debug, Clone)]
/// Bijective mapping between real connection names and their display names
///
/// Aliases receive ascending letter suffixes. Registering an alias that is
/// already taken renames the earlier holder instead of rejecting the new one,
/// so every display name stays unique.
pub struct IdentityRegistry {
    next_letter: u32,
    anonymizer: BTreeMap<String, String>,
    deanonymizer: BTreeMap<String, String>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            next_letter: FIRST_LETTER,
            anonymizer: BTreeMap::new(),
            deanonymizer: BTreeMap::new(),
        }
    }

    /// forget every registration and restart lettering at `A`
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // next unused letter, code points that are no valid char are passed over
    fn take_letter(&mut self) -> char {
        loop {
            let letter = char::from_u32(self.next_letter);
            self.next_letter += 1;

            if let Some(letter) = letter {
                return letter;
            }
        }
    }

    fn is_assigned(&self, display_name: &str) -> bool {
        self.deanonymizer.contains_key(display_name)
    }

    fn assign(&mut self, real_name: &str, display_name: String) {
        if let Some(previous) = self
            .anonymizer
            .insert(real_name.to_string(), display_name.clone())
        {
            self.deanonymizer.remove(&previous);
        }
        self.deanonymizer.insert(display_name, real_name.to_string());
    }

    /// Register a connection and return its display name.
    ///
    /// Without anonymization the real name is displayed. Otherwise the
    /// connection is shown under `alias` (suffixed by a letter on collision) or
    /// under a generic `DBMS <letter>`.
    pub fn register(&mut self, real_name: &str, alias: Option<&str>, anonymous: bool) -> String {
        let display_name = if !anonymous {
            real_name.to_string()
        } else {
            match alias.filter(|alias| !alias.is_empty()) {
                Some(alias) => {
                    if self.is_assigned(alias) {
                        let old_origin = self.deanonymizer[alias].clone();
                        let old_alias = format!("{alias} {}", self.take_letter());

                        info!(connection = %old_origin, alias = %old_alias, "Renamed earlier alias");
                        self.assign(&old_origin, old_alias);
                    }

                    if self.is_assigned(alias) || self.is_assigned(&format!("{alias} A")) {
                        format!("{alias} {}", self.take_letter())
                    } else {
                        alias.to_string()
                    }
                }
                None => format!("DBMS {}", self.take_letter()),
            }
        };

        if anonymous {
            info!(connection = %real_name, alias = %display_name, "Registered alias");
        }
        self.assign(real_name, display_name.clone());

        display_name
    }

    /// display name of a real connection name, unknown names are returned unchanged
    pub fn display_name<'a>(&'a self, real_name: &'a str) -> &'a str {
        self.anonymizer
            .get(real_name)
            .map(String::as_str)
            .unwrap_or(real_name)
    }

    /// real connection name of a display name
    pub fn real_name(&self, display_name: &str) -> Option<&str> {
        self.deanonymizer.get(display_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.anonymizer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anonymizer.is_empty()
    }
}

#[cfg(test)]
mod registry_test;
