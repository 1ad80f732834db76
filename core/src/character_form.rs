//! Character-form (half-width / full-width) rules and learned preferences.
//!
//! The manager holds two rule tables, one consulted while the user is still
//! composing (preedit) and one for the finalized conversion, plus the history
//! of forms the user picked for `LastForm` groups. All state sits behind one
//! `RwLock`: lookups take the read side, every mutation (including the
//! write-through to the persisted history) takes the write side, so a reader
//! never sees a half-rebuilt table.
//!
//! Characters are canonicalized before lookup: full-width ASCII folds to
//! ASCII, every Latin letter folds to `A`, every digit to `0` and every
//! katakana to `ア`. A rule for `"A"` therefore covers all letters in
//! either width.

use crate::form_history::FormHistory;
use crate::width::{self, FormType};
use crate::Config;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Width preference of a rule group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharacterForm {
    HalfWidth,
    FullWidth,
    /// Whatever form the user chose last time for the group
    LastForm,
    /// Undecided; callers must leave the width alone
    NoConversion,
}

impl CharacterForm {
    fn from_form_type(form: FormType) -> Option<CharacterForm> {
        match form {
            FormType::HalfWidth => Some(CharacterForm::HalfWidth),
            FormType::FullWidth => Some(CharacterForm::FullWidth),
            FormType::Unknown => None,
        }
    }

    fn to_form_type(self) -> FormType {
        match self {
            CharacterForm::HalfWidth => FormType::HalfWidth,
            CharacterForm::FullWidth => FormType::FullWidth,
            _ => FormType::Unknown,
        }
    }
}

/// Which of the two rule tables to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormTable {
    Preedit,
    Conversion,
}

impl FormTable {
    fn name(self) -> &'static str {
        match self {
            FormTable::Preedit => "preedit",
            FormTable::Conversion => "conversion",
        }
    }
}

/// Stock rules: (group, preedit form, conversion form).
pub const DEFAULT_RULES: &[(&str, CharacterForm, CharacterForm)] = &[
    ("ア", CharacterForm::FullWidth, CharacterForm::FullWidth),
    ("A", CharacterForm::FullWidth, CharacterForm::LastForm),
    ("0", CharacterForm::FullWidth, CharacterForm::LastForm),
    ("(){}[]", CharacterForm::FullWidth, CharacterForm::LastForm),
    (".,", CharacterForm::FullWidth, CharacterForm::LastForm),
    ("。、・「」", CharacterForm::FullWidth, CharacterForm::FullWidth),
    ("\"'", CharacterForm::FullWidth, CharacterForm::LastForm),
    (":;", CharacterForm::FullWidth, CharacterForm::LastForm),
    ("#%&@$^_|`\\", CharacterForm::FullWidth, CharacterForm::LastForm),
    ("~", CharacterForm::FullWidth, CharacterForm::LastForm),
    ("<>=+-/*", CharacterForm::FullWidth, CharacterForm::LastForm),
    ("?!", CharacterForm::FullWidth, CharacterForm::LastForm),
];

/// Representative character used as the rule-table key for `ch`.
pub fn canonical_char(ch: char) -> char {
    let ch = match ch {
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(ch as u32 - 0xFF01 + 0x21).unwrap_or(ch),
        '｡' => '。',
        '｢' => '「',
        '｣' => '」',
        '､' => '、',
        '･' => '・',
        _ => ch,
    };
    match ch {
        'a'..='z' | 'A'..='Z' => 'A',
        '0'..='9' => '0',
        '\u{30A1}'..='\u{30FA}' | '\u{30FC}'..='\u{30FE}' | '\u{FF66}'..='\u{FF9F}' => 'ア',
        _ => ch,
    }
}

#[derive(Debug, Clone)]
struct RuleGroup {
    /// Canonical characters of the group, used as the history key
    key: String,
    form: CharacterForm,
}

#[derive(Debug, Clone)]
struct RuleTable {
    kind: FormTable,
    groups: Vec<RuleGroup>,
    members: HashMap<char, usize>,
}

impl RuleTable {
    fn new(kind: FormTable) -> Self {
        Self {
            kind,
            groups: Vec::new(),
            members: HashMap::new(),
        }
    }

    fn add_rule(&mut self, characters: &str, form: CharacterForm) {
        let mut key = String::new();
        for ch in characters.chars().map(canonical_char) {
            if !key.contains(ch) {
                key.push(ch);
            }
        }
        if key.is_empty() {
            return;
        }
        let index = self.groups.len();
        // Last writer wins per character; earlier groups keep their other members.
        for ch in key.chars() {
            self.members.insert(ch, index);
        }
        self.groups.push(RuleGroup { key, form });
    }

    fn group_of(&self, ch: char) -> Option<&RuleGroup> {
        self.members
            .get(&canonical_char(ch))
            .and_then(|&i| self.groups.get(i))
    }

    fn history_key(&self, group: &RuleGroup) -> String {
        format!("{}:{}", self.kind.name(), group.key)
    }

    fn clear(&mut self) {
        self.groups.clear();
        self.members.clear();
    }
}

#[derive(Debug)]
struct Inner {
    preedit: RuleTable,
    conversion: RuleTable,
    store: FormHistory,
    /// Loaded copy of `store`, kept in sync on every write
    history: HashMap<String, FormType>,
}

impl Inner {
    fn table(&self, kind: FormTable) -> &RuleTable {
        match kind {
            FormTable::Preedit => &self.preedit,
            FormTable::Conversion => &self.conversion,
        }
    }

    fn table_mut(&mut self, kind: FormTable) -> &mut RuleTable {
        match kind {
            FormTable::Preedit => &mut self.preedit,
            FormTable::Conversion => &mut self.conversion,
        }
    }

    /// Preference of `ch` with `LastForm` resolved through the history.
    fn resolved_form(&self, kind: FormTable, ch: char) -> Option<(CharacterForm, bool)> {
        let table = self.table(kind);
        let group = table.group_of(ch)?;
        if group.form != CharacterForm::LastForm {
            return Some((group.form, false));
        }
        let form = self
            .history
            .get(&table.history_key(group))
            .and_then(|&f| CharacterForm::from_form_type(f))
            .unwrap_or(CharacterForm::FullWidth);
        Some((form, true))
    }

    fn set_default_rule(&mut self) {
        self.preedit.clear();
        self.conversion.clear();
        for &(group, preedit, conversion) in DEFAULT_RULES {
            self.preedit.add_rule(group, preedit);
            self.conversion.add_rule(group, conversion);
        }
    }

    /// Persist `changes` in one write, then update the cache. A failed
    /// write leaves both untouched.
    fn record_all(&mut self, changes: Vec<(String, FormType)>) -> Result<()> {
        let changes: Vec<_> = changes
            .into_iter()
            .filter(|(key, form)| self.history.get(key) != Some(form))
            .collect();
        self.store.set_many(&changes)?;
        self.history.extend(changes);
        Ok(())
    }
}

/// Rule tables plus learned history; share it behind an `Arc`.
#[derive(Debug)]
pub struct CharacterFormManager {
    inner: RwLock<Inner>,
}

impl Default for CharacterFormManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterFormManager {
    /// Empty tables, in-memory history.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                preedit: RuleTable::new(FormTable::Preedit),
                conversion: RuleTable::new(FormTable::Conversion),
                store: FormHistory::new_in_memory(),
                history: HashMap::new(),
            }),
        }
    }

    /// Empty tables backed by `store`; the stored history is loaded now.
    pub fn with_history(store: FormHistory) -> Result<Self> {
        let history = store.snapshot()?;
        Ok(Self {
            inner: RwLock::new(Inner {
                preedit: RuleTable::new(FormTable::Preedit),
                conversion: RuleTable::new(FormTable::Conversion),
                store,
                history,
            }),
        })
    }

    /// Manager with the rules of `config` and the history in `store`.
    pub fn from_config(config: &Config, store: FormHistory) -> Result<Self> {
        let manager = Self::with_history(store)?;
        manager.reload_config(config)?;
        Ok(manager)
    }

    // ========== Rule table management ==========

    /// Register every character of `characters` as one new group.
    pub fn add_rule(&self, table: FormTable, characters: &str, form: CharacterForm) {
        if let Ok(mut inner) = self.inner.write() {
            inner.table_mut(table).add_rule(characters, form);
        }
    }

    pub fn add_preedit_rule(&self, characters: &str, form: CharacterForm) {
        self.add_rule(FormTable::Preedit, characters, form);
    }

    pub fn add_conversion_rule(&self, characters: &str, form: CharacterForm) {
        self.add_rule(FormTable::Conversion, characters, form);
    }

    /// Replace both tables with the stock rules.
    pub fn set_default_rule(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.set_default_rule();
        }
    }

    /// Rebuild both tables from `config` and reload the stored history.
    ///
    /// A config without rules falls back to the stock rules.
    pub fn reload_config(&self, config: &Config) -> Result<()> {
        let mut preedit = RuleTable::new(FormTable::Preedit);
        let mut conversion = RuleTable::new(FormTable::Conversion);
        for rule in &config.character_form_rules {
            preedit.add_rule(&rule.group, rule.preedit_character_form);
            conversion.add_rule(&rule.group, rule.conversion_character_form);
        }

        let Ok(mut inner) = self.inner.write() else {
            anyhow::bail!("character form manager lock poisoned");
        };
        let history = inner.store.snapshot()?;
        inner.history = history;
        if config.character_form_rules.is_empty() {
            inner.set_default_rule();
        } else {
            inner.preedit = preedit;
            inner.conversion = conversion;
        }
        tracing::debug!(
            "reloaded character form rules: {} preedit groups, {} conversion groups",
            inner.preedit.groups.len(),
            inner.conversion.groups.len()
        );
        Ok(())
    }

    /// Drop both rule tables. Learned history is kept.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.preedit.clear();
            inner.conversion.clear();
        }
    }

    /// Forget every learned form. Rule tables are kept.
    pub fn clear_history(&self) -> Result<()> {
        let Ok(mut inner) = self.inner.write() else {
            anyhow::bail!("character form manager lock poisoned");
        };
        inner.store.clear()?;
        inner.history.clear();
        Ok(())
    }

    // ========== Lookup ==========

    /// Common resolved preference of the classified characters of `input`.
    ///
    /// Returns `NoConversion` when two classified characters disagree or
    /// when nothing in `input` is classified.
    pub fn get_form(&self, input: &str, table: FormTable) -> CharacterForm {
        let Ok(inner) = self.inner.read() else {
            return CharacterForm::NoConversion;
        };
        let mut result: Option<CharacterForm> = None;
        for ch in input.chars() {
            let Some((form, _)) = inner.resolved_form(table, ch) else {
                continue;
            };
            match result {
                None => result = Some(form),
                Some(prev) if prev != form => return CharacterForm::NoConversion,
                Some(_) => {}
            }
        }
        result.unwrap_or(CharacterForm::NoConversion)
    }

    pub fn get_preedit_character_form(&self, input: &str) -> CharacterForm {
        self.get_form(input, FormTable::Preedit)
    }

    pub fn get_conversion_character_form(&self, input: &str) -> CharacterForm {
        self.get_form(input, FormTable::Conversion)
    }

    // ========== Conversion ==========

    /// Convert each classified character to its group's resolved form.
    ///
    /// Returns the primary rendering and, when some `LastForm` group makes
    /// the other width meaningful, the alternative rendering. The
    /// alternative is only returned if it differs from the primary one.
    pub fn convert_with_alternative(
        &self,
        input: &str,
        table: FormTable,
    ) -> (String, Option<String>) {
        let Ok(inner) = self.inner.read() else {
            return (input.to_string(), None);
        };

        // Runs of (primary form, alternative form); voicing marks need the
        // whole run to compose correctly.
        let mut output = String::with_capacity(input.len());
        let mut alternative = String::with_capacity(input.len());
        let mut run = String::new();
        let mut run_forms: Option<(FormType, FormType)> = None;
        let mut has_alternative = false;

        let flush = |run: &mut String,
                     forms: Option<(FormType, FormType)>,
                     output: &mut String,
                     alternative: &mut String| {
            if run.is_empty() {
                return;
            }
            let (primary, alt) = forms.unwrap_or((FormType::Unknown, FormType::Unknown));
            output.push_str(&width::convert_to(run, primary));
            alternative.push_str(&width::convert_to(run, alt));
            run.clear();
        };

        for ch in input.chars() {
            let forms = match inner.resolved_form(table, ch) {
                Some((form, learned)) => {
                    let primary = form.to_form_type();
                    let alt = if learned { primary.opposite() } else { primary };
                    has_alternative |= learned;
                    (primary, alt)
                }
                None => (FormType::Unknown, FormType::Unknown),
            };
            if run_forms != Some(forms) {
                flush(&mut run, run_forms, &mut output, &mut alternative);
                run_forms = Some(forms);
            }
            run.push(ch);
        }
        flush(&mut run, run_forms, &mut output, &mut alternative);

        if has_alternative && alternative != output {
            (output, Some(alternative))
        } else {
            (output, None)
        }
    }

    pub fn convert_preedit_string(&self, input: &str) -> String {
        self.convert_with_alternative(input, FormTable::Preedit).0
    }

    pub fn convert_conversion_string(&self, input: &str) -> String {
        self.convert_with_alternative(input, FormTable::Conversion).0
    }

    pub fn convert_preedit_string_with_alternative(&self, input: &str) -> (String, Option<String>) {
        self.convert_with_alternative(input, FormTable::Preedit)
    }

    pub fn convert_conversion_string_with_alternative(
        &self,
        input: &str,
    ) -> (String, Option<String>) {
        self.convert_with_alternative(input, FormTable::Conversion)
    }

    /// Render every character of `input` that has a width counterpart in
    /// `form`. `LastForm` and `NoConversion` leave the text unchanged.
    pub fn convert_width(input: &str, form: CharacterForm) -> String {
        width::convert_to(input, form.to_form_type())
    }

    // ========== Learning ==========

    /// Remember `form` for every `LastForm` group that `input` touches, in
    /// both tables. Only `HalfWidth`/`FullWidth` are recorded.
    pub fn set_character_form(&self, input: &str, form: CharacterForm) -> Result<()> {
        let form = form.to_form_type();
        if form == FormType::Unknown {
            return Ok(());
        }
        self.learn(input, |_| Some(form))
    }

    /// Like `set_character_form`, but each group's form is read off the
    /// characters of `input` themselves. Groups whose characters appear in
    /// both widths are left alone.
    pub fn guess_and_set_character_form(&self, input: &str) -> Result<()> {
        self.learn(input, |ch| match width::form_type_of(ch) {
            FormType::Unknown => None,
            form => Some(form),
        })
    }

    fn learn<F>(&self, input: &str, form_of: F) -> Result<()>
    where
        F: Fn(char) -> Option<FormType>,
    {
        let Ok(mut inner) = self.inner.write() else {
            anyhow::bail!("character form manager lock poisoned");
        };

        let mut changes: Vec<(String, FormType)> = Vec::new();
        for kind in [FormTable::Preedit, FormTable::Conversion] {
            // Group key -> observed form, None once the input disagrees with itself.
            let mut observed: Vec<(String, Option<FormType>)> = Vec::new();
            let table = inner.table(kind);
            for ch in input.chars() {
                let Some(group) = table.group_of(ch) else {
                    continue;
                };
                if group.form != CharacterForm::LastForm {
                    continue;
                }
                let Some(form) = form_of(ch) else {
                    continue;
                };
                let key = table.history_key(group);
                match observed.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, slot)) => {
                        if *slot != Some(form) {
                            *slot = None;
                        }
                    }
                    None => observed.push((key, Some(form))),
                }
            }
            changes.extend(
                observed
                    .into_iter()
                    .filter_map(|(key, form)| form.map(|f| (key, f))),
            );
        }
        inner.record_all(changes)
    }

    // ========== Pairwise classification ==========

    /// Decide which width each of `input1` and `input2` is written in.
    ///
    /// Characters are compared position by position up to the shorter
    /// length, by their own Unicode width. Fails when some position has
    /// the same width in both strings, when either string uses both widths,
    /// or when no position tells the two apart.
    ///
    /// ```
    /// use librewrite_core::{CharacterFormManager, FormType};
    /// assert_eq!(
    ///     CharacterFormManager::get_form_types_from_string_pair("ABCぐーぐる", "ＡＢＣ"),
    ///     Some((FormType::HalfWidth, FormType::FullWidth))
    /// );
    /// assert_eq!(
    ///     CharacterFormManager::get_form_types_from_string_pair("ABC１２３", "ＡＢＣ123"),
    ///     None
    /// );
    /// ```
    pub fn get_form_types_from_string_pair(
        input1: &str,
        input2: &str,
    ) -> Option<(FormType, FormType)> {
        let mut form1 = FormType::Unknown;
        let mut form2 = FormType::Unknown;
        let mut differs = false;

        for (c1, c2) in input1.chars().zip(input2.chars()) {
            let t1 = width::form_type_of(c1);
            let t2 = width::form_type_of(c2);
            if t1 != FormType::Unknown && t1 == t2 {
                return None;
            }
            for (seen, t) in [(&mut form1, t1), (&mut form2, t2)] {
                if t == FormType::Unknown {
                    continue;
                }
                if *seen != FormType::Unknown && *seen != t {
                    return None;
                }
                *seen = t;
            }
            if t1 != FormType::Unknown && t2 != FormType::Unknown {
                differs = true;
            }
        }

        if differs {
            Some((form1, form2))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> CharacterFormManager {
        let m = CharacterFormManager::new();
        m.add_conversion_rule("[]{}()", CharacterForm::LastForm);
        m.add_conversion_rule("+=", CharacterForm::HalfWidth);
        m.add_conversion_rule("0", CharacterForm::FullWidth);
        m
    }

    #[test]
    fn canonical_char_folds_widths_and_classes() {
        assert_eq!(canonical_char('z'), 'A');
        assert_eq!(canonical_char('Ｑ'), 'A');
        assert_eq!(canonical_char('７'), '0');
        assert_eq!(canonical_char('ｶ'), 'ア');
        assert_eq!(canonical_char('ヴ'), 'ア');
        assert_eq!(canonical_char('･'), '・');
        assert_eq!(canonical_char('（'), '(');
        assert_eq!(canonical_char('漢'), '漢');
    }

    #[test]
    fn single_concrete_group() {
        let m = manager();
        assert_eq!(m.get_conversion_character_form("1+1="), CharacterForm::NoConversion);
        assert_eq!(m.get_conversion_character_form("+="), CharacterForm::HalfWidth);
        assert_eq!(m.get_conversion_character_form("１２"), CharacterForm::FullWidth);
        assert_eq!(m.get_conversion_character_form("かな"), CharacterForm::NoConversion);
        assert_eq!(m.get_preedit_character_form("+="), CharacterForm::NoConversion);
    }

    #[test]
    fn last_form_defaults_to_full_width() {
        let m = manager();
        assert_eq!(m.get_conversion_character_form("()"), CharacterForm::FullWidth);
        m.set_character_form("[", CharacterForm::HalfWidth).unwrap();
        assert_eq!(m.get_conversion_character_form("()"), CharacterForm::HalfWidth);
    }

    #[test]
    fn later_rule_overwrites_membership() {
        let m = manager();
        m.add_conversion_rule("=", CharacterForm::FullWidth);
        assert_eq!(m.get_conversion_character_form("="), CharacterForm::FullWidth);
        assert_eq!(m.get_conversion_character_form("+"), CharacterForm::HalfWidth);
    }

    #[test]
    fn conversion_follows_each_group() {
        let m = manager();
        assert_eq!(m.convert_conversion_string("＋12かな"), "+１２かな");
        m.set_character_form("(", CharacterForm::HalfWidth).unwrap();
        let (out, alt) = m.convert_conversion_string_with_alternative("（ａ）");
        assert_eq!(out, "(ａ)");
        assert_eq!(alt.as_deref(), Some("（ａ）"));
        let (out, alt) = m.convert_conversion_string_with_alternative("+");
        assert_eq!(out, "+");
        assert_eq!(alt, None);
    }

    #[test]
    fn guess_learns_each_group_separately() {
        let m = CharacterFormManager::new();
        m.set_default_rule();
        m.guess_and_set_character_form("ＡＢＣ123").unwrap();
        assert_eq!(m.get_conversion_character_form("x"), CharacterForm::FullWidth);
        assert_eq!(m.get_conversion_character_form("9"), CharacterForm::HalfWidth);
        m.guess_and_set_character_form("aＢ").unwrap();
        assert_eq!(m.get_conversion_character_form("x"), CharacterForm::FullWidth);
    }

    #[test]
    fn pair_alignment_ignores_trailing_characters() {
        assert_eq!(
            CharacterFormManager::get_form_types_from_string_pair("ＡＢＣ", "ABCぐーぐる"),
            Some((FormType::FullWidth, FormType::HalfWidth))
        );
        assert_eq!(
            CharacterFormManager::get_form_types_from_string_pair("かな", "カナ"),
            None
        );
        assert_eq!(CharacterFormManager::get_form_types_from_string_pair("", "A"), None);
    }
}
