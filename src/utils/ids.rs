//! Identifier generation for directory, component and file entries.
//!
//! Two schemes exist. Format version 1 manifests use readable sequential
//! identifiers (`comp_Group_12`) driven by [`SequenceCounters`] that are
//! persisted in the options header. Version 2 manifests use random 128-bit
//! tokens rendered as 32 uppercase hex digits. Either way, nodes preserved
//! from a prior manifest keep their identifiers verbatim; this module only
//! runs for brand-new entries.

use rand::Rng;
use tracing::trace;

/// Longest identifier emitted by the legacy scheme.
pub const MAX_ID_LEN: usize = 70;

/// Source of 128-bit tokens for identifiers and component GUIDs.
pub trait TokenSource {
    /// Produce the next token.
    fn next_token(&mut self) -> u128;
}

/// Tokens from the thread-local random generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&mut self) -> u128 {
        rand::rng().random::<u128>()
    }
}

/// Deterministic counting tokens, for reproducible output in tests and benches.
#[derive(Debug, Clone, Copy)]
pub struct SequentialTokens {
    next: u128,
}

impl SequentialTokens {
    /// Start counting at `start`.
    #[must_use]
    pub const fn new(start: u128) -> Self {
        Self { next: start }
    }
}

impl Default for SequentialTokens {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TokenSource for SequentialTokens {
    fn next_token(&mut self) -> u128 {
        let token = self.next;
        self.next = self.next.wrapping_add(1);
        token
    }
}

/// Legacy numbering state, read from and written back to the options header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCounters {
    /// Number used for the next directory id
    pub next_directory: u32,
    /// Number used for the next component id
    pub next_component: u32,
    /// Step between directory numbers, and the size of the component gap
    /// left after each new directory
    pub increment: u32,
}

impl Default for SequenceCounters {
    fn default() -> Self {
        Self {
            next_directory: 0,
            next_component: 0,
            increment: 1,
        }
    }
}

/// Creates identifiers for new manifest entries.
pub struct IdGenerator {
    group_name: String,
    counters: Option<SequenceCounters>,
    tokens: Box<dyn TokenSource>,
}

impl IdGenerator {
    /// Random identifiers (format version 2).
    #[must_use]
    pub fn modern(group_name: impl Into<String>, tokens: Box<dyn TokenSource>) -> Self {
        Self {
            group_name: group_name.into(),
            counters: None,
            tokens,
        }
    }

    /// Sequential identifiers (format version 1) seeded from `counters`.
    #[must_use]
    pub fn legacy(
        group_name: impl Into<String>,
        counters: SequenceCounters,
        tokens: Box<dyn TokenSource>,
    ) -> Self {
        Self {
            group_name: group_name.into(),
            counters: Some(counters),
            tokens,
        }
    }

    /// Current counter state; `None` in random mode.
    #[must_use]
    pub const fn counters(&self) -> Option<SequenceCounters> {
        self.counters
    }

    /// Id for a new directory.
    ///
    /// `dotted_path` is the directory's path from the starting directory's
    /// own name down, with separators replaced by `.` (e.g. `app.bin.x64`).
    pub fn directory_id(&mut self, dotted_path: &str) -> String {
        let id = match self.counters.as_mut() {
            Some(counters) => {
                let id = legacy_id("dir", dotted_path, i64::from(counters.next_directory));
                counters.next_directory = counters.next_directory.wrapping_add(counters.increment);
                id
            }
            None => self.random_id("dir"),
        };
        trace!(%id, "Generated directory id");
        id
    }

    /// Id for a new component. Must be called before [`Self::file_id`] so
    /// that legacy file ids share the component's number.
    pub fn component_id(&mut self) -> String {
        match self.counters.as_mut() {
            Some(counters) => {
                let id = legacy_id("comp", &self.group_name, i64::from(counters.next_component));
                counters.next_component = counters.next_component.wrapping_add(1);
                id
            }
            None => self.random_id("comp"),
        }
    }

    /// Id for a new file entry or per-user registry value name.
    pub fn file_id(&mut self) -> String {
        match self.counters {
            Some(counters) => legacy_id(
                "file",
                &self.group_name,
                i64::from(counters.next_component) - 1,
            ),
            None => self.random_id("file"),
        }
    }

    /// Installation GUID for a new component, uppercase and hyphenated.
    pub fn guid(&mut self) -> String {
        let bytes = self.tokens.next_token().to_be_bytes();
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .hyphenated()
            .to_string()
            .to_uppercase()
    }

    /// Leave room for hand-added components after a new directory's files.
    ///
    /// Only meaningful in legacy mode, and only for directories that produced
    /// at least one component.
    pub fn finish_new_directory(&mut self) {
        if let Some(counters) = self.counters.as_mut() {
            counters.next_component = counters
                .next_component
                .wrapping_add(counters.increment.saturating_sub(1));
        }
    }

    fn random_id(&mut self, prefix: &str) -> String {
        format!("{prefix}_{:032X}", self.tokens.next_token())
    }
}

/// Build a legacy `{prefix}_{main}_{sequence}` id.
///
/// When the result would exceed [`MAX_ID_LEN`] characters the `main` segment
/// is cut to `MAX_ID_LEN - (len(sequence) + len(prefix))` characters. The
/// result is then passed through [`sanitize_id`].
#[must_use]
pub fn legacy_id(prefix: &str, main: &str, sequence: i64) -> String {
    let sequence = sequence.to_string();
    let mut id = format!("{prefix}_{main}_{sequence}");
    if id.chars().count() > MAX_ID_LEN {
        let budget = MAX_ID_LEN.saturating_sub(sequence.len() + prefix.chars().count());
        let cut: String = main.chars().take(budget).collect();
        id = format!("{prefix}_{cut}_{sequence}");
    }
    sanitize_id(&id)
}

/// Replace every character outside `[0-9a-zA-Z_]` with `_`.
#[must_use]
pub fn sanitize_id(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
