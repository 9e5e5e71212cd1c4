//! Streaming parser configuration and implementation.
//!
//! The parser is a hand-rolled, codepoint-at-a-time finite automaton
//! (not combinator-based) because:
//! 1. Push/incremental parsing requires suspendable state at every
//!    codepoint boundary
//! 2. Lenient-mode recovery requires fine-grained control over lexer state
//! 3. Performance — no abstraction overhead in the hot loop

pub(crate) mod buffers;
pub(crate) mod chars;
mod machine;
pub(crate) mod namespace;
pub(crate) mod state;

pub use machine::SaxParser;

/// Default maximum length (in bytes) a single region buffer may reach
/// before the overflow policy applies.
pub(crate) const DEFAULT_MAX_BUFFER_LENGTH: usize = 64 * 1024;

/// Maximum recursion depth for re-fed entity replacement text under
/// `unparsed_entities`.
pub(crate) const MAX_ENTITY_DEPTH: usize = 64;

/// Case normalization applied to tag and attribute names in lenient mode.
///
/// Strict mode always preserves case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseTransform {
    /// Keep names exactly as written.
    #[default]
    Preserve,
    /// ASCII-lowercase names when they are committed.
    Lowercase,
    /// ASCII-uppercase names when they are committed.
    Uppercase,
}

/// Parser options controlling fidelity mode, normalization, namespace
/// processing, and resource limits.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use saxoxide::{CaseTransform, ParserOptions};
///
/// let opts = ParserOptions::default()
///     .strict(true)
///     .track_position(true)
///     .max_buffer_length(1024 * 1024);
///
/// let lenient = ParserOptions::default()
///     .case_transform(CaseTransform::Lowercase)
///     .trim(true)
///     .normalize(true);
/// ```
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct ParserOptions {
    /// Reject constructs lenient parsing accepts; names stay case-exact.
    pub strict: bool,
    /// Case normalization for tag/attribute names (lenient mode only).
    pub case_transform: CaseTransform,
    /// Strip leading/trailing whitespace from text and comment events.
    pub trim: bool,
    /// Collapse internal whitespace runs in text and comment events.
    pub normalize: bool,
    /// Enable xmlns resolution and deferred attribute emission.
    pub namespaces: bool,
    /// Maintain line/column and attach locations to errors. Default true.
    pub track_position: bool,
    /// Restrict named entities to the five XML predefined ones.
    pub strict_entities: bool,
    /// Tolerate attribute values without quotes. Defaults to `!strict`.
    unquoted_attribute_values: Option<bool>,
    /// Recursively re-feed non-predefined entity replacement text.
    pub unparsed_entities: bool,
    /// Per-region buffer cap; `usize::MAX` disables the overflow check.
    pub max_buffer_length: usize,
    /// Treat `<script>` bodies as raw text until `</script>` (lenient only).
    pub allow_script: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            strict: false,
            case_transform: CaseTransform::Preserve,
            trim: false,
            normalize: false,
            namespaces: false,
            track_position: true,
            strict_entities: false,
            unquoted_attribute_values: None,
            unparsed_entities: false,
            max_buffer_length: DEFAULT_MAX_BUFFER_LENGTH,
            allow_script: false,
        }
    }
}

impl ParserOptions {
    /// Enables or disables strict mode.
    #[must_use]
    pub fn strict(mut self, yes: bool) -> Self {
        self.strict = yes;
        self
    }

    /// Sets the case normalization for tag and attribute names.
    #[must_use]
    pub fn case_transform(mut self, transform: CaseTransform) -> Self {
        self.case_transform = transform;
        self
    }

    /// Enables or disables trimming of text and comment events.
    #[must_use]
    pub fn trim(mut self, yes: bool) -> Self {
        self.trim = yes;
        self
    }

    /// Enables or disables whitespace-run collapsing in text and comments.
    #[must_use]
    pub fn normalize(mut self, yes: bool) -> Self {
        self.normalize = yes;
        self
    }

    /// Enables or disables namespace processing.
    #[must_use]
    pub fn namespaces(mut self, yes: bool) -> Self {
        self.namespaces = yes;
        self
    }

    /// Enables or disables line/column tracking.
    #[must_use]
    pub fn track_position(mut self, yes: bool) -> Self {
        self.track_position = yes;
        self
    }

    /// Restricts named entities to the five XML predefined ones.
    #[must_use]
    pub fn strict_entities(mut self, yes: bool) -> Self {
        self.strict_entities = yes;
        self
    }

    /// Tolerates unquoted attribute values. When never set, this defaults
    /// to the opposite of `strict`.
    #[must_use]
    pub fn unquoted_attribute_values(mut self, yes: bool) -> Self {
        self.unquoted_attribute_values = Some(yes);
        self
    }

    /// Enables recursive expansion of non-predefined entity replacements.
    #[must_use]
    pub fn unparsed_entities(mut self, yes: bool) -> Self {
        self.unparsed_entities = yes;
        self
    }

    /// Sets the per-region buffer cap. `usize::MAX` disables the check.
    #[must_use]
    pub fn max_buffer_length(mut self, max: usize) -> Self {
        self.max_buffer_length = max;
        self
    }

    /// Enables the lenient `<script>` raw-text mode.
    #[must_use]
    pub fn allow_script(mut self, yes: bool) -> Self {
        self.allow_script = yes;
        self
    }

    /// Whether unquoted attribute values are tolerated, applying the
    /// `!strict` default when the option was never set explicitly.
    #[must_use]
    pub fn unquoted_attribute_values_enabled(&self) -> bool {
        self.unquoted_attribute_values.unwrap_or(!self.strict)
    }

    /// The effective case transform: strict mode preserves case.
    pub(crate) fn effective_case_transform(&self) -> CaseTransform {
        if self.strict {
            CaseTransform::Preserve
        } else {
            self.case_transform
        }
    }

    /// Applies the effective case transform to a committed name.
    pub(crate) fn transform_name(&self, name: &str) -> String {
        match self.effective_case_transform() {
            CaseTransform::Preserve => name.to_string(),
            CaseTransform::Lowercase => name.to_ascii_lowercase(),
            CaseTransform::Uppercase => name.to_ascii_uppercase(),
        }
    }
}
