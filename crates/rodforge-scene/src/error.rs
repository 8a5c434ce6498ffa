//! Scene validation diagnostics.
//!
//! Every problem found while turning a scene document into a
//! [`SceneModel`](crate::SceneModel) is reported as a [`CompileError`].
//! Diagnostics carry the document location they refer to (for example
//! `objects[1].n_elem`) so that a failed job's error log points straight at
//! the offending field.
//!
//! # Design
//!
//! - `CompileError` — single diagnostic with a location, message and notes
//! - `ErrorKind` — categorizes diagnostics by the rule that produced them
//! - `Severity` — warning or error; only errors reject a scene
//!
//! # Examples
//!
//! ```
//! # use rodforge_scene::error::*;
//! let error = CompileError::new(
//!     ErrorKind::InvalidGeometry,
//!     "objects[0].n_elem",
//!     "element count must be a positive integer, got 0",
//! );
//! assert!(error.is_error());
//! ```

use std::fmt;

/// Scene diagnostic with document location and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Category of this diagnostic
    pub kind: ErrorKind,
    /// Severity level
    pub severity: Severity,
    /// Path into the scene document (`objects[0].length`, `render.fps`, ...)
    pub location: String,
    /// Primary message
    pub message: String,
    /// Additional notes or hints
    pub notes: Vec<String>,
}

/// Category of scene diagnostic.
///
/// # Invariant
///
/// The discriminant values must match the ERROR_KIND_NAMES array indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// Document is not a structurally valid scene (wrong JSON shape)
    Malformed = 0,
    /// Rod with non-positive length, radius or element count
    InvalidGeometry = 1,
    /// Connection whose rod index does not name an object
    DanglingConnection = 2,
    /// Numeric parameter out of its allowed range or not finite
    InvalidParameter = 3,
    /// Unrecognized object, constraint, force, joint or offset tag
    UnknownTag = 4,
    /// Material name absent from the materials table
    UnknownMaterial = 5,
}

/// Human-readable names for error kinds.
///
/// Index matches ErrorKind discriminant.
const ERROR_KIND_NAMES: &[&str] = &[
    "malformed document",  // 0: Malformed
    "invalid geometry",    // 1: InvalidGeometry
    "dangling connection", // 2: DanglingConnection
    "invalid parameter",   // 3: InvalidParameter
    "unknown tag",         // 4: UnknownTag
    "unknown material",    // 5: UnknownMaterial
];

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The scene compiles, but something was silently substituted
    Warning,
    /// The scene is rejected
    Error,
}

impl CompileError {
    /// Creates a new error diagnostic.
    pub fn new(kind: ErrorKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_severity(kind, Severity::Error, location, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(
        kind: ErrorKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::with_severity(kind, Severity::Warning, location, message)
    }

    fn with_severity(
        kind: ErrorKind,
        severity: Severity,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            location: location.into(),
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Adds a note or hint.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// True when this diagnostic rejects the scene.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl ErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn name(self) -> &'static str {
        ERROR_KIND_NAMES[self as usize]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}: {}",
            self.severity,
            self.kind.name(),
            self.location,
            self.message
        )
    }
}

impl std::error::Error for CompileError {}

/// Returns true if any diagnostic in the slice is an error.
pub fn has_errors(diagnostics: &[CompileError]) -> bool {
    diagnostics.iter().any(CompileError::is_error)
}

/// Formats diagnostics one per line, notes indented beneath their diagnostic.
pub fn format_errors(diagnostics: &[CompileError]) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        out.push_str(&diagnostic.to_string());
        out.push('\n');
        for note in &diagnostic.notes {
            out.push_str("  = note: ");
            out.push_str(note);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_discriminants() {
        assert_eq!(ErrorKind::Malformed.name(), "malformed document");
        assert_eq!(ErrorKind::InvalidGeometry.name(), "invalid geometry");
        assert_eq!(ErrorKind::DanglingConnection.name(), "dangling connection");
        assert_eq!(ErrorKind::UnknownMaterial.name(), "unknown material");
    }

    #[test]
    fn display_includes_location() {
        let error = CompileError::new(
            ErrorKind::DanglingConnection,
            "connections[0].rod_b_index",
            "rod index 5 is out of range for 2 objects",
        );
        assert_eq!(
            error.to_string(),
            "error: dangling connection: connections[0].rod_b_index: rod index 5 is out of range for 2 objects"
        );
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let diagnostics = vec![CompileError::warning(
            ErrorKind::UnknownMaterial,
            "objects[0].material",
            "unknown material 'unobtainium', using 'rubber'",
        )];
        assert!(!has_errors(&diagnostics));
    }

    #[test]
    fn format_errors_renders_notes() {
        let error = CompileError::new(ErrorKind::UnknownTag, "objects[0].forces[1]", "unknown force")
            .with_note("expected one of: gravity, endpoint_force");
        let text = format_errors(&[error]);
        assert!(text.contains("= note: expected one of"));
        assert_eq!(text.lines().count(), 2);
    }
}
