//! Compiler configuration.

use std::fmt;

/// Which surface syntax a source unit is written in.
///
/// Chosen once per unit, from its leading directive or the caller's
/// default, and passed down to the scanner as a plain value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScannerMode {
    /// Blocks are introduced by deeper indentation.
    #[default]
    Indentation,
    /// Blocks are delimited by `{ }`, statements by newlines or `;`.
    Brace,
}

impl ScannerMode {
    /// Parse the argument of a `/// :scanner-<mode>` directive.
    pub fn from_directive(name: &str) -> Option<Self> {
        match name {
            "brace" => Some(ScannerMode::Brace),
            "indent" | "indentation" => Some(ScannerMode::Indentation),
            _ => None,
        }
    }
}

impl fmt::Display for ScannerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerMode::Indentation => f.write_str("indent"),
            ScannerMode::Brace => f.write_str("brace"),
        }
    }
}

/// Packages every unit sees as if it had written `import pkg._`.
pub const DEFAULT_IMPLICIT_IMPORTS: [&str; 2] = ["java.lang", "lt.lang"];

/// Options for a compilation batch.
///
/// ```
/// use latte_core::{CompilerConfig, ScannerMode};
///
/// let config = CompilerConfig::new()
///     .with_default_mode(ScannerMode::Brace)
///     .with_warnings_fatal(true);
/// assert_eq!(config.default_mode(), ScannerMode::Brace);
/// assert!(config.warnings_fatal());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerConfig {
    default_mode: ScannerMode,
    warnings_fatal: bool,
    implicit_imports: Vec<String>,
    emit_source_file: bool,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self {
            default_mode: ScannerMode::Indentation,
            warnings_fatal: false,
            implicit_imports: DEFAULT_IMPLICIT_IMPORTS.iter().map(|s| s.to_string()).collect(),
            emit_source_file: true,
        }
    }

    /// Mode used for units without a leading directive.
    pub fn with_default_mode(mut self, mode: ScannerMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_warnings_fatal(mut self, fatal: bool) -> Self {
        self.warnings_fatal = fatal;
        self
    }

    /// Replace the implicit package imports.
    pub fn with_implicit_imports<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implicit_imports = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Whether emitted classes carry a `SourceFile` attribute.
    pub fn with_source_file_attribute(mut self, emit: bool) -> Self {
        self.emit_source_file = emit;
        self
    }

    pub fn default_mode(&self) -> ScannerMode {
        self.default_mode
    }

    pub fn warnings_fatal(&self) -> bool {
        self.warnings_fatal
    }

    pub fn implicit_imports(&self) -> &[String] {
        &self.implicit_imports
    }

    pub fn emit_source_file(&self) -> bool {
        self.emit_source_file
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.default_mode(), ScannerMode::Indentation);
        assert!(!config.warnings_fatal());
        assert_eq!(config.implicit_imports(), &["java.lang".to_string(), "lt.lang".to_string()]);
        assert!(config.emit_source_file());
    }

    #[test]
    fn directive_names() {
        assert_eq!(ScannerMode::from_directive("brace"), Some(ScannerMode::Brace));
        assert_eq!(ScannerMode::from_directive("indent"), Some(ScannerMode::Indentation));
        assert_eq!(ScannerMode::from_directive("python"), None);
    }

    #[test]
    fn implicit_imports_can_be_replaced() {
        let config = CompilerConfig::new().with_implicit_imports(["java.util"]);
        assert_eq!(config.implicit_imports(), &["java.util".to_string()]);
    }
}
