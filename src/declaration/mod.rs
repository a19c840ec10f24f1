//! Declaration Source
//!
//! The generator's unit of input is a [`DeclarationNode`]: the kind of a
//! syntactic declaration plus its declared name. Nodes usually come from
//! [`SourceScanner`], which walks the source roots of the crate being compiled,
//! but callers are free to construct them directly.
//!
//! ## Workflow
//! Source roots → file discovery (globs) → `syn` parse → declaration visitor
//!
//! Parsed declarations are cached per file, keyed by a SHA-256 of the file
//! contents, so an unchanged file is never parsed twice by the same scanner.

pub mod scanner;

pub use scanner::{ScanOutcome, SourceScanner, parse_declarations};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};

/// Kind of a syntactic declaration
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Struct,
    Enum,
    Union,
    Trait,
    TypeAlias,
    Function,
    Const,
    Static,
    Module,
    Field,
    Variant,
}

impl DeclarationKind {
    /// Nominal type declarations, the only kinds that can be generation triggers
    pub fn is_type_declaration(&self) -> bool {
        matches!(self, Self::Struct | Self::Enum | Self::Union)
    }
}

/// Where a declaration was found. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// Inline module path inside the file, `::`-joined (empty at file root)
    pub module_path: String,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.module_path.is_empty() {
            write!(f, "{}", self.file.display())
        } else {
            write!(f, "{} ({})", self.file.display(), self.module_path)
        }
    }
}

/// One syntactic declaration of the compiled unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclarationNode {
    pub kind: DeclarationKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl DeclarationNode {
    pub fn new(kind: DeclarationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Human readable origin for log lines
    pub fn describe(&self) -> String {
        match &self.location {
            Some(location) => format!("{} {} at {}", self.kind, self.name, location),
            None => format!("{} {}", self.kind, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_type_declaration_kinds() {
        assert!(DeclarationKind::Struct.is_type_declaration());
        assert!(DeclarationKind::Enum.is_type_declaration());
        assert!(DeclarationKind::Union.is_type_declaration());
        assert!(!DeclarationKind::Field.is_type_declaration());
        assert!(!DeclarationKind::Trait.is_type_declaration());
        assert!(!DeclarationKind::TypeAlias.is_type_declaration());
    }

    #[test]
    fn test_kind_display_round_trips_through_from_str() {
        assert_eq!(DeclarationKind::TypeAlias.to_string(), "type_alias");
        assert_eq!(
            DeclarationKind::from_str("struct").unwrap(),
            DeclarationKind::Struct
        );
    }

    #[test]
    fn test_describe_includes_location() {
        let node = DeclarationNode::new(DeclarationKind::Struct, "OrderAggregate").with_location(
            SourceLocation {
                file: PathBuf::from("src/order.rs"),
                module_path: "domain".to_string(),
            },
        );
        assert_eq!(node.describe(), "struct OrderAggregate at src/order.rs (domain)");
    }
}
