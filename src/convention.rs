//! Naming convention that selects generation triggers
//!
//! A declaration opts into generation by its name alone: any type declaration
//! whose name ends with the convention suffix is a trigger, and the feature
//! name is that declared name minus the suffix. The suffix is carried by one
//! [`Convention`] value so the filter and the extractor can never disagree.

use crate::declaration::DeclarationNode;
use serde::{Deserialize, Serialize};

/// Suffix marking aggregate root types
pub const DEFAULT_SUFFIX: &str = "Aggregate";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Convention {
    suffix: String,
}

impl Convention {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Whether `node` is a type declaration named with the convention suffix
    ///
    /// Ordinal, case-sensitive comparison on the declared name.
    pub fn is_trigger(&self, node: &DeclarationNode) -> bool {
        node.kind.is_type_declaration() && node.name.ends_with(self.suffix.as_str())
    }

    /// Declared name with exactly one trailing suffix removed
    ///
    /// `"AggregateOrderAggregate"` becomes `"AggregateOrder"`. A name equal to
    /// the suffix yields the empty string, which is passed on as is.
    pub fn feature_name(&self, trigger: &DeclarationNode) -> String {
        trigger
            .name
            .strip_suffix(self.suffix.as_str())
            .unwrap_or(&trigger.name)
            .to_string()
    }

    /// Feature name of `node` if it is a trigger
    pub fn match_trigger(&self, node: &DeclarationNode) -> Option<String> {
        self.is_trigger(node).then(|| self.feature_name(node))
    }
}

impl Default for Convention {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::DeclarationKind;

    fn node(kind: DeclarationKind, name: &str) -> DeclarationNode {
        DeclarationNode::new(kind, name)
    }

    #[test]
    fn test_filter_exactness() {
        let convention = Convention::default();
        assert!(convention.is_trigger(&node(DeclarationKind::Struct, "OrderAggregate")));
        assert!(!convention.is_trigger(&node(DeclarationKind::Struct, "OrderEvent")));
        assert!(!convention.is_trigger(&node(DeclarationKind::Field, "OrderAggregate")));
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let convention = Convention::default();
        assert!(!convention.is_trigger(&node(DeclarationKind::Struct, "Orderaggregate")));
        assert!(!convention.is_trigger(&node(DeclarationKind::Struct, "ORDERAGGREGATE")));
    }

    #[test]
    fn test_enum_and_union_can_trigger() {
        let convention = Convention::default();
        assert!(convention.is_trigger(&node(DeclarationKind::Enum, "LedgerAggregate")));
        assert!(convention.is_trigger(&node(DeclarationKind::Union, "RawAggregate")));
        assert!(!convention.is_trigger(&node(DeclarationKind::Trait, "OrderAggregate")));
    }

    #[test]
    fn test_feature_name_strips_only_trailing_suffix() {
        let convention = Convention::default();
        assert_eq!(
            convention.feature_name(&node(DeclarationKind::Struct, "OrderAggregate")),
            "Order"
        );
        assert_eq!(
            convention.feature_name(&node(DeclarationKind::Struct, "AggregateOrderAggregate")),
            "AggregateOrder"
        );
    }

    #[test]
    fn test_feature_name_of_bare_suffix_is_empty() {
        let convention = Convention::default();
        assert_eq!(
            convention.feature_name(&node(DeclarationKind::Struct, "Aggregate")),
            ""
        );
    }

    #[test]
    fn test_custom_suffix() {
        let convention = Convention::new("Root");
        let trigger = node(DeclarationKind::Struct, "CustomerRoot");
        assert_eq!(convention.match_trigger(&trigger), Some("Customer".to_string()));
        assert_eq!(
            convention.match_trigger(&node(DeclarationKind::Struct, "CustomerAggregate")),
            None
        );
    }
}
