//! Approval workflow configuration.

use serde::{Deserialize, Serialize};

/// Behaviour of the submission intercept and review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Whether writes to entity types without an explicit policy need review.
    #[serde(default = "default_require_approval")]
    pub require_approval_by_default: bool,
    /// Entity type tags whose writes are always applied directly.
    #[serde(default)]
    pub exempt_entity_types: Vec<String>,
    /// Maximum length of an approval comment, in characters.
    #[serde(default = "default_max_comment_length")]
    pub max_comment_length: usize,
    /// Page size used by review-queue listings when the caller gives none.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            require_approval_by_default: default_require_approval(),
            exempt_entity_types: Vec::new(),
            max_comment_length: default_max_comment_length(),
            default_page_size: default_page_size(),
        }
    }
}

fn default_require_approval() -> bool {
    true
}

fn default_max_comment_length() -> usize {
    255
}

fn default_page_size() -> u64 {
    25
}
