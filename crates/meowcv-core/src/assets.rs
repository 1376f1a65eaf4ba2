use crate::types::ExpressionCategory;

/// Resolves categories to asset paths under a fixed root.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    root: String,
}

impl AssetResolver {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let root = root.trim_end_matches('/').to_string();
        Self { root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn file_name(category: ExpressionCategory) -> &'static str {
        match category {
            ExpressionCategory::Shock => "cat-shock.jpeg",
            ExpressionCategory::Tongue => "cat-tongue.jpeg",
            ExpressionCategory::Glare => "cat-glare.jpeg",
            ExpressionCategory::Default => "default-cat.jpeg",
        }
    }

    pub fn resolve(&self, category: ExpressionCategory) -> String {
        format!("{}/{}", self.root, Self::file_name(category))
    }

    /// Resolve a category by its wire label. Unknown labels get the
    /// `default` asset (same `.jpeg` extension as the other mappings).
    pub fn resolve_label(&self, label: &str) -> String {
        let category = label.parse::<ExpressionCategory>().unwrap_or_else(|_| {
            tracing::warn!(label, "unknown category label; using default asset");
            ExpressionCategory::Default
        });
        self.resolve(category)
    }
}
