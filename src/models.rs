use crate::config::{ModelEntry, ModelsConfig};

/// Allowlisted chat models plus the default and the designated thinking model.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    allowed: Vec<ModelEntry>,
    default: String,
    thinking: String,
}

impl ModelCatalog {
    #[must_use]
    pub fn new(config: &ModelsConfig) -> Self {
        Self {
            allowed: config.allowed.clone(),
            default: config.default.clone(),
            thinking: config.thinking.clone(),
        }
    }

    #[must_use]
    pub fn allowed(&self) -> &[ModelEntry] {
        &self.allowed
    }

    #[must_use]
    pub fn is_allowed(&self, model: &str) -> bool {
        self.allowed.iter().any(|entry| entry.id == model)
    }

    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.default
    }

    #[must_use]
    pub fn thinking_model(&self) -> &str {
        &self.thinking
    }

    /// Pick the model to forward: the requested one when allowed, otherwise
    /// the default.
    #[must_use]
    pub fn resolve<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(model) if self.is_allowed(model) => model,
            Some(model) => {
                tracing::debug!(model, fallback = %self.default, "model not allowed, using default");
                &self.default
            }
            None => &self.default,
        }
    }

    /// Whether visible output for `model` is typed out character by character.
    #[must_use]
    pub fn uses_typing(&self, model: &str) -> bool {
        model == self.thinking
    }

    /// Model to switch to when think mode is toggled.
    #[must_use]
    pub fn toggle_think(&self, think_mode: bool, current: &str) -> String {
        if think_mode {
            self.thinking.clone()
        } else if current == self.thinking {
            self.default.clone()
        } else {
            current.to_string()
        }
    }

    #[must_use]
    pub fn label(&self, model: &str) -> Option<&str> {
        self.allowed
            .iter()
            .find(|entry| entry.id == model)
            .map(|entry| entry.label.as_str())
            .filter(|label| !label.is_empty())
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(&ModelsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_default() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.resolve(Some("moonshotai/kimi-k2:free")), "moonshotai/kimi-k2:free");
        assert_eq!(catalog.resolve(Some("openai/gpt-4o")), catalog.default_model());
        assert_eq!(catalog.resolve(None), catalog.default_model());
    }

    #[test]
    fn test_only_thinking_model_uses_typing() {
        let catalog = ModelCatalog::default();
        assert!(catalog.uses_typing("moonshotai/kimi-vl-a3b-thinking:free"));
        assert!(!catalog.uses_typing(catalog.default_model()));
    }

    #[test]
    fn test_toggle_think() {
        let catalog = ModelCatalog::default();
        let thinking = catalog.thinking_model().to_string();
        assert_eq!(catalog.toggle_think(true, "moonshotai/kimi-k2:free"), thinking);
        assert_eq!(catalog.toggle_think(false, &thinking), catalog.default_model());
        assert_eq!(
            catalog.toggle_think(false, "moonshotai/kimi-k2:free"),
            "moonshotai/kimi-k2:free"
        );
    }
}
