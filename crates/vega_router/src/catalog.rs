//! Static provider metadata.
//!
//! The catalog records which providers exist, how fast they tend to answer
//! and what they can do. It never changes while a router is running.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Error loading a [`ProviderCatalog`].
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The document is not valid catalog JSON.
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but describes an unusable catalog.
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// Typical response latency class of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedTier {
    /// Usually answers within a few seconds.
    Fast,
    /// Usually answers within several seconds.
    Medium,
    /// Slow but working; used as backup.
    Slow,
}

impl core::fmt::Display for SpeedTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
        })
    }
}

/// Provider lists and per-provider overrides.
///
/// Tier lists are ordered by preference. Capability lists are independent
/// overlays: a provider may sit in a tier and in the vision list at once.
/// Missing JSON fields fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderCatalog {
    /// Fast tier.
    pub fast: Vec<String>,
    /// Medium tier.
    pub medium: Vec<String>,
    /// Slow (backup) tier.
    pub slow: Vec<String>,
    /// Providers able to read attached images.
    pub vision: Vec<String>,
    /// Providers able to generate images.
    pub image_generation: Vec<String>,
    /// Providers known not to read images.
    pub no_vision: Vec<String>,
    /// Providers excluded from vision routing even if listed as vision-capable.
    pub blocked_vision: Vec<String>,
    /// Providers known not to work at all.
    pub blocked: Vec<String>,
    /// Working providers whose output is unusable; never routed to.
    pub problematic: Vec<String>,
    /// Model to request from a vision provider for image requests.
    pub vision_models: BTreeMap<String, String>,
    /// Extra request parameters for image-generation providers.
    pub image_params: BTreeMap<String, Map<String, Value>>,
    /// Model used in automatic mode.
    pub default_model: String,
    /// Model used for image requests when a provider has no override.
    pub vision_model: String,
    /// Provider tried first before anything has succeeded.
    pub default_provider: String,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|name| (*name).to_string()).collect()
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        let mut image_labs = Map::new();
        image_labs.insert("image_model".into(), Value::from("sd_xl_base_1.0"));

        Self {
            fast: names(&[
                "Chatai",
                "AnyProvider",
                "Blackbox",
                "OpenAIFM",
                "Qwen_Qwen_2_5_Max",
                "OIVSCodeSer0501",
                "WeWordle",
                "CohereForAI_C4AI_Command",
            ]),
            medium: names(&["OIVSCodeSer2", "Qwen_Qwen_2_5", "Yqcloud"]),
            slow: names(&[
                "ImageLabs",
                "Qwen_Qwen_3",
                "LambdaChat",
                "BlackForestLabs_Flux1Dev",
            ]),
            vision: names(&["PollinationsAI"]),
            image_generation: names(&["ImageLabs", "BlackForestLabs_Flux1Dev"]),
            no_vision: names(&[
                "Chatai",
                "WeWordle",
                "OIVSCodeSer0501",
                "OIVSCodeSer2",
                "Yqcloud",
                "LambdaChat",
                "ImageLabs",
            ]),
            blocked_vision: names(&[
                "DeepInfraChat",
                "OIVSCodeSer0501",
                "Anthropic",
                "DeepInfra",
                "Groq",
                "GeminiPro",
                "CablyAI",
                "DocsBot",
                "OIVSCodeSer5",
                "You",
                "Chatai",
                "Cloudflare",
                "Qwen_Qwen_2_72B",
            ]),
            blocked: names(&[
                "You",
                "HuggingChat",
                "DeepInfra",
                "OpenaiChat",
                "Groq",
                "MetaAI",
                "Copilot",
                "DeepSeek",
                "HuggingFace",
            ]),
            problematic: names(&["Free2GPT"]),
            vision_models: BTreeMap::from([("PollinationsAI".to_string(), "gpt-4o".to_string())]),
            image_params: BTreeMap::from([
                ("ImageLabs".to_string(), image_labs),
                ("BlackForestLabs_Flux1Dev".to_string(), Map::new()),
            ]),
            default_model: "gpt-4".to_string(),
            vision_model: "gpt-4o".to_string(),
            default_provider: "Chatai".to_string(),
        }
    }
}

impl ProviderCatalog {
    /// Loads a catalog from JSON. Omitted fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] for malformed JSON and
    /// [`CatalogError::Invalid`] if any list contains an empty identity or
    /// the default model is empty.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let lists = [
            ("fast", &self.fast),
            ("medium", &self.medium),
            ("slow", &self.slow),
            ("vision", &self.vision),
            ("image_generation", &self.image_generation),
            ("no_vision", &self.no_vision),
            ("blocked_vision", &self.blocked_vision),
            ("blocked", &self.blocked),
            ("problematic", &self.problematic),
        ];
        for (field, list) in lists {
            if list.iter().any(|name| name.trim().is_empty()) {
                return Err(CatalogError::Invalid(format!(
                    "`{field}` contains an empty provider name"
                )));
            }
        }
        if self.default_model.trim().is_empty() {
            return Err(CatalogError::Invalid("`default_model` is empty".into()));
        }
        Ok(())
    }

    /// All tiered providers, fast then medium then slow, each listed once.
    #[must_use]
    pub fn all_providers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.fast
            .iter()
            .chain(&self.medium)
            .chain(&self.slow)
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }

    /// Fast and medium tiers, in order. Used for automatic mode.
    #[must_use]
    pub fn working(&self) -> Vec<String> {
        self.fast.iter().chain(&self.medium).cloned().collect()
    }

    /// The slow tier.
    #[must_use]
    pub fn backup(&self) -> &[String] {
        &self.slow
    }

    /// Every tier in order, without deduplication.
    #[must_use]
    pub fn tiered(&self) -> Vec<String> {
        self.fast
            .iter()
            .chain(&self.medium)
            .chain(&self.slow)
            .cloned()
            .collect()
    }

    /// Vision-capable providers in preference order.
    #[must_use]
    pub fn vision(&self) -> &[String] {
        &self.vision
    }

    /// Image-generation providers in preference order.
    #[must_use]
    pub fn image_generation(&self) -> &[String] {
        &self.image_generation
    }

    /// Providers known not to read images.
    #[must_use]
    pub fn no_vision(&self) -> &[String] {
        &self.no_vision
    }

    /// Whether `id` may receive requests carrying an image.
    #[must_use]
    pub fn is_vision_capable(&self, id: &str) -> bool {
        contains(&self.vision, id) && !contains(&self.no_vision, id) && !contains(&self.blocked_vision, id)
    }

    /// Whether `id` can generate images.
    #[must_use]
    pub fn is_image_capable(&self, id: &str) -> bool {
        contains(&self.image_generation, id)
    }

    /// Whether `id` is known not to work.
    #[must_use]
    pub fn is_blocked(&self, id: &str) -> bool {
        contains(&self.blocked, id)
    }

    /// Whether `id` must never be routed to.
    #[must_use]
    pub fn is_problematic(&self, id: &str) -> bool {
        contains(&self.problematic, id)
    }

    /// The first tier listing `id`.
    #[must_use]
    pub fn tier_of(&self, id: &str) -> Option<SpeedTier> {
        if contains(&self.fast, id) {
            Some(SpeedTier::Fast)
        } else if contains(&self.medium, id) {
            Some(SpeedTier::Medium)
        } else if contains(&self.slow, id) {
            Some(SpeedTier::Slow)
        } else {
            None
        }
    }

    /// Model override for `id` on image requests.
    #[must_use]
    pub fn vision_model_for(&self, id: &str) -> Option<&str> {
        self.vision_models.get(id).map(String::as_str)
    }

    /// Extra generation parameters for `id`, if it needs any special request shape.
    #[must_use]
    pub fn image_params(&self, id: &str) -> Option<&Map<String, Value>> {
        self.image_params.get(id)
    }
}

fn contains(list: &[String], id: &str) -> bool {
    list.iter().any(|name| name == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_providers_is_tier_ordered() {
        let catalog = ProviderCatalog::default();
        let all = catalog.all_providers();

        assert_eq!(all.len(), 15);
        assert_eq!(all[0], "Chatai");
        assert_eq!(all[8], "OIVSCodeSer2");
        assert_eq!(all[14], "BlackForestLabs_Flux1Dev");
    }

    #[test]
    fn all_providers_drops_cross_tier_duplicates() {
        let catalog = ProviderCatalog {
            fast: vec!["A".into(), "B".into()],
            medium: vec!["B".into(), "C".into()],
            slow: vec!["A".into(), "D".into()],
            ..ProviderCatalog::default()
        };

        assert_eq!(catalog.all_providers(), vec!["A", "B", "C", "D"]);
        assert_eq!(catalog.tiered().len(), 6);
    }

    #[test]
    fn working_is_fast_then_medium() {
        let catalog = ProviderCatalog::default();
        let working = catalog.working();
        assert_eq!(working.len(), 11);
        assert_eq!(&working[..3], ["Chatai", "AnyProvider", "Blackbox"]);
        assert_eq!(working.last().map(String::as_str), Some("Yqcloud"));
    }

    #[test]
    fn capability_predicates() {
        let catalog = ProviderCatalog::default();

        assert!(catalog.is_vision_capable("PollinationsAI"));
        assert!(!catalog.is_vision_capable("Chatai"));
        assert!(!catalog.is_vision_capable("Unknown"));

        assert!(catalog.is_image_capable("ImageLabs"));
        assert!(!catalog.is_image_capable("Chatai"));

        assert!(catalog.is_blocked("HuggingChat"));
        assert!(!catalog.is_blocked("Chatai"));

        assert!(catalog.is_problematic("Free2GPT"));
        assert!(!catalog.is_problematic("Yqcloud"));
    }

    #[test]
    fn no_vision_overrides_vision_list() {
        let catalog = ProviderCatalog {
            vision: vec!["PollinationsAI".into(), "Yqcloud".into()],
            ..ProviderCatalog::default()
        };
        assert!(!catalog.is_vision_capable("Yqcloud"));
    }

    #[test]
    fn tiers_and_overrides() {
        let catalog = ProviderCatalog::default();

        assert_eq!(catalog.tier_of("Blackbox"), Some(SpeedTier::Fast));
        assert_eq!(catalog.tier_of("Yqcloud"), Some(SpeedTier::Medium));
        assert_eq!(catalog.tier_of("LambdaChat"), Some(SpeedTier::Slow));
        assert_eq!(catalog.tier_of("PollinationsAI"), None);

        assert_eq!(catalog.vision_model_for("PollinationsAI"), Some("gpt-4o"));
        assert_eq!(catalog.vision_model_for("Chatai"), None);

        let params = catalog.image_params("ImageLabs").unwrap();
        assert_eq!(params["image_model"], "sd_xl_base_1.0");
        assert!(catalog.image_params("BlackForestLabs_Flux1Dev").unwrap().is_empty());
        assert!(catalog.image_params("Chatai").is_none());
    }

    #[test]
    fn from_json_fills_missing_fields_with_defaults() {
        let catalog = ProviderCatalog::from_json(r#"{ "fast": ["Alpha"], "medium": [] }"#).unwrap();

        assert_eq!(catalog.working(), vec!["Alpha"]);
        assert_eq!(catalog.default_model, "gpt-4");
        assert_eq!(catalog.vision(), ["PollinationsAI"]);
    }

    #[test]
    fn from_json_rejects_bad_documents() {
        let err = ProviderCatalog::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));

        let err = ProviderCatalog::from_json(r#"{ "slow": ["ok", "  "] }"#).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(ref msg) if msg.contains("slow")));
    }

    #[test]
    fn speed_tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SpeedTier::Medium).unwrap(), r#""medium""#);
        assert_eq!(SpeedTier::Slow.to_string(), "slow");
    }
}
