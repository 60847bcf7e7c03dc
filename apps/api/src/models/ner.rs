use async_trait::async_trait;
use serde::Deserialize;

use super::inference_client::InferenceClient;
use super::{EntityTagger, ModelError, TaggedEntity};

/// Token-classification endpoint with grouped entities
/// (`[{"entity_group": "PER", "word": "Jane", "score": 0.99, ...}]`).
pub struct RemoteTagger {
    client: InferenceClient,
    url: String,
}

impl RemoteTagger {
    pub fn new(client: InferenceClient, url: String) -> Self {
        Self { client, url }
    }
}

#[derive(Debug, Deserialize)]
struct GroupedEntity {
    #[serde(alias = "entity")]
    entity_group: String,
    word: String,
    score: f32,
}

impl From<GroupedEntity> for TaggedEntity {
    fn from(e: GroupedEntity) -> Self {
        TaggedEntity {
            entity_type: e.entity_group,
            text: e.word,
            confidence: e.score,
        }
    }
}

#[async_trait]
impl EntityTagger for RemoteTagger {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn tag(&self, text: &str) -> Result<Vec<TaggedEntity>, ModelError> {
        let entities: Vec<GroupedEntity> = self.client.infer(&self.url, text).await?;
        Ok(entities.into_iter().map(TaggedEntity::from).collect())
    }
}

/// Used when no NER endpoint is configured: tags nothing, so name resolution
/// moves straight on to the heuristic strategies.
pub struct DisabledTagger;

#[async_trait]
impl EntityTagger for DisabledTagger {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn tag(&self, _text: &str) -> Result<Vec<TaggedEntity>, ModelError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_entities_deserialize() {
        let json = r#"[
            {"entity_group": "PER", "word": "Jane Doe", "score": 0.998, "start": 0, "end": 8},
            {"entity_group": "ORG", "word": "Acme", "score": 0.91, "start": 20, "end": 24}
        ]"#;
        let raw: Vec<GroupedEntity> = serde_json::from_str(json).unwrap();
        let tagged: Vec<TaggedEntity> = raw.into_iter().map(TaggedEntity::from).collect();
        assert_eq!(tagged.len(), 2);
        assert_eq!(tagged[0].entity_type, "PER");
        assert_eq!(tagged[0].text, "Jane Doe");
        assert!(tagged[0].confidence > 0.99);
    }

    #[test]
    fn test_ungrouped_entity_key_is_accepted() {
        let json = r#"[{"entity": "PER", "word": "Jane", "score": 0.95}]"#;
        let raw: Vec<GroupedEntity> = serde_json::from_str(json).unwrap();
        assert_eq!(raw[0].entity_group, "PER");
    }

    #[tokio::test]
    async fn test_disabled_tagger_returns_nothing() {
        assert!(DisabledTagger.tag("Jane Doe").await.unwrap().is_empty());
    }
}
