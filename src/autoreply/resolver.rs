//! Reply resolution
//!
//! Turns a template reference plus an inbound message into the text that
//! should be sent back.

use std::sync::Arc;

use crate::ai::{GenerationContext, ResponseGenerator};
use crate::templates::TemplateStore;

/// Content prefix that hands a template to the response generator.
///
/// The rest of the content is used as guidance for the generated reply.
pub const AI_TEMPLATE_PREFIX: &str = "AI:";

/// Resolves reply text from templates, optionally through a generator
#[derive(Clone)]
pub struct TemplateResolver {
    templates: Arc<dyn TemplateStore>,
    generator: Option<Arc<dyn ResponseGenerator>>,
}

impl std::fmt::Debug for TemplateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateResolver")
            .field("has_generator", &self.generator.is_some())
            .finish()
    }
}

impl TemplateResolver {
    /// Create a resolver over a template store
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self {
            templates,
            generator: None,
        }
    }

    /// Attach a generator for `AI:` templates
    pub fn with_generator(mut self, generator: Option<Arc<dyn ResponseGenerator>>) -> Self {
        self.generator = generator;
        self
    }

    /// Template store the resolver reads from
    pub fn templates(&self) -> &Arc<dyn TemplateStore> {
        &self.templates
    }

    /// Resolve the reply for `message_text` using `template_ref`.
    ///
    /// Returns `None` when no template is configured, the template is missing,
    /// or the store fails. Never returns an error.
    pub async fn resolve_reply(
        &self,
        template_ref: Option<&str>,
        message_text: &str,
    ) -> Option<String> {
        let Some(template_ref) = template_ref else {
            tracing::warn!("auto-reply has no template configured");
            return None;
        };

        let template = match self.templates.lookup(template_ref) {
            Ok(Some(template)) => template,
            Ok(None) => {
                tracing::warn!(template = %template_ref, "template not found");
                return None;
            }
            Err(e) => {
                tracing::error!(template = %template_ref, error = %e, "template lookup failed");
                return None;
            }
        };

        match template.content.strip_prefix(AI_TEMPLATE_PREFIX) {
            Some(guide) => Some(self.generate(template_ref, guide, message_text, &template.content).await),
            None => Some(template.content),
        }
    }

    /// Generate an AI reply, falling back to the raw template content
    async fn generate(
        &self,
        template_ref: &str,
        guide: &str,
        message_text: &str,
        raw_content: &str,
    ) -> String {
        let Some(generator) = &self.generator else {
            tracing::warn!(
                template = %template_ref,
                "AI template used without a response generator; sending raw content"
            );
            return raw_content.to_string();
        };

        let intent = match generator.analyze_intent(message_text).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(template = %template_ref, error = %e, "intent analysis failed");
                None
            }
        };

        let context = GenerationContext {
            intent,
            template_guide: Some(guide.to_string()),
        };

        match generator.generate(message_text, &context).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(template = %template_ref, "generator returned no text; sending raw content");
                raw_content.to_string()
            }
            Err(e) => {
                tracing::warn!(
                    template = %template_ref,
                    error = %e,
                    "reply generation failed; sending raw content"
                );
                raw_content.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, IntentAnalysis};
    use crate::templates::{MemoryTemplateStore, Template, TemplateDraft, TemplateError};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Generator returning a canned reply and recording what it was asked
    struct ScriptedGenerator {
        reply: Option<String>,
        fail: bool,
        seen: Mutex<Vec<GenerationContext>>,
    }

    impl ScriptedGenerator {
        fn replying(reply: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                fail: false,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                fail: true,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ResponseGenerator for ScriptedGenerator {
        async fn analyze_intent(&self, _text: &str) -> crate::ai::Result<Option<IntentAnalysis>> {
            Ok(Some(IntentAnalysis::Unstructured("question".to_string())))
        }

        async fn generate(
            &self,
            _text: &str,
            context: &GenerationContext,
        ) -> crate::ai::Result<Option<String>> {
            self.seen.lock().push(context.clone());
            if self.fail {
                return Err(AiError::ApiError("boom".to_string()));
            }
            Ok(self.reply.clone())
        }
    }

    struct BrokenStore;

    impl TemplateStore for BrokenStore {
        fn lookup(&self, _id: &str) -> Result<Option<Template>, TemplateError> {
            Err(TemplateError::Invalid("disk on fire".to_string()))
        }
        fn list(&self) -> Result<Vec<Template>, TemplateError> {
            Ok(Vec::new())
        }
        fn insert(&self, _draft: TemplateDraft) -> Result<Template, TemplateError> {
            Err(TemplateError::Invalid("read-only".to_string()))
        }
        fn update(&self, _id: &str, _draft: TemplateDraft) -> Result<Option<Template>, TemplateError> {
            Ok(None)
        }
        fn delete(&self, _id: &str) -> Result<bool, TemplateError> {
            Ok(false)
        }
    }

    fn store() -> Arc<dyn TemplateStore> {
        Arc::new(
            MemoryTemplateStore::new()
                .with_template("T1", "Thanks for asking, {name}!")
                .with_template("AI1", "AI:be concise"),
        )
    }

    #[tokio::test]
    async fn test_plain_template_returned_verbatim() {
        let resolver = TemplateResolver::new(store());
        let reply = resolver.resolve_reply(Some("T1"), "hello?").await;
        // No placeholder substitution for auto-replies.
        assert_eq!(reply.as_deref(), Some("Thanks for asking, {name}!"));
    }

    #[tokio::test]
    async fn test_missing_template_yields_nothing() {
        let resolver = TemplateResolver::new(store());
        assert_eq!(resolver.resolve_reply(Some("nope"), "hello").await, None);
        assert_eq!(resolver.resolve_reply(None, "hello").await, None);
    }

    #[tokio::test]
    async fn test_lookup_failure_yields_nothing() {
        let resolver = TemplateResolver::new(Arc::new(BrokenStore));
        assert_eq!(resolver.resolve_reply(Some("T1"), "hello").await, None);
    }

    #[tokio::test]
    async fn test_ai_template_uses_generated_text() {
        let generator = ScriptedGenerator::replying(Some("Thanks!"));
        let resolver = TemplateResolver::new(store())
            .with_generator(Some(generator.clone() as Arc<dyn ResponseGenerator>));

        let reply = resolver.resolve_reply(Some("AI1"), "When do you open?").await;
        assert_eq!(reply.as_deref(), Some("Thanks!"));

        let seen = generator.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].template_guide.as_deref(), Some("be concise"));
        assert_eq!(
            seen[0].intent,
            Some(IntentAnalysis::Unstructured("question".to_string()))
        );
    }

    #[tokio::test]
    async fn test_ai_template_falls_back_when_generator_silent() {
        let resolver = TemplateResolver::new(store())
            .with_generator(Some(ScriptedGenerator::replying(None) as Arc<dyn ResponseGenerator>));
        let reply = resolver.resolve_reply(Some("AI1"), "hi").await;
        assert_eq!(reply.as_deref(), Some("AI:be concise"));

        let resolver = TemplateResolver::new(store())
            .with_generator(Some(ScriptedGenerator::replying(Some("  ")) as Arc<dyn ResponseGenerator>));
        let reply = resolver.resolve_reply(Some("AI1"), "hi").await;
        assert_eq!(reply.as_deref(), Some("AI:be concise"));
    }

    #[tokio::test]
    async fn test_ai_template_falls_back_on_generator_error() {
        let resolver = TemplateResolver::new(store())
            .with_generator(Some(ScriptedGenerator::failing() as Arc<dyn ResponseGenerator>));
        let reply = resolver.resolve_reply(Some("AI1"), "hi").await;
        assert_eq!(reply.as_deref(), Some("AI:be concise"));
    }

    #[tokio::test]
    async fn test_ai_template_without_generator_sends_raw() {
        let resolver = TemplateResolver::new(store());
        let reply = resolver.resolve_reply(Some("AI1"), "hi").await;
        assert_eq!(reply.as_deref(), Some("AI:be concise"));
    }

    #[tokio::test]
    async fn test_marker_is_case_sensitive() {
        let store: Arc<dyn TemplateStore> =
            Arc::new(MemoryTemplateStore::new().with_template("T", "ai: lowercase is plain"));
        let resolver = TemplateResolver::new(store)
            .with_generator(Some(ScriptedGenerator::replying(Some("generated")) as Arc<dyn ResponseGenerator>));
        let reply = resolver.resolve_reply(Some("T"), "hi").await;
        assert_eq!(reply.as_deref(), Some("ai: lowercase is plain"));
    }
}
