//! Chat session
//!
//! Owns everything one educator's conversation needs: the persona
//! attributes, the compiled persona, the transcript and the provider handle.
//! Every user-visible operation goes through here.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::conversation::{write_export, ConversationLedger, ConversationTurn};
use crate::error::{Error, Result};
use crate::persona::{
    extract_name, CompiledPersona, IntroductionSource, PersonaAttributes, PersonaCompiler,
    REFUSAL_LINE,
};
use crate::provider::{CompletionRequest, ProviderKind, SharedProvider};

/// Request limits applied by a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLimits {
    /// Prior turns sent with each message
    pub context_turns: usize,
    pub chat_max_tokens: u32,
    pub chat_temperature: Option<f32>,
    pub intro_max_tokens: u32,
    pub intro_temperature: f32,
}

impl SessionLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            context_turns: config.conversation.context_turns,
            chat_max_tokens: config.provider.chat_max_tokens,
            chat_temperature: config.provider.chat_temperature,
            intro_max_tokens: config.provider.intro_max_tokens,
            intro_temperature: config.provider.intro_temperature,
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// One educator's conversation with one persona at a time
pub struct Session {
    id: Uuid,
    kind: ProviderKind,
    provider: Option<SharedProvider>,
    compiler: PersonaCompiler,
    limits: SessionLimits,
    attributes: Option<PersonaAttributes>,
    persona: Option<CompiledPersona>,
    ledger: ConversationLedger,
    withdrawn: bool,
}

impl Session {
    /// Create a session. `provider` is None when no API key was supplied.
    pub fn new(
        kind: ProviderKind,
        provider: Option<SharedProvider>,
        compiler: PersonaCompiler,
        limits: SessionLimits,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!(session_id = %id, provider = %kind, has_key = provider.is_some(), "Session created");

        Self {
            id,
            kind,
            provider,
            compiler,
            limits,
            attributes: None,
            persona: None,
            ledger: ConversationLedger::new(),
            withdrawn: false,
        }
    }

    /// Create a session from the loaded configuration
    pub fn from_config(config: &AppConfig, kind: ProviderKind, provider: Option<SharedProvider>) -> Self {
        Self::new(
            kind,
            provider,
            PersonaCompiler::new(config.persona.setting.clone()),
            SessionLimits::from_config(config),
        )
    }

    // ─────────────────────────────────────────────────────────────
    // Persona Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Compile a persona and reset the conversation to its greeting.
    ///
    /// Fails only on missing required attributes, in which case nothing is
    /// sent to the provider and the previous persona stays in place. A
    /// failed or impossible introduction call falls back to a locally
    /// built description and records the reason on the persona.
    pub async fn create_persona(&mut self, attrs: PersonaAttributes) -> Result<&CompiledPersona> {
        attrs.validate()?;

        let (name, introduction_text, source, introduction_error) =
            match self.generate_introduction(&attrs).await {
                Ok(text) => (extract_name(&text), text, IntroductionSource::Generated, None),
                Err(e) => {
                    let (name, text) = self.compiler.fallback_description(&attrs);
                    (name, text, IntroductionSource::Fallback, Some(e.user_message()))
                }
            };

        let system_prompt = self.compiler.build_system_prompt(&attrs, &name);

        self.ledger.seed_greeting(&name);
        self.withdrawn = false;
        self.attributes = Some(attrs);

        info!(session_id = %self.id, provider = %self.kind, name = %name, ?source, "Persona created");

        Ok(self.persona.insert(CompiledPersona {
            name,
            introduction_text,
            system_prompt,
            source,
            introduction_error,
        }))
    }

    /// Ask the provider to introduce the persona. Any error means the
    /// caller falls back to the local description.
    async fn generate_introduction(&self, attrs: &PersonaAttributes) -> Result<String> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            debug!(session_id = %self.id, "No provider available, using fallback introduction");
            Error::MissingApiKey {
                provider: self.kind.display_name().to_string(),
            }
        })?;

        let request = CompletionRequest::single(
            self.compiler.build_introduction_prompt(attrs),
            self.limits.intro_max_tokens,
            self.limits.intro_temperature,
        );
        debug!(session_id = %self.id, model = provider.model(), "Requesting introduction");

        provider
            .generate_completion(request)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| {
                warn!(session_id = %self.id, error = %e.format_for_log(), "Introduction failed, using fallback");
                e
            })
    }

    /// Empty the transcript but keep the current persona
    pub fn start_new_conversation(&mut self) {
        self.ledger.clear();
        self.withdrawn = false;
        info!(session_id = %self.id, "Started new conversation");
    }

    // ─────────────────────────────────────────────────────────────
    // Conversation
    // ─────────────────────────────────────────────────────────────

    /// Send one user message and return the persona's reply.
    ///
    /// The user turn is recorded before the provider is called and stays
    /// recorded if the call fails.
    pub async fn send_message(&mut self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::EmptyInput { action: "send" });
        }

        let persona = self.persona.as_ref().ok_or(Error::NoPersona)?;

        if self.withdrawn {
            let reply = persona.departure_line();
            self.ledger.append(ConversationTurn::user(message));
            self.ledger.append(ConversationTurn::assistant(reply.clone()));
            debug!(session_id = %self.id, "Persona has withdrawn, answering locally");
            return Ok(reply);
        }

        let provider = self.provider.clone().ok_or_else(|| Error::MissingApiKey {
            provider: self.kind.display_name().to_string(),
        })?;

        let request = CompletionRequest::conversation(
            persona.system_prompt.clone(),
            self.ledger.context_window(self.limits.context_turns),
            message,
            self.limits.chat_max_tokens,
            self.limits.chat_temperature,
        );

        self.ledger.append(ConversationTurn::user(message));
        debug!(
            session_id = %self.id,
            provider = provider.name(),
            model = provider.model(),
            turns = request.history.len(),
            "Sending message"
        );

        let reply = provider.generate_completion(request).await?;

        if is_refusal(&reply) {
            info!(session_id = %self.id, "Persona withdrew from the conversation");
            self.withdrawn = true;
        }

        self.ledger.append(ConversationTurn::assistant(reply.clone()));
        Ok(reply)
    }

    // ─────────────────────────────────────────────────────────────
    // Export
    // ─────────────────────────────────────────────────────────────

    /// The transcript as an export document
    pub fn export_transcript(&self) -> Result<String> {
        match self.attributes {
            Some(ref attrs) if !self.ledger.is_empty() => Ok(self.ledger.serialize_for_export(
                attrs,
                self.persona.as_ref().map(|p| p.introduction_text.as_str()),
            )),
            _ => Err(Error::EmptyInput { action: "download" }),
        }
    }

    /// Write the transcript into `dir` and return the file path
    pub fn write_export(&self, dir: &Path) -> Result<PathBuf> {
        let contents = self.export_transcript()?;
        write_export(dir, &contents)
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn provider_kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn persona(&self) -> Option<&CompiledPersona> {
        self.persona.as_ref()
    }

    pub fn ledger(&self) -> &ConversationLedger {
        &self.ledger
    }

    /// Whether the persona has ended the conversation
    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn
    }
}

/// Whether a reply contains the persona's final refusal
fn is_refusal(reply: &str) -> bool {
    reply.to_lowercase().contains(&REFUSAL_LINE.to_lowercase())
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::persona::{Attitude, Level};
    use crate::provider::MockProvider;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn attrs() -> PersonaAttributes {
        PersonaAttributes::new(
            "Islam",
            "Sunni",
            "Stockholm suburbs",
            "Man, 17, high-school student",
            None,
            Level::Medium,
            Level::Medium,
            Attitude::Positive,
        )
    }

    fn session_with(mock: &Arc<MockProvider>) -> Session {
        let provider: SharedProvider = mock.clone();
        Session::new(
            ProviderKind::Mock,
            Some(provider),
            PersonaCompiler::default(),
            SessionLimits::default(),
        )
    }

    fn keyless_session() -> Session {
        Session::new(
            ProviderKind::OpenAi,
            None,
            PersonaCompiler::default(),
            SessionLimits::default(),
        )
    }

    #[tokio::test]
    async fn test_create_persona_with_generated_intro() {
        let mock = Arc::new(MockProvider::new());
        mock.push_response("This is Ahmed, a 17-year-old student who prays at the local mosque.");
        let mut session = session_with(&mock);

        let persona = session.create_persona(attrs()).await.unwrap().clone();

        assert_eq!(persona.name, "Ahmed");
        assert_eq!(persona.source, IntroductionSource::Generated);
        assert!(persona.introduction_error.is_none());
        assert!(persona.system_prompt.contains("Ahmed"));
        assert_eq!(session.ledger().turns(), &[ConversationTurn::assistant("Hi, I am Ahmed.")]);

        let request = mock.last_request().unwrap();
        assert!(request.system_prompt.is_none());
        assert!(request.history.is_empty());
        assert_eq!(request.max_tokens, 200);
        assert_eq!(request.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_invalid_attributes_never_reach_provider() {
        let mock = Arc::new(MockProvider::new());
        let mut session = session_with(&mock);

        let mut incomplete = attrs();
        incomplete.denomination = "   ".to_string();

        let err = session.create_persona(incomplete).await.unwrap_err();
        assert!(matches!(err, Error::MissingPersonaFields { .. }));
        assert_eq!(mock.call_count(), 0);
        assert!(session.persona().is_none());
    }

    #[tokio::test]
    async fn test_create_without_key_uses_fallback() {
        let mut session = keyless_session();
        let persona = session.create_persona(attrs()).await.unwrap();

        assert_eq!(persona.name, "Man");
        assert_eq!(persona.source, IntroductionSource::Fallback);
        assert!(persona.introduction_text.starts_with("This is Man, who identifies as Sunni within Islam"));
        let reason = persona.introduction_error.as_deref().unwrap();
        assert!(reason.starts_with("API Key Error"));
        assert!(reason.contains("OpenAI GPT-4o"));
        assert_eq!(session.ledger().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_intro_falls_back() {
        let mock = Arc::new(MockProvider::new());
        mock.push_failure("service unavailable");
        let mut session = session_with(&mock);

        let persona = session.create_persona(attrs()).await.unwrap();
        assert_eq!(persona.source, IntroductionSource::Fallback);
        let reason = persona.introduction_error.as_deref().unwrap();
        assert!(reason.starts_with("Could not generate a response"));
        assert!(reason.contains("service unavailable"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_key_on_intro_is_reported() {
        let mock = Arc::new(MockProvider::new());
        mock.push_failure("authentication rejected (401 Unauthorized): invalid key");
        let mut session = session_with(&mock);

        let persona = session.create_persona(attrs()).await.unwrap();
        assert_eq!(persona.name, "Man");
        assert!(persona
            .introduction_error
            .as_deref()
            .unwrap()
            .starts_with("API Key Error"));
    }

    #[tokio::test]
    async fn test_create_persona_resets_conversation() {
        let mock = Arc::new(MockProvider::new());
        let mut session = session_with(&mock);
        session.create_persona(attrs()).await.unwrap();
        session.send_message("Hello").await.unwrap();
        session.send_message("How are you?").await.unwrap();
        assert_eq!(session.ledger().len(), 5);

        mock.push_response("This is Maria, a Catholic nurse.");
        session.create_persona(attrs()).await.unwrap();

        assert_eq!(session.ledger().turns(), &[ConversationTurn::assistant("Hi, I am Maria.")]);
    }

    #[tokio::test]
    async fn test_send_message_records_both_turns() {
        let mock = Arc::new(MockProvider::new());
        let mut session = session_with(&mock);
        session.create_persona(attrs()).await.unwrap();

        mock.push_response("[smiles] Yes, on Fridays.");
        let reply = session.send_message("  Do you go to the mosque?  ").await.unwrap();

        assert_eq!(reply, "[smiles] Yes, on Fridays.");
        let turns = session.ledger().turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1], ConversationTurn::user("Do you go to the mosque?"));
        assert_eq!(turns[2].role, Role::Assistant);

        let request = mock.last_request().unwrap();
        assert_eq!(request.message, "Do you go to the mosque?");
        assert_eq!(request.history, vec![ConversationTurn::assistant("Hi, I am Sam.")]);
        assert_eq!(request.max_tokens, 500);
        assert!(request.temperature.is_none());
        assert!(request.system_prompt.unwrap().contains("Sam"));
    }

    #[tokio::test]
    async fn test_context_window_is_bounded() {
        let mock = Arc::new(MockProvider::new());
        let mut session = session_with(&mock);
        session.create_persona(attrs()).await.unwrap();

        for i in 0..8 {
            session.send_message(&format!("message {}", i)).await.unwrap();
        }
        assert_eq!(session.ledger().len(), 17);

        session.send_message("last one").await.unwrap();
        let request = mock.last_request().unwrap();

        assert_eq!(request.history.len(), 10);
        assert_eq!(request.history, session.ledger().turns()[7..17].to_vec());
        assert_eq!(request.message, "last one");
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_user_message() {
        let mock = Arc::new(MockProvider::new());
        let mut session = session_with(&mock);
        session.create_persona(attrs()).await.unwrap();

        mock.push_failure("Incorrect API key provided");
        let err = session.send_message("Hello?").await.unwrap_err();

        assert!(err.is_authentication_problem());
        assert_eq!(session.ledger().len(), 2);
        assert_eq!(session.ledger().last().unwrap(), &ConversationTurn::user("Hello?"));
    }

    #[tokio::test]
    async fn test_send_without_key_records_nothing() {
        let mut session = keyless_session();
        session.create_persona(attrs()).await.unwrap();

        let err = session.send_message("Hi").await.unwrap_err();
        assert!(matches!(err, Error::MissingApiKey { .. }));
        assert_eq!(session.ledger().len(), 1);
    }

    #[tokio::test]
    async fn test_send_requires_persona_and_text() {
        let mock = Arc::new(MockProvider::new());
        let mut session = session_with(&mock);

        assert!(matches!(session.send_message("Hi").await, Err(Error::NoPersona)));
        session.create_persona(attrs()).await.unwrap();
        assert!(matches!(session.send_message("   ").await, Err(Error::EmptyInput { .. })));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_withdrawal_stops_provider_calls() {
        let mock = Arc::new(MockProvider::new());
        let mut session = session_with(&mock);
        session.create_persona(attrs()).await.unwrap();

        mock.push_response("[stands up] I do not want to talk to you any more.");
        session.send_message("insult").await.unwrap();
        assert!(session.is_withdrawn());
        let calls = mock.call_count();

        let reply = session.send_message("sorry!").await.unwrap();
        assert_eq!(reply, "[Sam] has left the building");
        assert_eq!(mock.call_count(), calls);
        assert_eq!(session.ledger().len(), 5);

        session.start_new_conversation();
        assert!(!session.is_withdrawn());
        assert!(session.ledger().is_empty());
        assert_eq!(session.persona().unwrap().name, "Sam");
    }

    #[tokio::test]
    async fn test_export() {
        let mock = Arc::new(MockProvider::new());
        let mut session = session_with(&mock);
        assert!(matches!(session.export_transcript(), Err(Error::EmptyInput { .. })));

        session.create_persona(attrs()).await.unwrap();
        session.send_message("Hello").await.unwrap();

        let doc = session.export_transcript().unwrap();
        assert!(doc.contains("Religious Tradition: Islam"));
        assert!(doc.contains("This is Sam"));
        assert!(doc.contains("Me: Hello\n\n"));

        let temp = TempDir::new().unwrap();
        let path = session.write_export(temp.path()).unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("============"));
        assert!(written.ends_with("Me: Hello\n\nPersona: [nods] You said: Hello\n\n"));

        session.start_new_conversation();
        assert!(matches!(session.export_transcript(), Err(Error::EmptyInput { .. })));
    }

    #[test]
    fn test_refusal_detection() {
        assert!(is_refusal("I do not want to talk to you any more"));
        assert!(is_refusal("[crosses arms] i do not want to talk to you any more!"));
        assert!(!is_refusal("I do not want to talk about that."));
    }
}
