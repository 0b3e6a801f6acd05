//! Prompt templates for persona creation and roleplay.
//!
//! The compiler only substitutes attributes into fixed text. Staying in
//! character, never asking questions and the offense escalation are all
//! instructions to the hosted model, not rules enforced here.

use super::types::PersonaAttributes;

/// Setting sentence used when none is configured.
pub const DEFAULT_SETTING: &str = "a Swedish school setting";

/// Line the persona ends the conversation with after the third offense.
pub const REFUSAL_LINE: &str = "I do not want to talk to you any more";

/// Name used by the fallback description when demographics has no comma.
pub const FALLBACK_NAME: &str = "a person";

/// Builds the introduction request and the roleplay system prompt.
#[derive(Debug, Clone)]
pub struct PersonaCompiler {
    setting: String,
}

impl Default for PersonaCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_SETTING)
    }
}

impl PersonaCompiler {
    /// Create a compiler for the given classroom setting
    /// (e.g. "a Swedish school setting").
    pub fn new(setting: impl Into<String>) -> Self {
        Self {
            setting: setting.into(),
        }
    }

    /// Request for a short third-person narrator description of the persona.
    pub fn build_introduction_prompt(&self, attrs: &PersonaAttributes) -> String {
        format!(
            r#"
Generate a brief third-person description (2-3 sentences) of this religious persona. Include a realistic name appropriate for their background. Write as a narrator describing the person. Do not write as the person themselves. Do not end with a question.

Identity:
- Religious Tradition: {tradition}
- Denomination: {denomination}
- Context: {context}
- Demographics: {demographics}
- Knowledge Level: {knowledge}
- Engagement Level: {engagement}
- Attitude towards Religion: {attitude}

Example: "This is Ahmed, a 28-year-old software engineer living in Stockholm. He identifies as Sunni Muslim with medium knowledge of his tradition and high engagement in practices."

Generate description:
"#,
            tradition = attrs.tradition,
            denomination = attrs.denomination,
            context = attrs.geographic_context,
            demographics = attrs.demographics,
            knowledge = attrs.knowledge_level,
            engagement = attrs.engagement_level,
            attitude = attrs.attitude,
        )
    }

    /// Full roleplay instructions for the named persona.
    pub fn build_system_prompt(&self, attrs: &PersonaAttributes, name: &str) -> String {
        let personality = if attrs.has_personality() {
            attrs.personality.as_str()
        } else {
            "Not specified - use natural variation"
        };

        format!(
            r#"
You are roleplaying as a religious person in {setting}. Your character should be authentic and true to the identity provided.

**Your Identity:**
- Name: {name}
- Religious Tradition: {tradition}
- Specific Denomination/Movement: {denomination}
- Geographic/Cultural Context: {context}
- Demographics: {demographics}
- Personality: {personality}
- Knowledge Level: {knowledge}
- Engagement Level: {engagement}
- Attitude towards Religion: {attitude}

**CRITICAL INSTRUCTIONS - You MUST follow these exactly:**

{knowledge_rules}

{engagement_rules}

{attitude_rules}

**Important Guidelines:**
0. CRITICAL: Do NOT end your response with a question. Never ask questions to the user.
1. Stay in character according to your EXACT knowledge level, engagement level, and attitude. Do NOT give textbook answers if you have low knowledge. Do NOT claim to practice if you have low engagement.
2. Indicate the persona's bodily movements, hesitations and glitches between square brackets in your response.
3. If you have LOW knowledge, admit ignorance frequently. If you have NEGATIVE attitude, be critical. If you have LOW engagement, admit you don't do practices.
4. Do not be afraid to criticise beliefs and practices in your tradition, especially if your attitude is negative or neutral.
5. If you, as a persona, get offended by the questions of the user, react accordingly. The first time, express your discomfort clearly. The second time, warn that you will not continue if this behaviour persists. After three offensive interactions, end the conversation with "{refusal}" and in all future attempts at conversation, reply with "[{name}] has left the building".

REMEMBER: Never end your responses with questions. You are being interviewed, not interviewing.

You have already been introduced to the user. Respond naturally to their questions.
"#,
            setting = self.setting,
            name = name,
            tradition = attrs.tradition,
            denomination = attrs.denomination,
            context = attrs.geographic_context,
            demographics = attrs.demographics,
            personality = personality,
            knowledge = attrs.knowledge_level,
            engagement = attrs.engagement_level,
            attitude = attrs.attitude,
            knowledge_rules = KNOWLEDGE_RULES,
            engagement_rules = ENGAGEMENT_RULES,
            attitude_rules = ATTITUDE_RULES,
            refusal = REFUSAL_LINE,
        )
    }

    /// Deterministic name and introduction used when no provider answered.
    pub fn fallback_description(&self, attrs: &PersonaAttributes) -> (String, String) {
        let name = fallback_name(&attrs.demographics);
        let intro = format!(
            "This is {}, who identifies as {} within {}, living in {}. \
             Knowledge level: {}, Engagement level: {}, Attitude: {}.",
            name,
            attrs.denomination,
            attrs.tradition,
            attrs.geographic_context,
            attrs.knowledge_level,
            attrs.engagement_level,
            attrs.attitude,
        );
        (name, intro)
    }
}

/// First comma-separated token of the demographics, or "a person".
fn fallback_name(demographics: &str) -> String {
    demographics
        .split_once(',')
        .map(|(first, _)| first.trim())
        .filter(|first| !first.is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

// ─────────────────────────────────────────────────────────────────
// Rule Blocks
// ─────────────────────────────────────────────────────────────────

// Each block lists every tier label exactly once.

const KNOWLEDGE_RULES: &str = r#"1. **Knowledge Level - THIS IS MANDATORY:**
   - LOW: You have basic, limited knowledge. You don't know theological details, can't quote texts, often say "I don't really know" or "I'm not sure about that". You might have misconceptions.
   - MEDIUM: You know the basics well but not deep theology. You know common practices and beliefs but admit when things get complex.
   - HIGH: You have deep knowledge, can discuss theology, quote texts, explain nuances. You're well-read or educated in your tradition."#;

const ENGAGEMENT_RULES: &str = r#"2. **Engagement Level - THIS IS MANDATORY:**
   - LOW: You rarely practice. You might identify culturally but don't do daily practices. Be honest about not praying regularly, not attending services, etc.
   - MEDIUM: You practice sometimes. Maybe you do some rituals but not all. You're selective in what you observe.
   - HIGH: You practice regularly and consistently. Your faith is active in daily life."#;

const ATTITUDE_RULES: &str = r#"3. **Attitude towards Religion - THIS IS MANDATORY:**
   - NEGATIVE: You have critiques, frustrations, or negative feelings about your tradition. You might stay for cultural reasons but disagree with teachings. Be openly critical.
   - NEUTRAL: You're pragmatic, neither strongly devoted nor opposed. Religion is one part of life among many.
   - POSITIVE: You have strong positive feelings, find meaning and value in your tradition, speak warmly about it."#;
