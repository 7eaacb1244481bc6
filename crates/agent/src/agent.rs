//! Form-filling agent
//!
//! Walks a session through the field schedule one step at a time. A step
//! without input asks the question for the current field; a step with input
//! extracts the field's value from the answer.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use form_agent_config::PromptsConfig;
use form_agent_core::{
    FieldDescriptor, FieldSchedule, Language, LanguageDetector, SpeechToText, Translator,
};
use form_agent_llm::{LlmBackend, PromptTemplate};
use form_agent_text_processing::{InputNormalizer, NoopTranslator, ScriptDetector};

use crate::extraction::{coerce_value, parse_extraction, Extraction};
use crate::state::FormState;
use crate::AgentError;

const INVALID_INPUT: &str = "Invalid input";
const MISSING_INPUT: &str = "Provide either audio or text";

/// An answer to the current question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Text(String),
    /// Path to an uploaded recording
    Audio(PathBuf),
}

impl UserInput {
    /// Combine the optional parts of an answer request.
    ///
    /// Audio wins over text; blank text counts as no text.
    pub fn from_parts(text: Option<String>, audio: Option<PathBuf>) -> Option<Self> {
        if let Some(path) = audio {
            return Some(UserInput::Audio(path));
        }
        text.filter(|t| !t.trim().is_empty()).map(UserInput::Text)
    }
}

/// Result of one step, serialized as the response body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepOutcome {
    Done { done: bool, data: Map<String, Value> },
    Question { question: String, field: String },
    Invalid { question: String, error: String },
    Accepted { success: bool, data: Map<String, Value> },
    MissingInput { error: String },
}

impl StepOutcome {
    pub fn done(data: Map<String, Value>) -> Self {
        StepOutcome::Done { done: true, data }
    }

    pub fn question(question: impl Into<String>, field: impl Into<String>) -> Self {
        StepOutcome::Question {
            question: question.into(),
            field: field.into(),
        }
    }

    pub fn invalid(question: impl Into<String>) -> Self {
        StepOutcome::Invalid {
            question: question.into(),
            error: INVALID_INPUT.to_string(),
        }
    }

    pub fn accepted(data: Map<String, Value>) -> Self {
        StepOutcome::Accepted {
            success: true,
            data,
        }
    }

    pub fn missing_input() -> Self {
        StepOutcome::MissingInput {
            error: MISSING_INPUT.to_string(),
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            StepOutcome::Done { .. } => "done",
            StepOutcome::Question { .. } => "question",
            StepOutcome::Invalid { .. } => "invalid",
            StepOutcome::Accepted { .. } => "accepted",
            StepOutcome::MissingInput { .. } => "missing_input",
        }
    }
}

/// Question and extraction templates
#[derive(Debug, Clone)]
pub struct FormPrompts {
    question: PromptTemplate,
    extraction: PromptTemplate,
}

impl FormPrompts {
    pub fn new(question: PromptTemplate, extraction: PromptTemplate) -> Result<Self, AgentError> {
        question
            .require(&["field", "history"])
            .map_err(|e| AgentError::Configuration(e.to_string()))?;
        extraction
            .require(&["question", "field", "user_input"])
            .map_err(|e| AgentError::Configuration(e.to_string()))?;
        Ok(Self {
            question,
            extraction,
        })
    }

    pub fn from_config(config: &PromptsConfig) -> Result<Self, AgentError> {
        Self::new(
            PromptTemplate::new("question", config.question.clone()),
            PromptTemplate::new("extraction", config.extraction.clone()),
        )
    }
}

impl Default for FormPrompts {
    fn default() -> Self {
        let config = PromptsConfig::default();
        Self {
            question: PromptTemplate::new("question", config.question),
            extraction: PromptTemplate::new("extraction", config.extraction),
        }
    }
}

/// Builder for [`FormAgent`]
pub struct FormAgentBuilder {
    schedule: FieldSchedule,
    llm: Arc<dyn LlmBackend>,
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
    stt: Option<Arc<dyn SpeechToText>>,
    prompts: FormPrompts,
    display_language: Language,
}

impl FormAgentBuilder {
    pub fn detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn stt(mut self, stt: Arc<dyn SpeechToText>) -> Self {
        self.stt = Some(stt);
        self
    }

    pub fn prompts(mut self, prompts: FormPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Language questions are shown in
    pub fn display_language(mut self, language: Language) -> Self {
        self.display_language = language;
        self
    }

    pub fn build(self) -> FormAgent {
        let normalizer = InputNormalizer::new(self.detector, self.translator.clone());
        FormAgent {
            schedule: self.schedule,
            llm: self.llm,
            normalizer,
            translator: self.translator,
            stt: self.stt,
            prompts: self.prompts,
            display_language: self.display_language,
        }
    }
}

/// Conversational form filler
///
/// Stateless apart from its collaborators; all progress lives in the
/// [`FormState`] passed to each step.
pub struct FormAgent {
    schedule: FieldSchedule,
    llm: Arc<dyn LlmBackend>,
    normalizer: InputNormalizer,
    translator: Arc<dyn Translator>,
    stt: Option<Arc<dyn SpeechToText>>,
    prompts: FormPrompts,
    display_language: Language,
}

impl FormAgent {
    /// Start building an agent; questions default to English and no
    /// translation or speech-to-text is configured.
    pub fn builder(schedule: FieldSchedule, llm: Arc<dyn LlmBackend>) -> FormAgentBuilder {
        FormAgentBuilder {
            schedule,
            llm,
            detector: Arc::new(ScriptDetector::default()),
            translator: Arc::new(NoopTranslator),
            stt: None,
            prompts: FormPrompts::default(),
            display_language: Language::English,
        }
    }

    pub fn schedule(&self) -> &FieldSchedule {
        &self.schedule
    }

    pub fn display_language(&self) -> Language {
        self.display_language
    }

    pub fn accepts_audio(&self) -> bool {
        self.stt.is_some()
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Probe the chat model endpoint
    pub async fn model_available(&self) -> bool {
        self.llm.is_available().await
    }

    /// Advance the session by one step.
    ///
    /// `None` asks the question for the current field, `Some` answers it.
    /// On error the state is left exactly as it was.
    pub async fn process_step(
        &self,
        state: &mut FormState,
        input: Option<UserInput>,
    ) -> Result<StepOutcome, AgentError> {
        let Some(field) = self.schedule.get(state.index()) else {
            return Ok(StepOutcome::done(state.data().clone()));
        };

        match input {
            None => self.ask(state, field).await,
            Some(input) => self.answer(state, field, input).await,
        }
    }

    async fn ask(
        &self,
        state: &mut FormState,
        field: &FieldDescriptor,
    ) -> Result<StepOutcome, AgentError> {
        let history = Value::Array(state.history().to_vec()).to_string();
        let prompt = self
            .prompts
            .question
            .render(&[
                ("field", field.description.as_str()),
                ("history", history.as_str()),
            ])?;

        let start = Instant::now();
        let question = self.llm.complete(&prompt).await?;
        if question.is_empty() {
            return Err(AgentError::Llm(form_agent_llm::LlmError::InvalidResponse(
                "empty question".to_string(),
            )));
        }

        let shown = if self.display_language.is_english() {
            question.clone()
        } else {
            self.translator
                .translate(&question, Language::English, self.display_language)
                .await
                .map_err(|e| AgentError::Translation(e.to_string()))?
        };

        tracing::info!(
            field = %field.key,
            index = state.index(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Asking question"
        );

        state.set_question(question);
        Ok(StepOutcome::question(shown, field.key.clone()))
    }

    async fn answer(
        &self,
        state: &mut FormState,
        field: &FieldDescriptor,
        input: UserInput,
    ) -> Result<StepOutcome, AgentError> {
        // Answer before any question was asked: the description stands in
        let question = state
            .last_question()
            .unwrap_or(&field.description)
            .to_string();

        let user_input = match input {
            UserInput::Text(text) => self.normalize(&text).await?,
            UserInput::Audio(path) => self.transcribe(&path).await?,
        };

        if user_input.trim().is_empty() {
            tracing::debug!(field = %field.key, "Empty answer after normalization");
            return Ok(StepOutcome::invalid(question));
        }

        let prompt = self.prompts.extraction.render(&[
            ("question", question.as_str()),
            ("field", field.description.as_str()),
            ("user_input", user_input.as_str()),
        ])?;
        let reply = self.llm.complete(&prompt).await?;

        let value = match parse_extraction(&reply)? {
            Extraction::Invalid => None,
            Extraction::Value(value) => {
                let coerced = coerce_value(field.kind, value);
                if coerced.is_none() {
                    tracing::debug!(field = %field.key, kind = ?field.kind, "Extracted value rejected");
                }
                coerced
            }
        };

        let Some(value) = value else {
            tracing::info!(field = %field.key, "Invalid answer, asking again");
            return Ok(StepOutcome::invalid(question));
        };

        state.record_answer(&field.key, value);
        tracing::info!(
            field = %field.key,
            index = state.index(),
            remaining = self.schedule.len() - state.index(),
            "Field accepted"
        );

        Ok(StepOutcome::accepted(state.data().clone()))
    }

    async fn normalize(&self, text: &str) -> Result<String, AgentError> {
        let normalized = self
            .normalizer
            .normalize(text)
            .await
            .map_err(|e| AgentError::Translation(e.to_string()))?;
        if normalized.translated {
            tracing::debug!(
                language = normalized.detected.code(),
                "Answer translated to English"
            );
        }
        Ok(normalized.text)
    }

    async fn transcribe(&self, path: &std::path::Path) -> Result<String, AgentError> {
        let stt = self
            .stt
            .as_ref()
            .ok_or_else(|| AgentError::Configuration("speech-to-text is disabled".to_string()))?;

        let transcript = stt
            .transcribe(path)
            .await
            .map_err(|e| AgentError::Transcription(e.to_string()))?;

        tracing::debug!(
            engine = stt.name(),
            language = %transcript.language,
            chars = transcript.text.len(),
            "Transcribed answer"
        );

        if stt.outputs_english() {
            Ok(transcript.text)
        } else {
            self.normalize(&transcript.text).await
        }
    }
}
