//! Centralized constants for the form agent
//!
//! Single source of truth for default endpoints, models and limits.

/// Hosted API endpoints (OpenAI-compatible)
pub mod endpoints {
    /// Groq OpenAI-compatible endpoint (chat + Whisper)
    pub const GROQ_DEFAULT: &str = "https://api.groq.com/openai/v1";

    /// Gemini OpenAI-compatible endpoint
    pub const GEMINI_DEFAULT: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
}

/// Default model identifiers
pub mod models {
    /// Question generation and value extraction
    pub const CHAT_DEFAULT: &str = "openai/gpt-oss-20b";

    /// Inbound and outbound translation
    pub const TRANSLATION_DEFAULT: &str = "gemini-2.5-flash";

    /// Speech-to-text
    pub const WHISPER_DEFAULT: &str = "whisper-large-v3";
}

/// Timeouts (seconds)
pub mod timeouts {
    /// Chat-completion request timeout
    pub const LLM_REQUEST_SECS: u64 = 60;

    /// Whisper upload + inference timeout
    pub const STT_REQUEST_SECS: u64 = 120;

    /// Whole HTTP request timeout
    pub const HTTP_REQUEST_SECS: u64 = 300;
}

/// Session store limits
pub mod sessions {
    pub const MAX_SESSIONS: usize = 10_000;

    /// Idle time after which a session is evicted
    pub const IDLE_TIMEOUT_SECS: u64 = 3600;

    pub const CLEANUP_INTERVAL_SECS: u64 = 300;
}

/// Upload limits
pub mod uploads {
    pub const DEFAULT_DIR: &str = "data/uploads";

    /// Whisper accepts at most 25 MB per request
    pub const MAX_BYTES: usize = 25 * 1024 * 1024;
}
