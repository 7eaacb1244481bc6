//! Speech processing traits

use crate::{Result, Transcript};
use async_trait::async_trait;
use std::path::Path;

/// Speech-to-Text interface
///
/// Implementations:
/// - `WhisperHttpStt` - hosted Whisper over an OpenAI-compatible API
///
/// # Example
///
/// ```ignore
/// let stt: Arc<dyn SpeechToText> = Arc::new(WhisperHttpStt::new(config)?);
/// let transcript = stt.transcribe(Path::new("data/uploads/answer.webm")).await?;
/// println!("Transcribed: {}", transcript.text);
/// ```
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe a recorded audio file
    ///
    /// # Arguments
    /// * `audio_path` - Path of the uploaded recording
    ///
    /// # Returns
    /// Recognized text plus the language the service detected
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;

    /// Whether the returned text is already English regardless of input language
    fn outputs_english(&self) -> bool {
        true
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}
