//! Assistant service - AI drafts for posts and comments
//!
//! Wraps a TextGenerator with the prompts, an explicit deadline and a
//! cancellation token. Timeouts and cancellations surface as the same kind
//! of transient error as a provider failure; the feed is never touched here.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::adapters::gemini::GeminiClient;
use crate::config::AssistantConfig;
use crate::domain::result::{Error, Result};
use crate::domain::Category;
use crate::ports::TextGenerator;

const POST_FALLBACK: &str = "No se pudo generar el contenido.";
const COMMENT_FALLBACK: &str = "Hmm, el tiempo se me escapó y no pude pensar en nada.";

/// Tone requested for an AI comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Supportive,
    Critical,
    Funny,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Supportive => "supportive",
            Mood::Critical => "critical",
            Mood::Funny => "funny",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Mood::Supportive => "Sé muy alentador, da un consejo positivo extra.",
            Mood::Critical => {
                "Juega al abogado del diablo de forma educada, cuestiona la premisa o da un punto de vista opuesto."
            }
            Mood::Funny => "Haz una broma relacionada con el tiempo o una observación irónica divertida.",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supportive" => Ok(Mood::Supportive),
            "critical" => Ok(Mood::Critical),
            "funny" => Ok(Mood::Funny),
            other => Err(Error::validation(format!(
                "Unknown mood '{}'. Valid: supportive, critical, funny",
                other
            ))),
        }
    }
}

/// Cooperative cancellation for an in-flight request
#[derive(Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

const MISSING_KEY: &str = "API key not found";

enum Backend {
    Ready(Arc<dyn TextGenerator>),
    /// Every call fails with this configuration message
    Unavailable(String),
}

/// Drafts posts and comments through a generative-text provider
pub struct AssistantService {
    backend: Backend,
    timeout: Duration,
}

impl AssistantService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        let backend = match generator {
            Some(generator) => Backend::Ready(generator),
            None => Backend::Unavailable(MISSING_KEY.to_string()),
        };
        Self { backend, timeout }
    }

    /// Build from configuration
    ///
    /// Never fails: a missing key or a client that cannot be built leaves the
    /// service present but failing fast on every call.
    pub fn from_config(config: &AssistantConfig) -> Self {
        let backend = match config.api_key.as_deref() {
            Some(key) => match GeminiClient::new(key, &config.model, &config.endpoint) {
                Ok(client) => Backend::Ready(Arc::new(client) as Arc<dyn TextGenerator>),
                Err(e) => {
                    tracing::warn!(error = %e, "assistant disabled");
                    let reason = match e {
                        Error::Config(msg) => msg,
                        other => other.to_string(),
                    };
                    Backend::Unavailable(reason)
                }
            },
            None => Backend::Unavailable(MISSING_KEY.to_string()),
        };
        Self {
            backend,
            timeout: config.timeout,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    /// Why drafting is disabled, if it is
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            Backend::Ready(_) => None,
            Backend::Unavailable(reason) => Some(reason),
        }
    }

    /// Draft the body of a post about `topic`
    pub async fn draft_post(
        &self,
        topic: &str,
        category: Category,
        cancel: &CancelToken,
    ) -> Result<String> {
        if topic.trim().is_empty() {
            return Err(Error::validation(
                "Write a title or topic first so the assistant has something to work with",
            ));
        }
        let prompt = post_prompt(topic, category);
        self.run(&prompt, POST_FALLBACK, cancel).await
    }

    /// Draft a reply to `post_content` in the given mood
    pub async fn draft_comment(
        &self,
        post_content: &str,
        mood: Mood,
        cancel: &CancelToken,
    ) -> Result<String> {
        let prompt = comment_prompt(post_content, mood);
        self.run(&prompt, COMMENT_FALLBACK, cancel).await
    }

    async fn run(&self, prompt: &str, fallback: &str, cancel: &CancelToken) -> Result<String> {
        let generator = match &self.backend {
            Backend::Ready(generator) => generator,
            Backend::Unavailable(reason) => return Err(Error::Config(reason.clone())),
        };

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            outcome = tokio::time::timeout(self.timeout, generator.generate(prompt)) => {
                match outcome {
                    Err(_) => Err(Error::Timeout(self.timeout.as_secs())),
                    Ok(Err(e)) => Err(e),
                    Ok(Ok(Some(text))) => Ok(text),
                    Ok(Ok(None)) => Ok(fallback.to_string()),
                }
            }
        };

        if let Err(e) = &result {
            tracing::warn!(provider = generator.name(), error = %e, "assistant request failed");
        }
        result
    }
}

fn post_prompt(topic: &str, category: Category) -> String {
    format!(
        "Escribe una publicación de blog corta, divertida y atractiva para una red social sobre gestión del tiempo.
  Tema: {}
  Categoría: {}
  
  El tono debe ser conversacional, útil y animado. Usa emojis. Máximo 150 palabras.
  No incluyas títulos ni markdown complejo, solo el cuerpo del texto.",
        topic,
        category.label()
    )
}

fn comment_prompt(post_content: &str, mood: Mood) -> String {
    format!(
        "Responde a esta publicación de blog: \"{}\".
  Tu rol: Un experto en tiempo (o el Tiempo mismo).
  Instrucción: {}
  Mantenlo corto (max 2 oraciones) y usa emojis.",
        post_content,
        mood.instruction()
    )
}
