//! Form Agent Server Entry Point

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use form_agent_agent::{FormAgent, FormPrompts};
use form_agent_config::{load_settings, Settings};
use form_agent_core::{Language, SpeechToText, Translator};
use form_agent_llm::{LlmFactory, LlmProviderConfig, PromptTemplate};
use form_agent_pipeline::stt::{WhisperHttpConfig, WhisperHttpStt};
use form_agent_server::{create_router, init_metrics, AppState, SessionManager};
use form_agent_text_processing::{LlmTranslator, NoopTranslator, ScriptDetector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults.
    // Missing files fall back to defaults; a present but invalid file is fatal.
    let env = std::env::var("FORM_AGENT_ENV").ok();
    let config = load_settings(env.as_deref()).context("invalid configuration")?;
    // Tracing not yet initialized, use eprintln for early logging
    eprintln!(
        "Loaded configuration (env: {})",
        env.as_deref().unwrap_or("default")
    );

    init_tracing(&config);

    tracing::info!("Starting Form Agent Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let agent = Arc::new(build_agent(&config)?);
    tracing::info!(
        fields = agent.schedule().len(),
        model = agent.model_name(),
        display_language = %agent.display_language(),
        audio = agent.accepts_audio(),
        "Initialized form agent"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        let handle = init_metrics();
        tracing::info!("Initialized Prometheus metrics at /metrics");
        handle
    } else {
        None
    };

    let sessions = Arc::new(SessionManager::from_config(&config.sessions));
    let cleanup_shutdown = sessions.start_cleanup_task();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;

    let state = AppState::new(config, sessions, agent).with_metrics(metrics_handle);
    state
        .uploads
        .ensure_dir()
        .await
        .with_context(|| format!("cannot create upload dir {}", state.uploads.dir().display()))?;

    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on SIGTERM/SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = cleanup_shutdown.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wire the chat model, translator, speech-to-text and prompts from settings
fn build_agent(config: &Settings) -> anyhow::Result<FormAgent> {
    let schedule = config.form.schedule()?;
    let llm = LlmFactory::create(&LlmProviderConfig::from(&config.llm))
        .context("failed to create chat model backend")?;
    let prompts = FormPrompts::from_config(&config.prompts)?;

    let translator: Arc<dyn Translator> = if config.translation.enabled {
        let backend = LlmFactory::create(&LlmProviderConfig::from(&config.translation))
            .context("failed to create translation backend")?;
        Arc::new(LlmTranslator::new(
            backend,
            PromptTemplate::new("to_english", config.prompts.to_english.clone()),
            PromptTemplate::new("from_english", config.prompts.from_english.clone()),
        )?)
    } else {
        tracing::warn!("Translation disabled, answers and questions pass through unchanged");
        Arc::new(NoopTranslator)
    };

    let pairs = [
        (config.form.source_language, Language::English),
        (Language::English, config.form.display_language),
    ];
    if let Some((from, to)) = pairs
        .into_iter()
        .find(|(from, to)| !translator.supports_pair(*from, *to))
    {
        anyhow::bail!(
            "translator {} cannot translate {} -> {}",
            translator.name(),
            from.code(),
            to.code()
        );
    }

    let mut builder = FormAgent::builder(schedule, llm)
        .detector(Arc::new(ScriptDetector::for_language(config.form.source_language)))
        .translator(translator)
        .prompts(prompts)
        .display_language(config.form.display_language);

    if config.stt.enabled {
        let stt: Arc<dyn SpeechToText> = Arc::new(
            WhisperHttpStt::new(WhisperHttpConfig::from(&config.stt))
                .context("failed to create speech-to-text client")?,
        );
        builder = builder.stt(stt);
    } else {
        tracing::warn!("Speech-to-text disabled, audio answers will be rejected");
    }

    Ok(builder.build())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("form_agent={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
