//! spark-chat: command-line host for the Spark chat client.
//!
//! Loads credentials and defaults from config, sends one exchange and
//! prints the assembled reply. Ctrl-C cancels the exchange.

mod cli;

use std::process::ExitCode;
use std::time::Duration;

use spark_ai::{ChatParameters, Credentials, Message, SessionOptions, SparkClient, SparkError};
use spark_config::{ConfigError, SparkConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Spark(#[from] SparkError),

    #[error("no prompt given")]
    MissingPrompt,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let log_directive = args.log_level.as_deref().unwrap_or("spark=info");
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "spark=info".parse().unwrap()),
            ),
        )
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "spark-chat failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Args) -> Result<(), CliError> {
    if args.init {
        let path = spark_config::default_config_path()?;
        spark_config::create_default_config(&path)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let prompt = args.prompt.clone().ok_or(CliError::MissingPrompt)?;

    let config = match &args.config {
        Some(path) => spark_config::load_from_path(path)?,
        None => spark_config::load_default()?,
    };

    let client = build_client(&config, args.timeout)?;
    let parameters = ChatParameters {
        domain: config.chat.domain.clone(),
        temperature: config.chat.temperature,
        top_k: config.chat.top_k,
        max_tokens: config.chat.max_tokens,
    };
    let endpoint = args.endpoint.as_deref().unwrap_or(&config.chat.endpoint);
    let messages = build_messages(&args.history, prompt);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling exchange");
            on_interrupt.cancel();
        }
    });

    let reply = client
        .chat_with_cancel(endpoint, &parameters, &args.uid, &messages, &cancel)
        .await?;

    println!("{}", reply.text);
    if args.verbose {
        eprintln!(
            "code={} message={:?} sid={} fragments={}",
            reply.status_code,
            reply.message,
            reply.sid.as_deref().unwrap_or("-"),
            reply.fragments,
        );
        if let Some(usage) = reply.usage {
            eprintln!(
                "tokens: prompt={} completion={} total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
    }
    Ok(())
}

fn build_client(config: &SparkConfig, timeout_override: Option<u64>) -> Result<SparkClient, CliError> {
    let creds = &config.credentials;
    let credentials = Credentials::new(&creds.app_id, &creds.api_key, &creds.api_secret)?;

    let mut options = SessionOptions::default();
    if let Some(secs) = timeout_override.or(config.session.timeout_secs) {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    Ok(SparkClient::new(credentials).with_options(options))
}

/// History alternates user/assistant starting with the user; the prompt is
/// appended as the final user turn.
fn build_messages(history: &[String], prompt: String) -> Vec<Message> {
    let mut messages: Vec<Message> = history
        .iter()
        .enumerate()
        .map(|(i, text)| {
            if i % 2 == 0 {
                Message::user(text.clone())
            } else {
                Message::assistant(text.clone())
            }
        })
        .collect();
    messages.push(Message::user(prompt));
    messages
}
