use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result};
use heartflow::conversation::InMemoryConversations;
use heartflow::heartflow::{Heartflow, MessageOutcome};
use heartflow::llm::ProviderMessage;
use heartflow::transport::{CliIngress, CliInput, CompositeUnit, QueuePipeline};
use heartflow::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

const CLI_PERSONA_ID: &str = "cli";
const DRAIN_POLL: Duration = Duration::from_millis(200);

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run { self_id, persona } => run(config, self_id, persona).await,
        Commands::Config => {
            let mut shown = config.clone();
            for endpoint in shown.providers.values_mut() {
                if endpoint.api_key.is_some() {
                    endpoint.api_key = Some("***".into());
                }
            }
            let rendered =
                toml::to_string_pretty(&shown).context("Failed to serialize config")?;
            println!("# {}", config.config_path.display());
            print!("{rendered}");
            Ok(())
        }
    }
}

/// Feed one stdin line to the engine and render what the operator sees.
/// Messages are appended to the chat's history after judging.
async fn handle_input(
    heartflow: &Heartflow,
    store: &InMemoryConversations,
    input: CliInput,
) -> String {
    let message = match input {
        CliInput::Admin(command) => return heartflow.execute_admin(&command),
        CliInput::Message(message) => message,
    };

    let chat_id = message.chat_id.clone();
    let history_line = format!("{}: {}", message.sender_name, message.text);
    let line = match heartflow.on_group_message(message).await {
        MessageOutcome::Skipped(reason) => format!("[skip] {chat_id}: {reason}"),
        MessageOutcome::Deferred { score } => {
            format!("[wait] {chat_id}: admitted with score {score:.2}")
        }
        MessageOutcome::Declined { score, reason } => format!(
            "[pass] {chat_id}: declined with score {score:.2}{}",
            reason.map(|r| format!(" ({r})")).unwrap_or_default()
        ),
    };
    store.push_history(&chat_id, ProviderMessage::user(history_line));
    line
}

fn print_unit(unit: &CompositeUnit) {
    println!(
        "[reply] {} <- {} ({} message(s)):\n{}",
        unit.chat_id, unit.sender_name, unit.message_count, unit.text
    );
}

/// Feed stdin through the engine until EOF, then wait for open quiet
/// windows to close so every admitted burst is printed.
async fn run(config: Config, self_id: String, persona: Option<String>) -> Result<()> {
    let store = Arc::new(InMemoryConversations::new());
    if let Some(persona) = persona {
        store.add_persona(CLI_PERSONA_ID, persona);
        store.set_default_persona(CLI_PERSONA_ID);
    }

    let (pipeline, mut units) = QueuePipeline::channel(32);
    let heartflow = Heartflow::from_config(config, store.clone(), Arc::new(pipeline));
    if let Err(error) = heartflow.warmup().await {
        tracing::warn!(%error, "judge warmup failed");
    }

    let printer = tokio::spawn(async move {
        while let Some(unit) = units.recv().await {
            print_unit(&unit);
        }
    });

    let (tx, mut inbound) = mpsc::channel(64);
    let ingress = CliIngress::new(self_id);
    let listener = tokio::spawn(async move { ingress.listen(tx).await });

    info!(
        quiet_secs = heartflow.debounce().quiet_duration().as_secs(),
        "reading chat|sender|text lines and /status, /reset, /cache, /cache_clear from stdin"
    );

    let mut interrupted = false;
    loop {
        tokio::select! {
            next = inbound.recv() => {
                let Some(input) = next else { break };
                println!("{}", handle_input(&heartflow, &store, input).await);
            }
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        let dropped = heartflow.debounce().cancel_all();
        info!(dropped, "interrupted; pending bursts discarded");
        listener.abort();
    } else {
        while heartflow.debounce().waiting_senders() > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
        listener.await.context("stdin listener panicked")??;
    }

    drop(heartflow);
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use heartflow::heartflow::AdminCommand;
    use heartflow::llm::ProviderRegistry;
    use heartflow::transport::cli::parse_input;

    fn live_engine() -> (Heartflow, Arc<InMemoryConversations>) {
        let store = Arc::new(InMemoryConversations::new());
        let (pipeline, _units) = QueuePipeline::channel(1);
        let config = Config {
            enabled: true,
            ..Config::default()
        };
        let heartflow = Heartflow::new(
            config,
            ProviderRegistry::new(),
            store.clone(),
            Arc::new(pipeline),
        );
        (heartflow, store)
    }

    #[tokio::test]
    async fn status_line_reflects_messages_seen_in_the_session() {
        let (hf, store) = live_engine();

        for line in ["g1|alice|hello there", "g1|bob|hi alice"] {
            let input = parse_input(line, "bot").unwrap();
            let out = handle_input(&hf, &store, input).await;
            assert!(out.starts_with("[pass] g1"), "{out}");
        }

        let status = handle_input(&hf, &store, parse_input("/status g1", "bot").unwrap()).await;
        assert!(status.contains("Heartflow status for g1"));
        assert!(status.contains("messages:          2"));
    }

    #[tokio::test]
    async fn reset_line_clears_live_state() {
        let (hf, store) = live_engine();
        let input = parse_input("g1|alice|hello", "bot").unwrap();
        handle_input(&hf, &store, input).await;

        let out = handle_input(&hf, &store, parse_input("/reset g1", "bot").unwrap()).await;
        assert_eq!(out, "Reset state for g1");
        assert_eq!(hf.status_report("g1").total_messages, 0);

        let out = handle_input(&hf, &store, CliInput::Admin(AdminCommand::CacheClear)).await;
        assert_eq!(out, "Cleared 0 persona cache entries");
    }
}
