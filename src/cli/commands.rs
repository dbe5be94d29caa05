use clap::{Parser, Subcommand};

/// `Heartflow` - decides when a group-chat bot should speak up unprompted.
#[derive(Parser, Debug)]
#[command(name = "heartflow")]
#[command(version)]
#[command(about = "Proactive-reply admission engine for group-chat bots.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read `chat|sender|text` lines from stdin and print each merged reply
    /// unit. `/status <chat>`, `/reset <chat>`, `/cache` and `/cache_clear`
    /// inspect the running engine
    Run {
        /// The bot's own sender id; `@<id>` in a message marks it as addressed
        #[arg(long, default_value = "heartflow")]
        self_id: String,

        /// Persona prompt used as the default persona for every chat
        #[arg(long)]
        persona: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["heartflow", "run"]).unwrap();
        match cli.command {
            Commands::Run { self_id, persona } => {
                assert_eq!(self_id, "heartflow");
                assert!(persona.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn status_is_not_a_subcommand() {
        assert!(Cli::try_parse_from(["heartflow", "status", "--chat", "g1"]).is_err());
    }
}
