use std::path::PathBuf;

use clap::Parser;

/// Send one prompt to the Spark chat endpoint and print the reply.
#[derive(Parser, Debug)]
#[command(name = "spark-chat", version, about)]
pub struct Args {
    /// Prompt to send as the final user message.
    pub prompt: Option<String>,

    /// Earlier turns as alternating user/assistant messages, oldest first.
    #[arg(long = "history", value_name = "TEXT")]
    pub history: Vec<String>,

    /// User id reported in the request header.
    #[arg(short, long, default_value = "spark-chat")]
    pub uid: String,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write a config template to the default path and exit.
    #[arg(long)]
    pub init: bool,

    /// Endpoint override (ws:// or wss://).
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Deadline in seconds, overriding `session.timeout_secs`.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Print status code, sid and token usage after the reply.
    #[arg(short, long)]
    pub verbose: bool,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prompt_and_history() {
        let args = Args::parse_from([
            "spark-chat",
            "--history",
            "hi",
            "--history",
            "hello!",
            "--uid",
            "u-42",
            "what now?",
        ]);
        assert_eq!(args.prompt.as_deref(), Some("what now?"));
        assert_eq!(args.history, vec!["hi", "hello!"]);
        assert_eq!(args.uid, "u-42");
        assert!(!args.init);
    }

    #[test]
    fn defaults() {
        let args = Args::parse_from(["spark-chat", "ping"]);
        assert_eq!(args.uid, "spark-chat");
        assert!(args.history.is_empty());
        assert!(args.timeout.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn timeout_must_be_positive() {
        assert!(Args::try_parse_from(["spark-chat", "--timeout", "0", "ping"]).is_err());

        let args = Args::try_parse_from(["spark-chat", "--timeout", "5", "ping"]).unwrap();
        assert_eq!(args.timeout, Some(5));
    }
}
