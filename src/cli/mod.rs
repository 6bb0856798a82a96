use clap::{ Parser, Subcommand };
use std::num::NonZeroU32;

use crate::bot::BotVariant;
use crate::llm::chat::gemini::{ DEFAULT_BASE_URL, DEFAULT_MODEL };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Bot persona to run (daily-challenge, legal)
    #[arg(long, env = "BOT_VARIANT", default_value = "legal", global = true)]
    pub bot: BotVariant,

    /// Optional JSON file overriding the built-in persona (name, description, scope, refusal, greeting, keywords)
    #[arg(long, env = "PERSONA_PATH", global = true)]
    pub persona_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve `POST /api/chat` for the selected bot.
    Serve(ServeArgs),
    /// Chat with a running server from the terminal.
    Chat(ChatArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    // --- Generation Provider Args ---
    /// API key for the Gemini generative language API.
    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Gemini model name (e.g., gemini-1.5-flash, gemini-1.5-pro)
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub gemini_model: String,

    /// Base URL of the generative language API, without the model path.
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub gemini_base_url: String,

    /// Upper bound on the size of one reply, in tokens.
    #[arg(long, env = "MAX_OUTPUT_TOKENS", default_value = "1000")]
    pub max_output_tokens: u32,

    /// Sampling temperature for replies.
    #[arg(long, env = "TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    /// Maximum duration of one chat request, streaming included, in seconds.
    #[arg(long, env = "MAX_DURATION_SECS", default_value = "30")]
    pub max_duration_secs: u64,

    /// Optional cap on inbound chat requests per second. Unset means no cap.
    #[arg(long, env = "REQUESTS_PER_SECOND")]
    pub requests_per_second: Option<NonZeroU32>,

    // --- TLS Args ---
    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChatArgs {
    /// Base URL of a running `serve` instance.
    #[arg(long, env = "CHAT_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    pub server_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults_match_generation_settings() {
        let args = Args::try_parse_from(["persona-chat", "serve"]).unwrap();
        assert_eq!(args.bot, BotVariant::Legal);
        match args.command {
            Command::Serve(serve) => {
                assert_eq!(serve.max_output_tokens, 1000);
                assert!((serve.temperature - 0.7).abs() < f32::EPSILON);
                assert_eq!(serve.requests_per_second, None);
                assert!(!serve.enable_tls);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn bot_flag_is_accepted_after_subcommand() {
        let args = Args::try_parse_from(
            ["persona-chat", "chat", "--bot", "daily-challenge", "--server-url", "http://x:1"]
        ).unwrap();
        assert_eq!(args.bot, BotVariant::DailyChallenge);
        match args.command {
            Command::Chat(chat) => assert_eq!(chat.server_url, "http://x:1"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn unknown_bot_is_rejected() {
        assert!(Args::try_parse_from(["persona-chat", "--bot", "weather", "serve"]).is_err());
    }
}
