pub mod agent;
pub mod bot;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod server;

use agent::ChatAgent;
use bot::Persona;
use cli::{ Args, Command, ServeArgs };
use governor::{ Quota, RateLimiter };
use llm::chat::new_client as new_chat_client;
use llm::{ GenerationConfig, LlmConfig };
use log::{ info, error };
use server::api::AppState;
use server::Server;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let persona = config::persona::load_persona(args.bot, args.persona_path.as_deref())?;

    match args.command {
        Command::Serve(serve) => serve_chat(persona, serve).await,
        Command::Chat(chat) => client::terminal::run_terminal(persona, chat).await,
    }
}

async fn serve_chat(persona: Persona, args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Persona: {} ({} keywords)", persona.name, persona.keywords.len());
    info!("Server Address: {}", args.server_addr);
    info!("Gemini Model: {}", args.gemini_model);
    info!("Gemini Base URL: {}", args.gemini_base_url);
    info!("Gemini API Key Set: {}", !args.gemini_api_key.is_empty());
    info!("Max Output Tokens: {}", args.max_output_tokens);
    info!("Temperature: {}", args.temperature);
    info!("Max Request Duration: {}s", args.max_duration_secs);
    match args.requests_per_second {
        Some(rps) => info!("Inbound Limit: {} requests/s", rps),
        None => info!("Inbound Limit: disabled"),
    }
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let chat_config = LlmConfig {
        api_key: Some(args.gemini_api_key.clone()).filter(|k| !k.is_empty()),
        completion_model: Some(args.gemini_model.clone()),
        base_url: Some(args.gemini_base_url.clone()),
    };
    let chat_client = new_chat_client(&chat_config)?;
    let generation = GenerationConfig {
        max_output_tokens: args.max_output_tokens,
        temperature: args.temperature,
    };
    let agent = Arc::new(ChatAgent::new(chat_client, Arc::new(persona), generation));

    let state = AppState {
        agent,
        max_duration: Duration::from_secs(args.max_duration_secs),
        limiter: args.requests_per_second.map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps)))),
    };

    let addr: SocketAddr = args.server_addr.parse()?;
    let mut server = Server::new(addr, state);
    if args.enable_tls {
        match (args.tls_cert_path, args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => {
                server = server.with_tls(cert_path, key_path);
            }
            _ => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("TLS enabled without cert/key".into());
            }
        }
    }

    server.run().await
}
