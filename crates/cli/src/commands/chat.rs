//! `mindmate chat`: Interactive or single-message chat mode.

use std::path::PathBuf;

use mindmate_agent::{ConversationContext, build_pipeline};
use mindmate_config::AppConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Providers that run locally and need no API key.
const LOCAL_PROVIDERS: [&str; 4] = ["ollama", "vllm", "llamacpp", "llama.cpp"];

/// What to do with one line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Skip,
    Exit,
    Message(&'a str),
}

/// Interpret a raw input line.
///
/// Blank lines are skipped; `exit`, `quit` and `bye` (any case) end the session.
pub fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Skip;
    }
    match trimmed.to_lowercase().as_str() {
        "exit" | "quit" | "bye" => Input::Exit,
        _ => Input::Message(trimmed),
    }
}

fn requires_api_key(config: &AppConfig) -> bool {
    !LOCAL_PROVIDERS.contains(&config.default_provider.as_str())
}

pub async fn run(
    message: Option<String>,
    kb_override: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(path) = kb_override {
        config.knowledge_base = path;
    }

    // Check for API key early so the error is clear
    if requires_api_key(&config) && !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    MINDMATE_API_KEY = 'sk-...'   (generic)");
        eprintln!("    OPENAI_API_KEY   = 'sk-...'   (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    eprint!("  Loading knowledge base...");
    let pipeline = build_pipeline(&config).await?;
    eprint!("\r                           \r");

    let mut context = ConversationContext::from_config(&config.context);

    if let Some(msg) = message {
        // Single message mode
        let Input::Message(text) = parse_input(&msg) else {
            return Err("Message is empty".into());
        };
        let response = pipeline.handle_turn(text, &mut context).await;
        println!("{response}");
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        MindMate AI — Interactive Mode        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:   {}", config.default_provider);
    println!("  Model:      {}", config.default_model);
    println!("  Knowledge:  {} entries", pipeline.index().len());
    println!();
    println!("  Casual & emotional support mode active.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"  You > ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_input(&line) {
            Input::Skip => continue,
            Input::Exit => break,
            Input::Message(text) => {
                let response = pipeline.handle_turn(text, &mut context).await;
                println!();
                for line in response.lines() {
                    println!("  MindMate > {line}");
                }
                println!();
            }
        }
    }

    println!();
    println!("  Take care! 👋");
    println!();

    Ok(())
}
