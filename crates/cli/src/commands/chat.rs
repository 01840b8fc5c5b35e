//! `concierge chat`: interactive or single-message chat mode.

use std::io::Write;
use std::path::Path;

use concierge_agent::ConversationLoop;
use concierge_config::AppConfig;
use concierge_core::error::ProviderError;
use concierge_core::turn::Session;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::debug;

pub async fn run(message: Option<String>, user: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(user) = user.filter(|u| !u.trim().is_empty()) {
        config.user_id = user;
    }

    let provider = match concierge_providers::build_from_config(&config) {
        Ok(provider) => provider,
        Err(ProviderError::NotConfigured(reason)) => {
            print_key_help(&config);
            return Err(reason.into());
        }
        Err(e) => return Err(e.into()),
    };

    let mut agent = ConversationLoop::from_config(&config, provider);
    let mut session = Session::new(config.user_id.clone());
    debug!(
        provider = agent.provider_name(),
        model = %config.model,
        weather = agent.dispatcher().weather_source(),
        session_id = %session.id(),
        "Chat session started"
    );

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = agent.process(&mut session, &msg).await;
        eprint!("\r              \r");
        println!("{reply}");
        return Ok(());
    }

    println!();
    println!("  Concierge, interactive mode");
    println!();
    println!("  Provider:  {}", agent.provider_name());
    println!("  Model:     {}", config.model);
    println!("  Weather:   {}", agent.dispatcher().weather_source());
    println!("  User:      {}", session.user_id());
    println!();
    println!("  Type your message and press Enter. /help lists commands, /exit quits.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Some(ReplCommand::Exit) => break,
            Some(command) => run_command(command, &mut agent, &mut session),
            None => {
                eprint!("  ...");
                let reply = agent.process(&mut session, &line).await;
                eprint!("\r     \r");
                println!();
                for line in reply.lines() {
                    println!("  {} > {line}", config.assistant.name);
                }
                println!();
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_key_help(config: &AppConfig) {
    eprintln!();
    eprintln!("  ERROR: No model API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    GEMINI_API_KEY=...      (for the default Gemini provider)");
    eprintln!("    CONCIERGE_API_KEY=...   (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_path().display());
    eprintln!();
    eprintln!("  Current provider: {}", config.provider);
    eprintln!();
}

/// A slash command typed at the REPL prompt.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Help,
    Prefs,
    Forget(&'a str),
    History,
    Search(&'a str),
    Stats,
    Export(&'a str),
    Import(&'a str),
    Reset,
    Exit,
    /// Known command with a missing argument
    Usage(&'static str),
    Unknown(&'a str),
}

/// Lines not starting with `/` are utterances and yield `None`.
fn parse_command(line: &str) -> Option<ReplCommand<'_>> {
    let line = line.trim();
    let rest = line.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    Some(match name {
        "help" => ReplCommand::Help,
        "prefs" => ReplCommand::Prefs,
        "forget" => with_arg(arg, ReplCommand::Forget, "/forget KEY"),
        "history" => ReplCommand::History,
        "search" => with_arg(arg, ReplCommand::Search, "/search WORD"),
        "stats" => ReplCommand::Stats,
        "export" => with_arg(arg, ReplCommand::Export, "/export PATH"),
        "import" => with_arg(arg, ReplCommand::Import, "/import PATH"),
        "reset" => ReplCommand::Reset,
        "exit" | "quit" => ReplCommand::Exit,
        _ => ReplCommand::Unknown(name),
    })
}

fn with_arg<'a>(arg: &'a str, make: fn(&'a str) -> ReplCommand<'a>, usage: &'static str) -> ReplCommand<'a> {
    if arg.is_empty() { ReplCommand::Usage(usage) } else { make(arg) }
}

fn run_command(command: ReplCommand<'_>, agent: &mut ConversationLoop, session: &mut Session) {
    let user = session.user_id().to_string();
    match command {
        ReplCommand::Help => {
            println!("  /prefs          show what I remember about you");
            println!("  /forget KEY     forget one preference");
            println!("  /history        print this conversation");
            println!("  /search WORD    search this conversation, newest first");
            println!("  /stats          memory statistics");
            println!("  /export PATH    save preferences as JSON");
            println!("  /import PATH    load preferences from JSON");
            println!("  /reset          start a new conversation");
            println!("  /exit           quit");
        }
        ReplCommand::Prefs => {
            let prefs = agent.preferences().get(&user);
            if prefs.is_empty() {
                println!("  No preferences remembered yet.");
            }
            for (key, value) in &prefs {
                println!("  {key}: {value}");
            }
        }
        ReplCommand::Forget(key) => {
            if agent.preferences_mut().forget(&user, key) {
                println!("  Forgot '{key}'.");
            } else {
                println!("  Nothing remembered under '{key}'.");
            }
        }
        ReplCommand::History => {
            if session.is_empty() {
                println!("  (empty conversation)");
            }
            for turn in session.turns() {
                println!("  [{}] {}: {}", turn.timestamp.format("%H:%M:%S"), turn.speaker, turn.text);
            }
        }
        ReplCommand::Search(word) => {
            let hits = session.search(word);
            if hits.is_empty() {
                println!("  No turns mention '{word}'.");
            }
            for turn in hits {
                println!("  {}: {}", turn.speaker, turn.text);
            }
        }
        ReplCommand::Stats => {
            for line in agent.stats(session).to_string().lines() {
                println!("  {line}");
            }
        }
        ReplCommand::Export(path) => match agent.preferences().export_to(Path::new(path)) {
            Ok(users) => println!("  Exported preferences for {users} user(s) to {path}."),
            Err(e) => eprintln!("  [Error] {e}"),
        },
        ReplCommand::Import(path) => match agent.preferences_mut().import_from(Path::new(path)) {
            Ok(users) => println!("  Imported preferences for {users} user(s) from {path}."),
            Err(e) => eprintln!("  [Error] {e}"),
        },
        ReplCommand::Reset => {
            *session = Session::new(user);
            println!("  Started a new conversation.");
        }
        ReplCommand::Usage(usage) => println!("  Usage: {usage}"),
        ReplCommand::Unknown(name) => println!("  Unknown command '/{name}'. Type /help for a list."),
        ReplCommand::Exit => {}
    }
}
