use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::chat::{ExchangeOutcome, SessionStore, handle_user_message};
use crate::core::AppConfig;
use crate::core::logging::init_tracing;
use crate::llm::client_from_config;

pub async fn run() -> Result<()> {
    // Keep the prompt readable, only warnings and up by default
    init_tracing(format!("{}=warn", env!("CARGO_CRATE_NAME")));

    let config = AppConfig::from_env()?;
    let model = client_from_config(&config)?;
    let store = SessionStore::new(model, config.session_ttl);
    let handle = store.get_or_create_session(None);

    let mut rl = DefaultEditor::new()?;
    println!("{} ({}). Ctrl-D to exit.", config.page_title, config.model);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                let mut session = handle.try_lock()?;
                match handle_user_message(&mut session, &line).await? {
                    ExchangeOutcome::Replied(reply) => println!("{}", reply),
                    ExchangeOutcome::Failed { notice } => {
                        // Already shown, don't keep it around
                        session.take_notice();
                        println!("Error: {}", notice);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
