use anyhow::{Context, Result};
use clap::Parser;
use parley::cli::{Cli, Commands};
use parley::utils::display;
use parley::{App, ChatUpdate, Settings};
use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = Settings::new().context("Failed to load configuration")?;
    if let Some(locale) = &cli.locale {
        settings.locale = locale.parse()?;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut app = App::init(settings).await?;
    if let Some(error) = app.store.error() {
        display::print_error(error);
    }

    let result = match cli.command {
        Commands::List => handle_list(&app),
        Commands::New => handle_new(&mut app).await,
        Commands::Show { chat_id } => handle_show(&app, chat_id),
        Commands::Rename { chat_id, title } => handle_rename(&mut app, chat_id, title).await,
        Commands::Delete { chat_id } => handle_delete(&mut app, chat_id).await,
        Commands::Clear => handle_clear(&mut app).await,
        Commands::Chat {
            chat_id,
            model,
            temperature,
        } => handle_chat(&mut app, chat_id, model, temperature).await,
    };

    app.shutdown();

    result
}

fn handle_list(app: &App) -> Result<()> {
    let mut chats: Vec<_> = app.store.chats().iter().collect();
    chats.sort_by(|a, b| b.created_at.as_datetime().cmp(&a.created_at.as_datetime()));

    display::print_header(&format!("{} chats", chats.len()));
    let current = app.store.current_chat_id();
    for chat in chats {
        display::print_chat_summary(chat, current == Some(chat.id.as_str()));
    }
    Ok(())
}

async fn handle_new(app: &mut App) -> Result<()> {
    let chat = app.store.create_new_chat().await?;
    display::print_success(&format!("Created chat {}", chat.id));
    Ok(())
}

fn handle_show(app: &App, chat_id: Option<String>) -> Result<()> {
    let chat = match &chat_id {
        Some(id) => app.store.chat(id),
        None => app.store.current_chat(),
    }
    .with_context(|| format!("Chat '{}' not found", chat_id.as_deref().unwrap_or("current")))?;

    display::print_transcript(chat);
    Ok(())
}

async fn handle_rename(app: &mut App, chat_id: String, title: String) -> Result<()> {
    if app.store.chat(&chat_id).is_none() {
        anyhow::bail!("Chat '{}' not found", chat_id);
    }
    app.store.update_chat(&chat_id, ChatUpdate::title(title)).await?;
    display::print_success("Chat renamed");
    Ok(())
}

async fn handle_delete(app: &mut App, chat_id: String) -> Result<()> {
    if app.store.chat(&chat_id).is_none() {
        anyhow::bail!("Chat '{}' not found", chat_id);
    }
    app.store.delete_chat(&chat_id).await?;
    display::print_success(&format!("Deleted chat {}", chat_id));
    Ok(())
}

async fn handle_clear(app: &mut App) -> Result<()> {
    app.store.clear_chats().await?;
    display::print_success("All chats cleared");
    Ok(())
}

async fn handle_chat(
    app: &mut App,
    chat_id: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
) -> Result<()> {
    if let Some(id) = &chat_id {
        if !app.store.set_current_chat(id) {
            anyhow::bail!("Chat '{}' not found", id);
        }
    }
    let assistant = app.assistant()?;

    let mut current = app
        .store
        .current_chat_id()
        .map(str::to_string)
        .context("No chat available")?;

    let mut update = ChatUpdate::default();
    update.model = model;
    update.temperature = temperature;
    if !update.is_empty() {
        app.store.update_chat(&current, update).await?;
    }

    if let Some(chat) = app.store.chat(&current) {
        display::print_transcript(chat);
        display::print_info(&format!("Model: {} (temperature {})", chat.model, chat.temperature));
    }
    display::print_info("Type your messages (/help for commands, Ctrl+C to exit)\n");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        display::print_prompt("You: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/exit" | "/quit" => break,
            "/help" => {
                println!("Special commands:");
                println!("  /new    - Start a new chat");
                println!("  /clear  - Delete all chats and start over");
                println!("  /exit   - Leave the session");
                println!("  /help   - Show this help\n");
                continue;
            }
            "/new" => {
                let chat = app.store.create_new_chat().await?;
                current = chat.id.clone();
                display::print_success(&format!("Started chat {}\n", chat.id));
                continue;
            }
            "/clear" => {
                app.store.clear_chats().await?;
                current = app
                    .store
                    .current_chat_id()
                    .map(str::to_string)
                    .context("No chat available after clearing")?;
                display::print_success("All chats cleared\n");
                continue;
            }
            _ => {}
        }

        display::print_prompt("Assistant: ");
        let reply = assistant
            .reply_with(&mut app.store, &current, input, |delta| {
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            })
            .await;
        println!("\n");

        if let Err(e) = reply {
            display::print_error(&format!("Error: {:#}", e));
            if let Some(message) = app.store.error() {
                display::print_error(message);
            }
        }
    }

    Ok(())
}
