use crate::core::chat::{Chat, Role};
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
}

/// One line per chat: marker for the current chat, id, title, message count
pub fn chat_summary(chat: &Chat, is_current: bool) -> String {
    let marker = if is_current { "*" } else { " " };
    format!(
        "{} {}  {}  ({} messages, {})",
        marker,
        chat.id,
        chat.title,
        chat.messages.len(),
        chat.created_at
    )
}

pub fn print_chat_summary(chat: &Chat, is_current: bool) {
    let line = chat_summary(chat, is_current);
    if is_current {
        println!("{}", line.bold());
    } else {
        println!("{}", line);
    }
}

pub fn print_transcript(chat: &Chat) {
    print_header(&chat.title);
    for message in &chat.messages {
        let label = match message.role {
            Role::User => "You".yellow().bold(),
            Role::Assistant => "Assistant".blue().bold(),
        };
        println!("{}: {}\n", label, message.content);
    }
}
