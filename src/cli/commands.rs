use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "parley")]
#[command(author, version, about = "Local chat client with durable conversation history", long_about = None)]
pub struct Cli {
    /// Override the configured locale (zh-CN, en-US, ug-CN)
    #[arg(long, global = true)]
    pub locale: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List stored chats, most recent first
    List,

    /// Create a new chat and print its id
    New,

    /// Print the messages of a chat (default: the current chat)
    Show {
        chat_id: Option<String>,
    },

    /// Rename a chat
    Rename {
        chat_id: String,
        title: String,
    },

    /// Delete a chat
    Delete {
        chat_id: String,
    },

    /// Delete every chat and start over with a fresh one
    Clear,

    /// Start an interactive chat session
    Chat {
        /// Chat to continue (default: the current chat)
        #[arg(short = 'c', long)]
        chat_id: Option<String>,

        /// Model for this chat (stored on the chat)
        #[arg(short = 'm', long)]
        model: Option<String>,

        /// Sampling temperature for this chat (stored on the chat)
        #[arg(short = 't', long)]
        temperature: Option<f64>,
    },
}
