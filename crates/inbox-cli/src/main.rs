//! `inbox` — command-line client for the inbox JSON API.
//!
//! # Usage
//!
//! ```text
//! inbox send norbert "hello" --from albert
//! inbox read norbert
//! inbox read norbert --all
//! inbox read norbert --page 1 --page-size 20
//! inbox delete norbert 3 4 5
//! ```

mod client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ReadMode};
use inbox_core::message::{Message, MessageId};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "inbox", version, about = "Command-line client for the inbox service")]
struct Args {
  /// Path to a TOML config file (`url = "..."`).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the inbox server (default: http://localhost:8080).
  #[arg(long, env = "INBOX_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Post a message to a user's inbox.
  Send {
    /// Recipient user id.
    target: String,
    text:   String,
    /// Sender user id.
    #[arg(long = "from")]
    sender: String,
  },
  /// Fetch messages addressed to a user. Without flags, only messages that
  /// arrived since the last read are returned.
  Read {
    user: String,
    /// Return the full history instead of only new messages.
    #[arg(long)]
    all:       bool,
    /// Zero-based page of the full history (implies --all).
    #[arg(long)]
    page:      Option<u32>,
    /// Page size (implies --all; defaults to 10 on the server).
    #[arg(long)]
    page_size: Option<u32>,
  },
  /// Delete messages from a user's inbox.
  Delete {
    user: String,
    #[arg(required = true)]
    ids:  Vec<i64>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| DEFAULT_URL.to_string());
  tracing::debug!(%base_url, "resolved server URL");

  let client = ApiClient::new(base_url)?;

  match args.command {
    Command::Send { target, text, sender } => {
      let message = client.send(&sender, &target, &text).await?;
      println!("{}", format_message(&message));
    }
    Command::Read { user, all, page, page_size } => {
      let mode = read_mode(all, page, page_size);
      for message in client.read(&user, mode).await? {
        println!("{}", format_message(&message));
      }
    }
    Command::Delete { user, ids } => {
      let ids: Vec<MessageId> = ids.into_iter().map(MessageId).collect();
      let deleted = client.delete(&user, &ids).await?;
      println!("deleted {deleted}");
    }
  }

  Ok(())
}

fn read_mode(all: bool, page: Option<u32>, page_size: Option<u32>) -> ReadMode {
  if page.is_some() || page_size.is_some() {
    ReadMode::Page { page, page_size }
  } else if all {
    ReadMode::All
  } else {
    ReadMode::New
  }
}

fn format_message(m: &Message) -> String {
  format!(
    "#{} [{}] {}: {}",
    m.id,
    m.sent_time.format("%Y-%m-%d %H:%M:%S"),
    m.sender,
    m.text
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_flags_imply_history() {
    assert_eq!(read_mode(false, None, None), ReadMode::New);
    assert_eq!(read_mode(true, None, None), ReadMode::All);
    assert_eq!(
      read_mode(false, None, Some(5)),
      ReadMode::Page { page: None, page_size: Some(5) }
    );
  }

  #[test]
  fn args_parse_subcommands() {
    let args = Args::try_parse_from([
      "inbox", "--url", "http://h:1", "send", "norbert", "hi", "--from", "albert",
    ])
    .unwrap();
    assert_eq!(args.url.as_deref(), Some("http://h:1"));
    assert!(matches!(
      args.command,
      Command::Send { ref target, ref sender, .. } if target == "norbert" && sender == "albert"
    ));

    assert!(Args::try_parse_from(["inbox", "delete", "norbert"]).is_err());
  }
}
