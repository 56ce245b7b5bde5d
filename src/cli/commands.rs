use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use clap::{Parser, Subcommand};

use crate::filters::{effective_activity_time, filter_exportable, filter_since};
use crate::indexer::{CancelFlag, ComposerAssociations, ConversationResolver, ResolveOptions};
use crate::models::{NormalizedConversation, Role, SourceTier};
use crate::utils::terminal::{preview_line, sanitize};
use crate::utils::{ExtractorConfig, format_path_with_tilde};

const PREVIEW_CHARS: usize = 72;

#[derive(Parser)]
#[command(name = "composer-history")]
#[command(version = "0.1.0")]
#[command(about = "Recover chat conversations from the editor's local state stores", long_about = None)]
pub struct Cli {
    /// Editor user-data directory (defaults to $CURSOR_USER_DATA_DIR, then the platform config dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Fall back to the global store even when a workspace registry exists but is empty
    #[arg(long, global = true)]
    pub fallback_on_empty_registry: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List known workspaces
    Workspaces,
    /// List conversations of a workspace (matched by folder name or path substring)
    List {
        workspace: String,
        /// Only conversations with assistant replies
        #[arg(long)]
        export: bool,
        /// Only conversations active on or after this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        since: Option<NaiveDate>,
    },
    /// Show the most recently active conversation across all workspaces
    Latest,
    /// Show statistics about the stores
    Stats,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", value, e))
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = &cli.command else {
        println!("Use --help for usage information");
        return Ok(());
    };

    let options = ResolveOptions { empty_registry_is_terminal: !cli.fallback_on_empty_registry, ..Default::default() };
    let config = ExtractorConfig::discover(cli.data_dir.as_deref())
        .context("Failed to locate the editor data directory")?
        .with_options(options);
    let resolver = ConversationResolver::new(&config);

    match command {
        Commands::Workspaces => show_workspaces(&resolver),
        Commands::List { workspace, export, since } => show_conversations(&resolver, workspace, *export, *since),
        Commands::Latest => show_latest(&resolver),
        Commands::Stats => show_stats(&config, &resolver),
    }

    Ok(())
}

fn show_workspaces(resolver: &ConversationResolver) {
    let workspaces = resolver.resolve_workspaces();
    if workspaces.is_empty() {
        println!("No workspaces found");
        return;
    }
    for ws in workspaces {
        println!(
            "{:<28} {:<34} {}",
            sanitize(&ws.display_name),
            sanitize(&ws.storage_id),
            format_path_with_tilde(std::path::Path::new(&sanitize(&ws.folder_path)))
        );
    }
}

fn show_conversations(resolver: &ConversationResolver, workspace: &str, export: bool, since: Option<NaiveDate>) {
    let workspaces = resolver.resolve_workspaces();
    let associations = ComposerAssociations::from_global_store(resolver.global_store(), &workspaces);
    let (mut conversations, report) =
        resolver.resolve_conversations_for_workspace_with_report(workspace, &associations);

    if export {
        conversations = filter_exportable(conversations);
    }
    if let Some(date) = since {
        conversations = filter_since(conversations, date);
    }

    if conversations.is_empty() {
        println!("No conversations found for '{}'", sanitize(workspace));
        return;
    }
    for conversation in &conversations {
        println!("{}", summary_line(conversation));
    }
    println!();
    println!(
        "{} conversations (source: {}, {} records skipped)",
        conversations.len(),
        report.tier.map(tier_label).unwrap_or("none"),
        report.records_skipped
    );
}

fn show_latest(resolver: &ConversationResolver) {
    let Some(conversation) = resolver.resolve_latest_conversation() else {
        println!("No conversations found");
        return;
    };

    println!("{}", summary_line(&conversation));
    for message in &conversation.messages {
        let speaker = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        println!();
        println!("{}:", speaker);
        if !message.text.is_empty() {
            println!("{}", sanitize(&message.text));
        }
        for block in &message.code_blocks {
            let location = block.file_path.as_deref().map(|p| format!(" {}", sanitize(p))).unwrap_or_default();
            println!("  [code: {}{}, {} lines]", sanitize(&block.language), location, block.code.lines().count());
        }
    }
}

fn show_stats(config: &ExtractorConfig, resolver: &ConversationResolver) {
    let workspaces = resolver.resolve_workspaces();
    let associations = ComposerAssociations::from_global_store(&config.global_store, &workspaces);
    let (conversations, report) = resolver.resolve_all_conversations(&associations, &CancelFlag::new());

    let messages: usize = conversations.iter().map(|c| c.messages.len()).sum();
    let metadata_only = conversations.iter().filter(|c| c.is_metadata_only()).count();
    let latest = resolver.resolve_latest_conversation();

    println!("Composer History Statistics");
    println!("===========================");
    println!("Workspaces: {}", workspaces.len());
    println!("Conversations: {}", conversations.len());
    println!("  Metadata only: {}", metadata_only);
    println!("  Messages: {}", messages);
    println!("Records skipped: {}", report.records_skipped);
    println!("Stores failed: {}", report.stores_failed);
    println!();
    println!("Data directory: {}", format_path_with_tilde(&config.user_data_dir));
    if let Some(latest) = latest {
        println!("Latest activity: {}", format_millis(effective_activity_time(&latest)));
    }
}

fn summary_line(conversation: &NormalizedConversation) -> String {
    let name = conversation.name.as_deref().map(|n| preview_line(n, PREVIEW_CHARS));
    let title = name.unwrap_or_else(|| {
        conversation
            .messages
            .iter()
            .find(|m| m.role == Role::User && !m.text.is_empty())
            .map(|m| preview_line(&m.text, PREVIEW_CHARS))
            .unwrap_or_else(|| "(untitled)".to_string())
    });
    format!(
        "{}  {}  {}  [{} messages]",
        format_millis(effective_activity_time(conversation)),
        sanitize(&conversation.id),
        title,
        conversation.messages.len()
    )
}

fn format_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn tier_label(tier: SourceTier) -> &'static str {
    match tier {
        SourceTier::Direct => "direct",
        SourceTier::LocalRegistry => "workspace registry",
        SourceTier::GlobalFallback => "global store",
        SourceTier::GlobalLatest => "global latest",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedMessage;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-02-29"), Ok(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert!(parse_date("2024-02-31").is_err());
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01 00:00");
        assert_eq!(format_millis(1_700_000_000_000), "2023-11-14 22:13");
    }

    #[test]
    fn test_summary_line_uses_first_user_message_when_unnamed() {
        let conv = NormalizedConversation::new("abc", 0, SourceTier::Direct).with_messages(vec![NormalizedMessage {
            role: Role::User,
            text: "How do I\nfix this?".into(),
            code_blocks: Vec::new(),
            timing: None,
        }]);
        let line = summary_line(&conv);
        assert!(line.contains("abc"));
        assert!(line.contains("How do I fix this?"));
        assert!(line.contains("[1 messages]"));
    }

    #[test]
    fn test_summary_line_for_metadata_only() {
        let conv = NormalizedConversation::new("m1", 0, SourceTier::LocalRegistry);
        assert!(summary_line(&conv).contains("(untitled)"));
    }
}
