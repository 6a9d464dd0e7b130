mod display;
mod session;

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use noticeboard_core::{Notice, NoticeType};
use noticeboard_sync::{HttpDatabase, RemoteDatabase, StoreHandle};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "noticeboard", version, about = "Author, publish, and browse procurement notices")]
struct Cli {
    /// Base URL of the remote record service.
    #[arg(
        long,
        env = "NOTICEBOARD_REMOTE_URL",
        default_value = "http://localhost:4000",
        global = true
    )]
    remote_url: String,

    /// Database (container) holding the shared bulletin.
    #[arg(long, env = "NOTICEBOARD_DATABASE", default_value = "public", global = true)]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List notice types and their form fields
    Templates {
        /// Only show this type (slug or label)
        #[arg(long = "type")]
        kind: Option<NoticeType>,
    },
    /// Show the shared bulletin, newest first
    Bulletin {
        /// Print the export JSON of every notice instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one bulletin notice as a card
    Show { id: Uuid },
    /// Print the JSON export document of one bulletin notice
    Export { id: Uuid },
    /// Fill in a notice from its template and publish it
    Publish {
        /// Notice type (slug or label), e.g. `tender`
        #[arg(long = "type")]
        kind: NoticeType,
        /// Field value as KEY=VALUE; repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Delete a notice from the shared bulletin
    Delete { id: Uuid },
    /// Keep drafts in an interactive session read from stdin
    Session,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("field key is empty in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("noticeboard v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Templates { kind } => {
            let kinds: Vec<NoticeType> = match kind {
                Some(k) => vec![k],
                None => NoticeType::ALL.to_vec(),
            };
            display::print_templates(&kinds);
        }
        Command::Bulletin { json } => {
            let store = connect(&cli.remote_url, &cli.database);
            store.refresh().await.context("fetching bulletin")?;
            let notices = store.bulletin().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&notices)?);
            } else {
                display::print_bulletin(&notices);
            }
        }
        Command::Show { id } => {
            let store = connect(&cli.remote_url, &cli.database);
            let notice = find_published(&store, id).await?;
            display::print_notice_card(&notice);
        }
        Command::Export { id } => {
            let store = connect(&cli.remote_url, &cli.database);
            let notice = find_published(&store, id).await?;
            println!("{}", notice.to_export_json()?);
        }
        Command::Publish { kind, fields } => {
            let mut notice = Notice::from_template(kind);
            for (key, value) in fields {
                notice.set_field(&key, value);
            }
            if !notice.has_content() {
                bail!("fill in at least one field before publishing");
            }

            let store = connect(&cli.remote_url, &cli.database);
            store.save_draft(notice.clone())?;
            store
                .publish(notice.clone())
                .await
                .with_context(|| format!("publishing {}", notice.display_title()))?;
            eprintln!("Published {}", notice.id);
            display::print_notice_card(&notice);
        }
        Command::Delete { id } => {
            let store = connect(&cli.remote_url, &cli.database);
            let notice = find_published(&store, id).await?;
            store
                .delete_from_bulletin(&notice)
                .await
                .with_context(|| format!("deleting {}", notice.display_title()))?;
            eprintln!("Deleted {}", notice.display_title());
        }
        Command::Session => {
            let store = connect(&cli.remote_url, &cli.database);
            session::run(store).await?;
        }
    }

    Ok(())
}

fn connect(remote_url: &str, database: &str) -> StoreHandle {
    let db: Arc<dyn RemoteDatabase> = Arc::new(HttpDatabase::new(
        remote_url.to_string(),
        database.to_string(),
    ));
    noticeboard_sync::connect(db)
}

/// Refresh the bulletin and look `id` up in it.
async fn find_published(store: &StoreHandle, id: Uuid) -> anyhow::Result<Notice> {
    store.refresh().await.context("fetching bulletin")?;
    match store.find(id).await? {
        Some(notice) => Ok(notice),
        None => bail!("no notice with id {id} on the bulletin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_field_splits_on_first_equals() {
        assert_eq!(
            parse_field("Title=A=B").unwrap(),
            ("Title".to_string(), "A=B".to_string())
        );
        assert_eq!(
            parse_field(" Amount =").unwrap(),
            ("Amount".to_string(), String::new())
        );
        assert!(parse_field("Title").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn publish_args_parse_type_and_fields() {
        let cli = Cli::try_parse_from([
            "noticeboard",
            "publish",
            "--type",
            "tender",
            "--field",
            "Title=Acme Roadworks",
            "--field",
            "Deadline=2025-10-01",
        ])
        .unwrap();
        match cli.command {
            Command::Publish { kind, fields } => {
                assert_eq!(kind, NoticeType::Tender);
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].1, "Acme Roadworks");
            }
            _ => panic!("expected publish"),
        }
    }
}
