//! Interactive session: one store for the whole process, driven line by line
//! from stdin. Drafts live in the store's owner task and are lost on exit
//! unless posted.

use std::fmt::Write as _;
use std::io::IsTerminal;

use anyhow::{Context, bail};
use noticeboard_core::{Notice, NoticeType};
use noticeboard_sync::StoreHandle;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::{display, parse_field};

const HELP: &str = "\
commands:
  new <type> KEY=VALUE...   save a draft from the type's template
  drafts                    list drafts with their index
  drop <idx>...             delete drafts by index
  post <idx>                publish a draft to the bulletin
  export <idx>              print a draft's JSON export document
  show <id>                 show a draft or bulletin notice by id
  bulletin                  list the bulletin mirror
  refresh                   fetch the bulletin from the remote store
  help                      show this list
  quit                      leave the session (unposted drafts are lost)
";

#[derive(Debug, PartialEq)]
enum Line {
    New {
        kind: NoticeType,
        fields: Vec<(String, String)>,
    },
    Drafts,
    Drop(Vec<usize>),
    Post(usize),
    Export(usize),
    Show(Uuid),
    Bulletin,
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, PartialEq)]
enum Reply {
    Output(String),
    Quit,
}

// ── Public API ──

/// Read commands from stdin until EOF or `quit`. Command errors are reported
/// and the session carries on.
pub async fn run(store: StoreHandle) -> anyhow::Result<()> {
    let interactive = std::io::stdin().is_terminal();
    let session = Session { store };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if interactive {
        eprintln!("type `help` for commands");
    }

    loop {
        if interactive {
            eprint!("noticeboard> ");
        }
        let Some(line) = lines.next_line().await.context("reading stdin")? else {
            break;
        };
        match session.execute(&line).await {
            Ok(Reply::Output(text)) => print!("{text}"),
            Ok(Reply::Quit) => break,
            Err(e) => eprintln!("error: {e:#}"),
        }
    }

    let left = session.store.drafts().await?.len();
    if left > 0 {
        tracing::warn!(drafts = left, "session ended with unposted drafts");
    }
    Ok(())
}

// ── Execution ──

struct Session {
    store: StoreHandle,
}

impl Session {
    async fn execute(&self, line: &str) -> anyhow::Result<Reply> {
        let Some(command) = parse_line(line).map_err(anyhow::Error::msg)? else {
            return Ok(Reply::Output(String::new()));
        };

        let mut out = String::new();
        match command {
            Line::New { kind, fields } => {
                let mut notice = Notice::from_template(kind);
                for (key, value) in fields {
                    notice.set_field(&key, value);
                }
                if !notice.has_content() {
                    bail!("fill in at least one field before saving");
                }
                let title = notice.display_title();
                self.store.save_draft(notice)?;
                let index = self.store.drafts().await?.len().saturating_sub(1);
                writeln!(out, "saved draft {index}: {title}")?;
            }
            Line::Drafts => {
                let drafts = self.store.drafts().await?;
                if drafts.is_empty() {
                    writeln!(out, "(no drafts)")?;
                }
                for (index, notice) in drafts.iter().enumerate() {
                    writeln!(out, "{index:>3}  {}", display::format_row(notice))?;
                }
            }
            Line::Drop(indices) => {
                self.store.delete_drafts(indices)?;
                let left = self.store.drafts().await?.len();
                writeln!(out, "{left} draft(s) left")?;
            }
            Line::Post(index) => {
                let notice = self.draft_at(index).await?;
                self.store
                    .publish(notice.clone())
                    .await
                    .with_context(|| format!("publishing {}", notice.display_title()))?;
                writeln!(out, "published {}: {}", notice.id, notice.display_title())?;
            }
            Line::Export(index) => {
                let notice = self.draft_at(index).await?;
                writeln!(out, "{}", notice.to_export_json()?)?;
            }
            Line::Show(id) => match self.store.find(id).await? {
                Some(notice) => out.push_str(&display::format_card(&notice)),
                None => bail!("no draft or bulletin notice with id {id}"),
            },
            Line::Bulletin => {
                let notices = self.store.bulletin().await?;
                if notices.is_empty() {
                    writeln!(out, "(bulletin is empty)")?;
                }
                for notice in &notices {
                    writeln!(out, "{}", display::format_row(notice))?;
                }
            }
            Line::Refresh => {
                self.store.refresh().await.context("fetching bulletin")?;
                let count = self.store.bulletin().await?.len();
                writeln!(out, "{count} notice(s) on the bulletin")?;
            }
            Line::Help => out.push_str(HELP),
            Line::Quit => return Ok(Reply::Quit),
        }
        Ok(Reply::Output(out))
    }

    async fn draft_at(&self, index: usize) -> anyhow::Result<Notice> {
        let drafts = self.store.drafts().await?;
        match drafts.into_iter().nth(index) {
            Some(notice) => Ok(notice),
            None => bail!("no draft at index {index}"),
        }
    }
}

// ── Parsing ──

/// `Ok(None)` for a blank line.
fn parse_line(line: &str) -> Result<Option<Line>, String> {
    let words = split_words(line)?;
    let Some((head, args)) = words.split_first() else {
        return Ok(None);
    };

    let parsed = match head.as_str() {
        "new" => {
            let (kind, fields) = args
                .split_first()
                .ok_or("usage: new <type> KEY=VALUE...")?;
            Line::New {
                kind: kind.parse::<NoticeType>().map_err(|e| e.to_string())?,
                fields: fields
                    .iter()
                    .map(|f| parse_field(f))
                    .collect::<Result<_, _>>()?,
            }
        }
        "drafts" => no_args(args, Line::Drafts)?,
        "drop" => {
            if args.is_empty() {
                return Err("usage: drop <idx>...".into());
            }
            Line::Drop(args.iter().map(|a| parse_index(a)).collect::<Result<_, _>>()?)
        }
        "post" => Line::Post(one_index(args, "usage: post <idx>")?),
        "export" => Line::Export(one_index(args, "usage: export <idx>")?),
        "show" => match args {
            [id] => Line::Show(id.parse().map_err(|_| format!("not a notice id: `{id}`"))?),
            _ => return Err("usage: show <id>".into()),
        },
        "bulletin" => no_args(args, Line::Bulletin)?,
        "refresh" => no_args(args, Line::Refresh)?,
        "help" | "?" => Line::Help,
        "quit" | "exit" => Line::Quit,
        other => return Err(format!("unknown command `{other}`, try `help`")),
    };
    Ok(Some(parsed))
}

fn no_args(args: &[String], line: Line) -> Result<Line, String> {
    if args.is_empty() {
        Ok(line)
    } else {
        Err(format!("unexpected arguments: {}", args.join(" ")))
    }
}

fn one_index(args: &[String], usage: &str) -> Result<usize, String> {
    match args {
        [index] => parse_index(index),
        _ => Err(usage.to_string()),
    }
}

fn parse_index(s: &str) -> Result<usize, String> {
    s.parse().map_err(|_| format!("not a draft index: `{s}`"))
}

/// Split on whitespace; double quotes group words and are removed.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote".into());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
