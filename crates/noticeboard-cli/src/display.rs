//! Terminal rendering for notices: one-line bulletin rows, vertical detail
//! cards, and the template catalogue.

use std::fmt::Write;

use noticeboard_core::{Notice, NoticeType};

const KEY_WIDTH: usize = 22;

// ── Public API ──

/// Print the bulletin as one row per notice, newest first.
pub fn print_bulletin(notices: &[Notice]) {
    if notices.is_empty() {
        println!("(bulletin is empty)");
        return;
    }
    for notice in notices {
        println!("{}", format_row(notice));
    }
    println!();
    println!("{} notice(s)", notices.len());
}

/// Print a single notice as a vertical card.
pub fn print_notice_card(notice: &Notice) {
    print!("{}", format_card(notice));
}

/// Print every notice type with its template fields.
pub fn print_templates(kinds: &[NoticeType]) {
    for kind in kinds {
        println!("{} ({})", kind.label(), kind.slug());
        for field in kind.template() {
            match field.tooltip {
                Some(tip) => println!("  {:<KEY_WIDTH$} {}", field.key, tip),
                None => println!("  {}", field.key),
            }
        }
        println!();
    }
}

// ── Formatting ──

pub(crate) fn format_row(notice: &Notice) -> String {
    format!(
        "{}  {}  {}",
        notice.created_date.format("%Y-%m-%d %H:%M"),
        notice.id,
        notice.display_title()
    )
}

pub(crate) fn format_card(notice: &Notice) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", notice.display_title());
    let _ = writeln!(out, "  {:<KEY_WIDTH$} {}", "id", notice.id);
    let _ = writeln!(out, "  {:<KEY_WIDTH$} {}", "type", notice.kind);
    let _ = writeln!(
        out,
        "  {:<KEY_WIDTH$} {}",
        "created",
        notice.created_date.to_rfc3339()
    );
    let _ = writeln!(out);
    for field in &notice.fields {
        let value = if field.value.is_empty() {
            "-"
        } else {
            field.value.as_str()
        };
        let _ = writeln!(out, "  {:<KEY_WIDTH$} {}", field.key, value);
    }
    out
}
