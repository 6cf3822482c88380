//! Plain-text table rendering.

use std::fmt::Write;

use catcache_core::utils::truncate_string;
use catcache_core::{CacheState, Category, SyncFailure};

/// Longest name shown before truncation.
const NAME_WIDTH: usize = 40;

pub fn render_table(rows: &[Category]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>6}  {:<width$}  {}", "ID", "NAME", "STATUS", width = NAME_WIDTH);

    if rows.is_empty() {
        out.push_str("No categories found.\n");
        return out;
    }

    for category in rows {
        let _ = writeln!(
            out,
            "{:>6}  {:<width$}  {}",
            category.id,
            truncate_string(&category.name, NAME_WIDTH),
            category.effective_status(),
            width = NAME_WIDTH
        );
    }
    out
}

pub fn render_footer(shown: usize, state: &CacheState) -> String {
    let total = state.records().len();
    let noun = if total == 1 { "category" } else { "categories" };
    if shown == total {
        format!("{} {} (synced {})", total, noun, state.age_display())
    } else {
        format!("{} of {} {} (synced {})", shown, total, noun, state.age_display())
    }
}

pub fn render_failure(failure: &SyncFailure) -> String {
    format!("{} failed ({}): {}", failure.operation, failure.kind, failure.message)
}
