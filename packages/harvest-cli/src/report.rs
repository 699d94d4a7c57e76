//! Terminal output for harvest runs and stance views.

use anyhow::Result;
use chrono::{Datelike, Utc};
use colored::{ColoredString, Colorize};
use harvester::{HarvestReport, RecordStore, Source, Stance, StanceView};

fn stance_label(stance: Stance) -> ColoredString {
    match stance {
        Stance::Yes => stance.as_str().bright_green().bold(),
        Stance::Uncertain => stance.as_str().bright_yellow().bold(),
        Stance::No => stance.as_str().bright_red().bold(),
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

pub fn print_harvest_summary(report: &HarvestReport) {
    println!();
    println!("{}", "Harvest summary".bright_cyan().bold());
    for outcome in &report.outcomes {
        match &outcome.error {
            None => println!("  {:<10} {} collected", outcome.source, outcome.records),
            Some(error) => println!(
                "  {:<10} {} ({})",
                outcome.source,
                "failed".red(),
                error
            ),
        }
    }
    println!("  Collected: {}", report.collected);
    println!("  Relevant:  {}", report.relevant);
    println!("  Stored:    {}", report.stored.to_string().bright_green());
}

/// Database size, this year's share and per-source counts.
pub async fn print_db_report(store: &dyn RecordStore) -> Result<()> {
    let current_year = Utc::now().year();
    let stored = store.fetch_all().await?;
    let this_year = stored
        .iter()
        .filter(|s| s.record.year() == Some(current_year))
        .count();
    let by_source = store.count_by_source().await?;

    println!();
    println!("{}", "Database report".bright_cyan().bold());
    println!("  Total articles:      {}", stored.len());
    println!("  Published in {current_year}:   {this_year}");
    for source in Source::ALL {
        let count = by_source.get(&source).copied().unwrap_or(0);
        println!("  {:<20} {}", format!("{source}:"), count);
    }
    Ok(())
}

pub fn print_stance_view(view: &StanceView, lexical: bool) {
    if view.is_empty() {
        println!("{}", "No articles match the current filters.".yellow());
        return;
    }

    let total = view.total();
    println!();
    println!(
        "{} {}",
        "Stance distribution".bright_cyan().bold(),
        if lexical {
            "(lexical patterns only)".dimmed()
        } else {
            "(zero-shot + patterns)".dimmed()
        }
    );
    for (stance, count) in &view.distribution {
        println!(
            "  {:<10} {:>5}  {:>5.1}%",
            stance_label(*stance),
            count,
            percent(*count, total)
        );
    }
    println!("  {:<10} {:>5}", "Total", total);

    if !view.by_year.is_empty() {
        println!();
        println!("{}", "By year".bright_cyan().bold());
        let mut current = None;
        for row in &view.by_year {
            if current != Some(row.year) {
                print!("\n  {}:", row.year);
                current = Some(row.year);
            }
            print!("  {} {:.0}%", stance_label(row.stance), row.proportion * 100.0);
        }
        println!();
    }

    for stance in Stance::DISPLAY_ORDER {
        let examples = view.examples_for(stance);
        if examples.is_empty() {
            continue;
        }
        println!();
        println!("{} {}", "Examples:".bright_cyan().bold(), stance_label(stance));
        for row in examples {
            let year = row
                .record
                .year()
                .map(|y| y.to_string())
                .unwrap_or_else(|| "n.d.".to_string());
            println!(
                "  [{:.2}] {} ({}, {})",
                row.stance.confidence, row.record.title, row.record.source, year
            );
            if !row.record.url.is_empty() {
                println!("         {}", row.record.url.dimmed());
            }
        }
    }
}
