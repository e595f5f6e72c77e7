//! Report rendering for okrlint

use anyhow::Result;
use colored::*;
use okrdeck_core::violation::CellReference;
use okrdeck_core::{Severity, Violation, ViolationScope};
use serde::Serialize;
use std::path::Path;

/// Violation counts by severity
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct Tally {
    total: usize,
    errors: usize,
    warnings: usize,
    info: usize,
}

impl Tally {
    fn of(violations: &[Violation]) -> Self {
        violations.iter().fold(Self::default(), |mut tally, violation| {
            tally.total += 1;
            match violation.severity {
                Severity::Error => tally.errors += 1,
                Severity::Warning => tally.warnings += 1,
                Severity::Info => tally.info += 1,
            }
            tally
        })
    }
}

/// Outline position of a violation in the human report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Heading<'a> {
    Workbook,
    Sheet(&'a str),
    Cell(&'a str, CellReference),
}

impl<'a> Heading<'a> {
    fn of(scope: &'a ViolationScope) -> Self {
        match scope {
            ViolationScope::Book => Heading::Workbook,
            ViolationScope::Sheet(sheet) => Heading::Sheet(sheet),
            ViolationScope::Cell(sheet, cell) => Heading::Cell(sheet, *cell),
        }
    }

    fn sheet(self) -> Option<&'a str> {
        match self {
            Heading::Workbook => None,
            Heading::Sheet(sheet) | Heading::Cell(sheet, _) => Some(sheet),
        }
    }

    fn indent(self) -> &'static str {
        match self {
            Heading::Cell(..) => "    ",
            _ => "  ",
        }
    }
}

/// Print violations as an outline: workbook, then each sheet with its cells.
///
/// Walks the violations in their natural order and opens a heading whenever
/// the scope changes.
pub fn print_human(file_path: &Path, violations: &[Violation]) {
    println!("{}", format!("Checking: {}", file_path.display()).bold());
    println!();

    if violations.is_empty() {
        println!("{}", "✓ Workbook matches the dashboard layout".green().bold());
        return;
    }

    let mut ordered: Vec<&Violation> = violations.iter().collect();
    ordered.sort();

    let mut current: Option<Heading> = None;
    for violation in ordered {
        let heading = Heading::of(&violation.scope);
        if current != Some(heading) {
            open_heading(current, heading);
            current = Some(heading);
        }
        println!(
            "{}{} [{}] {}",
            heading.indent(),
            severity_tag(violation.severity),
            violation.check_id.bright_black(),
            violation.message
        );
    }
    println!();

    let tally = Tally::of(violations);
    println!("{}", "Summary:".bold().underline());
    let lines = [
        ("Errors:", tally.errors, Color::Red),
        ("Warnings:", tally.warnings, Color::Yellow),
        ("Info:", tally.info, Color::Blue),
    ];
    for (label, count, color) in lines {
        if count > 0 {
            println!("  {} {}", label.color(color).bold(), count);
        }
    }
}

fn open_heading(previous: Option<Heading>, next: Heading) {
    let previous_sheet = previous.and_then(Heading::sheet);
    let same_sheet = previous_sheet.is_some() && previous_sheet == next.sheet();
    if previous.is_some() && !same_sheet {
        println!();
    }

    match next {
        Heading::Workbook => println!("{}", "Workbook:".bold().underline()),
        Heading::Sheet(sheet) => println!("{} {}", "Sheet:".bold(), sheet.cyan().bold()),
        Heading::Cell(sheet, cell) => {
            if !same_sheet {
                println!("{} {}", "Sheet:".bold(), sheet.cyan().bold());
            }
            println!("  {} {}", "Cell:".bold(), cell.to_string().yellow());
        }
    }
}

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warning => "WARN".yellow().bold(),
        Severity::Info => "INFO".blue().bold(),
    }
}

/// Print violations in JSON format
pub fn print_json(file_path: &Path, violations: &[Violation]) -> Result<()> {
    let output = serde_json::json!({
        "file": file_path.display().to_string(),
        "violations": violations,
        "summary": Tally::of(violations),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
