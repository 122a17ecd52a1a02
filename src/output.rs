use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::plan::score::Weights;
use crate::plan::{candidates, Plan};
use crate::record::CourseRecord;

/// The single console write of everything scraped.
pub fn print_records(records: &[CourseRecord]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}

pub fn write_records(path: &Path, records: &[CourseRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} courses to {}", records.len(), path.display());
    Ok(())
}

pub fn load_records(path: &Path) -> Result<Vec<CourseRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed ratings in {}", path.display()))
}

pub fn print_plan(plan: Option<&Plan>, size: usize) {
    let Some(plan) = plan else {
        println!("Solver status: Infeasible");
        println!("No optimal solution found.");
        return;
    };

    println!("Solver status: Optimal");
    println!("Objective (Max Score) = {:.2}", plan.total);
    println!("Chosen Specialization: {}", plan.specialization);
    println!("Courses to take ({} total):", size);
    for c in &plan.courses {
        println!(
            "  - {} ({}, score {:.1}, interest {})",
            c.course.course_name, c.course.codes, c.score, c.interest
        );
    }
}

/// Ranked table of courses by planner score.
pub fn print_overview(records: &[CourseRecord], weights: &Weights, limit: usize) {
    for line in overview_lines(records, weights, limit) {
        println!("{}", line);
    }
}

fn overview_lines(records: &[CourseRecord], weights: &Weights, limit: usize) -> Vec<String> {
    let mut rows = candidates(records, weights, &HashMap::new());
    rows.sort_by(|a, b| b.score.total_cmp(&a.score));
    if rows.is_empty() {
        return vec!["No courses with complete ratings.".to_string()];
    }

    let header = format!(
        "{:>3} | {:<40} | {:<12} | {:>6} | {:>5} | {:>5} | {:>7} | {:>6}",
        "#", "Course", "Codes", "Rating", "Diff", "Work", "Reviews", "Score"
    );
    let rule = "-".repeat(header.chars().count());
    let mut lines = vec![header, rule];

    for (i, c) in rows.iter().take(limit).enumerate() {
        let r = c.course;
        lines.push(format!(
            "{:>3} | {:<40} | {:<12} | {:>6} | {:>5} | {:>5} | {:>7} | {:>6.1}",
            i + 1,
            truncate(&r.course_name, 40),
            truncate(&r.codes, 12),
            number(r.rating, 2),
            number(r.difficulty, 2),
            number(r.workload, 1),
            number(r.num_reviews, 0),
            c.score
        ));
    }

    let skipped = records.len() - rows.len();
    lines.push(format!(
        "\n{} courses ranked{}",
        rows.len(),
        if skipped > 0 {
            format!(" | {} left out (duplicate or incomplete)", skipped)
        } else {
            String::new()
        }
    ));
    lines
}

fn number(v: f64, decimals: usize) -> String {
    if v.is_nan() {
        "-".to_string()
    } else {
        format!("{:.*}", decimals, v)
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
