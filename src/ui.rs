use colored::Colorize;
use declarative::ExecuteSummary;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

/// Print the counts from an install or teardown
pub fn summary(title: &str, summary: &ExecuteSummary) {
    section(title);
    let rows = [
        ("Components applied", summary.components_applied),
        ("Components destroyed", summary.components_destroyed),
        ("Kustomizations applied", summary.kustomizations_applied),
        ("Kustomizations deleted", summary.kustomizations_deleted),
        ("Ready", summary.waited),
        ("Skipped", summary.skipped),
    ];
    for (key, count) in rows.iter().filter(|(_, count)| *count > 0) {
        kv(key, &count.to_string());
    }
    if summary.total_changes() == 0 && summary.skipped == 0 {
        dim("nothing to do");
    }
}
