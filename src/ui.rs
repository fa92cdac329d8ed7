use colored::Colorize;
use membership::{OperationKind, Summary};

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

/// Print one planned operation
pub fn operation(kind: OperationKind, member_id: &str) {
    let symbol = match kind {
        OperationKind::CreateUser | OperationKind::CreateGroup => "+".green(),
        OperationKind::UpdateUser => "~".yellow(),
        OperationKind::DeleteUser | OperationKind::DeleteGroup => "-".red(),
    };
    println!("  {symbol} {kind} {member_id}");
}

/// Print the counts of a finished pass
pub fn summary(summary: &Summary) {
    if summary.created > 0 {
        println!("    • {} assignments created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} assignments updated", summary.updated);
    }
    if summary.removed > 0 {
        println!("    • {} assignments removed", summary.removed);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "operations".red());
    }
}
