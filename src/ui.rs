use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
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

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {:<16} {}", format!("{key}:").dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", step_label(num, total).blue().bold(), msg);
}

/// `[ 3/14]` - padded so descriptions line up
pub fn step_label(num: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("[{num:>width$}/{total}]")
}

/// Mask a secret for echoing back to the operator
pub fn mask(secret: &str) -> &'static str {
    if secret.is_empty() { "(empty)" } else { "(set)" }
}

/// Print the primer banner
pub fn banner() {
    println!(
        "{}",
        r"
  ██████╗ ██████╗ ██╗███╗   ███╗███████╗██████╗
  ██╔══██╗██╔══██╗██║████╗ ████║██╔════╝██╔══██╗
  ██████╔╝██████╔╝██║██╔████╔██║█████╗  ██████╔╝
  ██╔═══╝ ██╔══██╗██║██║╚██╔╝██║██╔══╝  ██╔══██╗
  ██║     ██║  ██║██║██║ ╚═╝ ██║███████╗██║  ██║
  ╚═╝     ╚═╝  ╚═╝╚═╝╚═╝     ╚═╝╚══════╝╚═╝  ╚═╝
"
        .cyan()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_label_pads_to_total_width() {
        assert_eq!(step_label(3, 14), "[ 3/14]");
        assert_eq!(step_label(14, 14), "[14/14]");
        assert_eq!(step_label(1, 9), "[1/9]");
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(""), "(empty)");
        assert_eq!(mask("hunter2"), "(set)");
    }
}
