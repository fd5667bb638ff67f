use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "Storescope".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "SEO scoring and storefront discovery\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print an indented key/value detail under a step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Colours a score by tier: 70+ green, 40+ yellow, lower red.
pub fn paint_score(value: &str) -> String {
    match value.trim().parse::<f64>() {
        Ok(score) if score >= 70.0 => value.bright_green().bold().to_string(),
        Ok(score) if score >= 40.0 => value.bright_yellow().bold().to_string(),
        Ok(_) => value.bright_red().bold().to_string(),
        Err(_) => value.dimmed().to_string(),
    }
}

/// Adds terminal colours to a plain text report.
///
/// Underlined `===` headings become bold, `Label:` prefixes are dimmed and
/// score values are coloured with [`paint_score`].
pub fn colorize_report(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let underlined = lines.get(i + 1).is_some_and(|next| !next.is_empty() && next.chars().all(|c| c == '='));
        if underlined {
            out.push(line.bold().bright_white().to_string());
            continue;
        }
        if !line.is_empty() && line.chars().all(|c| c == '=') {
            out.push(line.dimmed().to_string());
            continue;
        }

        match line.split_once(':') {
            Some((label, value)) if is_label(label) => {
                let value = if label == "SEO score" || label == "PageSpeed" {
                    let trimmed = value.trim_start();
                    let pad = &value[..value.len() - trimmed.len()];
                    format!("{}{}", pad, paint_score(trimmed))
                } else {
                    value.to_string()
                };
                out.push(format!("{}{}", format!("{}:", label).dimmed(), value));
            }
            _ => out.push(line.to_string()),
        }
    }

    out.join("\n")
}

/// Report labels are short capitalized words at the start of the line.
fn is_label(label: &str) -> bool {
    label.starts_with(|c: char| c.is_ascii_uppercase())
        && label.len() <= 20
        && label.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_paint_score_keeps_text() {
        for value in ["91.00", "55.10", "12.00", "n/a"] {
            let painted = paint_score(value);
            assert!(painted.contains(value));
            assert!(painted.starts_with("\u{1b}["));
        }
    }

    #[test]
    fn test_colorize_keeps_content() {
        let text = "https://a.example\n=================\nSEO score:           72.00\nKeywords:            rings, gold";
        let colored = colorize_report(text);

        assert_eq!(colored.lines().count(), 4);
        assert!(colored.contains("72.00"));
        assert!(colored.contains("rings, gold"));
        assert!(colored.contains("https://a.example"));
    }

    #[test]
    fn test_urls_are_not_labels() {
        assert!(!is_label("https"));
        assert!(is_label("SEO score"));
        assert!(!is_label("   trending"));
    }
}
