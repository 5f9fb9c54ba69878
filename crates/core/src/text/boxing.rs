//! Boxed console banners drawn with Unicode box characters

/// Draw a box around `content`.
///
/// Width is measured in characters so non-ASCII hostnames and paths keep the
/// right border aligned.
///
/// ```
/// use codeup_core::text::boxing::banner;
///
/// let boxed = banner("Code Server running at http://h:1/?folder=/w");
/// assert_eq!(boxed.lines().count(), 3);
/// ```
pub fn banner(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let width = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(format!("┌{}┐", "─".repeat(width + 2)));
    for line in lines {
        let pad = width - line.chars().count();
        out.push(format!("│ {}{} │", line, " ".repeat(pad)));
    }
    out.push(format!("└{}┘", "─".repeat(width + 2)));
    out.join("\n")
}

/// The banner announcing the editor URL
pub fn service_banner(url: &str) -> String {
    banner(&format!("Code Server running at {}", url))
}
