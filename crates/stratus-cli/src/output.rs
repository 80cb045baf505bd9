//! Formatted output helpers for CLI commands.

/// A horizontal rule `width` characters wide.
#[must_use]
pub fn rule(width: usize) -> String {
    "\u{2550}".repeat(width)
}

/// Pads `cells` into columns of the given widths, separated by two spaces.
#[must_use]
pub fn row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_has_requested_width() {
        assert_eq!(rule(3).chars().count(), 3);
    }

    #[test]
    fn row_pads_columns() {
        assert_eq!(row(&["web", "Up"], &[6, 4]), "web     Up");
    }
}
