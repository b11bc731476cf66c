//! Source excerpts for error output

use crate::ctxfst::ast::range::Position;

/// Format source code context around a diagnostic position
///
/// Shows 2 lines before the position, the line itself with a >> marker, and 2 lines after.
/// All lines are numbered for easy reference.
pub fn format_source_context(source: &str, position: Position) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let error_line = position.line;

    let start_line = error_line.saturating_sub(2);
    let end_line = (error_line + 3).min(lines.len());

    let mut context = String::new();

    for (line_num, line) in lines.iter().enumerate().take(end_line).skip(start_line) {
        let marker = if line_num == error_line { ">>" } else { "  " };
        context.push_str(&format!("{} {:3} | {}\n", marker, line_num + 1, line));
    }

    context
}
