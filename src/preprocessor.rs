/// Strips `--` line comments and normalises line endings.
///
/// Every input line yields exactly one output line terminated by `\n`, so the
/// last statement always ends with an end-of-line and line numbers survive.
/// A `--` inside a string literal is left alone.
pub fn filter(source: &str) -> String {
    let mut filtered = String::with_capacity(source.len() + 1);
    for line in source.lines() {
        filtered.push_str(strip_comment(line));
        filtered.push('\n');
    }
    filtered
}

fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut chars = line.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => in_string = !in_string,
            '-' if !in_string && matches!(chars.peek(), Some((_, '-'))) => return &line[..i],
            _ => {}
        }
    }
    line
}
