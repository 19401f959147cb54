/// Greedy character-granularity line wrap.
///
/// Returns the whole string as one line when it fits. Otherwise characters are appended one at a
/// time and a new line starts whenever the next character would push the current line past
/// `max_width`. A character wider than `max_width` on its own still occupies a line.
///
/// Breaking on characters rather than words keeps scripts without inter-word spaces wrappable.
/// Concatenating the returned lines reproduces `text` exactly.
pub fn wrap_text<F>(text: &str, max_width: f32, mut measure: F) -> Vec<String>
where
    F: FnMut(&str) -> f32,
{
    if measure(text) <= max_width {
        return vec![text.to_owned()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut candidate = String::new();
    for ch in text.chars() {
        candidate.clear();
        candidate.push_str(&current);
        candidate.push(ch);
        if !current.is_empty() && measure(&candidate) > max_width {
            lines.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            std::mem::swap(&mut current, &mut candidate);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
#[path = "../../tests/unit/text/wrap.rs"]
mod tests;
