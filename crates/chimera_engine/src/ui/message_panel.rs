use std::collections::VecDeque;

pub const DEFAULT_PANEL_LINES: usize = 64;

/// Chat-style log; the oldest line is evicted once full.
#[derive(Debug, Clone)]
pub struct MessagePanel {
    lines: VecDeque<String>,
    max_lines: usize,
}

impl Default for MessagePanel {
    fn default() -> Self {
        Self::new(DEFAULT_PANEL_LINES)
    }
}

impl MessagePanel {
    pub fn new(max_lines: usize) -> Self {
        let max_lines = max_lines.max(1);
        Self {
            lines: VecDeque::with_capacity(max_lines),
            max_lines,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        push_bounded(&mut self.lines, line.into(), self.max_lines);
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// The newest `count` lines, oldest first, joined for a text widget.
    pub fn render_tail(&self, count: usize) -> String {
        let skip = self.lines.len().saturating_sub(count);
        self.lines
            .iter()
            .skip(skip)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

fn push_bounded(queue: &mut VecDeque<String>, value: String, max_len: usize) {
    if queue.len() == max_len {
        queue.pop_front();
    }
    queue.push_back(value);
}
