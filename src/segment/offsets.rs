/// Line table over one document: stripped line text plus the absolute byte
/// offset of each line start. Terminator widths are measured per line, so
/// mixed `\r\n` / `\n` / lone `\r` documents slice without drift.
#[derive(Debug)]
pub struct LineIndex {
    lines: Vec<String>,
    starts: Vec<usize>,
    total_len: usize,
}

impl LineIndex {
    pub fn build(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut lines = Vec::new();
        let mut starts = Vec::new();

        let mut line_start = 0;
        let mut cursor = 0;
        while cursor < bytes.len() {
            match bytes[cursor] {
                b'\n' => {
                    lines.push(text[line_start..cursor].to_string());
                    starts.push(line_start);
                    cursor += 1;
                    line_start = cursor;
                }
                b'\r' => {
                    lines.push(text[line_start..cursor].to_string());
                    starts.push(line_start);
                    cursor += if bytes.get(cursor + 1) == Some(&b'\n') {
                        2
                    } else {
                        1
                    };
                    line_start = cursor;
                }
                _ => cursor += 1,
            }
        }

        if line_start < bytes.len() {
            lines.push(text[line_start..].to_string());
            starts.push(line_start);
        }

        Self {
            lines,
            starts,
            total_len: bytes.len(),
        }
    }

    pub fn line(&self, idx: usize) -> &str {
        self.lines.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn start(&self, idx: usize) -> usize {
        self.starts.get(idx).copied().unwrap_or(self.total_len)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn is_blank(&self, idx: usize) -> bool {
        self.line(idx).trim().is_empty()
    }
}
