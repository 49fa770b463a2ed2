use crate::reconcile::{DELETE_SENTINEL, Mode};

const NO_HEADER: &[&str] = &[];

const LINE_HEADER: &[&str] = &[
    "// Edit the file names below, then save and close the editor.",
    "// Changing a line renames its file; prefix a line with \"//\" to delete the file.",
    "// Do not add, remove or reorder lines. These header lines are ignored.",
];

const DIFF_HEADER: &[&str] = &[
    "// Edit the file names below, then save and close the editor.",
    "// Changing a line renames its file; removing a line deletes the file.",
    "// Added lines are ignored. These header lines are ignored too.",
];

/// Renders a file list as editable text and parses it back.
///
/// The header is owned here so the number of lines written and the number
/// stripped can never disagree.
#[derive(Debug, Clone, Copy)]
pub struct Framing {
    header: &'static [&'static str],
}

impl Framing {
    pub fn new(show_header: bool, mode: Mode) -> Self {
        let header = match (show_header, mode) {
            (false, _) => NO_HEADER,
            (true, Mode::Line) => LINE_HEADER,
            (true, Mode::Diff) => DIFF_HEADER,
        };
        Self { header }
    }

    pub fn header_len(&self) -> usize {
        self.header.len()
    }

    pub fn frame(&self, files: &[String]) -> String {
        let mut text = String::new();
        for line in self.header.iter().copied().chain(files.iter().map(String::as_str)) {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    // a damaged header shifts every file line; line mode reports the count mismatch
    pub fn unframe(&self, text: &str) -> Vec<String> {
        text.lines()
            .skip(self.header.len())
            .map(str::to_string)
            .collect()
    }

    pub fn header_intact(&self, text: &str) -> bool {
        let mut lines = text.lines();
        (0..self.header.len()).all(|_| {
            lines
                .next()
                .map(|line| line.starts_with(DELETE_SENTINEL))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn frame_without_header_is_one_name_per_line() {
        let framing = Framing::new(false, Mode::Line);
        assert_eq!(framing.frame(&files(&["a.jpg", "b.jpg"])), "a.jpg\nb.jpg\n");
        assert_eq!(framing.header_len(), 0);
    }

    #[test]
    fn header_is_stripped_by_unframe() {
        let framing = Framing::new(true, Mode::Line);
        let list = files(&["a.jpg", "dir/b.jpg"]);
        let text = framing.frame(&list);
        assert!(text.starts_with("// "));
        assert_eq!(text.lines().count(), framing.header_len() + list.len());
        assert_eq!(framing.unframe(&text), list);
        assert!(framing.header_intact(&text));
    }

    #[test]
    fn unframe_accepts_crlf_and_missing_final_newline() {
        let framing = Framing::new(false, Mode::Line);
        assert_eq!(framing.unframe("a\r\nb"), files(&["a", "b"]));
    }

    #[test]
    fn deleted_header_line_shifts_the_file_lines() {
        let framing = Framing::new(true, Mode::Line);
        let list = files(&["a.jpg", "b.jpg"]);
        let text = framing.frame(&list);
        let damaged: String = text.lines().skip(1).map(|line| format!("{line}\n")).collect();
        assert_eq!(framing.unframe(&damaged), files(&["b.jpg"]));
        assert!(!framing.header_intact(&damaged));
    }

    #[test]
    fn headers_have_the_same_length_in_both_modes() {
        assert_eq!(
            Framing::new(true, Mode::Line).header_len(),
            Framing::new(true, Mode::Diff).header_len()
        );
    }
}
