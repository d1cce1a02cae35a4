//! Text normalizer: page-positioned fragments to one reading-order string.
//!
//! PDF text layers report fragments in arbitrary order with bottom-left
//! origin coordinates. Fragments are regrouped into visual lines (Y within a
//! small threshold), lines emitted top to bottom, fragments within a line
//! left to right.

use std::cmp::Ordering;

use super::{Page, PageFragment};

/// Fragments whose Y coordinates differ by less than this share a line.
const LINE_Y_THRESHOLD: f32 = 2.0;

/// Join all pages into a single whitespace-normalized string. Pure function;
/// empty input yields an empty string.
pub fn layout_text(pages: &[Page]) -> String {
    let page_texts: Vec<String> = pages
        .iter()
        .map(|page| page_text(page))
        .filter(|text| !text.is_empty())
        .collect();
    page_texts.join("\n")
}

fn page_text(page: &Page) -> String {
    let mut fragments: Vec<&PageFragment> = page
        .iter()
        .filter(|fragment| !fragment.text.trim().is_empty())
        .collect();
    // Reading order: line descending (top of page first), then X ascending.
    fragments.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal));

    let mut lines: Vec<Vec<&PageFragment>> = Vec::new();
    for fragment in fragments {
        match lines.last_mut() {
            Some(line) if (line[0].y - fragment.y).abs() < LINE_Y_THRESHOLD => {
                line.push(fragment);
            }
            _ => lines.push(vec![fragment]),
        }
    }

    let line_texts: Vec<String> = lines
        .iter_mut()
        .map(|line| {
            line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
            line.iter()
                .map(|fragment| collapse_whitespace(&fragment.text))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    line_texts.join("\n")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(layout_text(&[]), "");
        assert_eq!(layout_text(&[vec![]]), "");
    }

    #[test]
    fn same_line_fragments_join_left_to_right() {
        let page = vec![
            PageFragment::new("pass1", 120.0, 700.0),
            PageFragment::new("jh23", 40.0, 700.5),
        ];
        assert_eq!(layout_text(&[page]), "jh23 pass1");
    }

    #[test]
    fn lines_emit_top_to_bottom() {
        let page = vec![
            PageFragment::new("jh24", 40.0, 650.0),
            PageFragment::new("jh23", 40.0, 700.0),
        ];
        assert_eq!(layout_text(&[page]), "jh23\njh24");
    }

    #[test]
    fn y_delta_below_threshold_stays_on_one_line() {
        let page = vec![
            PageFragment::new("jh23", 40.0, 700.0),
            PageFragment::new("pass1", 120.0, 699.2),
            PageFragment::new("jh24", 40.0, 690.0),
        ];
        assert_eq!(layout_text(&[page]), "jh23 pass1\njh24");
    }

    #[test]
    fn pages_join_with_newline() {
        let first = vec![PageFragment::new("jh23", 40.0, 700.0)];
        let second = vec![PageFragment::new("jh24", 40.0, 700.0)];
        assert_eq!(layout_text(&[first, second]), "jh23\njh24");
    }

    #[test]
    fn fragment_internal_whitespace_collapses() {
        let page = vec![PageFragment::new("  jh23   pass1 ", 40.0, 700.0)];
        assert_eq!(layout_text(&[page]), "jh23 pass1");
    }

    #[test]
    fn blank_fragments_are_dropped() {
        let page = vec![
            PageFragment::new("   ", 10.0, 700.0),
            PageFragment::new("jh23", 40.0, 700.0),
        ];
        assert_eq!(layout_text(&[page]), "jh23");
    }
}
