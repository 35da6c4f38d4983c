//! Block-level pruning of boilerplate markdown
//!
//! A block is a run of lines between blank lines. Blocks that are too short
//! or mostly markup (link farms, badge rows, breadcrumb trails) are dropped.
//! Headings survive only when something below them survives.

use super::plaintext::{markdown_to_text, word_count};

/// Whether a block is a markdown heading line
fn is_heading(block: &str) -> bool {
    let trimmed = block.trim_start();
    trimmed.starts_with('#') && !trimmed.contains('\n')
}

/// Ratio of readable characters to raw block characters
fn text_density(block: &str) -> f64 {
    let raw = block.chars().filter(|c| !c.is_whitespace()).count();
    if raw == 0 {
        return 0.0;
    }
    let text = markdown_to_text(block);
    let readable = text.chars().filter(|c| !c.is_whitespace()).count();
    readable as f64 / raw as f64
}

/// Split on blank lines, keeping fenced code blocks intact
fn split_blocks(markdown: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if line.trim().is_empty() && !in_fence {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}

/// Drop blocks with fewer than `word_threshold` words or a text density
/// below `density_threshold`.
///
/// Code fences count by their raw words and skip the density check, since
/// stripping them to plain text would always read as zero density.
#[must_use]
pub fn prune_markdown(markdown: &str, word_threshold: usize, density_threshold: f64) -> String {
    let blocks = split_blocks(markdown);
    let mut keep = vec![false; blocks.len()];

    for (i, block) in blocks.iter().enumerate() {
        if is_heading(block) {
            continue;
        }
        keep[i] = if block.trim_start().starts_with("```") {
            word_count(block) >= word_threshold
        } else {
            word_count(&markdown_to_text(block)) >= word_threshold
                && text_density(block) >= density_threshold
        };
    }

    // Walk backwards so a heading sees whether its section kept anything
    let mut section_has_content = false;
    for i in (0..blocks.len()).rev() {
        if is_heading(&blocks[i]) {
            keep[i] = section_has_content;
            section_has_content = false;
        } else if keep[i] {
            section_has_content = true;
        }
    }

    blocks
        .into_iter()
        .zip(keep)
        .filter_map(|(block, kept)| kept.then_some(block))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_short_and_link_heavy_blocks() {
        let md = "Home\n\n[a](https://x.example/a) [b](https://x.example/b) [c](https://x.example/c)\n\nThis paragraph carries the actual article text for readers.";
        let pruned = prune_markdown(md, 3, 0.5);
        assert_eq!(pruned, "This paragraph carries the actual article text for readers.");
    }

    #[test]
    fn heading_without_body_is_removed() {
        let md = "# Kept\n\nEnough words live in this section body.\n\n## Empty\n\nok";
        let pruned = prune_markdown(md, 3, 0.3);
        assert_eq!(pruned, "# Kept\n\nEnough words live in this section body.");
    }

    #[test]
    fn fenced_code_is_one_block() {
        let md = "```\nlet a = 1;\n\nlet b = 2;\n```";
        assert_eq!(split_blocks(md).len(), 1);
        assert_eq!(prune_markdown(md, 3, 0.9), md);
    }

    #[test]
    fn zero_thresholds_keep_everything() {
        let md = "# H\n\none\n\ntwo";
        assert_eq!(prune_markdown(md, 0, 0.0), md);
    }
}
