//! Lightweight slide splitter for the live preview path.
//!
//! Cheaper than the full SOM: no regions or background resolution, just
//! the blocks of each slide and a title. Boundaries are the document
//! parser's separator blocks, so it always agrees with [`crate::som::build_som`].

use crate::types::{Block, BlockKind, Metadata};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleSlide {
    pub index: usize,
    /// First heading on the slide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub config: Metadata,
    pub blocks: Vec<Block>,
    pub start_index: usize,
    pub end_index: usize,
}

/// Split a flat block stream into slides.
///
/// Column-break markers are layout hints and are dropped, as the SOM drops
/// them when it builds column regions.
pub fn split_slides(blocks: &[Block]) -> Vec<SimpleSlide> {
    let mut slides: Vec<SimpleSlide> = Vec::new();
    let mut implicit = false;

    for block in blocks {
        if block.kind == BlockKind::SlideSeparator {
            slides.push(SimpleSlide {
                index: slides.len(),
                title: None,
                config: block.metadata.clone(),
                blocks: Vec::new(),
                start_index: block.start_index,
                end_index: block.end_index,
            });
            implicit = false;
            continue;
        }

        if slides.is_empty() {
            slides.push(SimpleSlide {
                index: 0,
                title: None,
                config: Metadata::new(),
                blocks: Vec::new(),
                start_index: block.start_index,
                end_index: block.end_index,
            });
            implicit = true;
        }
        if let Some(slide) = slides.last_mut() {
            // Without a separator the span is the blocks' own extent.
            if implicit {
                slide.end_index = slide.end_index.max(block.end_index);
            }
            if block.kind == BlockKind::ColumnBreak {
                continue;
            }
            if slide.title.is_none() && block.kind.is_heading() {
                slide.title = Some(block.content.clone());
            }
            slide.blocks.push(block.clone());
        }
    }

    slides
}
