//! List grouping pass.
//!
//! The block parser emits one block per list item. Renderers call
//! [`group_blocks`] to merge consecutive items of the same kind back into a
//! single list, so the HTML preview and the PPTX export group identically.

use crate::types::{Block, BlockKind};

/// A block to render on its own, or a run of list items.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderUnit<'a> {
    Single(&'a Block),
    List {
        ordered: bool,
        items: Vec<&'a Block>,
    },
}

impl<'a> RenderUnit<'a> {
    /// First number of an ordered list (`start` metadata, default 1).
    pub fn list_start(&self) -> u64 {
        match self {
            RenderUnit::List { items, .. } => items
                .first()
                .and_then(|b| b.metadata.get("start"))
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(1),
            RenderUnit::Single(_) => 1,
        }
    }
}

/// Group consecutive same-kind list items.
pub fn group_blocks<'a, I>(blocks: I) -> Vec<RenderUnit<'a>>
where
    I: IntoIterator<Item = &'a Block>,
{
    let mut units: Vec<RenderUnit<'a>> = Vec::new();
    for block in blocks {
        if !block.kind.is_list_item() {
            units.push(RenderUnit::Single(block));
            continue;
        }
        let ordered = block.kind == BlockKind::NumberedItem;
        // A nested item joins the open list whatever its kind.
        let joins = match units.last() {
            Some(RenderUnit::List {
                ordered: open_ordered,
                items,
            }) => *open_ordered == ordered || (block.list_level() > 0 && !items.is_empty()),
            _ => false,
        };
        if joins {
            if let Some(RenderUnit::List { items, .. }) = units.last_mut() {
                items.push(block);
            }
        } else {
            units.push(RenderUnit::List {
                ordered,
                items: vec![block],
            });
        }
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: BlockKind, text: &str, level: usize) -> Block {
        Block::new(kind, text).with_meta("level", level)
    }

    #[test]
    fn test_consecutive_items_group() {
        let blocks = vec![
            Block::new(BlockKind::Heading1, "T"),
            item(BlockKind::BulletItem, "a", 0),
            item(BlockKind::BulletItem, "b", 0),
            item(BlockKind::NumberedItem, "1", 0),
            Block::new(BlockKind::Paragraph, "p"),
            item(BlockKind::BulletItem, "c", 0),
        ];
        let units = group_blocks(&blocks);
        assert_eq!(units.len(), 5);
        match &units[1] {
            RenderUnit::List { ordered, items } => {
                assert!(!ordered);
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected list, got {:?}", other),
        }
        assert!(matches!(units[2], RenderUnit::List { ordered: true, .. }));
    }

    #[test]
    fn test_nested_items_of_other_kind_stay_in_list() {
        let blocks = vec![
            item(BlockKind::BulletItem, "a", 0),
            item(BlockKind::NumberedItem, "a.1", 1),
            item(BlockKind::BulletItem, "b", 0),
        ];
        let units = group_blocks(&blocks);
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn test_list_start() {
        let blocks = vec![Block::new(BlockKind::NumberedItem, "x").with_meta("start", 4u64)];
        let units = group_blocks(&blocks);
        assert_eq!(units[0].list_start(), 4);
    }
}
