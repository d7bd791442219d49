//! Block tree reconstruction and tag lookup.
//!
//! # Responsibility
//! - Rebuild the nested block hierarchy from the flat tag list using the
//!   block start/end control tags.
//! - Provide the lookup primitives (`find_tag`, `find_blocks`) every domain
//!   reader is built on.
//!
//! # Invariants
//! - Node 0 is the implicit root (`FIFFB_ROOT`) and encloses the whole stream.
//! - Every start tag has exactly one matching end tag at the same depth.
//! - The tree is immutable once built.

use crate::constants::{FIFFB_ROOT, FIFF_BLOCK_END, FIFF_BLOCK_START, FIFFT_INT};
use crate::error::{FiffResult, FormatError};
use crate::tag::{read_value, Tag, TagValue};
use std::io::{Read, Seek};

/// Index of a block in its [`BlockTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One block: its kind, its direct tags and its child blocks, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    pub kind: i32,
    pub parent: Option<BlockId>,
    pub tags: Vec<Tag>,
    pub children: Vec<BlockId>,
}

impl BlockNode {
    fn new(kind: i32, parent: Option<BlockId>) -> Self {
        Self {
            kind,
            parent,
            tags: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Arena of blocks; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTree {
    nodes: Vec<BlockNode>,
}

impl BlockTree {
    pub fn root(&self) -> BlockId {
        BlockId(0)
    }

    /// Returns the node for `id`.
    ///
    /// Ids only come from this tree, so indexing cannot go out of bounds.
    pub fn block(&self, id: BlockId) -> &BlockNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nesting depth of `id`; the root is at depth 0.
    pub fn depth(&self, id: BlockId) -> usize {
        let mut depth = 0;
        let mut current = self.block(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.block(parent).parent;
        }
        depth
    }

    /// First direct tag of `block` with `kind`.
    pub fn find_tag(&self, block: BlockId, kind: i32) -> Option<&Tag> {
        self.block(block).tags.iter().find(|tag| tag.kind == kind)
    }

    /// All direct tags of `block` with `kind`, in stream order.
    pub fn find_tags(&self, block: BlockId, kind: i32) -> impl Iterator<Item = &Tag> + '_ {
        self.block(block)
            .tags
            .iter()
            .filter(move |tag| tag.kind == kind)
    }

    /// Direct child blocks of `parent` with `kind`, in stream order.
    pub fn find_blocks(&self, parent: BlockId, kind: i32) -> Vec<BlockId> {
        self.block(parent)
            .children
            .iter()
            .copied()
            .filter(|child| self.block(*child).kind == kind)
            .collect()
    }

    /// `node` and all its descendants with `kind`, in pre-order.
    pub fn find_blocks_recursive(&self, node: BlockId, kind: i32) -> Vec<BlockId> {
        let mut found = Vec::new();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if self.block(current).kind == kind {
                found.push(current);
            }
            pending.extend(self.block(current).children.iter().rev().copied());
        }
        found
    }

    /// Pre-order walk yielding every block with its depth.
    pub fn walk(&self) -> Vec<(BlockId, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut pending = vec![(self.root(), 0usize)];
        while let Some((current, depth)) = pending.pop() {
            out.push((current, depth));
            for child in self.block(current).children.iter().rev() {
                pending.push((*child, depth + 1));
            }
        }
        out
    }
}

/// Builds the block tree for `tags`, reading control-tag payloads from `stream`.
pub fn build_tree<R: Read + Seek>(stream: &mut R, tags: &[Tag]) -> FiffResult<BlockTree> {
    let mut nodes = vec![BlockNode::new(FIFFB_ROOT, None)];
    let mut stack = vec![BlockId(0)];

    for tag in tags {
        match tag.kind {
            FIFF_BLOCK_START => {
                let kind = read_block_kind(stream, tag)?;
                let parent = current(&stack);
                let id = BlockId(nodes.len());
                nodes.push(BlockNode::new(kind, Some(parent)));
                nodes[parent.0].children.push(id);
                stack.push(id);
            }
            FIFF_BLOCK_END => {
                let kind = read_block_kind(stream, tag)?;
                if stack.len() == 1 {
                    return Err(FormatError::UnexpectedBlockEnd {
                        offset: tag.pos,
                        kind,
                    }
                    .into());
                }
                let open = nodes[current(&stack).0].kind;
                if open != kind {
                    return Err(FormatError::BlockMismatch {
                        offset: tag.pos,
                        open,
                        found: kind,
                    }
                    .into());
                }
                stack.pop();
            }
            _ => nodes[current(&stack).0].tags.push(*tag),
        }
    }

    if stack.len() > 1 {
        let open = current(&stack);
        return Err(FormatError::UnclosedBlock {
            kind: nodes[open.0].kind,
            depth: stack.len() - 1,
        }
        .into());
    }

    Ok(BlockTree { nodes })
}

fn current(stack: &[BlockId]) -> BlockId {
    stack.last().copied().unwrap_or(BlockId(0))
}

fn read_block_kind<R: Read + Seek>(stream: &mut R, tag: &Tag) -> FiffResult<i32> {
    if tag.type_code != FIFFT_INT || tag.size != 4 {
        return Err(FormatError::TypeMismatch {
            kind: tag.kind,
            expected: "single int block kind",
            type_code: tag.type_code,
        }
        .into());
    }
    match read_value(stream, tag)? {
        TagValue::Int(values) if values.len() == 1 => Ok(values[0]),
        _ => Err(FormatError::TypeMismatch {
            kind: tag.kind,
            expected: "single int block kind",
            type_code: tag.type_code,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::build_tree;
    use crate::constants::{FIFFB_ROOT, FIFF_BLOCK_END, FIFF_BLOCK_START, FIFF_NCHAN};
    use crate::dir::scan_directory;
    use crate::error::{FiffError, FormatError};
    use crate::tag::{write_sequential, TagValue};
    use std::io::Cursor;

    fn stream_of(tags: &[(i32, i32)]) -> Cursor<Vec<u8>> {
        let mut stream = Cursor::new(Vec::new());
        for (kind, value) in tags {
            write_sequential(&mut stream, *kind, &TagValue::Int(vec![*value])).unwrap();
        }
        stream
    }

    fn build(tags: &[(i32, i32)]) -> Result<super::BlockTree, FiffError> {
        let mut stream = stream_of(tags);
        let directory = scan_directory(&mut stream, 0).unwrap();
        build_tree(&mut stream, &directory)
    }

    #[test]
    fn nests_blocks_and_assigns_direct_tags() {
        let tree = build(&[
            (FIFF_NCHAN, 60),
            (FIFF_BLOCK_START, 313),
            (FIFF_NCHAN, 3),
            (FIFF_BLOCK_START, 314),
            (FIFF_NCHAN, 2),
            (FIFF_BLOCK_END, 314),
            (FIFF_BLOCK_START, 314),
            (FIFF_BLOCK_END, 314),
            (FIFF_BLOCK_END, 313),
        ])
        .unwrap();

        let root = tree.root();
        assert_eq!(tree.block(root).kind, FIFFB_ROOT);
        assert_eq!(tree.block(root).tags.len(), 1);

        let proj = tree.find_blocks(root, 313);
        assert_eq!(proj.len(), 1);
        assert_eq!(tree.depth(proj[0]), 1);
        let items = tree.find_blocks(proj[0], 314);
        assert_eq!(items.len(), 2);
        assert_eq!(tree.block(items[0]).tags.len(), 1);
        assert!(tree.block(items[1]).tags.is_empty());
        assert!(tree.find_blocks(root, 314).is_empty());
        assert_eq!(tree.find_blocks_recursive(root, 314), items);
        assert_eq!(tree.walk().len(), 4);
    }

    #[test]
    fn premature_end_is_rejected() {
        let err = build(&[(FIFF_BLOCK_END, 313)]).unwrap_err();
        assert!(matches!(
            err,
            FiffError::Format(FormatError::UnexpectedBlockEnd { kind: 313, .. })
        ));
    }

    #[test]
    fn mismatched_end_is_rejected() {
        let err = build(&[
            (FIFF_BLOCK_START, 313),
            (FIFF_BLOCK_START, 314),
            (FIFF_BLOCK_END, 313),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            FiffError::Format(FormatError::BlockMismatch {
                open: 314,
                found: 313,
                ..
            })
        ));
    }

    #[test]
    fn unclosed_block_is_rejected() {
        let err = build(&[(FIFF_BLOCK_START, 313), (FIFF_BLOCK_START, 314)]).unwrap_err();
        assert!(matches!(
            err,
            FiffError::Format(FormatError::UnclosedBlock {
                kind: 314,
                depth: 2
            })
        ));
    }

    #[test]
    fn control_tag_must_hold_one_int() {
        let mut stream = Cursor::new(Vec::new());
        write_sequential(&mut stream, FIFF_BLOCK_START, &TagValue::Int(vec![313, 314])).unwrap();
        let directory = scan_directory(&mut stream, 0).unwrap();
        let err = build_tree(&mut stream, &directory).unwrap_err();
        assert!(matches!(
            err,
            FiffError::Format(FormatError::TypeMismatch { .. })
        ));
    }
}
