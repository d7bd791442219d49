use fiff_core::constants::{
    FIFFB_MEAS, FIFFB_MEAS_INFO, FIFFB_PROJ, FIFFB_PROJ_ITEM, FIFFB_ROOT, FIFFV_NEXT_NONE,
    FIFF_BLOCK_END, FIFF_BLOCK_START, FIFF_NCHAN, FIFF_NOP,
};
use fiff_core::dir::scan_directory;
use fiff_core::tag::{write_sequential, write_tag};
use fiff_core::tree::build_tree;
use fiff_core::{FiffError, FiffReader, FiffWriter, FileId, FormatError, TagValue, WriterOptions};
use std::io::Cursor;

#[derive(Debug, Clone, Copy)]
enum Control {
    Start(i32),
    End(i32),
}

fn stream_for(sequence: &[Control]) -> Cursor<Vec<u8>> {
    let mut stream = Cursor::new(Vec::new());
    for control in sequence {
        let (kind, block) = match control {
            Control::Start(block) => (FIFF_BLOCK_START, *block),
            Control::End(block) => (FIFF_BLOCK_END, *block),
        };
        write_sequential(&mut stream, kind, &TagValue::Int(vec![block])).unwrap();
    }
    write_tag(&mut stream, FIFF_NOP, &TagValue::Void, FIFFV_NEXT_NONE).unwrap();
    stream
}

fn is_balanced(sequence: &[Control]) -> bool {
    let mut open = Vec::new();
    for control in sequence {
        match control {
            Control::Start(block) => open.push(*block),
            Control::End(block) => {
                if open.pop() != Some(*block) {
                    return false;
                }
            }
        }
    }
    open.is_empty()
}

fn all_sequences(max_len: usize) -> Vec<Vec<Control>> {
    let alphabet = [
        Control::Start(FIFFB_PROJ),
        Control::End(FIFFB_PROJ),
        Control::Start(FIFFB_PROJ_ITEM),
        Control::End(FIFFB_PROJ_ITEM),
    ];
    let mut out = vec![Vec::new()];
    let mut frontier = vec![Vec::new()];
    for _ in 0..max_len {
        let mut next = Vec::new();
        for prefix in &frontier {
            for control in alphabet {
                let mut sequence: Vec<Control> = prefix.clone();
                sequence.push(control);
                next.push(sequence);
            }
        }
        out.extend(next.iter().cloned());
        frontier = next;
    }
    out
}

#[test]
fn tree_builds_exactly_for_balanced_sequences() {
    for sequence in all_sequences(6) {
        let mut stream = stream_for(&sequence);
        let tags = scan_directory(&mut stream, 0).unwrap();
        let result = build_tree(&mut stream, &tags);

        if is_balanced(&sequence) {
            let tree = result.unwrap_or_else(|err| panic!("{sequence:?} rejected: {err}"));
            let starts = sequence
                .iter()
                .filter(|control| matches!(control, Control::Start(_)))
                .count();
            assert_eq!(tree.len(), starts + 1, "{sequence:?}");
        } else {
            let err = match result {
                Ok(_) => panic!("{sequence:?} accepted"),
                Err(err) => err,
            };
            assert!(
                matches!(
                    err,
                    FiffError::Format(
                        FormatError::UnexpectedBlockEnd { .. }
                            | FormatError::BlockMismatch { .. }
                            | FormatError::UnclosedBlock { .. }
                    )
                ),
                "{sequence:?}: {err}"
            );
        }
    }
}

#[test]
fn unclosed_block_reports_innermost_kind_and_depth() {
    let sequence = [
        Control::Start(FIFFB_MEAS),
        Control::Start(FIFFB_PROJ),
        Control::Start(FIFFB_PROJ_ITEM),
        Control::End(FIFFB_PROJ_ITEM),
    ];
    let mut stream = stream_for(&sequence);
    let tags = scan_directory(&mut stream, 0).unwrap();
    let err = build_tree(&mut stream, &tags).unwrap_err();
    assert!(matches!(
        err,
        FiffError::Format(FormatError::UnclosedBlock {
            kind: FIFFB_PROJ,
            depth: 2
        })
    ));
}

#[test]
fn reader_exposes_nested_blocks_and_recursive_search() {
    let mut writer = FiffWriter::new(
        Cursor::new(Vec::new()),
        FileId::generate(),
        WriterOptions::default(),
    )
    .unwrap();
    writer
        .with_block(FIFFB_MEAS, |w| {
            w.with_block(FIFFB_MEAS_INFO, |w| {
                w.write_int(FIFF_NCHAN, 4)?;
                w.with_block(FIFFB_PROJ, |w| w.write_int(FIFF_NCHAN, 2))
            })?;
            w.with_block(FIFFB_PROJ, |_| Ok(()))
        })
        .unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let mut reader = FiffReader::new(Cursor::new(bytes)).unwrap();
    let tree = reader.tree().clone();
    let root = tree.root();
    assert_eq!(tree.block(root).kind, FIFFB_ROOT);
    assert!(tree.find_blocks(root, FIFFB_PROJ).is_empty());

    let meas = tree.find_blocks(root, FIFFB_MEAS);
    assert_eq!(meas.len(), 1);
    let info = tree.find_blocks(meas[0], FIFFB_MEAS_INFO)[0];
    assert_eq!(tree.depth(info), 2);
    assert_eq!(tree.block(info).parent, Some(meas[0]));

    // Pre-order: the nested one inside measurement info comes first.
    let projs = tree.find_blocks_recursive(root, FIFFB_PROJ);
    assert_eq!(projs.len(), 2);
    assert_eq!(tree.block(projs[0]).parent, Some(info));
    assert_eq!(reader.find_int(projs[0], FIFF_NCHAN).unwrap(), Some(2));
    assert_eq!(reader.find_int(info, FIFF_NCHAN).unwrap(), Some(4));
    assert_eq!(reader.find_int(projs[1], FIFF_NCHAN).unwrap(), None);

    let walk: Vec<usize> = tree.walk().into_iter().map(|(_, depth)| depth).collect();
    assert_eq!(walk, vec![0, 1, 2, 3, 2]);
}
