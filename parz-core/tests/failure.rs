mod common;

use common::{dir_entries, write_tagged, ScriptedCodec};
use parz_core::{compress_file, decompress_file, run_with_codec, ChunkError, Config, Operation, ParzError};
use std::io::{Seek, SeekFrom, Write};
use std::sync::atomic::Ordering;

#[test]
fn failing_chunk_aborts_with_its_index_and_leaks_nothing() {
    let td = tempfile::tempdir().unwrap();
    let work = td.path().join("work");
    let scratch = td.path().join("scratch");
    std::fs::create_dir(&work).unwrap();
    std::fs::create_dir(&scratch).unwrap();
    let input = work.join("in.bin");
    let output = work.join("in.parz");
    write_tagged(&input, 5, 4096);

    let cfg = Config {
        workers: 5,
        small_file_threshold: 0,
        memory_limit: 0,
        scratch_dir: Some(scratch.clone()),
        ..Config::default()
    };
    // chunks 3 and 4 are still busy when chunk 2 is drained
    let codec = ScriptedCodec { delays_ms: vec![0, 0, 50, 300, 300], fail_tag: Some(2), ..Default::default() };

    let err = run_with_codec(Operation::Compress, &input, &output, &cfg, &codec).unwrap_err();
    assert_eq!(err.chunk_index(), Some(2));
    match &err {
        ParzError::ChunkFailure { index: 2, source: ChunkError::Codec { codec: "scripted", .. } } => {}
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains('2'));

    assert!(!output.exists());
    assert_eq!(dir_entries(&work), vec!["in.bin".to_string()]);
    assert!(dir_entries(&scratch).is_empty(), "scratch leaked: {:?}", dir_entries(&scratch));
}

#[test]
fn empty_input_fails_before_any_worker() {
    let td = tempfile::tempdir().unwrap();
    let input = td.path().join("empty.bin");
    let output = td.path().join("empty.parz");
    std::fs::write(&input, b"").unwrap();

    let codec = ScriptedCodec::default();
    let err = run_with_codec(Operation::Compress, &input, &output, &Config::default(), &codec).unwrap_err();
    assert!(matches!(err, ParzError::EmptyInput(_)), "{err:?}");
    assert_eq!(codec.calls.load(Ordering::SeqCst), 0);
    assert!(!output.exists());

    let err = decompress_file(&input, &output, &Config::default()).unwrap_err();
    assert!(matches!(err, ParzError::EmptyInput(_)), "{err:?}");
}

#[test]
fn missing_input_is_reported() {
    let td = tempfile::tempdir().unwrap();
    let err = compress_file(&td.path().join("nope.bin"), &td.path().join("out"), &Config::default()).unwrap_err();
    assert!(matches!(err, ParzError::InputNotFound(_)), "{err:?}");
}

#[test]
fn oversized_footer_count_is_corrupt_and_starts_no_worker() {
    let td = tempfile::tempdir().unwrap();
    let input = td.path().join("in.bin");
    let packed = td.path().join("in.parz");
    let output = td.path().join("in.out");
    write_tagged(&input, 3, 2048);
    let cfg = Config { workers: 3, small_file_threshold: 0, ..Config::default() };
    compress_file(&input, &packed, &cfg).unwrap();

    let mut f = std::fs::OpenOptions::new().write(true).open(&packed).unwrap();
    f.seek(SeekFrom::End(-4)).unwrap();
    f.write_all(&0x00FF_FFFFu32.to_le_bytes()).unwrap();
    drop(f);

    let codec = ScriptedCodec::default();
    let err = run_with_codec(Operation::Decompress, &packed, &output, &cfg, &codec).unwrap_err();
    assert!(matches!(err, ParzError::CorruptContainer(_)), "{err:?}");
    assert_eq!(codec.calls.load(Ordering::SeqCst), 0);
    assert!(!output.exists());
}

#[test]
fn shuffled_offsets_are_corrupt() {
    let td = tempfile::tempdir().unwrap();
    let input = td.path().join("in.bin");
    let packed = td.path().join("in.parz");
    write_tagged(&input, 3, 2048);
    let cfg = Config { workers: 3, small_file_threshold: 0, ..Config::default() };
    compress_file(&input, &packed, &cfg).unwrap();

    // swap offsets of chunks 1 and 2
    let mut bytes = std::fs::read(&packed).unwrap();
    let base = bytes.len() - 4 - 3 * 8;
    let (a, b) = (base + 8, base + 16);
    for i in 0..8 {
        bytes.swap(a + i, b + i);
    }
    std::fs::write(&packed, &bytes).unwrap();

    let err = decompress_file(&packed, &td.path().join("out"), &cfg).unwrap_err();
    assert!(matches!(err, ParzError::CorruptContainer(_)), "{err:?}");
}

#[test]
fn wrong_codec_surfaces_as_chunk_failure() {
    let td = tempfile::tempdir().unwrap();
    let input = td.path().join("in.bin");
    let packed = td.path().join("in.parz");
    write_tagged(&input, 2, 10_000);
    let zstd = Config { workers: 2, small_file_threshold: 0, ..Config::default() };
    compress_file(&input, &packed, &zstd).unwrap();

    let gzip = Config { codec: parz_core::CodecKind::Gzip, ..zstd };
    let err = decompress_file(&packed, &td.path().join("out"), &gzip).unwrap_err();
    assert_eq!(err.chunk_index(), Some(0), "{err:?}");
}

#[test]
fn unusable_scratch_dir_is_insufficient_resources() {
    let td = tempfile::tempdir().unwrap();
    let input = td.path().join("in.bin");
    write_tagged(&input, 2, 4096);
    let cfg = Config {
        workers: 2,
        small_file_threshold: 0,
        memory_limit: 0,
        scratch_dir: Some(td.path().join("missing")),
        ..Config::default()
    };
    let err = compress_file(&input, &td.path().join("out"), &cfg).unwrap_err();
    assert!(matches!(err, ParzError::InsufficientResources { index: 0, .. }), "{err:?}");
}

#[test]
fn unknown_operation_name() {
    let err = "squash".parse::<Operation>().unwrap_err();
    assert!(matches!(err, ParzError::UnknownOperation(ref s) if s == "squash"));
}

#[test]
fn bytes_after_gzip_member_fail_the_chunk() {
    let td = tempfile::tempdir().unwrap();
    let input = td.path().join("in.bin");
    let packed = td.path().join("in.parz");
    let output = td.path().join("in.out");
    write_tagged(&input, 1, 5000);
    let cfg = Config { codec: parz_core::CodecKind::Gzip, ..Config::default() };
    compress_file(&input, &packed, &cfg).unwrap();

    // one chunk, so the footer is a single zero offset plus the count
    let mut bytes = std::fs::read(&packed).unwrap();
    let footer_at = bytes.len() - (8 + 4);
    bytes.splice(footer_at..footer_at, [0x5Au8; 12]);
    std::fs::write(&packed, &bytes).unwrap();

    let err = decompress_file(&packed, &output, &cfg).unwrap_err();
    match &err {
        ParzError::ChunkFailure { index: 0, source: ChunkError::Codec { codec: "gzip", .. } } => {}
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!output.exists());
}
