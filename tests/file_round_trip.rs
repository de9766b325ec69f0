//! End-to-end file tests
//!
//! Covers every wire format through the public reader and writer:
//! - Binary round trips in both byte orders
//! - ASCII scenarios with custom separators and name fixing
//! - Gzip detection
//! - Truncated records and reader poisoning
//! - Chunked and windowed reads

mod common;

use common::{random_dense, random_sparse, rng, scratch};
use fingerprint_fs::file::{
    count_fps_in_file, get_fp_names, read_fp_file, write_fp_file, Endian, FpReaderBuilder,
    FpWriterBuilder,
};
use fingerprint_fs::{
    FileFormat, Fingerprint, FingerprintError, FingerprintOps, FpReader, Session, SparseFingerprint,
    WireFormat,
};
use std::fs;
use tempfile::TempDir;

fn write_with_order(path: &std::path::Path, wire: WireFormat, num_bits: u32, endian: Endian, fps: &[Fingerprint]) {
    let mut writer = FpWriterBuilder::new(path, FileFormat::new(wire))
        .with_num_bits(num_bits)
        .with_byte_order(endian)
        .create()
        .unwrap();
    writer.write_fingerprints(fps).unwrap();
    writer.finish().unwrap();
}

#[test]
fn test_dense_binary_round_trip_both_byte_orders() {
    let dir = TempDir::new().unwrap();
    let fps = random_dense(&mut rng(7), 25, 166);

    for endian in [Endian::Little, Endian::Big] {
        let path = scratch(dir.path(), &format!("dense_{:?}.fpd", endian));
        write_with_order(&path, WireFormat::FlushDense, 166, endian, &fps);

        let mut session = Session::new(1024);
        let format = FileFormat::new(WireFormat::FlushDense);
        let mut reader = FpReader::open(&path, &format, &mut session).unwrap();
        assert_eq!(reader.byte_swapping(), endian != Endian::native());
        assert_eq!(reader.read_all().unwrap(), fps);
        assert_eq!(session.num_bits(), 166);
        assert!(session.is_width_locked());
    }
}

#[test]
fn test_sparse_binary_round_trip_both_byte_orders() {
    let dir = TempDir::new().unwrap();
    let fps = random_sparse(&mut rng(11), 40, 1 << 20);

    for endian in [Endian::Little, Endian::Big] {
        let path = scratch(dir.path(), &format!("sparse_{:?}.fps", endian));
        write_with_order(&path, WireFormat::BinaryFragments, 0, endian, &fps);

        let mut session = Session::default();
        let format = FileFormat::new(WireFormat::BinaryFragments);
        assert_eq!(read_fp_file(&path, &format, &mut session).unwrap(), fps);
        assert!(!session.is_width_locked());
    }
}

#[test]
fn test_forced_byte_swapping_misreads_native_file() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "native.fpd");
    let fps = random_dense(&mut rng(3), 2, 64);
    write_with_order(&path, WireFormat::FlushDense, 64, Endian::native(), &fps);

    // Forcing the wrong order makes the tag unrecognisable
    let mut session = Session::new(64);
    let result = FpReaderBuilder::new(&mut session, &path, FileFormat::new(WireFormat::FlushDense))
        .with_byte_swapping(true)
        .open();
    assert!(matches!(result, Err(FingerprintError::FormatMismatch { .. })));

    let mut session = Session::new(64);
    let mut reader = FpReaderBuilder::new(&mut session, &path, FileFormat::new(WireFormat::FlushDense))
        .with_byte_swapping(false)
        .open()
        .unwrap();
    assert_eq!(reader.read_all().unwrap(), fps);
}

#[test]
fn test_forced_byte_swapping_reads_opposite_order_file() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "foreign.fpd");
    let fps = random_dense(&mut rng(5), 9, 100);
    write_with_order(&path, WireFormat::FlushDense, 100, Endian::native().opposite(), &fps);

    let mut session = Session::new(1024);
    let mut reader = FpReaderBuilder::new(&mut session, &path, FileFormat::new(WireFormat::FlushDense))
        .with_byte_swapping(true)
        .open()
        .unwrap();
    assert!(reader.byte_swapping());
    assert_eq!(reader.read_all().unwrap(), fps);
    assert_eq!(session.num_bits(), 100);
}

#[test]
fn test_names_holding_the_separator() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "frags.txt");
    let session = Session::default();
    let fps = vec![Fingerprint::from(SparseFingerprint::new("mol 1", vec![5, 9]))];

    let result = write_fp_file(&path, &"FRAG_NUMS".parse().unwrap(), &session, &fps);
    assert!(matches!(result, Err(FingerprintError::SeparatorInName { .. })));

    let format: FileFormat = "FRAG_NUMS,FIX_NAMES".parse().unwrap();
    write_fp_file(&path, &format, &session, &fps).unwrap();
    let mut session = Session::default();
    let back = read_fp_file(&path, &format, &mut session).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].name(), "mol_1");
    assert_eq!(back[0].as_sparse().unwrap().frag_nums(), &[5, 9]);
}

#[test]
fn test_dense_header_conflicts_with_locked_width() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "wide.fpd");
    write_with_order(&path, WireFormat::FlushDense, 256, Endian::native(), &[]);

    let mut session = Session::new(128);
    session.lock_width();
    let result = FpReader::open(&path, &FileFormat::new(WireFormat::FlushDense), &mut session);
    assert!(matches!(
        result,
        Err(FingerprintError::WidthReconfiguration { current: 128, requested: 256 })
    ));
}

#[test]
fn test_ascii_comma_bitstring_scenario() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "mols.txt");
    fs::write(&path, "mol1,11110000\n").unwrap();

    let format: FileFormat = "BITSTRINGS,sep=,".parse().unwrap();
    let mut session = Session::new(8);
    let fps = read_fp_file(&path, &format, &mut session).unwrap();

    assert_eq!(fps.len(), 1);
    assert_eq!(fps[0].name(), "mol1");
    let bits = fps[0].as_dense().unwrap().bits();
    assert!((0..4).all(|i| bits.get(i)));
    assert!((4..8).all(|i| !bits.get(i)));

    // Same separator reproduces the input byte for byte
    let out = scratch(dir.path(), "mols_out.txt");
    write_fp_file(&out, &format, &session, &fps).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "mol1,11110000\n");
}

#[test]
fn test_ascii_fragments_tab_separated() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "frags.tsv");
    fs::write(&path, "a\t3\t1\t2\nb\t\nc\t2\t3\t4\n").unwrap();

    let format: FileFormat = "FRAG_NUMS,sep=TAB".parse().unwrap();
    let mut session = Session::default();
    let fps = read_fp_file(&path, &format, &mut session).unwrap();
    assert_eq!(fps.len(), 3);
    assert_eq!(fps[0].as_sparse().unwrap().frag_nums(), &[1, 2, 3]);
    assert_eq!(fps[1].bit_count(), 0);

    let d = session.distance(&fps[0], &fps[2]).unwrap();
    assert!((d - 0.5).abs() < 1e-12);
}

#[test]
fn test_gzip_round_trip_is_detected() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "frags.txt.gz");
    let fps = random_sparse(&mut rng(5), 30, 5000);
    let session = Session::default();

    let written: FileFormat = "FRAG_NUMS,GZ".parse().unwrap();
    write_fp_file(&path, &written, &session, &fps).unwrap();
    assert_eq!(&fs::read(&path).unwrap()[..2], &[0x1f, 0x8b]);

    // No compression named: detected from the magic bytes
    let detect: FileFormat = "FRAG_NUMS".parse().unwrap();
    let mut session = Session::default();
    assert_eq!(read_fp_file(&path, &detect, &mut session).unwrap(), fps);
    assert_eq!(count_fps_in_file(&path, &detect).unwrap(), 30);
}

#[test]
fn test_truncated_sparse_record_poisons_reader() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "short.fps");
    let endian = Endian::native();
    let u32_bytes = |v: u32| match endian {
        Endian::Little => v.to_le_bytes(),
        Endian::Big => v.to_be_bytes(),
    };

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&u32_bytes(u32::from_le_bytes(*b"FPS1")));
    bytes.extend_from_slice(&u32_bytes(0));
    // One good record
    bytes.extend_from_slice(&u32_bytes(2));
    bytes.extend_from_slice(b"ok");
    bytes.extend_from_slice(&u32_bytes(1));
    bytes.extend_from_slice(&u32_bytes(42));
    // Declares 3 identifiers, holds 2
    bytes.extend_from_slice(&u32_bytes(3));
    bytes.extend_from_slice(b"bad");
    bytes.extend_from_slice(&u32_bytes(3));
    bytes.extend_from_slice(&u32_bytes(10));
    bytes.extend_from_slice(&u32_bytes(20));
    fs::write(&path, &bytes).unwrap();

    let mut session = Session::default();
    let mut reader = FpReader::open(&path, &FileFormat::new(WireFormat::BinaryFragments), &mut session).unwrap();

    let first = reader.next().unwrap().unwrap();
    assert_eq!(first.name(), "ok");
    assert!(matches!(
        reader.next(),
        Some(Err(FingerprintError::TruncatedRecord { expected: 12, actual: 8 }))
    ));
    assert!(reader.next().is_none());
    assert_eq!(reader.records_read(), 1);
}

#[test]
fn test_chunks_and_windows() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "many.fpd");
    let fps = random_dense(&mut rng(99), 23, 40);
    write_with_order(&path, WireFormat::FlushDense, 40, Endian::native(), &fps);

    let format = FileFormat::new(WireFormat::FlushDense);
    let mut session = Session::new(40);
    let mut reader = FpReader::open(&path, &format, &mut session).unwrap();

    let mut collected = Vec::new();
    loop {
        let chunk = reader.read_chunk(10).unwrap();
        if chunk.is_empty() {
            break;
        }
        assert!(chunk.len() <= 10);
        collected.extend(chunk);
    }
    assert_eq!(collected, fps);

    let window = reader.read_window(5, 7).unwrap();
    assert_eq!(window, fps[5..12].to_vec());

    let tail = reader.read_window(20, 10).unwrap();
    assert_eq!(tail, fps[20..].to_vec());
}

#[test]
fn test_names_and_counts_do_not_touch_caller_session() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "names.fpd");
    let fps = random_dense(&mut rng(1), 4, 512);
    write_with_order(&path, WireFormat::FlushDense, 512, Endian::Big, &fps);

    let format = FileFormat::new(WireFormat::FlushDense);
    assert_eq!(count_fps_in_file(&path, &format).unwrap(), 4);
    assert_eq!(get_fp_names(&path, &format).unwrap(), vec!["d0", "d1", "d2", "d3"]);
}

#[test]
fn test_convert_ascii_to_binary_and_back() {
    let dir = TempDir::new().unwrap();
    let ascii = scratch(dir.path(), "in.txt");
    let fps = random_dense(&mut rng(21), 12, 72);
    let session = Session::new(72);
    write_fp_file(&ascii, &"BITSTRINGS".parse().unwrap(), &session, &fps).unwrap();

    let binary = scratch(dir.path(), "mid.fpd");
    let mut session = Session::new(72);
    let loaded = read_fp_file(&ascii, &"BITSTRINGS".parse().unwrap(), &mut session).unwrap();
    write_fp_file(&binary, &"FLUSH,GZ".parse().unwrap(), &session, &loaded).unwrap();

    let mut session = Session::new(72);
    let back = read_fp_file(&binary, &"FLUSH".parse().unwrap(), &mut session).unwrap();
    assert_eq!(back, fps);
}

#[test]
fn test_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = scratch(dir.path(), "nope.fpd");
    let mut session = Session::default();
    match FpReader::open(&path, &FileFormat::new(WireFormat::FlushDense), &mut session) {
        Err(FingerprintError::FileOpen { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected FileOpen, got {:?}", other.map(|_| ())),
    }
}
