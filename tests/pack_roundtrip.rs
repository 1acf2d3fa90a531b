//! Round-trip tests: staged streams must come back byte-identical from the
//! packed file, in the order the installed sorter chose.

use rand::{Rng, SeedableRng};
use rptdoc::{ArchiveReader, ArchiveWriter, NameOrderSorter};
use tempfile::TempDir;

fn open_writer(dir: &TempDir, name: &str) -> ArchiveWriter {
    let mut writer = ArchiveWriter::open(dir.path().join(name)).unwrap();
    writer.initialize().unwrap();
    writer
}

#[test]
fn test_staged_read_back_before_finish() {
    let dir = TempDir::new().unwrap();
    let mut writer = open_writer(&dir, "staged.rptdocument");

    let mut out = writer.create_stream("content/0").unwrap();
    out.write(b"written while the archive is still open").unwrap();

    let mut back = writer.open_stream("content/0").unwrap();
    let mut buf = vec![0u8; 39];
    back.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"written while the archive is still open");
}

#[test]
fn test_round_trip_random_streams() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("random.rptdocument");
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);

    let mut expected = Vec::new();
    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();

        for i in 0..12 {
            let name = format!("content/{}", i);
            let len = rng.gen_range(0..64 * 1024);
            let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

            let mut stream = writer.create_stream(&name).unwrap();
            stream.write(&payload).unwrap();
            expected.push((name, payload));
        }

        writer.finish().unwrap();
    }

    let reader = ArchiveReader::open(&path).unwrap();
    assert_eq!(reader.toc().len(), 12);
    for (name, payload) in &expected {
        assert_eq!(&reader.read_stream(name).unwrap(), payload, "stream {}", name);
    }
}

#[test]
fn test_large_stream_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("large.rptdocument");
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let payload: Vec<u8> = (0..1024 * 1024).map(|_| rng.gen()).collect();

    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();
        let mut stream = writer.create_stream("pages/large").unwrap();
        stream.write(&payload).unwrap();
        writer.finish().unwrap();
    }

    let reader = ArchiveReader::open(&path).unwrap();
    assert_eq!(reader.read_stream("pages/large").unwrap(), payload);
}

#[test]
fn test_packed_report_scenario() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.rptdocument");

    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();

        let mut content = writer.create_stream("content/0").unwrap();
        content.write(&[0xABu8; 1024]).unwrap();

        let mut toc_stream = writer.create_stream("toc/0").unwrap();
        toc_stream.write(&[0x00u8; 16]).unwrap();

        writer.finish().unwrap();
    }

    // Payload plus TOC and trailer overhead
    assert!(std::fs::metadata(&path).unwrap().len() >= 1040);

    let reader = ArchiveReader::open(&path).unwrap();
    let entries = reader.toc().entries();
    assert_eq!(entries.len(), 2);

    // Creation order, disjoint ranges covering 1040 payload bytes
    assert_eq!(entries[0].name, "content/0");
    assert_eq!(entries[0].length, 1024);
    assert_eq!(entries[1].name, "toc/0");
    assert_eq!(entries[1].length, 16);
    assert!(entries[0].offset + entries[0].length <= entries[1].offset);
    assert_eq!(reader.toc().payload_len(), 1040);

    assert_eq!(reader.read_stream("content/0").unwrap(), vec![0xABu8; 1024]);
    assert_eq!(reader.read_stream("toc/0").unwrap(), vec![0x00u8; 16]);
}

#[test]
fn test_default_sorter_preserves_creation_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ordered.rptdocument");

    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();
        for name in ["zeta", "alpha", "midway"] {
            let mut stream = writer.create_stream(name).unwrap();
            stream.write(name.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    let reader = ArchiveReader::open(&path).unwrap();
    assert_eq!(reader.stream_names(), vec!["zeta", "alpha", "midway"]);
}

#[test]
fn test_custom_sorter_controls_packed_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sorted.rptdocument");

    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();
        for name in ["zeta", "alpha", "midway"] {
            let mut stream = writer.create_stream(name).unwrap();
            stream.write(name.as_bytes()).unwrap();
        }
        writer.set_stream_sorter(Box::new(NameOrderSorter));
        writer.finish().unwrap();
    }

    let reader = ArchiveReader::open(&path).unwrap();
    assert_eq!(reader.stream_names(), vec!["alpha", "midway", "zeta"]);

    // Order changes, bytes do not
    assert_eq!(reader.read_stream("zeta").unwrap(), b"zeta");
}

#[test]
fn test_empty_archive_packs_and_reopens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.rptdocument");

    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();
        writer.finish().unwrap();
    }

    let reader = ArchiveReader::open(&path).unwrap();
    assert!(reader.toc().is_empty());
    assert!(reader.stream_names().is_empty());
}

#[test]
fn test_empty_streams_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("zero.rptdocument");

    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();
        writer.create_stream("empty/0").unwrap();
        let mut full = writer.create_stream("full/0").unwrap();
        full.write(b"x").unwrap();
        writer.finish().unwrap();
    }

    let reader = ArchiveReader::open(&path).unwrap();
    assert_eq!(reader.stream_len("empty/0").unwrap(), 0);
    assert!(reader.read_stream("empty/0").unwrap().is_empty());
    assert_eq!(reader.read_stream("full/0").unwrap(), b"x");
}

#[test]
fn test_dropped_stream_is_not_packed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dropped.rptdocument");

    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();
        let mut keep = writer.create_stream("keep").unwrap();
        keep.write(b"kept bytes").unwrap();
        let mut gone = writer.create_stream("gone").unwrap();
        gone.write(b"discarded").unwrap();

        assert!(writer.drop_stream("gone"));
        writer.finish().unwrap();
    }

    let reader = ArchiveReader::open(&path).unwrap();
    assert_eq!(reader.stream_names(), vec!["keep"]);
    assert!(!reader.stream_exists("gone"));
}

#[test]
fn test_recreate_truncates_before_pack() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recreate.rptdocument");

    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();

        let mut first = writer.create_stream("content/0").unwrap();
        first.write(b"a very long first draft of the stream").unwrap();

        let mut second = writer.create_stream("content/0").unwrap();
        second.write(b"final").unwrap();

        writer.finish().unwrap();
    }

    let reader = ArchiveReader::open(&path).unwrap();
    assert_eq!(reader.read_stream("content/0").unwrap(), b"final");
}

#[test]
fn test_patch_back_survives_packing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("patched.rptdocument");

    {
        let mut writer = ArchiveWriter::open(&path).unwrap();
        writer.initialize().unwrap();

        // Write a placeholder size, then the body, then patch the size back
        let mut body = writer.create_stream("content/0").unwrap();
        body.write(&[0u8; 8]).unwrap();
        body.write(b"report body").unwrap();

        let mut patch = writer.open_stream("content/0").unwrap();
        patch.write(&11u64.to_le_bytes()).unwrap();

        writer.finish().unwrap();
    }

    let reader = ArchiveReader::open(&path).unwrap();
    let bytes = reader.read_stream("content/0").unwrap();
    let mut header = [0u8; 8];
    header.copy_from_slice(&bytes[..8]);
    assert_eq!(u64::from_le_bytes(header), 11);
    assert_eq!(&bytes[8..], b"report body");
}
