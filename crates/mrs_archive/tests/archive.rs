use miette::{IntoDiagnostic, Result};
use mrs_archive::{
    archive::Storage,
    compression::{CompressionProvider, Deflate},
    crypto::{HeaderKind, SignatureCheck, Transform, Zones},
    error::Error,
    Archive, ArchiveOptions, OnDupe, ProgressEvent, SaveMode, Source,
};
use std::fs;
use std::io::{Cursor, Seek};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::info;
use tracing_test::traced_test;

fn options() -> ArchiveOptions {
    ArchiveOptions::builder().storage(Storage::Memory).build()
}

fn sample_files(root: &Path) -> Result<Vec<(&'static str, Vec<u8>)>> {
    let files = vec![
        ("interface/default/main.xml", b"<xml>".repeat(200)),
        ("model/woman/hair.elu", (0..=255u8).cycle().take(4096).collect()),
        ("sound/empty.wav", Vec::new()),
        ("system.ini", b"lang=en".to_vec()),
    ];

    for (name, data) in &files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).into_diagnostic()?;
        fs::write(&path, data).into_diagnostic()?;
    }

    Ok(files)
}

#[traced_test]
#[test]
fn directory_round_trip() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    let source = dir.path().join("data");
    let files = sample_files(&source)?;

    let output = mrs_archive::compile(&source, None, &ArchiveOptions::default(), |_| {})?;
    assert_eq!(output, dir.path().join("data.mrs"));

    let archive = Archive::open(&output)?;
    assert_eq!(archive.len(), files.len());

    for (name, data) in &files {
        let index = archive.find(name).unwrap();
        let entry = archive.entry(index)?;
        info!("checking {}", entry.name());

        assert_eq!(entry.name(), *name);
        assert_eq!(entry.size(), data.len() as u64);
        assert_eq!(entry.crc32(), mrs_archive::compression::crc32(data));
        assert_eq!(&archive.read(index)?, data);

        let on_disk = fs::metadata(source.join(name))
            .into_diagnostic()?
            .modified()
            .into_diagnostic()?;
        let stored = entry.modified();
        let drift = on_disk
            .duration_since(stored)
            .or_else(|_| stored.duration_since(on_disk))
            .into_diagnostic()?;
        assert!(drift < Duration::from_secs(2));
    }

    let extracted = mrs_archive::decompile(&output, None, &ArchiveOptions::default(), |_| {})?;
    assert_eq!(extracted, dir.path().join("data"));

    Ok(())
}

#[test]
fn extract_to_directory() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    let files = sample_files(&dir.path().join("in"))?;

    let mut archive = Archive::with_options(&options());
    archive.add(Source::directory(&dir.path().join("in")), OnDupe::KeepNew)?;

    let mut begun = Vec::new();
    archive.save(SaveMode::Directory, dir.path().join("out"), |progress| {
        if let ProgressEvent::Begin(name) = progress.event {
            begun.push(name.to_owned());
        }
    })?;

    assert_eq!(begun.len(), files.len());
    for (name, data) in &files {
        assert_eq!(&fs::read(dir.path().join("out").join(name)).into_diagnostic()?, data);
    }

    Ok(())
}

#[test]
fn keep_both_numbers_copies() -> Result<()> {
    let mut archive = Archive::with_options(&options());
    archive.add(Source::buffer(b"1", "a.txt"), OnDupe::KeepBoth)?;
    archive.add(Source::buffer(b"2", "a.txt"), OnDupe::KeepBoth)?;
    archive.add(Source::buffer(b"3", "a.txt"), OnDupe::KeepBoth)?;

    assert_eq!(
        archive.names().collect::<Vec<_>>(),
        vec!["a.txt", "a (2).txt", "a (3).txt"]
    );
    Ok(())
}

#[test]
fn keep_new_replaces_from_nested_archive() -> Result<()> {
    let mut inner = Archive::with_options(&options());
    inner.add(Source::buffer(b"new", "a.txt"), OnDupe::KeepNew)?;
    inner.add(Source::buffer(b"extra", "b.txt"), OnDupe::KeepNew)?;

    let mut bytes = Cursor::new(Vec::new());
    inner.save_to_writer(&mut bytes, |_| {})?;

    let dir = tempfile::tempdir().into_diagnostic()?;
    let path = dir.path().join("inner.mrs");
    fs::write(&path, bytes.get_ref()).into_diagnostic()?;

    let mut outer = Archive::with_options(&options());
    outer.add(Source::buffer(b"old", "a.txt"), OnDupe::KeepNew)?;
    outer.add(Source::buffer(b"copy", "a (2).txt"), OnDupe::KeepNew)?;

    assert_eq!(outer.add(Source::archive_file(&path), OnDupe::KeepNew)?, 2);
    assert_eq!(
        outer.names().collect::<Vec<_>>(),
        vec!["a.txt", "a (2).txt", "b.txt"]
    );
    assert_eq!(outer.read(0)?, b"new");
    assert_eq!(outer.read(1)?, b"copy");
    Ok(())
}

#[test]
fn keep_old_rejects_whole_batch() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    fs::write(dir.path().join("fresh.txt"), b"fresh").into_diagnostic()?;
    fs::write(dir.path().join("taken.txt"), b"taken").into_diagnostic()?;

    let mut archive = Archive::with_options(&options());
    archive.add(Source::buffer(b"original", "taken.txt"), OnDupe::KeepOld)?;

    let result = archive.add(Source::directory(dir.path()), OnDupe::KeepOld);
    assert!(matches!(result, Err(Error::Duplicate(name)) if name == "taken.txt"));
    assert_eq!(archive.names().collect::<Vec<_>>(), vec!["taken.txt"]);
    assert_eq!(archive.read(0)?, b"original");
    Ok(())
}

#[test]
fn remove_keeps_other_entries() -> Result<()> {
    let mut archive = Archive::with_options(&options());
    for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
        archive.add(Source::buffer(name.as_bytes(), name), OnDupe::KeepNew)?;
    }
    archive.remove(1)?;

    let mut bytes = Cursor::new(Vec::new());
    archive.save_to_writer(&mut bytes, |_| {})?;
    bytes.rewind().into_diagnostic()?;

    let reopened = Archive::from_reader(&mut bytes, &options())?;
    assert_eq!(
        reopened.names().collect::<Vec<_>>(),
        vec!["a.txt", "c.txt", "d.txt"]
    );
    for i in 0..reopened.len() {
        assert_eq!(reopened.read(i)?, reopened.entry(i)?.name().as_bytes());
    }
    Ok(())
}

#[test]
fn extras_and_comments_survive_save() -> Result<()> {
    let mut archive = Archive::with_options(&options());
    archive.add(
        Source::Buffer {
            data: b"payload",
            name: "a.txt".into(),
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_300_000_000)),
        },
        OnDupe::KeepNew,
    )?;
    archive.set_local_extra(0, Some(b"local"))?;
    archive.set_extra(0, Some(b"central"))?;
    archive.set_comment(0, Some(b"a comment"))?;

    let mut bytes = Cursor::new(Vec::new());
    archive.save_to_writer(&mut bytes, |_| {})?;
    bytes.rewind().into_diagnostic()?;

    let reopened = Archive::from_reader(&mut bytes, &options())?;
    let entry = reopened.entry(0)?;
    assert_eq!(entry.local_extra(), Some(&b"local"[..]));
    assert_eq!(entry.extra(), Some(&b"central"[..]));
    assert_eq!(entry.comment(), Some(&b"a comment"[..]));
    assert_eq!(entry.modified_dos(), archive.entry(0)?.modified_dos());
    assert_eq!(reopened.read(0)?, b"payload");
    Ok(())
}

fn xor(key: u8) -> Transform {
    Arc::new(move |buf: &mut [u8]| buf.iter_mut().for_each(|b| *b ^= key))
}

#[test]
fn custom_cipher_round_trip() -> Result<()> {
    let mut archive = Archive::with_options(&options());
    archive.set_encryption(Zones::ALL, Some(xor(0x5A)));
    archive.set_signature(Zones::BASE_HEADER, Some(0x1234_5678));
    archive.add(Source::buffer(b"secret", "a.txt"), OnDupe::KeepNew)?;

    let mut bytes = Cursor::new(Vec::new());
    archive.save_to_writer(&mut bytes, |_| {})?;

    // the default cipher cannot read it
    bytes.rewind().into_diagnostic()?;
    assert!(matches!(
        Archive::from_reader(&mut bytes, &options()),
        Err(Error::InvalidArchive)
    ));

    let mut reader = options();
    reader.decryption.set(Zones::ALL, Some(xor(0x5A)));
    reader.signatures.set_override(Zones::BASE_HEADER, Some(0x1234_5678));

    bytes.rewind().into_diagnostic()?;
    let reopened = Archive::from_reader(&mut bytes, &reader)?;
    assert_eq!(reopened.read(0)?, b"secret");
    assert_eq!(reopened.trailer().signature, 0x1234_5678);
    Ok(())
}

/// Frames empty input as an empty fixed Huffman block
#[derive(Debug)]
struct FramedEmpty;

impl CompressionProvider for FramedEmpty {
    fn compress(&self, data: &[u8]) -> Option<Vec<u8>> {
        data.is_empty().then(|| vec![0x03, 0x00])
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> mrs_archive::error::Result<Vec<u8>> {
        Deflate::new(Deflate::DEFAULT_LEVEL).decompress(data, expected_len)
    }
}

#[test]
fn payload_cipher_skips_the_same_payloads_both_ways() -> Result<()> {
    let mut archive = Archive::with_options(&options());
    archive.set_compressor(FramedEmpty);
    archive.set_encryption(Zones::BUFFER, Some(xor(0x5A)));
    archive.add(Source::buffer(b"", "empty.txt"), OnDupe::KeepNew)?;
    archive.add(Source::buffer(b"full", "full.txt"), OnDupe::KeepNew)?;
    assert_eq!(archive.entry(0)?.compressed_size(), 2);

    let mut bytes = Cursor::new(Vec::new());
    archive.save_to_writer(&mut bytes, |_| {})?;

    let mut reader = options();
    reader.decryption.set(Zones::BUFFER, Some(xor(0x5A)));

    bytes.rewind().into_diagnostic()?;
    let reopened = Archive::from_reader(&mut bytes, &reader)?;
    assert_eq!(reopened.read(0)?, b"");
    assert_eq!(reopened.read(1)?, b"full");
    Ok(())
}

#[test]
fn signature_check_accepts_unknown_values() -> Result<()> {
    let mut archive = Archive::with_options(&options());
    archive.set_signature(Zones::HEADERS, Some(0xCAFE_F00D));
    archive.add(Source::buffer(b"x", "a.txt"), OnDupe::KeepNew)?;

    let mut bytes = Cursor::new(Vec::new());
    archive.save_to_writer(&mut bytes, |_| {})?;

    let mut reader = options();
    let check: SignatureCheck = Arc::new(|_: HeaderKind, value: u32| value == 0xCAFE_F00D);
    reader.signatures.set_check(Some(check));

    bytes.rewind().into_diagnostic()?;
    let reopened = Archive::from_reader(&mut bytes, &reader)?;
    assert_eq!(reopened.len(), 1);
    Ok(())
}

#[test]
fn mismatched_local_signature() -> Result<()> {
    let mut archive = Archive::with_options(&options());
    archive.set_signature(Zones::LOCAL_HEADER, Some(0xDEAD_BEEF));
    archive.add(Source::buffer(b"x", "a.txt"), OnDupe::KeepNew)?;

    let mut bytes = Cursor::new(Vec::new());
    archive.save_to_writer(&mut bytes, |_| {})?;
    bytes.rewind().into_diagnostic()?;

    assert!(matches!(
        Archive::from_reader(&mut bytes, &options()),
        Err(Error::InvalidEncryption)
    ));
    Ok(())
}

#[test]
fn list_and_verify() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    let path = dir.path().join("list.mrs");

    let mut archive = Archive::with_options(&options());
    archive.add(Source::buffer(b"12345", "a.txt"), OnDupe::KeepNew)?;
    archive.add(Source::buffer(b"", "b/"), OnDupe::KeepNew)?;
    archive.save(SaveMode::Archive, &path, |_| {})?;

    mrs_archive::verify(&path, &ArchiveOptions::default())?;

    let listing = mrs_archive::list(&path, &ArchiveOptions::default())?;
    assert_eq!(listing.len(), 2);
    let entries = listing.collect::<Vec<_>>();
    assert_eq!(entries[0].name, "a.txt");
    assert_eq!(entries[0].size, 5);
    assert_eq!(entries[1].name, "b/");

    let empty = dir.path().join("empty.mrs");
    Archive::with_options(&options()).save(SaveMode::Archive, &empty, |_| {})?;
    assert!(matches!(
        mrs_archive::list(&empty, &ArchiveOptions::default()),
        Err(Error::Empty)
    ));

    let bogus = dir.path().join("bogus.mrs");
    fs::write(&bogus, vec![0u8; 64]).into_diagnostic()?;
    assert!(matches!(
        mrs_archive::verify(&bogus, &ArchiveOptions::default()),
        Err(Error::InvalidArchive)
    ));

    assert!(matches!(
        mrs_archive::verify(dir.path().join("missing.mrs"), &ArchiveOptions::default()),
        Err(Error::NotFound)
    ));
    Ok(())
}
