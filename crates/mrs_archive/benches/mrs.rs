use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

fn sample_archive() -> Vec<u8> {
    use mrs_archive::{archive::Storage, Archive, ArchiveOptions, OnDupe, Source};
    use std::io::Cursor;

    let mut archive =
        Archive::with_options(&ArchiveOptions::builder().storage(Storage::Memory).build());
    for i in 0..64 {
        let data = format!("<entry index=\"{i}\"/>\n").repeat(256);
        archive
            .add(
                Source::buffer(data.as_bytes(), format!("xml/entry_{i}.xml")),
                OnDupe::KeepNew,
            )
            .unwrap();
    }

    let mut out = Cursor::new(Vec::new());
    archive.save_to_writer(&mut out, |_| {}).unwrap();
    out.into_inner()
}

pub mod read {
    use divan::Bencher;
    use mrs_archive::{Archive, ArchiveOptions};
    use std::io::Cursor;

    #[divan::bench]
    fn open(bencher: Bencher) {
        bencher
            .with_inputs(super::sample_archive)
            .bench_refs(|data| {
                divan::black_box(
                    Archive::from_reader(&mut Cursor::new(data), &ArchiveOptions::default())
                        .unwrap(),
                );
            });
    }

    #[divan::bench]
    fn list(bencher: Bencher) {
        bencher
            .with_inputs(super::sample_archive)
            .bench_refs(|data| {
                let listing = mrs_archive::read::list_reader(
                    &mut Cursor::new(data),
                    &ArchiveOptions::default(),
                )
                .unwrap();
                divan::black_box(listing.count());
            });
    }

    #[divan::bench(sample_count = 10)]
    fn read_file_all(bencher: Bencher) {
        let archive =
            Archive::from_reader(&mut Cursor::new(super::sample_archive()), &ArchiveOptions::default())
                .unwrap();

        bencher.bench_local(move || {
            for i in 0..archive.len() {
                divan::black_box(archive.read(i).unwrap());
            }
        });
    }
}

pub mod write {
    use divan::Bencher;
    use mrs_archive::{Archive, ArchiveOptions};
    use std::io::Cursor;

    #[divan::bench(sample_count = 10)]
    fn save(bencher: Bencher) {
        let mut archive =
            Archive::from_reader(&mut Cursor::new(super::sample_archive()), &ArchiveOptions::default())
                .unwrap();

        bencher.bench_local(move || {
            let mut out = Cursor::new(Vec::new());
            archive.save_to_writer(&mut out, |_| {}).unwrap();
            divan::black_box(out);
        });
    }
}
