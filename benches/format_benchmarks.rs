use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tubequeue::downloader::progress::parse_percent;
use tubequeue::extractor::ytdlp::parse_progress_line;
use tubequeue::extractor::RawInfo;
use tubequeue::format::{parse_metadata, CodecTable};
use tubequeue::utils::sanitize_title;

fn sample_document(formats: usize) -> String {
    let entries: Vec<String> = (0..formats)
        .map(|i| {
            let (vcodec, acodec) = match i % 3 {
                0 => ("avc1.640028", "none"),
                1 => ("none", "opus"),
                _ => ("vp09.00.40.08", "mp4a.40.2"),
            };
            format!(
                r#"{{"format_id": "{i}", "ext": "mp4", "url": "https://cdn.example.com/{i}",
                    "vcodec": "{vcodec}", "acodec": "{acodec}", "resolution": "1920x1080",
                    "fps": 30, "asr": 48000, "abr": 129.5, "filesize": {size}}}"#,
                i = i,
                vcodec = vcodec,
                acodec = acodec,
                size = 1_000_000 + i * 1000,
            )
        })
        .collect();
    format!(
        r#"{{"title": "Benchmark clip", "duration_string": "4:20",
            "requested_formats": [{first}, {second}], "formats": [{all}]}}"#,
        first = entries[0],
        second = entries[1],
        all = entries.join(",")
    )
}

fn benchmark_parse_metadata(c: &mut Criterion) {
    let mut group = c.benchmark_group("Metadata Parsing");
    let codecs = CodecTable::default();

    for count in [10, 60, 200] {
        let raw = RawInfo::from_json(&sample_document(count)).expect("valid document");
        group.bench_function(format!("all_{}_formats", count), |b| {
            b.iter(|| parse_metadata(black_box(&raw), false, &codecs))
        });
    }

    let raw = RawInfo::from_json(&sample_document(60)).expect("valid document");
    group.bench_function("best_only", |b| {
        b.iter(|| parse_metadata(black_box(&raw), true, &codecs))
    });

    let json = sample_document(60);
    group.bench_function("deserialize_60_formats", |b| {
        b.iter(|| RawInfo::from_json(black_box(&json)))
    });

    group.finish();
}

fn benchmark_progress(c: &mut Criterion) {
    let mut group = c.benchmark_group("Progress Parsing");

    group.bench_function("percent", |b| {
        b.iter(|| parse_percent(black_box("\x1b[0;94m 42.7%\x1b[0m")))
    });

    group.bench_function("tagged_line", |b| {
        b.iter(|| {
            parse_progress_line(black_box(
                "tubequeue-dl downloading| 42.7%| 42.7% of 12.34MiB at 1.20MiB/s ETA 00:07",
            ))
        })
    });

    group.finish();
}

fn benchmark_sanitize_title(c: &mut Criterion) {
    let mut group = c.benchmark_group("Title Sanitization");

    group.bench_function("simple", |b| {
        b.iter(|| sanitize_title(black_box("Weekly update")))
    });

    group.bench_function("hostile", |b| {
        b.iter(|| sanitize_title(black_box("../CON: <live> | \"best\" of ???")))
    });

    let long_title = "ß".repeat(300);
    group.bench_function("long", |b| {
        b.iter(|| sanitize_title(black_box(&long_title)))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_parse_metadata,
    benchmark_progress,
    benchmark_sanitize_title
);
criterion_main!(benches);
