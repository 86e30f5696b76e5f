use criterion::{black_box, criterion_group, criterion_main, Criterion};
use elicast_ot::{build_text, get_areas, EngineConfig, MemoryBuffer, Operation, OperationLog, OwnerTable, Scrubber};

/// A lecture typing `lines` lines, each followed by a one-line exercise
fn lecture(lines: usize) -> OperationLog {
    let mut ops = Vec::new();
    let mut pos = 0;
    let mut ts = 0;

    for line in 0..lines {
        let code = format!("let v{line} = ");
        ops.push(Operation::insertion(ts, pos, code.clone()));
        pos += code.chars().count();
        ts += 10;

        ops.push(Operation::exercise(ts, line as u32 + 1));
        ops.push(Operation::insertion(ts + 1, pos, "42"));
        ops.push(Operation::exercise(ts + 2, line as u32 + 1));
        pos += 2;
        ts += 10;

        ops.push(Operation::insertion(ts, pos, ";\n"));
        ops.push(Operation::selection(ts + 1, pos + 2, pos + 2));
        pos += 2;
        ts += 10;
    }

    OperationLog::from_ops(ops).unwrap()
}

fn rebuild_document(c: &mut Criterion) {
    let log = lecture(500);

    c.bench_function("build_text_500_lines", |b| {
        b.iter(|| build_text(black_box(log.as_slice())))
    });
}

fn compute_regions(c: &mut Criterion) {
    let log = lecture(200);

    c.bench_function("get_areas_200_exercises", |b| {
        b.iter(|| get_areas(black_box(log.as_slice())))
    });
}

fn scrub_back_and_forth(c: &mut Criterion) {
    let log = lecture(200);
    let owners = OwnerTable::from_ops(log.as_slice());
    let end = log.last_ts();

    c.bench_function("seek_small_steps", |b| {
        b.iter(|| {
            let mut scrubber = Scrubber::new(&EngineConfig::default());
            let mut buffer = MemoryBuffer::new();
            let mut ts = 0;
            while ts < end {
                scrubber.seek(&log, &owners, &mut buffer, black_box(ts)).unwrap();
                ts += 25;
            }
        })
    });
}

criterion_group!(benches, rebuild_document, compute_regions, scrub_back_and_forth);
criterion_main!(benches);
