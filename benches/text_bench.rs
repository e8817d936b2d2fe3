use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use regex::Regex;
use statline::text::{replace_all, replace_first, trim_in_place};

const RAW_MODEL: &str = "Intel(R)  Core(TM)   i7-8550U CPU @ 1.80GHz";

fn bench_trim(c: &mut Criterion) {
    c.bench_function("trim_model_string", |b| {
        b.iter(|| {
            let mut s = black_box(RAW_MODEL).to_string();
            trim_in_place(&mut s);
            s
        })
    });
}

fn bench_replace_pipeline(c: &mut Criterion) {
    let clause = Regex::new(r"@ ([0-9]+\.)?[0-9]+GHz").unwrap();
    let noise = Regex::new(r"CPU|\((R|TM)\)").unwrap();
    c.bench_function("normalize_replace_pipeline", |b| {
        b.iter(|| {
            let mut s = black_box(RAW_MODEL).to_string();
            replace_first(&clause, "(8) @ 4.0GHz", &mut s, 256);
            replace_all(&noise, "", &mut s, 256);
            trim_in_place(&mut s);
            s
        })
    });
}

criterion_group!(benches, bench_trim, bench_replace_pipeline);
criterion_main!(benches);
