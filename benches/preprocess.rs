use criterion::{Criterion, criterion_group, criterion_main};

use cpre::preprocess::Preprocessor;

fn bench_preprocess_short(c: &mut Criterion) {
    c.bench_function("preprocess", |b| b.iter(|| {
        let input = "\
#define VERSION 10305
#define STR(x) #x
#define CONCAT(a,b) a##b
#define LOG(fmt, ...) fprintf(stderr, fmt, __VA_ARGS__)

#if VERSION >= 10000
#define API CONCAT(api_, 1)
#else
#define API CONCAT(api_, 0)
#endif

int API(void);

static const char *version = STR(VERSION);

int main(void) {
    LOG(\"%s %d\\n\", version, VERSION);
    return API();
}
";

        let mut pp = Preprocessor::new(Vec::new());
        pp.preprocess_str(input, "bench.c").unwrap();
    }));
}

criterion_group!(benches, bench_preprocess_short);
criterion_main!(benches);
