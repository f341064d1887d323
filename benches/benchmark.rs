use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use clausal::compiler::Compiler;

// ------------- Model -------------
// A chain of entity types, each related to the next, with a subtype beside each.
fn model(size: usize) -> String {
    let mut script = String::new();
    for n in 0..=size {
        script.push_str(&format!("entity type Thing{n};\n"));
    }
    for n in 0..size {
        script.push_str(&format!("Thing{n} relates to Thing{};\n", n + 1));
        script.push_str(&format!("Thing{n} is active;\n"));
        script.push_str(&format!("Kind{n} is a kind of Thing{n};\n"));
    }
    script
}

fn compiler(size: usize) -> Compiler {
    let mut compiler = Compiler::new();
    compiler.compile(&model(size)).expect("model compiles");
    compiler
}

fn criterion_benchmark(c: &mut Criterion) {
    for size in [10, 100, 1000] {
        let compiler = compiler(size);
        let middle = size / 2;
        let exact = format!("Thing{middle} relates to Thing{}", middle + 1);
        let through_subtype = format!("Kind{middle} relates to Thing{}", middle + 1);
        println!("{:?}", compiler.rank_readings(&through_subtype));

        c.bench_function(&format!("rank exact {size}"), |b| {
            b.iter(|| compiler.rank_readings(black_box(&exact)))
        });
        c.bench_function(&format!("rank subtype step {size}"), |b| {
            b.iter(|| compiler.rank_readings(black_box(&through_subtype)))
        });

        let query = format!(
            "Thing{middle} relates to Thing{} and Thing{middle} is active and Thing{} is active?",
            middle + 1,
            middle + 1
        );
        c.bench_function(&format!("compile query {size}"), |b| {
            b.iter_batched(
                || compiler.clone(),
                |mut compiler| compiler.compile(black_box(&query)),
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
