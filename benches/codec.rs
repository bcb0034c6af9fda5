use criterion::{Criterion, criterion_group, criterion_main};
use scopemap::{
    Binding, DecodeOptions, RangeOptions, SafeScopeInfoBuilder, ScopeInfo, ScopeOptions, decode,
    encode,
};

const FUNCTION_COUNT: u32 = 128;

fn build_sample_info() -> ScopeInfo {
    let mut builder = SafeScopeInfoBuilder::new();
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                kind: Some("Global".into()),
                key: Some("global".into()),
                ..Default::default()
            },
        )
        .expect("start global scope");
    for index in 0..FUNCTION_COUNT {
        let line = 1 + index * 4;
        builder
            .start_scope(
                line,
                0,
                ScopeOptions {
                    name: Some(format!("fn{index}")),
                    kind: Some("Function".into()),
                    is_stack_frame: true,
                    variables: vec![format!("a{index}"), format!("b{index}")],
                    key: Some(format!("fn{index}")),
                },
            )
            .expect("start function scope");
        builder.end_scope(line + 3, 0).expect("end function scope");
    }
    builder
        .end_scope(FUNCTION_COUNT * 4 + 1, 0)
        .expect("end global scope");

    builder
        .start_range(
            0,
            0,
            RangeOptions {
                scope_key: Some("global".into()),
                ..Default::default()
            },
        )
        .expect("start top range");
    for index in 0..FUNCTION_COUNT {
        builder
            .start_range(
                0,
                1 + index * 20,
                RangeOptions {
                    scope_key: Some(format!("fn{index}")),
                    is_stack_frame: true,
                    values: vec![
                        Binding::Expression(format!("v{index}")),
                        Binding::Unavailable,
                    ],
                    ..Default::default()
                },
            )
            .expect("start function range");
        builder
            .end_range(0, 11 + index * 20)
            .expect("end function range");
    }
    builder
        .end_range(0, FUNCTION_COUNT * 20 + 20)
        .expect("end top range");
    builder.build().expect("build sample info")
}

fn bench_codec(c: &mut Criterion) {
    let info = build_sample_info();
    let map = encode(&info, None).expect("encode sample info");

    c.bench_function("encode_scopes", |b| {
        b.iter(|| std::hint::black_box(encode(&info, None).expect("encode")));
    });

    c.bench_function("decode_scopes", |b| {
        b.iter(|| std::hint::black_box(decode(&map, DecodeOptions::default()).expect("decode")));
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
