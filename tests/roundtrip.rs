use anyhow::Result;
use pretty_assertions::assert_eq;
use scopemap::{
    Binding, DecodeOptions, OriginalPosition, Position, RangeOptions, SafeScopeInfoBuilder,
    ScopeInfoBuilder, ScopeOptions, SourceMapJson, SubRangeBinding, decode, encode,
};

#[test]
fn null_placeholders_encode_as_empty_items() -> Result<()> {
    let mut builder = SafeScopeInfoBuilder::new();
    builder.add_null_scope()?.add_null_scope()?.add_null_scope()?;
    let info = builder.build()?;

    let map = encode(&info, None)?;
    assert_eq!(map.scopes.as_deref(), Some(",,"));
    assert_eq!(map.sources.len(), 3);
    assert_eq!(map.version, 3);
    assert_eq!(map.mappings, "");

    let decoded = decode(&map, DecodeOptions::default())?;
    assert_eq!(decoded.scopes, vec![None, None, None]);
    assert_eq!(decoded, info);
    Ok(())
}

#[test]
fn named_scopes_round_trip_and_intern_in_appearance_order() -> Result<()> {
    let mut builder = SafeScopeInfoBuilder::new();
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                kind: Some("Global".into()),
                ..Default::default()
            },
        )?
        .start_scope(
            10,
            5,
            ScopeOptions {
                kind: Some("Function".into()),
                name: Some("foo".into()),
                ..Default::default()
            },
        )?
        .end_scope(20, 0)?
        .end_scope(30, 0)?;
    let info = builder.build()?;

    let map = encode(&info, None)?;
    assert_eq!(
        map.names.as_deref(),
        Some(&["Global".to_string(), "Function".to_string(), "foo".to_string()][..])
    );

    let decoded = decode(&map, DecodeOptions::default())?;
    assert_eq!(decoded, info);

    let global = decoded.scope(decoded.scopes[0].expect("top scope"));
    assert_eq!(global.kind.as_deref(), Some("Global"));
    assert_eq!(global.start, Position::new(0, 0));
    assert_eq!(global.end, Position::new(30, 0));
    let function = decoded.scope(global.children[0]);
    assert_eq!(function.name.as_deref(), Some("foo"));
    assert_eq!(function.kind.as_deref(), Some("Function"));
    assert_eq!(function.start, Position::new(10, 5));
    assert_eq!(function.end, Position::new(20, 0));
    Ok(())
}

#[test]
fn inlined_range_with_call_site_round_trips() -> Result<()> {
    let mut builder = SafeScopeInfoBuilder::new();
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                key: Some("outer".into()),
                ..Default::default()
            },
        )?
        .start_scope(
            10,
            0,
            ScopeOptions {
                key: Some("f".into()),
                ..Default::default()
            },
        )?
        .end_scope(20, 0)?
        .end_scope(30, 0)?
        .start_range(
            0,
            0,
            RangeOptions {
                scope_key: Some("outer".into()),
                ..Default::default()
            },
        )?
        .start_range(
            0,
            10,
            RangeOptions {
                scope_key: Some("f".into()),
                call_site: Some(OriginalPosition::new(0, 30, 5)),
                ..Default::default()
            },
        )?
        .end_range(0, 20)?
        .end_range(0, 70)?;
    let info = builder.build()?;

    let map = encode(&info, None)?;
    let decoded = decode(&map, DecodeOptions::default())?;
    assert_eq!(decoded, info);

    let outer = decoded.range(decoded.ranges[0]);
    assert_eq!(outer.call_site, None);
    let inlined = decoded.range(outer.children[0]);
    assert_eq!(inlined.call_site, Some(OriginalPosition::new(0, 30, 5)));
    assert_eq!(inlined.original_scope, decoded.scope(decoded.scopes[0].unwrap()).children.first().copied());
    Ok(())
}

#[test]
fn sub_range_bindings_round_trip() -> Result<()> {
    let parts = vec![
        SubRangeBinding {
            value: Some("\"foo\"".into()),
            from: Position::new(0, 0),
            to: Position::new(1, 0),
        },
        SubRangeBinding {
            value: Some("\"bar\"".into()),
            from: Position::new(1, 0),
            to: Position::new(1, 19),
        },
    ];

    let mut builder = SafeScopeInfoBuilder::new();
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                variables: vec!["x".into()],
                key: Some("s".into()),
                ..Default::default()
            },
        )?
        .end_scope(2, 0)?
        .start_range(
            0,
            0,
            RangeOptions {
                scope_key: Some("s".into()),
                values: vec![Binding::SubRanges(parts.clone())],
                ..Default::default()
            },
        )?
        .start_range(0, 5, RangeOptions::default())?
        .end_range(0, 10)?
        .end_range(1, 19)?;
    let info = builder.build()?;

    let map = encode(&info, None)?;
    let decoded = decode(&map, DecodeOptions::default())?;
    assert_eq!(decoded, info);

    let range = decoded.range(decoded.ranges[0]);
    assert_eq!(range.values, vec![Binding::SubRanges(parts)]);
    Ok(())
}

#[test]
fn single_piece_sub_range_bindings_round_trip() -> Result<()> {
    let mut builder = SafeScopeInfoBuilder::new();
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                variables: vec!["x".into(), "y".into()],
                key: Some("s".into()),
                ..Default::default()
            },
        )?
        .end_scope(3, 0)?
        .start_range(
            0,
            0,
            RangeOptions {
                scope_key: Some("s".into()),
                values: vec![
                    Binding::SubRanges(vec![SubRangeBinding {
                        value: Some("e".into()),
                        from: Position::new(0, 0),
                        to: Position::new(0, 30),
                    }]),
                    Binding::SubRanges(vec![SubRangeBinding {
                        value: None,
                        from: Position::new(0, 0),
                        to: Position::new(0, 30),
                    }]),
                ],
                ..Default::default()
            },
        )?
        .end_range(0, 30)?;
    let info = builder.build()?;

    let map = encode(&info, None)?;
    let decoded = decode(&map, DecodeOptions::default())?;
    assert_eq!(decoded, info);
    Ok(())
}

#[test]
fn unavailable_and_mixed_bindings_round_trip() -> Result<()> {
    let mut builder = SafeScopeInfoBuilder::new();
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                variables: vec!["a".into(), "b".into(), "c".into()],
                key: Some("s".into()),
                ..Default::default()
            },
        )?
        .end_scope(4, 0)?
        .start_range(
            0,
            0,
            RangeOptions {
                scope_key: Some("s".into()),
                values: vec![
                    Binding::Expression("x".into()),
                    Binding::Unavailable,
                    Binding::SubRanges(vec![
                        SubRangeBinding {
                            value: None,
                            from: Position::new(0, 0),
                            to: Position::new(0, 40),
                        },
                        SubRangeBinding {
                            value: Some("y".into()),
                            from: Position::new(0, 40),
                            to: Position::new(0, 80),
                        },
                    ]),
                ],
                ..Default::default()
            },
        )?
        .end_range(0, 80)?;
    let info = builder.build()?;

    let map = encode(&info, None)?;
    let decoded = decode(&map, DecodeOptions::default())?;
    assert_eq!(decoded, info);
    Ok(())
}

#[test]
fn deep_forest_round_trips() -> Result<()> {
    let mut builder = SafeScopeInfoBuilder::new();
    builder.add_null_scope()?;
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                kind: Some("Global".into()),
                key: Some("g1".into()),
                ..Default::default()
            },
        )?
        .start_scope(
            1,
            2,
            ScopeOptions {
                name: Some("alpha".into()),
                kind: Some("Function".into()),
                is_stack_frame: true,
                variables: vec!["x".into()],
                key: Some("alpha".into()),
            },
        )?
        .end_scope(4, 1)?
        .start_scope(
            6,
            0,
            ScopeOptions {
                name: Some("beta".into()),
                kind: Some("Function".into()),
                is_stack_frame: true,
                variables: vec!["y".into(), "z".into()],
                key: Some("beta".into()),
            },
        )?
        .end_scope(9, 1)?
        .end_scope(12, 0)?;
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                kind: Some("Global".into()),
                key: Some("g2".into()),
                ..Default::default()
            },
        )?
        .end_scope(3, 0)?;
    builder
        .start_range(
            0,
            0,
            RangeOptions {
                scope_key: Some("g1".into()),
                ..Default::default()
            },
        )?
        .start_range(
            0,
            7,
            RangeOptions {
                scope_key: Some("alpha".into()),
                is_stack_frame: true,
                values: vec![Binding::Expression("p".into())],
                ..Default::default()
            },
        )?
        .end_range(0, 20)?
        .start_range(
            0,
            25,
            RangeOptions {
                scope_key: Some("beta".into()),
                is_hidden: true,
                call_site: Some(OriginalPosition::new(1, 2, 3)),
                values: vec![Binding::Expression("q".into()), Binding::Unavailable],
                ..Default::default()
            },
        )?
        .end_range(0, 33)?
        .end_range(2, 0)?;
    builder
        .start_range(
            3,
            0,
            RangeOptions {
                scope_key: Some("g2".into()),
                ..Default::default()
            },
        )?
        .end_range(5, 0)?;
    let info = builder.build()?;

    let map = encode(&info, None)?;
    let decoded = decode(&map, DecodeOptions::default())?;
    assert_eq!(decoded, info);
    Ok(())
}

#[test]
fn interning_preserves_existing_names() -> Result<()> {
    let mut builder = SafeScopeInfoBuilder::new();
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                kind: Some("Global".into()),
                name: Some("foo".into()),
                ..Default::default()
            },
        )?
        .end_scope(9, 0)?;
    let info = builder.build()?;

    let mut input = SourceMapJson::from_json(
        r#"{"version":3,"sources":[null],"mappings":"","names":["foo","unrelated"]}"#,
    )?;
    input.file = Some("out.js".into());
    let map = encode(&info, Some(input))?;

    // "foo" kept index 0, "unrelated" survived, only "Global" was added.
    assert_eq!(
        map.names.as_deref(),
        Some(&["foo".to_string(), "unrelated".to_string(), "Global".to_string()][..])
    );
    assert_eq!(map.file.as_deref(), Some("out.js"));

    let decoded = decode(&map, DecodeOptions::default())?;
    assert_eq!(decoded, info);
    Ok(())
}

#[test]
fn encode_rejects_source_count_mismatch() -> Result<()> {
    let mut builder = SafeScopeInfoBuilder::new();
    builder.add_null_scope()?;
    let info = builder.build()?;

    let input = SourceMapJson::from_json(
        r#"{"version":3,"sources":["a.js","b.js"],"mappings":""}"#,
    )?;
    let err = encode(&info, Some(input)).expect_err("length mismatch must fail");
    assert!(err.to_string().contains("source"), "got: {err}");
    Ok(())
}

#[test]
fn encode_rejects_bindings_without_definition_scope() {
    let mut builder = ScopeInfoBuilder::new();
    builder
        .start_range(0, 0, RangeOptions::default())
        .set_range_values(vec![Binding::Unavailable])
        .end_range(0, 9);
    let info = builder.build();

    let err = encode(&info, None).expect_err("values without a scope must fail");
    assert!(err.to_string().contains("definition scope"), "got: {err}");
}

#[test]
fn encode_rejects_binding_count_mismatch() {
    let mut builder = ScopeInfoBuilder::new();
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                variables: vec!["x".into()],
                key: Some("s".into()),
                ..Default::default()
            },
        )
        .end_scope(5, 0)
        .start_range(
            0,
            0,
            RangeOptions {
                scope_key: Some("s".into()),
                values: vec![Binding::Unavailable, Binding::Unavailable],
                ..Default::default()
            },
        )
        .end_range(0, 9);
    let info = builder.build();

    let err = encode(&info, None).expect_err("count mismatch must fail");
    assert!(err.to_string().contains("variable"), "got: {err}");
}

#[test]
fn encode_rejects_foreign_definition_scopes() -> Result<()> {
    let mut donor = SafeScopeInfoBuilder::new();
    donor
        .start_scope(0, 0, ScopeOptions::default())?
        .end_scope(1, 0)?
        .start_scope(2, 0, ScopeOptions::default())?
        .end_scope(3, 0)?;
    let donor_info = donor.build()?;
    let foreign = donor_info.scopes[1].expect("donor scope");

    let mut builder = ScopeInfoBuilder::new();
    builder
        .start_range(0, 0, RangeOptions::default())
        .set_range_definition_scope(foreign)
        .end_range(0, 9);
    let info = builder.build();

    let err = encode(&info, None).expect_err("foreign scope id must fail");
    assert!(err.to_string().contains("unknown OriginalScope"), "got: {err}");
    Ok(())
}

#[test]
fn encode_rejects_out_of_order_positions() {
    // A child scope that closes before it opened.
    let mut builder = ScopeInfoBuilder::new();
    builder
        .start_scope(0, 0, ScopeOptions::default())
        .start_scope(5, 0, ScopeOptions::default())
        .end_scope(3, 0)
        .end_scope(10, 0);
    let info = builder.build();
    let err = encode(&info, None).expect_err("backwards scope end must fail");
    assert!(err.to_string().contains("precedes"), "got: {err}");

    // A child range starting before its parent.
    let mut builder = ScopeInfoBuilder::new();
    builder
        .start_range(5, 5, RangeOptions::default())
        .start_range(2, 0, RangeOptions::default())
        .end_range(6, 0)
        .end_range(7, 0);
    let info = builder.build();
    let err = encode(&info, None).expect_err("backwards range start must fail");
    assert!(err.to_string().contains("precedes"), "got: {err}");
}

#[test]
fn encode_rejects_gapped_sub_ranges() {
    let mut builder = ScopeInfoBuilder::new();
    builder
        .start_scope(
            0,
            0,
            ScopeOptions {
                variables: vec!["x".into()],
                key: Some("s".into()),
                ..Default::default()
            },
        )
        .end_scope(5, 0)
        .start_range(
            0,
            0,
            RangeOptions {
                scope_key: Some("s".into()),
                values: vec![Binding::SubRanges(vec![
                    SubRangeBinding {
                        value: Some("a".into()),
                        from: Position::new(0, 0),
                        to: Position::new(0, 3),
                    },
                    SubRangeBinding {
                        value: Some("b".into()),
                        from: Position::new(0, 4),
                        to: Position::new(1, 0),
                    },
                ])],
                ..Default::default()
            },
        )
        .end_range(1, 0);
    let info = builder.build();

    let err = encode(&info, None).expect_err("gapped sub-ranges must fail");
    assert!(err.to_string().contains("contiguous"), "got: {err}");
}
