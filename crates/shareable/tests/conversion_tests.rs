//! Conversion engine tests

use std::sync::Arc;

use pretty_assertions::assert_eq;
use shareable::host::js::JsValue;
use shareable::*;

// ═══════════════════════════════════════════════════════════════════════
// Primitives
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_primitives_round_trip_in_any_runtime() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let ui = exchange.runtime("UI");
    let worklet = exchange.runtime("Worklet-1");

    let cases = vec![
        (JsValue::Undefined, NativeValue::Undefined),
        (JsValue::Null, NativeValue::Null),
        (JsValue::from(true), NativeValue::Bool(true)),
        (JsValue::from(false), NativeValue::Bool(false)),
        (JsValue::from(0.0), NativeValue::Number(0.0)),
        (JsValue::from(-1.5), NativeValue::Number(-1.5)),
        (JsValue::from(""), NativeValue::String(Arc::from(""))),
        (JsValue::from("héllo"), NativeValue::String(Arc::from("héllo"))),
    ];

    for (source, expected) in cases {
        let shared = ui.share(&source)?;
        assert_eq!(shared.tag(), ShareableTag::Primitive);
        assert_eq!(ui.materialize(&shared)?, expected);
        assert_eq!(worklet.materialize(&shared)?, expected);
    }
    Ok(())
}

#[test]
fn test_nan_survives_conversion() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let shared = rt.share(&JsValue::from(f64::NAN))?;
    let native = rt.materialize(&shared)?;
    assert!(native.as_number().is_some_and(f64::is_nan));
    Ok(())
}

#[test]
fn test_primitives_do_not_touch_registry() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    rt.share(&JsValue::from("text"))?;
    assert!(exchange.registry().is_empty());
    Ok(())
}

#[test]
fn test_primitive_from_rust_values() {
    let cases = vec![
        (Primitive::from(true), "boolean", "true"),
        (Primitive::from(2.5), "number", "2.5"),
        (Primitive::from("hi"), "string", "\"hi\""),
        (Primitive::from(String::from("owned")), "string", "\"owned\""),
    ];

    for (primitive, name, shown) in cases {
        assert_eq!(primitive.type_name(), name);
        assert_eq!(primitive.to_string(), shown);
        assert_eq!(
            Shareable::primitive(primitive.clone()).as_primitive(),
            Some(&primitive)
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Containers
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_object_keeps_field_order() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let obj = JsValue::object_from([
        ("zeta", JsValue::from(1.0)),
        ("alpha", JsValue::from(2.0)),
        ("mid", JsValue::from(3.0)),
    ]);

    let shared = rt.share(&obj)?;
    assert_eq!(shared.tag(), ShareableTag::Map);
    assert_eq!(shared.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    assert_eq!(shared.get("alpha").and_then(|v| v.as_number()), Some(2.0));
    Ok(())
}

#[test]
fn test_array_elements() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let arr = JsValue::array(vec![JsValue::from(1.0), JsValue::from("two"), JsValue::Null]);

    let shared = rt.share(&arr)?;
    assert_eq!(shared.tag(), ShareableTag::Sequence);
    assert_eq!(shared.len(), 3);
    assert_eq!(shared.get_index(1).and_then(|v| v.as_str()), Some("two"));
    assert!(shared.get_index(3).is_none());
    Ok(())
}

#[test]
fn test_shared_child_is_converted_once() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let child = JsValue::object_from([("v", JsValue::from(1.0))]);
    let parent = JsValue::object_from([("left", child.clone()), ("right", child)]);

    let shared = rt.share(&parent)?;
    let (Some(left), Some(right)) = (shared.get("left"), shared.get("right")) else {
        panic!("Expected both fields");
    };
    assert!(Arc::ptr_eq(left, right));
    Ok(())
}

#[test]
fn test_conversion_is_a_snapshot_of_plain_fields() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let obj = JsValue::object_from([("x", JsValue::from(1.0))]);

    let shared = rt.share(&obj)?;
    obj.set("x", JsValue::from(99.0));
    obj.set("y", JsValue::from(2.0));

    assert_eq!(shared.get("x").and_then(|v| v.as_number()), Some(1.0));
    assert!(shared.get("y").is_none());
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Cycles and Unsupported Values
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_self_reference_is_rejected_without_leaking_cells() {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let obj = JsValue::object_from([("counter", JsValue::mutable(JsValue::from(0.0)))]);
    obj.set("self", obj.clone());

    let before = exchange.registry().len();
    let err = rt.share(&obj).unwrap_err();

    assert_eq!(
        err,
        ShareError::Cyclic {
            path: "self".to_string()
        }
    );
    assert_eq!(exchange.registry().len(), before);
    assert_eq!(exchange.registry().purge(), 0);
}

#[test]
fn test_array_containing_itself_is_rejected() {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let arr = JsValue::array(vec![JsValue::from(1.0)]);
    arr.push(arr.clone());

    let err = rt.share(&arr).unwrap_err();
    assert_eq!(
        err,
        ShareError::Cyclic {
            path: "1".to_string()
        }
    );
}

#[test]
fn test_failed_conversion_keeps_existing_cells() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let counter = JsValue::mutable(JsValue::from(0.0));
    let good = rt.share(&JsValue::object_from([("counter", counter.clone())]))?;

    let bad = JsValue::object_from([("counter", counter)]);
    bad.set("loop", bad.clone());
    assert!(rt.share(&bad).is_err());

    assert_eq!(exchange.registry().len(), 1);
    assert_eq!(good.mutables().len(), 1);
    Ok(())
}

#[test]
fn test_unsupported_value() {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let err = rt.share(&JsValue::symbol("iterator")).unwrap_err();
    assert_eq!(
        err,
        ShareError::Unsupported("cannot share symbol at `<root>`".to_string())
    );
}

#[test]
fn test_depth_limit_from_config() {
    let exchange = Exchange::with_config(ShareConfig::with_max_depth(2));
    let rt = exchange.runtime("UI");
    let deep = JsValue::object_from([(
        "a",
        JsValue::object_from([("b", JsValue::object_from([("c", JsValue::Null)]))]),
    )]);

    let err = rt.share(&deep).unwrap_err();
    assert_eq!(err, ShareError::DepthExceeded { depth: 3, max: 2 });
}

#[test]
fn test_traced_conversion_gives_same_result() -> anyhow::Result<()> {
    let exchange = Exchange::with_config(ShareConfig::new().traced());
    let rt = exchange.runtime("UI");
    assert!(exchange.config().trace);

    let shared = rt.share(&JsValue::object_from([("x", JsValue::from(1.0))]))?;
    assert_eq!(format!("{:?}", shared), "{ x: 1 }");
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Functions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_worklet_closure_is_converted() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let worklet = JsValue::function(FunctionRef::worklet("animate"));
    worklet.set("speed", JsValue::from(2.0));

    let shared = rt.share(&worklet)?;
    let ShareableKind::Function { func, closure } = shared.kind() else {
        panic!("Expected function");
    };
    assert_eq!(func.name(), "animate");
    assert!(shared.affinity().is_none());
    let closure = closure.as_ref().expect("closure");
    assert_eq!(closure.get("speed").and_then(|v| v.as_number()), Some(2.0));
    Ok(())
}

#[test]
fn test_host_function_is_pinned_to_origin() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("JS");
    let shared = rt.share(&JsValue::function(FunctionRef::host("setState")))?;
    assert_eq!(shared.affinity(), Some(rt.id()));
    Ok(())
}

#[test]
fn test_recursive_worklet_is_cyclic() {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let worklet = JsValue::function(FunctionRef::worklet("loop"));
    worklet.set("again", worklet.clone());

    let err = rt.share(&worklet).unwrap_err();
    assert!(matches!(err, ShareError::Cyclic { .. }));
}

// ═══════════════════════════════════════════════════════════════════════
// Mutable Cells
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_same_cell_under_two_keys_is_one_cell() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let cell = JsValue::mutable(JsValue::from(1.0));
    let obj = JsValue::object_from([("a", cell.clone()), ("b", cell)]);

    let shared = rt.share(&obj)?;
    let a = shared.get("a").and_then(|v| v.as_cell()).expect("cell a");
    let b = shared.get("b").and_then(|v| v.as_cell()).expect("cell b");
    assert!(a.ptr_eq(b));

    a.write(Shareable::number(7.0))?;
    assert_eq!(b.read().as_number(), Some(7.0));
    assert_eq!(exchange.registry().len(), 1);
    Ok(())
}

#[test]
fn test_registered_cell_is_authoritative() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let cell = JsValue::mutable(JsValue::from(1.0));
    let first = rt.share(&JsValue::object_from([("c", cell.clone())]))?;

    cell.assign(JsValue::from(2.0));
    let second = rt.share(&JsValue::object_from([("c", cell)]))?;

    let a = first.get("c").and_then(|v| v.as_cell()).expect("first cell");
    let b = second.get("c").and_then(|v| v.as_cell()).expect("second cell");
    assert!(a.ptr_eq(b));
    assert_eq!(b.read().as_number(), Some(1.0));
    Ok(())
}

#[test]
fn test_cell_is_freed_with_last_value() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let cell = JsValue::mutable(JsValue::from(1.0));
    let key = cell.cell_key().expect("key");

    let shared = rt.share(&JsValue::object_from([("c", cell)]))?;
    assert!(exchange.registry().contains(key));
    drop(shared);
    assert!(!exchange.registry().contains(key));
    Ok(())
}

#[test]
fn test_mutables_are_extracted_once_each() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let first = JsValue::mutable(JsValue::from(1.0));
    let nested = JsValue::mutable(JsValue::from(2.0));
    let outer = JsValue::mutable(JsValue::object_from([("nested", nested.clone())]));
    let obj = JsValue::object_from([
        ("a", first.clone()),
        ("b", JsValue::array(vec![first.clone(), outer.clone()])),
    ]);

    let shared = rt.share(&obj)?;
    let mut keys: Vec<CellKey> = shared.mutables().iter().map(CellHandle::key).collect();
    keys.sort();

    let mut expected: Vec<CellKey> = [first, nested, outer]
        .iter()
        .filter_map(JsValue::cell_key)
        .collect();
    expected.sort();
    assert_eq!(keys, expected);
    Ok(())
}

#[test]
fn test_pinned_conversion_tags_containers() -> anyhow::Result<()> {
    let exchange = Exchange::new();
    let rt = exchange.runtime("UI");
    let obj = JsValue::object_from([
        ("inner", JsValue::object()),
        ("n", JsValue::from(1.0)),
    ]);

    let shared = rt.share_pinned(&obj)?;
    assert_eq!(shared.affinity(), Some(rt.id()));
    assert_eq!(shared.get("inner").and_then(|v| v.affinity()), Some(rt.id()));
    assert_eq!(shared.get("n").and_then(|v| v.affinity()), None);
    Ok(())
}
