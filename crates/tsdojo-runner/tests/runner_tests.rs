//! End-to-end runner tests: passing and failing suites, compile failures,
//! runtime errors, timeouts, async entry points, isolation between runs,
//! deep recursion on the worker stack, reports, and suite files.

use std::io::Write as _;

use tsdojo_runner::{
    run_report, run_tests, ErrorKind, Runner, RunnerConfig, TestCase, TestSuite, Value,
};

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn suite(name: &str, cases: Vec<(Value, Value)>) -> TestSuite {
    TestSuite::new(
        name,
        cases
            .into_iter()
            .map(|(input, expected)| TestCase { input, expected })
            .collect(),
    )
}

fn n(x: f64) -> Value {
    Value::Number(x)
}

fn s(text: &str) -> Value {
    Value::String(text.to_string())
}

const INC: &str = r#"
export function inc(a: number): number {
    return a + 1;
}
"#;

// ═══════════════════════════════════════════════════════════════════════════
// Basic outcomes
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn passing_suite() {
    let results = run_tests(INC, &suite("Addition", vec![(n(1.0), n(2.0)), (n(2.0), n(3.0))]))
        .expect("runner failed");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.passed));
    assert_eq!(results[0].actual, Some(n(2.0)));
    assert_eq!(results[0].error, None);
    assert_eq!(results[0].error_kind, None);
}

#[test]
fn mismatch_keeps_actual_and_expected() {
    let results = run_tests(INC, &suite("Off by one", vec![(n(1.0), n(3.0))])).unwrap();
    let r = &results[0];
    assert!(!r.passed);
    assert_eq!(r.actual, Some(n(2.0)));
    assert_eq!(r.expected, Some(n(3.0)));
    assert_eq!(r.error, None);
    assert_eq!(r.error_kind, Some(ErrorKind::Mismatch));
}

#[test]
fn syntax_error_yields_single_compile_result() {
    let cases = vec![(n(1.0), n(1.0)), (n(2.0), n(2.0)), (n(3.0), n(3.0))];
    let results = run_tests("export function broken(", &suite("Broken", cases)).unwrap();
    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert!(!r.passed);
    assert_eq!(r.expected, None);
    assert_eq!(r.actual, None);
    assert_eq!(r.error_kind, Some(ErrorKind::Compile));
    let error = r.error.as_deref().unwrap_or_default();
    assert!(error.starts_with("Code evaluation failed: "), "{error}");
    assert!(error.len() > "Code evaluation failed: ".len());
}

#[test]
fn missing_brace_is_compile_error() {
    let results = run_tests("export function broken {", &suite("Broken", vec![(n(1.0), n(1.0))]))
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].error_kind, Some(ErrorKind::Compile));
}

#[test]
fn top_level_exception_is_compile_error() {
    let code = "const config = undefinedThing.value;\nexport function f() { return 1; }";
    let results = run_tests(code, &suite("Init", vec![(Value::Null, n(1.0))])).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].error.as_deref(),
        Some("Code evaluation failed: undefinedThing is not defined")
    );
}

#[test]
fn runtime_error_reports_message() {
    let code = r#"
export function throwError() {
    throw new Error('Test error');
}
"#;
    let results = run_tests(code, &suite("Error", vec![(Value::Null, Value::Null)])).unwrap();
    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert!(!r.passed);
    assert_eq!(r.error.as_deref(), Some("Test error"));
    assert_eq!(r.error_kind, Some(ErrorKind::Runtime));
    assert_eq!(r.actual, None);
    assert_eq!(r.expected, Some(Value::Null));
}

#[test]
fn failures_do_not_leak_into_later_cases() {
    let code = r#"
export function half(x: number) {
    if (x % 2 !== 0) throw new RangeError(`${x} is odd`);
    return x / 2;
}
"#;
    let results = run_tests(
        code,
        &suite("Half", vec![(n(4.0), n(2.0)), (n(3.0), n(1.5)), (n(10.0), n(5.0))]),
    )
    .unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].passed);
    assert_eq!(results[1].error.as_deref(), Some("3 is odd"));
    assert!(results[2].passed);
}

#[test]
fn no_exports_fails_every_case() {
    let results = run_tests(
        "function helper() { return 1; }",
        &suite("Hidden", vec![(Value::Null, n(1.0)), (Value::Null, n(1.0))]),
    )
    .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.error_kind == Some(ErrorKind::ExportNotFound)));
}

#[test]
fn empty_suite_gives_no_results() {
    let results = run_tests(INC, &suite("Empty", Vec::new())).unwrap();
    assert!(results.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Values
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn structured_inputs_and_outputs() {
    let code = r#"
interface Stats { min: number; max: number; mean: number }

export function stats(xs: number[]): Stats {
    const min = Math.min(...xs);
    const max = Math.max(...xs);
    const mean = xs.reduce((a, b) => a + b, 0) / xs.length;
    return { mean, max, min };
}
"#;
    let input = Value::Array(vec![n(2.0), n(4.0), n(9.0)]);
    let expected = Value::object([("min", n(2.0)), ("max", n(9.0)), ("mean", n(5.0))]);
    let results = run_tests(code, &suite("Stats", vec![(input, expected)])).unwrap();
    assert!(results[0].passed, "{:?}", results[0]);
}

#[test]
fn undefined_result_does_not_equal_null() {
    let code = "export function nothing(_: unknown) {}";
    let results = run_tests(code, &suite("Void", vec![(Value::Null, Value::Null)])).unwrap();
    assert!(!results[0].passed);
    assert_eq!(results[0].actual, Some(Value::Undefined));
}

#[test]
fn string_result_does_not_equal_number() {
    let code = "export function show(x: number) { return String(x); }";
    let results = run_tests(code, &suite("Coercion", vec![(n(2.0), n(2.0))])).unwrap();
    assert!(!results[0].passed);
    assert_eq!(results[0].actual, Some(s("2")));
}

#[test]
fn typeof_classification() {
    let code = r#"
export function classify(value: unknown): string {
    if (value === null) return 'null';
    return typeof value;
}
"#;
    let cases = vec![
        (n(42.0), s("number")),
        (s("hello"), s("string")),
        (Value::Bool(true), s("boolean")),
        (Value::Null, s("null")),
    ];
    let results = run_tests(code, &suite("Basic Types", cases)).unwrap();
    assert!(results.iter().all(|r| r.passed), "{results:?}");
}

// ═══════════════════════════════════════════════════════════════════════════
// Deferred results and budgets
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn async_entry_point_is_awaited() {
    let code = r#"
const sleep = (ms: number) => new Promise<void>(resolve => setTimeout(resolve, ms));

export async function fetchUser(id: number) {
    await sleep(250);
    return { id, name: `user-${id}` };
}
"#;
    let expected = Value::object([("id", n(7.0)), ("name", s("user-7"))]);
    let results = run_tests(code, &suite("Async", vec![(n(7.0), expected)])).unwrap();
    assert!(results[0].passed, "{:?}", results[0]);
}

#[test]
fn rejected_promise_is_runtime_error() {
    let code = "export async function fail(msg: string) { throw new Error(msg); }";
    let results = run_tests(code, &suite("Reject", vec![(s("nope"), Value::Null)])).unwrap();
    assert_eq!(results[0].error.as_deref(), Some("nope"));
    assert_eq!(results[0].error_kind, Some(ErrorKind::Runtime));
}

#[test]
fn never_settling_promise_times_out() {
    let code = "export function hang() { return new Promise(() => {}); }";
    let results = run_tests(code, &suite("Hang", vec![(Value::Null, Value::Null)])).unwrap();
    assert_eq!(results[0].error_kind, Some(ErrorKind::Timeout));
}

#[test]
fn infinite_loop_times_out_and_next_case_runs() {
    let code = r#"
export function loop(n: number) {
    while (n < 0) {}
    return n;
}
"#;
    let config = RunnerConfig {
        case_step_limit: 50_000,
        ..RunnerConfig::default()
    };
    let results = Runner::new(config)
        .run_tests(code, &suite("Loop", vec![(n(-1.0), n(-1.0)), (n(1.0), n(1.0))]))
        .unwrap();
    assert_eq!(results[0].error_kind, Some(ErrorKind::Timeout));
    assert!(results[1].passed);
}

#[test]
fn stale_timer_from_failed_case_does_not_reach_next_case() {
    let code = r#"
export function pick(x: number) {
    if (x === 1) {
        setTimeout(() => { throw new Error('stale timer from case 1'); }, 0);
        throw new Error('case 1 fails');
    }
    return x;
}
"#;
    let results = run_tests(code, &suite("Stale", vec![(n(1.0), n(1.0)), (n(2.0), n(2.0))]))
        .unwrap();
    assert_eq!(results[0].error.as_deref(), Some("case 1 fails"));
    assert!(results[1].passed, "{:?}", results[1]);
    assert_eq!(results[1].error, None);
}

#[test]
fn looping_timers_from_failed_case_do_not_exhaust_next_case() {
    let code = r#"
export function pick(x: number) {
    if (x === 1) {
        setTimeout(() => { while (true) {} }, 0);
        setTimeout(() => { for (;;) {} }, 10);
        throw new Error('case 1 fails');
    }
    return x;
}
"#;
    let config = RunnerConfig {
        case_step_limit: 50_000,
        ..RunnerConfig::default()
    };
    let results = Runner::new(config)
        .run_tests(
            code,
            &suite("Stale loops", vec![(n(1.0), n(1.0)), (n(2.0), n(2.0)), (n(3.0), n(3.0))]),
        )
        .unwrap();
    assert_eq!(results[0].error_kind, Some(ErrorKind::Runtime));
    assert!(results[1].passed, "{:?}", results[1]);
    assert!(results[2].passed, "{:?}", results[2]);
}

#[test]
fn exhausted_case_leaves_no_continuation_behind() {
    let code = r#"
let resumed = 0;
export async function step(x: number) {
    if (x === 1) {
        setTimeout(() => { resumed += 1; }, 0);
        await null;
        while (true) {}
    }
    await new Promise(resolve => setTimeout(resolve, 5));
    return resumed;
}
"#;
    let config = RunnerConfig {
        case_step_limit: 50_000,
        ..RunnerConfig::default()
    };
    let results = Runner::new(config)
        .run_tests(code, &suite("Exhausted", vec![(n(1.0), n(0.0)), (n(2.0), n(0.0))]))
        .unwrap();
    assert_eq!(results[0].error_kind, Some(ErrorKind::Timeout));
    assert!(results[1].passed, "{:?}", results[1]);
}

#[test]
fn async_entry_points_interleave() {
    let code = r#"
const delay = async (ms: number, v: string) => {
    await new Promise(resolve => setTimeout(resolve, ms));
    return v;
};

export async function fastest(_: unknown) {
    const log: number[] = [];
    const inner = (async () => { log.push(1); await null; log.push(3); })();
    log.push(2);
    await inner;
    const winner = await Promise.race([delay(100, 'slow'), delay(50, 'fast')]);
    return [log, winner];
}
"#;
    let expected = Value::Array(vec![Value::Array(vec![n(1.0), n(2.0), n(3.0)]), s("fast")]);
    let results = run_tests(code, &suite("Interleave", vec![(Value::Null, expected)])).unwrap();
    assert!(results[0].passed, "{:?}", results[0]);
}

#[test]
fn regex_and_date_solutions_are_graded() {
    let slug = r#"
export function slug(title: string): string {
    return title.trim().toLowerCase().replace(/[^a-z0-9]+/g, '-').replace(/^-|-$/g, '');
}
"#;
    let slugs = run_tests(
        slug,
        &suite(
            "Slug",
            vec![
                (s("  Hello, World! "), s("hello-world")),
                (s("Rust & TypeScript"), s("rust-typescript")),
            ],
        ),
    )
    .unwrap();
    assert!(slugs.iter().all(|r| r.passed), "{slugs:?}");

    let weekday = r#"
export function weekday(iso: string): number {
    return new Date(iso).getUTCDay();
}
"#;
    let days = suite("Weekday", vec![(s("2024-01-01"), n(1.0)), (s("not a date"), n(0.0))]);
    let results = run_tests(weekday, &days).unwrap();
    assert!(!results[1].passed);
    assert!(results[0].passed, "{:?}", results[0]);
}

#[test]
fn deep_recursion_is_catchable_range_error() {
    let code = r#"
export function depth(n: number): number {
    return n === 0 ? 0 : 1 + depth(n - 1);
}
"#;
    let results = run_tests(
        code,
        &suite("Depth", vec![(n(500.0), n(500.0)), (n(100_000.0), n(0.0))]),
    )
    .unwrap();
    assert!(results[0].passed, "{:?}", results[0]);
    assert_eq!(
        results[1].error.as_deref(),
        Some("Maximum call stack size exceeded")
    );
    assert_eq!(results[1].error_kind, Some(ErrorKind::Runtime));
}

// ═══════════════════════════════════════════════════════════════════════════
// Isolation and determinism
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn separate_runs_share_nothing() {
    let code = r#"
let calls = 0;
export function count(_: unknown) {
    calls += 1;
    (globalThis as any).seen = ((globalThis as any).seen ?? 0) + 1;
    return [calls, (globalThis as any).seen];
}
"#;
    let one = suite("Count", vec![(Value::Null, Value::Array(vec![n(1.0), n(1.0)]))]);
    for _ in 0..3 {
        let results = run_tests(code, &one).unwrap();
        assert!(results[0].passed, "{:?}", results[0]);
    }
}

#[test]
fn repeated_runs_are_identical() {
    let code = r#"
export function noisy(seed: number) {
    const xs = Array.from({ length: 5 }, () => Math.random());
    return xs.map(x => Math.floor(x * 1000) + seed);
}
"#;
    let s1 = suite("Random", vec![(n(1.0), Value::Null)]);
    let first = run_tests(code, &s1).unwrap();
    let second = run_tests(code, &s1).unwrap();
    assert_eq!(first, second);
}

// ═══════════════════════════════════════════════════════════════════════════
// Reports
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn report_totals_and_console() {
    let code = r#"
console.log('loading');
export function inc(a: number) {
    console.log('inc', a);
    return a + 1;
}
"#;
    let report = run_report(
        code,
        &suite("Addition", vec![(n(1.0), n(2.0)), (n(2.0), n(4.0))]),
    )
    .unwrap();
    assert_eq!(report.name, "Addition");
    assert_eq!((report.total, report.passed, report.failed), (2, 1, 1));
    assert_eq!(report.console, ["loading", "inc 1", "inc 2"]);
}

#[test]
fn report_json_shape() {
    let report = run_report(INC, &suite("Addition", vec![(n(1.0), n(2.0))])).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["passed"], 1);
    assert_eq!(json["results"][0]["passed"], true);
    assert_eq!(json["results"][0]["actual"], 2);
}

// ═══════════════════════════════════════════════════════════════════════════
// Suite files
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn suite_files_by_extension() {
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("addition.json");
    let mut file = std::fs::File::create(&json_path).unwrap();
    write!(
        file,
        r#"{{ "name": "Addition", "cases": [{{ "input": 1, "expected": 2 }}] }}"#
    )
    .unwrap();

    let toml_path = dir.path().join("addition.toml");
    std::fs::write(
        &toml_path,
        "name = \"Addition\"\n\n[[cases]]\ninput = 1\nexpected = 2\n",
    )
    .unwrap();

    let from_json = TestSuite::load(&json_path).unwrap();
    let from_toml = TestSuite::load(&toml_path).unwrap();
    assert_eq!(from_json, from_toml);
    assert!(run_tests(INC, &from_json).unwrap()[0].passed);
}

#[test]
fn missing_suite_file_is_io_error() {
    let err = TestSuite::load(std::path::Path::new("does/not/exist.json")).unwrap_err();
    assert!(err.to_string().starts_with("cannot read"), "{err}");
}
