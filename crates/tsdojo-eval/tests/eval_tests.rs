//! Interpreter tests: arithmetic and coercion, closures, classes,
//! destructuring, the array/string/number libraries, exceptions and their
//! messages, promises and async functions, virtual-time timers, the step
//! budget, call depth, JSON, collections, console capture, and the host
//! boundary (`export_value`, opaque leaves).

use tsdojo_eval::{ConsoleLevel, EvalError, Interpreter, JsValue, Limits, Settled};
use tsdojo_types::{SourceFile, Value};

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn parse(source: &str) -> tsdojo_types::ast::Program {
    let sf = SourceFile::new("solution.ts", source);
    let result = tsdojo_parser::parse_source(&sf);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  ERROR: {} ({})", e.message, e.code);
        }
        panic!("unexpected parse errors (see above)");
    }
    result.program.expect("no program returned")
}

/// Parse and run `source`, panicking if it throws.
fn run(source: &str) -> Interpreter {
    let program = parse(source);
    let mut interp = Interpreter::new(Limits::default());
    if let Err(err) = interp.run_program(&program) {
        let shown = match &err {
            EvalError::Throw(value) => interp.error_message(value),
            other => other.to_string(),
        };
        panic!("program failed: {shown}");
    }
    interp
}

/// Run `source` and snapshot the top-level binding `name`.
fn eval(source: &str, name: &str) -> Value {
    let mut interp = run(source);
    let value = interp.binding(name).expect("binding not found");
    interp.export_value(&value).expect("export failed")
}

/// Run `source`, expecting it to throw; returns the reported message.
fn thrown(source: &str) -> String {
    let program = parse(source);
    let mut interp = Interpreter::new(Limits::default());
    match interp.run_program(&program) {
        Err(EvalError::Throw(value)) => interp.error_message(&value),
        Err(other) => panic!("expected a throw, got {other:?}"),
        Ok(()) => panic!("expected a throw, program completed"),
    }
}

/// Call the top-level function `name` with `args`.
fn call(interp: &mut Interpreter, name: &str, args: Vec<JsValue>) -> JsValue {
    let f = interp.binding(name).expect("function not found");
    interp
        .call_value(&f, JsValue::Undefined, args)
        .expect("call failed")
}

fn log_lines(interp: &Interpreter) -> Vec<String> {
    interp.console().iter().map(|line| line.text.clone()).collect()
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn s(text: &str) -> Value {
    Value::String(text.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════
// Expressions and coercion
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(eval("const r = 1 + 2 * 3 - 4 / 2;", "r"), num(5.0));
    assert_eq!(eval("const r = 2 ** 3 ** 2;", "r"), num(512.0));
    assert_eq!(eval("const r = 7 % 3 + (-7 % 3);", "r"), num(0.0));
}

#[test]
fn string_concatenation_coerces() {
    assert_eq!(eval("const r = 1 + '2';", "r"), s("12"));
    assert_eq!(eval("const r = '3' * '4';", "r"), num(12.0));
    assert_eq!(eval("const r = [1, 2] + '';", "r"), s("1,2"));
    assert_eq!(eval("const r = 0.1 + 0.2;", "r"), num(0.1 + 0.2));
}

#[test]
fn equality_operators() {
    let r = eval(
        "const r = [1 == '1', 1 === '1', null == undefined, null === undefined, NaN === NaN];",
        "r",
    );
    assert_eq!(
        r,
        Value::Array(vec![
            Value::Bool(true),
            Value::Bool(false),
            Value::Bool(true),
            Value::Bool(false),
            Value::Bool(false),
        ])
    );
}

#[test]
fn typeof_reports_runtime_types() {
    let r = eval(
        "const r = [typeof 1, typeof 'a', typeof undefined, typeof null, typeof {}, typeof (() => 1)];",
        "r",
    );
    assert_eq!(
        r,
        Value::Array(vec![
            s("number"),
            s("string"),
            s("undefined"),
            s("object"),
            s("object"),
            s("function"),
        ])
    );
}

#[test]
fn template_literals_interpolate() {
    let src = "const name = 'Ada'; const n = 3; const r = `hi ${name}, ${n * 2} left`;";
    assert_eq!(eval(src, "r"), s("hi Ada, 6 left"));
}

#[test]
fn optional_chaining_and_nullish_coalescing() {
    let src = r#"
        const o: any = { a: { b: 1 } };
        const r = [o?.a?.b, o.x?.y.z, o.x ?? 'd', 0 ?? 5, o.f?.()];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![num(1.0), Value::Undefined, s("d"), num(0.0), Value::Undefined])
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Functions, closures, classes
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn closures_capture_their_scope() {
    let src = r#"
        function counter() {
            let n = 0;
            return () => ++n;
        }
        const c = counter();
        c(); c();
        const r = c();
    "#;
    assert_eq!(eval(src, "r"), num(3.0));
}

#[test]
fn function_declarations_are_hoisted() {
    let src = "const r = double(21); function double(x: number): number { return x * 2; }";
    assert_eq!(eval(src, "r"), num(42.0));
}

#[test]
fn default_and_rest_parameters() {
    let src = r#"
        function f(a: number, b = 10, ...rest: number[]) { return a + b + rest.length; }
        const r = [f(1), f(1, 2), f(1, 2, 3, 4)];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![num(11.0), num(3.0), num(5.0)])
    );
}

#[test]
fn classes_with_inheritance() {
    let src = r#"
        class Animal {
            constructor(public name: string) {}
            speak(): string { return `${this.name} makes a sound`; }
            get upper(): string { return this.name.toUpperCase(); }
        }
        class Dog extends Animal {
            speak(): string { return super.speak() + ' (woof)'; }
        }
        const d = new Dog('Rex');
        const r = [d.speak(), d.upper, d instanceof Animal, d instanceof Dog];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![
            s("Rex makes a sound (woof)"),
            s("REX"),
            Value::Bool(true),
            Value::Bool(true),
        ])
    );
}

#[test]
fn static_members_and_fields() {
    let src = r#"
        class Counter {
            static created = 0;
            count = 0;
            constructor() { Counter.created++; }
            inc() { this.count++; return this; }
        }
        new Counter();
        const c = new Counter().inc().inc();
        const r = [Counter.created, c.count];
    "#;
    assert_eq!(eval(src, "r"), Value::Array(vec![num(2.0), num(2.0)]));
}

#[test]
fn destructuring_patterns() {
    let src = r#"
        const { a, b: { c = 5 } = {}, ...others } = { a: 1, d: 4, e: 5 } as any;
        const [x, , y = 9, ...tail] = [1, 2, undefined, 4, 5];
        const r = [a, c, Object.keys(others).join(''), x, y, tail.length];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![num(1.0), num(5.0), s("de"), num(1.0), num(9.0), num(2.0)])
    );
}

#[test]
fn spread_in_calls_arrays_and_objects() {
    let src = r#"
        const xs = [3, 1, 2];
        const m = Math.max(...xs);
        const ys = [0, ...xs, 4];
        const o = { ...{ a: 1, b: 2 }, b: 3 };
        const r = [m, ys.length, o.b];
    "#;
    assert_eq!(eval(src, "r"), Value::Array(vec![num(3.0), num(5.0), num(3.0)]));
}

// ═══════════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn labelled_loops_break_outer() {
    let src = r#"
        let hits = 0;
        outer: for (let i = 0; i < 5; i++) {
            for (let j = 0; j < 5; j++) {
                if (j === 2) continue outer;
                if (i === 3) break outer;
                hits++;
            }
        }
        const r = hits;
    "#;
    assert_eq!(eval(src, "r"), num(6.0));
}

#[test]
fn switch_falls_through_until_break() {
    let src = r#"
        function label(n: number): string {
            let out = '';
            switch (n) {
                case 1: out += 'one';
                case 2: out += 'two'; break;
                default: out += 'other';
            }
            return out;
        }
        const r = [label(1), label(2), label(3)];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![s("onetwo"), s("two"), s("other")])
    );
}

#[test]
fn try_catch_finally_order() {
    let src = r#"
        const trace: string[] = [];
        function f(): string {
            try {
                trace.push('try');
                throw new Error('boom');
            } catch (e) {
                trace.push('catch:' + (e as Error).message);
                return 'from-catch';
            } finally {
                trace.push('finally');
            }
        }
        const r = [f(), trace.join(',')];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![s("from-catch"), s("try,catch:boom,finally")])
    );
}

#[test]
fn for_of_and_for_in() {
    let src = r#"
        let sum = 0;
        for (const x of [1, 2, 3]) sum += x;
        const keys: string[] = [];
        for (const k in { a: 1, b: 2 }) keys.push(k);
        let chars = '';
        for (const ch of 'hey') chars = ch + chars;
        const r = [sum, keys.join(''), chars];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![num(6.0), s("ab"), s("yeh")])
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Error messages
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn thrown_error_reports_message() {
    assert_eq!(thrown("throw new Error('bad input');"), "bad input");
    assert_eq!(thrown("throw 'plain';"), "plain");
    assert_eq!(thrown("throw 42;"), "42");
}

#[test]
fn reading_property_of_undefined() {
    assert_eq!(
        thrown("const o: any = undefined; o.x;"),
        "Cannot read properties of undefined (reading 'x')"
    );
}

#[test]
fn undefined_variable_is_reference_error() {
    assert_eq!(thrown("missing + 1;"), "missing is not defined");
    let src = r#"
        let kind = '';
        try { missing; } catch (e) { kind = (e as Error).name; }
        const r = kind;
    "#;
    assert_eq!(eval(src, "r"), s("ReferenceError"));
}

#[test]
fn assignment_to_const_throws() {
    assert_eq!(thrown("const x = 1; x = 2;"), "Assignment to constant variable.");
}

#[test]
fn calling_a_non_function() {
    let message = thrown("const o: any = { f: 1 }; o.f();");
    assert!(message.ends_with("is not a function"), "{message}");
}

#[test]
fn deep_recursion_throws_range_error() {
    // Each script frame spans several host frames.
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(deep_recursion)
        .expect("spawn");
    handle.join().expect("recursion test panicked");
}

fn deep_recursion() {
    let src = r#"
        function down(n: number): number { return down(n + 1); }
        let caught = '';
        try { down(0); } catch (e) { caught = (e as Error).name + ': ' + (e as Error).message; }
        const r = caught;
    "#;
    assert_eq!(
        eval(src, "r"),
        s("RangeError: Maximum call stack size exceeded")
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Library
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn array_method_chain() {
    let src = r#"
        const r = [5, 1, 4, 2, 3]
            .filter(x => x !== 4)
            .map(x => x * 10)
            .sort((a, b) => a - b)
            .reduce((acc, x) => acc + x, 0);
    "#;
    assert_eq!(eval(src, "r"), num(110.0));
}

#[test]
fn default_sort_compares_as_strings() {
    let src = "const r = [10, 9, 1, 100].sort();";
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![num(1.0), num(10.0), num(100.0), num(9.0)])
    );
}

#[test]
fn sort_is_stable() {
    let src = r#"
        const people = [
            { n: 'a', age: 30 }, { n: 'b', age: 20 }, { n: 'c', age: 30 }, { n: 'd', age: 20 },
        ];
        const r = people.sort((x, y) => x.age - y.age).map(p => p.n).join('');
    "#;
    assert_eq!(eval(src, "r"), s("bdac"));
}

#[test]
fn array_search_and_slicing() {
    let src = r#"
        const xs = [1, 2, 3, 2, NaN];
        const r = [
            xs.indexOf(2), xs.lastIndexOf(2), xs.includes(NaN), xs.indexOf(NaN),
            xs.slice(-2).length, xs.at(-2), xs.findIndex(x => x > 2),
        ];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![
            num(1.0),
            num(3.0),
            Value::Bool(true),
            num(-1.0),
            num(2.0),
            num(2.0),
            num(2.0),
        ])
    );
}

#[test]
fn splice_and_flat() {
    let src = r#"
        const xs = [1, 2, 3, 4, 5];
        const removed = xs.splice(1, 2, 9);
        const r = [xs.join(','), removed.join(','), [[1, [2]], [3]].flat(Infinity).join(',')];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![s("1,9,4,5"), s("2,3"), s("1,2,3")])
    );
}

#[test]
fn string_methods() {
    let src = r#"
        const t = '  Hello, World  ';
        const r = [
            t.trim(), t.trim().toLowerCase(), 'a-b-c'.split('-').length,
            'abc'.padStart(5, '*'), 'ab'.repeat(3), 'hello'.replace('l', 'L'),
            'hello'.replaceAll('l', 'L'), 'Hello'.startsWith('He'), 'abcdef'.slice(-3, -1),
            'abcdef'.substring(4, 1),
        ];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![
            s("Hello, World"),
            s("hello, world"),
            num(3.0),
            s("**abc"),
            s("ababab"),
            s("heLlo"),
            s("heLLo"),
            Value::Bool(true),
            s("de"),
            s("bcd"),
        ])
    );
}

#[test]
fn number_formatting() {
    let src = r#"
        const r = [
            (1.005).toFixed(2), (2.5).toFixed(0), (255).toString(16), (0.5).toString(2),
            String(1e21), String(123456789012), parseInt('42px'), parseFloat('3.5e1x'),
            Number(''), Number('0x1f'),
        ];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![
            s("1.00"),
            s("3"),
            s("ff"),
            s("0.1"),
            s("1e+21"),
            s("123456789012"),
            num(42.0),
            num(35.0),
            num(0.0),
            num(31.0),
        ])
    );
}

#[test]
fn math_functions() {
    let src = r#"
        const r = [
            Math.round(2.5), Math.round(-2.5), Math.max(), Math.min(3, 1, 2),
            Math.trunc(-4.7), Math.sign(-3), Math.hypot(3, 4), Math.abs(-7),
        ];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![
            num(3.0),
            num(-2.0),
            num(f64::NEG_INFINITY),
            num(1.0),
            num(-4.0),
            num(-1.0),
            num(5.0),
            num(7.0),
        ])
    );
}

#[test]
fn math_random_is_deterministic_per_interpreter() {
    let src = "const r = [Math.random(), Math.random()];";
    let first = eval(src, "r");
    let second = eval(src, "r");
    assert_eq!(first, second);
    match first {
        Value::Array(items) => {
            assert_ne!(items[0], items[1]);
            for item in items {
                match item {
                    Value::Number(n) => assert!((0.0..1.0).contains(&n)),
                    other => panic!("expected number, got {other:?}"),
                }
            }
        }
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn json_round_trip() {
    let src = r#"
        const text = JSON.stringify({ b: [1, 'x', null, undefined], a: { c: true }, f: () => 1 });
        const back = JSON.parse(text);
        const pretty = JSON.stringify([1, { k: 2 }], null, 2);
        const r = [text, back.b.length, back.a.c, pretty];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![
            s(r#"{"b":[1,"x",null,null],"a":{"c":true}}"#),
            num(4.0),
            Value::Bool(true),
            s("[\n  1,\n  {\n    \"k\": 2\n  }\n]"),
        ])
    );
}

#[test]
fn json_errors() {
    assert_eq!(thrown("JSON.parse('{');"), "Unexpected end of JSON input");
    assert_eq!(
        thrown("const o: any = {}; o.self = o; JSON.stringify(o);"),
        "Converting circular structure to JSON"
    );
}

#[test]
fn map_and_set_keep_insertion_order() {
    let src = r#"
        const m = new Map<string, number>([['b', 2], ['a', 1]]);
        m.set('c', 3).delete('b');
        const set = new Set([3, 1, 3, 2, 1]);
        const r = [[...m.keys()].join(''), m.get('a'), m.size, [...set].join(''), set.has(2)];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![s("ac"), num(1.0), num(2.0), s("312"), Value::Bool(true)])
    );
}

#[test]
fn regex_literals_drive_string_methods() {
    let src = r#"
        const r = [
            'a-b_c'.replace(/[-_]/g, ' '),
            'x1y22z333'.match(/\d+/g),
            /^(\w+)@(\w+)\.com$/.test('me@site.com'),
            'John Smith'.replace(/(\w+)\s(\w+)/, '$2, $1'),
            'a1b2'.replace(/\d/g, (d: string) => String(Number(d) * 2)),
            'one, two,three'.split(/\s*,\s*/),
            'Hello'.search(/l+/),
            /ab/gi.flags,
            'no digits'.match(/\d/),
        ];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![
            s("a b c"),
            Value::Array(vec![s("1"), s("22"), s("333")]),
            Value::Bool(true),
            s("Smith, John"),
            s("a2b4"),
            Value::Array(vec![s("one"), s("two"), s("three")]),
            num(2.0),
            s("gi"),
            Value::Null,
        ])
    );
}

#[test]
fn regexp_exec_tracks_last_index() {
    let src = r#"
        const re = /(?<word>[a-z]+)(\d)/g;
        const text = 'ab1 cd2';
        const first: any = re.exec(text);
        const afterFirst = re.lastIndex;
        const second: any = re.exec(text);
        const third = re.exec(text);
        const r = [
            first[0], first.index, first.groups.word, afterFirst,
            second[2], third, re.lastIndex,
            [...'a1b2'.matchAll(/[a-z](\d)/g)].map((m) => m[1]).join(''),
            new RegExp('a+', 'g').toString(),
            String(new RegExp('x/y')),
        ];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![
            s("ab1"),
            num(0.0),
            s("ab"),
            num(3.0),
            s("2"),
            Value::Null,
            num(0.0),
            s("12"),
            s("/a+/g"),
            s(r"/x\/y/"),
        ])
    );
}

#[test]
fn unsupported_patterns_throw_syntax_errors() {
    assert_eq!(
        thrown("new RegExp('(?<=a)b');"),
        "Invalid regular expression: /(?<=a)b/: Unsupported pattern"
    );
    assert_eq!(
        thrown("new RegExp('a', 'q');"),
        "Invalid flags supplied to RegExp constructor 'q'"
    );
    assert_eq!(
        thrown("'aa'.replaceAll(/a/, 'b');"),
        "replaceAll must be called with a global RegExp"
    );
    let src = r#"
        let kind = '';
        try { new RegExp('(?<!x)y'); } catch (e) { kind = e instanceof SyntaxError ? 'syntax' : 'other'; }
    "#;
    assert_eq!(eval(src, "kind"), s("syntax"));
}

#[test]
fn dates_from_components_and_strings() {
    let src = r#"
        const d = new Date(2024, 0, 31);
        d.setMonth(1);
        const at = new Date('2020-05-17T10:20:30.400Z');
        const r = [
            d.toISOString(),
            at.getFullYear(), at.getMonth(), at.getDate(), at.getDay(), at.getHours(),
            at.getTime(),
            Date.UTC(1970, 0, 2),
            isNaN(new Date(NaN).getTime()),
            String(new Date('nope')),
            JSON.stringify({ at: new Date(0) }),
            new Date(1000) < new Date(2000),
            (new Date(5000) as any) - (new Date(2000) as any),
            new Date(0) + '',
        ];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![
            s("2024-03-02T00:00:00.000Z"),
            num(2020.0),
            num(4.0),
            num(17.0),
            num(0.0),
            num(10.0),
            num(1_589_710_830_400.0),
            num(86_400_000.0),
            Value::Bool(true),
            s("Invalid Date"),
            s(r#"{"at":"1970-01-01T00:00:00.000Z"}"#),
            Value::Bool(true),
            num(3000.0),
            s("Thu Jan 01 1970 00:00:00 GMT+0000 (Coordinated Universal Time)"),
        ])
    );
    assert_eq!(
        thrown("new Date(NaN).toISOString();"),
        "Invalid time value"
    );
}

#[test]
fn date_now_follows_the_virtual_clock() {
    let program = parse(
        r#"
        const start = Date.now();
        const same = new Date().getTime() === start;
        let elapsed = -1;
        setTimeout(() => { elapsed = Date.now() - start; }, 250);
    "#,
    );
    let mut interp = Interpreter::new(Limits::default());
    interp.set_clock_origin(1_700_000_000_000);
    interp.run_program(&program).expect("program runs");
    let read = |interp: &mut Interpreter, name: &str| {
        let value = interp.binding(name).expect("binding");
        interp.export_value(&value).expect("export")
    };
    assert_eq!(read(&mut interp, "start"), num(1_700_000_000_000.0));
    assert_eq!(read(&mut interp, "same"), Value::Bool(true));
    assert_eq!(read(&mut interp, "elapsed"), num(250.0));
}

#[test]
fn dates_and_regexes_cross_the_host_boundary() {
    assert_eq!(eval("const d = new Date(86400000);", "d"), s("1970-01-02T00:00:00.000Z"));
    assert_eq!(eval("const d = new Date('bad');", "d"), Value::Null);
    assert_eq!(
        eval("const re = /a+/g;", "re"),
        Value::Opaque("/a+/g".to_string())
    );
    let interp = run("console.log(/x/i, new Date(0), [/y/]);");
    assert_eq!(
        log_lines(&interp),
        vec!["/x/i 1970-01-01T00:00:00.000Z [ /y/ ]".to_string()]
    );
}

#[test]
fn object_statics() {
    let src = r#"
        const o = { x: 1, y: 2 };
        const frozen = Object.freeze({ z: 1 }) as any;
        try { frozen.z = 5; } catch {}
        const r = [
            Object.keys(o).join(','), Object.values(o).join(','),
            Object.entries(o).map(([k, v]) => k + v).join(','),
            Object.assign({}, o, { y: 3 }).y, frozen.z,
        ];
    "#;
    assert_eq!(
        eval(src, "r"),
        Value::Array(vec![s("x,y"), s("1,2"), s("x1,y2"), num(3.0), num(1.0)])
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Promises, async, timers
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn async_function_fulfils() {
    let mut interp = run("async function twice(x: number) { await null; return x * 2; }");
    let promise = call(&mut interp, "twice", vec![JsValue::Number(21.0)]);
    match interp.settle(promise).expect("settle") {
        Settled::Fulfilled(value) => {
            assert_eq!(interp.export_value(&value).expect("export"), num(42.0))
        }
        other => panic!("expected fulfilled, got {other:?}"),
    }
}

#[test]
fn async_function_rejects() {
    let mut interp = run("async function fail() { throw new TypeError('nope'); }");
    let promise = call(&mut interp, "fail", Vec::new());
    match interp.settle(promise).expect("settle") {
        Settled::Rejected(reason) => assert_eq!(interp.error_message(&reason), "nope"),
        other => panic!("expected rejected, got {other:?}"),
    }
}

#[test]
fn promise_that_never_settles_stays_pending() {
    let mut interp = run("async function hang() { await new Promise(() => {}); return 1; }");
    let promise = call(&mut interp, "hang", Vec::new());
    assert!(matches!(
        interp.settle(promise).expect("settle"),
        Settled::Pending
    ));
}

#[test]
fn await_resolves_timers() {
    let src = r#"
        function delay(ms: number, v: string) {
            return new Promise<string>(resolve => setTimeout(() => resolve(v), ms));
        }
        async function both() {
            const a = await delay(50, 'a');
            const b = await delay(10, 'b');
            return a + b;
        }
    "#;
    let mut interp = run(src);
    let promise = call(&mut interp, "both", Vec::new());
    match interp.settle(promise).expect("settle") {
        Settled::Fulfilled(value) => assert_eq!(interp.export_value(&value).expect("export"), s("ab")),
        other => panic!("expected fulfilled, got {other:?}"),
    }
}

#[test]
fn microtasks_run_before_timers() {
    let src = r#"
        setTimeout(() => console.log('late'), 10);
        setTimeout(() => console.log('timer'), 0);
        Promise.resolve().then(() => console.log('micro'));
        queueMicrotask(() => console.log('queued'));
        console.log('sync');
    "#;
    let interp = run(src);
    assert_eq!(log_lines(&interp), ["sync", "micro", "queued", "timer", "late"]);
}

#[test]
fn cleared_timer_never_fires() {
    let src = r#"
        const id = setTimeout(() => console.log('never'), 5);
        setTimeout(() => console.log('kept'), 5);
        clearTimeout(id);
    "#;
    let interp = run(src);
    assert_eq!(log_lines(&interp), ["kept"]);
}

#[test]
fn promise_combinators() {
    let src = r#"
        let all: any, settled: any, raced: any, anyErr: any;
        Promise.all([1, Promise.resolve(2), new Promise(r => setTimeout(() => r(3), 1))])
            .then(v => { all = v; });
        Promise.allSettled([Promise.reject(new Error('x')), 1])
            .then(v => { settled = v.map(e => e.status); });
        Promise.race([new Promise(r => setTimeout(() => r('slow'), 20)), 'fast'])
            .then(v => { raced = v; });
        Promise.any([Promise.reject(1), Promise.reject(2)])
            .catch(e => { anyErr = e.name + ':' + e.errors.length; });
    "#;
    let mut interp = run(src);
    let mut get = |name: &str| {
        let value = interp.binding(name).expect("binding");
        interp.export_value(&value).expect("export")
    };
    assert_eq!(get("all"), Value::Array(vec![num(1.0), num(2.0), num(3.0)]));
    assert_eq!(get("settled"), Value::Array(vec![s("rejected"), s("fulfilled")]));
    assert_eq!(get("raced"), s("fast"));
    assert_eq!(get("anyErr"), s("AggregateError:2"));
}

#[test]
fn finally_passes_outcome_through() {
    let src = r#"
        const trace: string[] = [];
        let result: any;
        Promise.reject(new Error('e'))
            .finally(() => trace.push('cleanup'))
            .catch(e => (e as Error).message)
            .then(v => { result = v; });
    "#;
    let mut interp = run(src);
    let result = interp.binding("result").expect("binding");
    assert_eq!(interp.export_value(&result).expect("export"), s("e"));
    let trace = interp.binding("trace").expect("binding");
    assert_eq!(
        interp.export_value(&trace).expect("export"),
        Value::Array(vec![s("cleanup")])
    );
}

/// Call the async top-level function `name` and settle its promise.
fn fulfilled(interp: &mut Interpreter, name: &str) -> Value {
    let promise = call(interp, name, Vec::new());
    match interp.settle(promise).expect("settle") {
        Settled::Fulfilled(value) => interp.export_value(&value).expect("export"),
        other => panic!("expected fulfilled, got {other:?}"),
    }
}

#[test]
fn await_null_returns_control_to_the_caller() {
    let src = r#"
        async function order() {
            const log: number[] = [];
            const inner = (async () => { log.push(1); await null; log.push(3); })();
            log.push(2);
            await inner;
            return log;
        }
    "#;
    let mut interp = run(src);
    assert_eq!(
        fulfilled(&mut interp, "order"),
        Value::Array(vec![num(1.0), num(2.0), num(3.0)])
    );
}

#[test]
fn race_between_async_functions_on_timers() {
    let src = r#"
        async function delay(ms: number, v: string) {
            await new Promise(resolve => setTimeout(resolve, ms));
            return v;
        }
        async function first() {
            return Promise.race([delay(100, 'slow'), delay(50, 'fast')]);
        }
    "#;
    let mut interp = run(src);
    assert_eq!(fulfilled(&mut interp, "first"), s("fast"));
}

#[test]
fn queued_microtask_runs_before_await_continuation() {
    let src = r#"
        async function tick() {
            const log: string[] = [];
            Promise.resolve().then(() => log.push('micro'));
            await 0;
            log.push('after');
            return log;
        }
    "#;
    let mut interp = run(src);
    assert_eq!(
        fulfilled(&mut interp, "tick"),
        Value::Array(vec![s("micro"), s("after")])
    );
}

#[test]
fn async_calls_interleave_at_each_await() {
    let src = r#"
        async function worker(name: string) {
            console.log(name + ' start');
            await null;
            console.log(name + ' middle');
            await null;
            console.log(name + ' end');
        }
        worker('a');
        worker('b');
        console.log('sync');
    "#;
    let interp = run(src);
    assert_eq!(
        log_lines(&interp),
        ["a start", "b start", "sync", "a middle", "b middle", "a end", "b end"]
    );
}

#[test]
fn resumed_body_keeps_state_and_runs_effects_once() {
    let src = r#"
        let calls = 0;
        function bump() { calls++; return calls; }
        async function body() {
            const seen: number[] = [];
            const first = bump();
            const fns: any[] = [];
            for (let i = 0; i < 3; i++) {
                fns.push(() => i);
                seen.push(await i);
            }
            for (const x of [10, 20]) {
                seen.push(await x);
            }
            let n = 0;
            while (n < 2) {
                n += await 1;
            }
            try {
                await Promise.reject(new Error('boom'));
            } catch (e) {
                seen.push(-1);
            } finally {
                seen.push(-2);
            }
            seen.push(first, calls, n, ...fns.map(f => f()));
            return seen;
        }
    "#;
    let mut interp = run(src);
    let expected = [0.0, 1.0, 2.0, 10.0, 20.0, -1.0, -2.0, 1.0, 1.0, 2.0, 0.0, 1.0, 2.0];
    assert_eq!(
        fulfilled(&mut interp, "body"),
        Value::Array(expected.iter().copied().map(num).collect())
    );
}

#[test]
fn rejected_await_is_catchable_after_resume() {
    let src = r#"
        async function guarded() {
            try {
                await new Promise((_, reject) => setTimeout(() => reject(new RangeError('late')), 5));
                return 'unreachable';
            } catch (e) {
                return (e as Error).name + ': ' + (e as Error).message;
            }
        }
    "#;
    let mut interp = run(src);
    assert_eq!(fulfilled(&mut interp, "guarded"), s("RangeError: late"));
}

#[test]
fn cleared_pending_work_never_runs() {
    let src = r#"
        const hits: string[] = [];
        function schedule() {
            setTimeout(() => hits.push('timer'), 0);
            Promise.resolve().then(() => hits.push('job'));
        }
    "#;
    let mut interp = run(src);
    call(&mut interp, "schedule", Vec::new());
    assert!(interp.has_pending_work());
    interp.clear_pending_work();
    assert!(!interp.has_pending_work());
    interp.run_until_idle().expect("idle");
    let hits = interp.binding("hits").expect("binding");
    assert_eq!(interp.export_value(&hits).expect("export"), Value::Array(Vec::new()));
}

// ═══════════════════════════════════════════════════════════════════════════
// Budgets
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn infinite_loop_exhausts_step_budget() {
    let program = parse("while (true) {}");
    let mut interp = Interpreter::new(Limits {
        step_limit: 10_000,
        ..Limits::default()
    });
    assert!(matches!(
        interp.run_program(&program),
        Err(EvalError::GasExhausted)
    ));
    assert!(interp.steps_used() >= 10_000);
}

#[test]
fn step_budget_is_not_catchable() {
    let program = parse("function spin() { while (true) {} }");
    let mut interp = Interpreter::new(Limits::default());
    interp.run_program(&program).expect("load");
    interp.set_step_limit(interp.steps_used() + 5_000);
    let spin = interp.binding("spin").expect("binding");
    let err = interp
        .call_value(&spin, JsValue::Undefined, Vec::new())
        .expect_err("should run out of steps");
    assert!(err.is_fatal());
    assert!(!err.is_catchable());
}

// ═══════════════════════════════════════════════════════════════════════════
// Console and host boundary
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn console_formats_like_node() {
    let src = r#"
        console.log('a', 1, [1, 2], { x: 1 }, 'tail');
        console.warn('%s has %d items', 'cart', 3.7);
        console.error(new Error('oops'));
        console.log(new Map([['k', 1]]), [[1, [2, [3, [4]]]]]);
    "#;
    let interp = run(src);
    let lines = interp.console();
    assert_eq!(lines[0].text, "a 1 [ 1, 2 ] { x: 1 } tail");
    assert_eq!(lines[1].level, ConsoleLevel::Warn);
    assert_eq!(lines[1].text, "cart has 3 items");
    assert_eq!(lines[2].level, ConsoleLevel::Error);
    assert!(lines[2].text.starts_with("Error: oops"), "{}", lines[2].text);
    assert_eq!(lines[3].text, "Map(1) { 'k' => 1 } [ [ 1, [ 2, [Array] ] ] ]");
}

#[test]
fn functions_export_as_opaque_leaves() {
    let src = r#"
        function inc(x: number) { return x + 1; }
        class Box {}
        const r = { f: inc, c: Box, p: Promise.resolve(1), m: new Map(), n: null };
    "#;
    let r = eval(src, "r");
    assert_eq!(
        r,
        Value::object([
            ("f", Value::Opaque("[Function: inc]".into())),
            ("c", Value::Opaque("[class Box]".into())),
            ("p", Value::Opaque("[object Promise]".into())),
            ("m", Value::Opaque("[object Map(0)]".into())),
            ("n", Value::Null),
        ])
    );
}

#[test]
fn cycles_export_as_circular() {
    let src = "const r: any = { name: 'loop' }; r.self = r;";
    assert_eq!(
        eval(src, "r"),
        Value::object([
            ("name", s("loop")),
            ("self", Value::Opaque("[Circular]".into())),
        ])
    );
}

#[test]
fn imported_values_are_fresh_objects() {
    let mut interp = run("function mutate(o: any) { o.list.push(4); return o.list.length; }");
    let arg = Value::object([("list", Value::Array(vec![num(1.0), num(2.0), num(3.0)]))]);
    let first = interp.import_value(&arg);
    let second = interp.import_value(&arg);
    let a = call(&mut interp, "mutate", vec![first]);
    let b = call(&mut interp, "mutate", vec![second]);
    assert_eq!(interp.export_value(&a).expect("export"), num(4.0));
    assert_eq!(interp.export_value(&b).expect("export"), num(4.0));
}

#[test]
fn interpreters_are_isolated() {
    let mut first = run("globalThis.shared = 1; Array.prototype.extra = 1;");
    let mut second = run("const r = [typeof (globalThis as any).shared, typeof ([] as any).extra];");
    let value = second.binding("r").expect("binding");
    assert_eq!(
        second.export_value(&value).expect("export"),
        Value::Array(vec![s("undefined"), s("undefined")])
    );
    assert!(first.binding("r").is_none());
    assert!(first.take_console().is_empty());
}
