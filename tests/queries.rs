use chrono::{DateTime, Duration, Local, SecondsFormat};
use jmespath_engine::{search, Error, Runtime, RuntimeOptions, Value};

fn data(json: &str) -> Value {
    Value::from(serde_json::from_str::<serde_json::Value>(json).unwrap())
}

#[track_caller]
fn test(expression: &str, given: &str, expected: &str) {
    let result = search(expression, &data(given)).unwrap();
    assert_eq!(result, data(expected), "{expression}");
}

#[track_caller]
fn test_err(expression: &str, given: &str) -> Error {
    search(expression, &data(given)).unwrap_err()
}

#[test]
fn navigation() {
    test("a.b.c", r#"{"a": {"b": {"c": 42}}}"#, "42");
    test("a.b.c", r#"{"a": {"b": {}}}"#, "null");
    test("a.b.c", r#"{"a": null}"#, "null");
    test("a[1]", r#"{"a": [1, 2, 3]}"#, "2");
    test("a[-1]", r#"{"a": [1, 2, 3]}"#, "3");
    test("a[5]", r#"{"a": [1, 2, 3]}"#, "null");
    test("a[0]", r#"{"a": {"b": 1}}"#, "null");
}

#[test]
fn projections() {
    test(
        "a[*].b",
        r#"{"a": [{"b": 1}, {"b": 2}, {"c": 3}]}"#,
        "[1, 2]",
    );
    test("a.*.b", r#"{"a": {"x": {"b": 1}, "y": {"b": 2}}}"#, "[1, 2]");
    test("a[]", r#"{"a": [[1, 2], [3], 4]}"#, "[1, 2, 3, 4]",);
    test("a[*].b", r#"{"a": {"b": 1}}"#, "null");
    // A pipe applies to the materialized array, not element-wise.
    test(
        "a[*].b | [0]",
        r#"{"a": [{"b": 1}, {"b": 2}]}"#,
        "1",
    );
    test("a[*].b | @", r#"{"a": [{"b": 1}, {"b": 2}]}"#, "[1, 2]");
}

#[test]
fn slices() {
    test("@[::]", "[1, 2, 3]", "[1, 2, 3]");
    test("@[::-1]", "[1, 2, 3]", "[3, 2, 1]");
    test("@[1:3]", "[1, 2, 3, 4]", "[2, 3]");
    let err = test_err("@[::0]", "[1, 2, 3]");
    assert!(matches!(err, Error::InvalidValue(_)), "{err}");
}

#[test]
fn object_invariants() {
    let doc = r#"{"b": 1, "a": 2, "c": 3}"#;
    // keys/values/object projections follow insertion order.
    test("keys(@)", doc, r#"["b", "a", "c"]"#);
    test("values(@)", doc, "[1, 2, 3]");
    test("*", doc, "[1, 2, 3]");
    test("length(keys(@)) == length(values(@))", doc, "true");
}

#[test]
fn evaluation_is_pure() {
    let doc = data(r#"{"a": [3, 1, 2]}"#);
    let first = search("sort(a)", &doc).unwrap();
    let second = search("sort(a)", &doc).unwrap();
    assert_eq!(first, second);
    // The input document is untouched.
    assert_eq!(doc, data(r#"{"a": [3, 1, 2]}"#));
}

fn iso(dt: DateTime<Local>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn events() -> Value {
    let now = Local::now();
    let events = serde_json::json!({
        "events": [
            {"name": "Recent", "timestamp": iso(now - Duration::seconds(3600))},
            {"name": "Yesterday", "timestamp": iso(now - Duration::seconds(86400))},
            {"name": "Last week", "timestamp": iso(now - Duration::seconds(604800))},
            {"name": "Future", "timestamp": iso(now + Duration::seconds(3600))},
        ]
    });
    Value::from(events)
}

#[test]
fn current_datetime_format() {
    let result = search("current_datetime()", &data("{}")).unwrap();
    let text = result.as_str().unwrap();
    let pattern = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[+-]\d{2}:\d{2}$").unwrap();
    assert!(pattern.is_match(text), "unexpected format: {text}");

    let parsed = DateTime::parse_from_rfc3339(text).unwrap();
    let skew = (Local::now().timestamp() - parsed.timestamp()).abs();
    assert!(skew <= 1, "clock skew too large: {skew}s");
}

#[test]
fn datetime_arity_and_types() {
    let err = test_err("current_datetime(`1`)", "{}");
    assert!(matches!(err, Error::InvalidArity(_)), "{err}");

    let err = test_err("seconds_ago('30')", "{}");
    assert!(matches!(err, Error::InvalidType(_)), "{err}");

    let lenient = Runtime::new(RuntimeOptions {
        disable_visit_errors: true,
        ..Default::default()
    });
    assert_eq!(
        lenient.search("seconds_ago('30')", &data("{}")).unwrap(),
        Value::Null
    );
}

#[test]
fn datetime_filter_windows() {
    let names = |expression: &str| -> Vec<String> {
        let result = search(expression, &events()).unwrap();
        result
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_owned())
            .collect()
    };

    assert_eq!(
        names("events[?timestamp > minutes_ago(`90`)] | [*].name"),
        ["Recent", "Future"]
    );
    assert_eq!(
        names("events | sort_by(@, &timestamp) | [*].name"),
        ["Last week", "Yesterday", "Recent", "Future"]
    );

    let window =
        names("events[?timestamp > days_ago(`2`) && timestamp < hours_from_now(`1`)] | [*].name");
    assert!(window.contains(&"Recent".to_owned()));
    assert!(window.contains(&"Yesterday".to_owned()));
    assert!(!window.contains(&"Last week".to_owned()));
    assert!(!window.contains(&"Future".to_owned()));
}

#[test]
fn month_arithmetic_clamps_day_of_month() {
    // The calendar shift keeps the result a valid date, so shifting back
    // and forth by large month counts never fails mid-month.
    for months in [1, 2, 6, 12, 13, 24] {
        let expr = format!("months_ago(`{months}`) < months_from_now(`{months}`)");
        test(&expr, "{}", "true");
    }
    test("years_ago(`1`) < years_from_now(`1`)", "{}", "true");
    test(
        "months_ago(`1`) < weeks_ago(`1`) && weeks_ago(`1`) < days_ago(`1`)",
        "{}",
        "true",
    );
}

#[test]
fn expression_references() {
    test(
        "sort_by(@, &age)[*].age",
        r#"[{"age": 3}, {"age": 1}, {"age": 2}]"#,
        "[1, 2, 3]",
    );
    test("map(&a, @)", r#"[{"a": 1}, {"b": 2}]"#, "[1, null]");
    test("max_by(@, &a).a", r#"[{"a": 1}, {"a": 9}, {"a": 4}]"#, "9");

    let err = test_err("sort_by(@, &a)", r#"[{"a": 1}, {"a": "x"}]"#);
    assert!(matches!(err, Error::InvalidType(_)), "{err}");
}
