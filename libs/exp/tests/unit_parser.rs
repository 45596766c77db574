use cinnabar_exp::{parse, Error, Expression, Value};

fn round_trip(text: &str) {
    let expr = parse(text).unwrap_or_else(|e| panic!("failed to parse '{}': {}", text, e));
    let canonical = expr.to_string();
    let reparsed = parse(&canonical)
        .unwrap_or_else(|e| panic!("failed to reparse '{}' (from '{}'): {}", canonical, text, e));
    assert_eq!(expr, reparsed, "round trip changed '{}' via '{}'", text, canonical);
    assert_eq!(canonical, reparsed.to_string());
}

#[test]
fn test_round_trip_corpus() {
    for text in [
        "a = 1",
        "a != 'x'",
        "a <> 'x'",
        "a == 2",
        "a < 1L",
        "a >= 1.5f",
        "a <= 2.5d",
        "a between 1 and 10",
        "a not between -1 and 1.5",
        "a in (1, 2, 3)",
        "a not in ()",
        "a like 'x%'",
        "a not likeIgnoreCase 'X_'",
        "not a = 1",
        "not (a = 1 or b = 2)",
        "a = $x or b = $y and c = null",
        "(a + 1) * -b > 2",
        "a = ~1 | 2 ^ 3 & 4 << 1",
        "a - (b - c) = 0",
        "-(3) = a",
        "upper(artistName) = 'X'",
        "substring(artistName, 1, 3) = concat('a', 'b')",
        "count() > 1",
        "case when a = 1 then 'x' when a = 2 then 'y' else 'z' end = 'x'",
        "db:toArtist.ARTIST_NAME = 'p'",
        "paintingArray+.paintingTitle = 'x'",
        "obj:|paintingArray.paintingTitle = 'a'",
        "a|b.c = 1",
        "a = true and b = false",
        "a = enum:org.example.Color.RED",
        "a = \"quote\\\"d\"",
        "a = 'tab\\there'",
        "a = 3000000000",
        "a = 1e3",
    ] {
        round_trip(text);
    }
}

#[test]
fn test_canonical_forms() {
    let cases = [
        ("artistName = 'bla'", "artistName = \"bla\""),
        ("obj:artistName = 1", "artistName = 1"),
        ("a = 123.0", "a = 123.0"),
        ("a = 5L", "a = 5L"),
        ("a = 1.5F", "a = 1.5f"),
        ("a  &&  b = 1", "a and b = 1"),
        ("((a = 1))", "a = 1"),
        ("(a = 1 or b = 2) and c = 3", "(a = 1 or b = 2) and c = 3"),
        ("a = 1 or (b = 2 and c = 3)", "a = 1 or b = 2 and c = 3"),
        ("(1 << 1) & 2 = x", "1 << 1 & 2 = x"),
        ("1 << (1 & 2) = x", "1 << (1 & 2) = x"),
    ];
    for (text, expected) in cases {
        assert_eq!(parse(text).unwrap().to_string(), expected, "for '{}'", text);
    }
}

#[test]
fn test_from_str() {
    let expr: Expression = "a = 1".parse().unwrap();
    assert_eq!(expr, parse("a = 1").unwrap());
}

#[test]
fn test_literal_kinds_survive() {
    for (text, value) in [
        ("a = 1", Value::Int(1)),
        ("a = 1L", Value::Long(1)),
        ("a = 1.0", Value::Double(1.0)),
        ("a = 1.0f", Value::Float(1.0)),
    ] {
        let reparsed = parse(&parse(text).unwrap().to_string()).unwrap();
        match reparsed {
            Expression::Binary { right, .. } => assert_eq!(*right, Expression::Literal(value)),
            other => panic!("unexpected tree {:?}", other),
        }
    }
}

#[test]
fn test_parse_errors_carry_position() {
    for text in ["a = ", "a = 1 = 2", "(a, b) = 1", "a = 'open", "a..b = 1", "upper() = 1"] {
        match parse(text) {
            Err(Error::ParseError { line, column, .. }) => {
                assert_eq!(line, 1, "line for '{}'", text);
                assert!(column >= 1, "column for '{}'", text);
            }
            Err(Error::MalformedPathError { .. }) => {}
            other => panic!("expected an error for '{}', got {:?}", text, other),
        }
    }
}
