mod test_support;

use cinnabar_exp::{
    parse, to_ejbql, to_ejbql_with_params, translate_to_db_path, translate_to_related_entity,
    Error, Value,
};
use test_support::resolver;

fn related(entity: &str, expr: &str, via: &str) -> String {
    translate_to_related_entity(&**resolver(), entity, &parse(expr).unwrap(), via)
        .unwrap()
        .to_string()
}

#[test]
fn test_translate_to_related_entity() {
    let cases = [
        ("Artist", "paintingArray", "artistExhibitArray", "db:toArtist.paintingArray"),
        (
            "Artist",
            "artistExhibitArray.toExhibit",
            "artistExhibitArray",
            "db:toArtist.artistExhibitArray.toExhibit",
        ),
        (
            "Artist",
            "paintingArray.toPaintingInfo.textReview",
            "paintingArray.toGallery",
            "db:paintingArray.toArtist.paintingArray.toPaintingInfo.TEXT_REVIEW",
        ),
        (
            "Artist",
            "artistExhibitArray.toExhibit",
            "artistExhibitArray.toExhibit",
            "db:artistExhibitArray.toArtist.artistExhibitArray.toExhibit",
        ),
        (
            "Painting",
            "toArtist.paintingArray",
            "toArtist",
            "db:paintingArray.toArtist.paintingArray",
        ),
    ];
    for (entity, expr, via, expected) in cases {
        assert_eq!(related(entity, expr, via), expected, "{} via {}", expr, via);
    }
}

#[test]
fn test_translate_compound_qualifier() {
    assert_eq!(
        related(
            "Artist",
            "paintingArray = $p and artistExhibitArray.toExhibit.closingDate = $d",
            "artistExhibitArray"
        ),
        "db:toArtist.paintingArray = $p and db:toArtist.artistExhibitArray.toExhibit.CLOSING_DATE = $d"
    );
}

#[test]
fn test_db_paths_are_prefixed_as_is() {
    assert_eq!(
        related("Artist", "db:ARTIST_NAME = 'x'", "paintingArray"),
        "db:toArtist.ARTIST_NAME = \"x\""
    );
}

#[test]
fn test_flattened_relationship_via() {
    assert_eq!(
        related("Artist", "artistName", "exhibitArray"),
        "db:artistExhibitArray.toArtist.ARTIST_NAME"
    );
}

#[test]
fn test_input_is_not_mutated() {
    let expr = parse("artistName = 'a'").unwrap();
    let before = expr.clone();
    let translated = translate_to_db_path(&**resolver(), "Artist", &expr).unwrap();
    assert_eq!(translated.to_string(), "db:ARTIST_NAME = \"a\"");
    assert_eq!(expr, before);
}

#[test]
fn test_unresolvable_via() {
    let err = translate_to_related_entity(
        &**resolver(),
        "Artist",
        &parse("artistName").unwrap(),
        "noSuchRelationship",
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::UnresolvableRelationshipError {
            segment: "noSuchRelationship".into(),
            entity: "Artist".into(),
        }
    );
}

#[test]
fn test_ejbql_forms() {
    let cases = [
        ("artistName = 'bla'", "x.artistName = 'bla'"),
        ("artistName.stuff = $name", "x.artistName.stuff = :name"),
        ("artistName in ('a', 'b', 'c')", "x.artistName in ('a', 'b', 'c')"),
        ("artistName != 'bla'", "x.artistName <> 'bla'"),
        (
            "a = enum:org.apache.cayenne.exp.ExpEnum1.THREE",
            "x.a = enum:org.apache.cayenne.exp.ExpEnum1.THREE",
        ),
        ("a between 1 and 5L", "x.a between 1 and 5L"),
        ("not (a = 1 or b = 2)", "not (x.a = 1 or x.b = 2)"),
    ];
    for (text, expected) in cases {
        assert_eq!(to_ejbql(&parse(text).unwrap(), "x").unwrap(), expected);
    }
}

#[test]
fn test_ejbql_accumulator_continues_numbering() {
    let mut bindings = vec![Value::from("earlier")];
    let text = to_ejbql_with_params(&parse("artistName != 'bla'").unwrap(), "x", &mut bindings)
        .unwrap();
    assert_eq!(text, "x.artistName <> ?2");
    assert_eq!(bindings, vec![Value::from("earlier"), Value::from("bla")]);
}
