use indoc::indoc;
use pretty_assertions::assert_eq;
use wdshex::{parse_shex_code, parse_shex_code_strict};

mod utils;

const HUMAN: &str = indoc! {"
    PREFIX : <http://example.org/>
    start = @<human>

    <human> EXTRA wdt:P31 {
      wdt:P31 [ wd:Q5 ] ;             # instance of
      wdt:P21 @<gender> ? ;
      wdt:P569 xsd:dateTime ? ;
      wdt:P31 [ wd:Q6 ] ;
      p:P569 {
        ps:P569 xsd:dateTime ;
        prov:wasDerivedFrom @<reference> ;
      } * ;
      ^wdt:P40 @<human> * ;
    }

    <gender> [ wd:Q6581097 wd:Q6581072 ]

    :reference {
      pr:P248 . ;
      wdt:P813 xsd:dateTime ? ;
    }
"};

#[test]
fn human() {
    let document = parse_shex_code_strict(HUMAN).unwrap();

    insta::assert_snapshot!(utils::render(&document), @r"
    (document)
    shape human
      P31 {1,1} [ wd:Q5 ] # instance of
      P21 {0,1} @<gender>
      P569 {0,1} xsd:dateTime
    shape gender
    shape :reference
      P813 {0,1} xsd:dateTime
    ");

    assert!(document.properties.is_empty());
    assert_eq!(document.start_shape().map(|s| s.label.as_str()), Some("human"));
    assert_eq!(parse_shex_code(HUMAN), document);
}

#[test]
fn redeclared_shapes_merge() {
    let document = parse_shex_code(indoc! {"
        <human> { wdt:P31 [ wd:Q5 ] ; }
        <human> {
          wdt:P31 [ wd:Q6 ] ;
          wdt:P21 . ? ;
        }
    "});

    assert_eq!(document.shapes.len(), 1);
    let human = document.shape("human").unwrap();
    assert_eq!(utils::ids(&human.properties.required), ["P31"]);
    assert_eq!(utils::ids(&human.properties.optional), ["P21"]);
    assert_eq!(human.properties.required[0].constraint, "[ wd:Q5 ]");
}

#[test]
fn scopes_deduplicate_independently() {
    let document = parse_shex_code(indoc! {"
        wdt:P31 [ wd:Q5 ] ;
        <a> { wdt:P31 . ; }
        <b> { wdt:P31 . ? ; }
    "});

    assert_eq!(document.all_properties().filter(|p| p.id == "P31").count(), 3);
    assert!(document.shape("b").unwrap().properties.required.is_empty());
}

#[test]
fn groups_are_flattened() {
    let document = parse_shex_code_strict(indoc! {"
        <person> CLOSED {
          ( wdt:P569 xsd:dateTime ;
            wdt:P570 xsd:dateTime ? ) ? ;
          wdt:P31 [ wd:Q5 ] ;
          $<names> ( wdt:P735 . * | wdt:P734 . * ) ;
        }
    "})
    .unwrap();

    let person = document.shape("person").unwrap();
    assert_eq!(utils::ids(&person.properties.required), ["P569", "P31"]);
    assert_eq!(utils::ids(&person.properties.optional), ["P570", "P735", "P734"]);
}

#[test]
fn shapes_with_missing_semicolons() {
    let document = parse_shex_code_strict(indoc! {"
        <human> {
          wdt:P31 [ wd:Q5 ]   # instance of
          wdt:P106 @<occupation>
            OR IRI *
          wdt:P27 . *
        }
    "})
    .unwrap();

    let human = document.shape("human").unwrap();
    assert_eq!(human.properties.len(), 3);
    assert_eq!(
        human.properties.get("P31").unwrap().schema_comment.as_deref(),
        Some("instance of")
    );
    assert_eq!(
        human.properties.get("P106").unwrap().constraint,
        "@<occupation>\n    OR IRI"
    );
}

#[test]
fn broken_items_do_not_spoil_the_shape() {
    let document = parse_shex_code(indoc! {"
        <human> {
          wdt:P31 [ wd:Q5 ] ;
          wdt:P21 xsd:string {2,1} ;
          wdt:P569 xsd:dateTime ? ;
        }
        wdt:P18 . ? ;
    "});

    let human = document.shape("human").unwrap();
    assert_eq!(utils::ids(&human.properties.required), ["P31"]);
    assert_eq!(utils::ids(&human.properties.optional), ["P569"]);
    assert_eq!(utils::ids(&document.properties.optional), ["P18"]);
}
