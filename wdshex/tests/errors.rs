use indoc::indoc;
use miette::Diagnostic;
use pretty_assertions::assert_eq;
use wdshex::{ParsedDocument, parse_shex_code, parse_shex_code_strict};

mod utils;

#[test]
fn garbage() {
    let source = "invalid shex code !!!";

    assert_eq!(parse_shex_code(source), ParsedDocument::default());
    assert!(parse_shex_code(source).is_empty());

    let err = parse_shex_code_strict(source).unwrap_err();
    assert_eq!(err.message, "unexpected 'invalid'");
    assert_eq!((err.line, err.column), (1, 1));
    assert_eq!(err.to_string(), "unexpected 'invalid' at line 1, column 1");
}

#[test]
fn empty_input() {
    assert!(parse_shex_code("").is_empty());
    assert!(parse_shex_code_strict("  \n# only a comment\n").unwrap().is_empty());
}

#[test]
fn located_on_the_offending_line() {
    let source = indoc! {"
        wdt:P31 @<Q5> ;
        wdt:P21 . ;
        wdt:P569 xsd:dateTime ] ;
    "};

    let err = parse_shex_code_strict(source).unwrap_err();
    assert_eq!(err.message, "unexpected ']'");
    assert_eq!((err.line, err.column), (3, 23));
    assert_eq!(err.snippet(), "wdt:P569 xsd:dateTime ] ;");
    assert_eq!(&err.source[err.offset()..err.offset() + 1], "]");

    let document = parse_shex_code(source);
    assert_eq!(utils::ids(&document.properties.required), ["P31", "P21"]);
}

#[test]
fn unclosed_shape() {
    let source = "<human> {\n  wdt:P31 @<Q5> ;\n";

    let err = parse_shex_code_strict(source).unwrap_err();
    assert_eq!(err.message, "missing '}' to close shape 'human'");
    assert_eq!((err.line, err.column), (3, 1));

    // whatever was read before the end is kept
    let document = parse_shex_code(source);
    assert_eq!(document.shape("human").map(|s| s.properties.len()), Some(1));
}

#[test]
fn unterminated_iri() {
    let err = parse_shex_code_strict("wdt:P31 @<Q5 ;").unwrap_err();
    assert_eq!(err.message, "unterminated IRI");
    assert_eq!(err.column, 10);
}

#[test]
fn undeclared_prefix() {
    let err = parse_shex_code_strict("foo:P31 . ;").unwrap_err();
    assert_eq!(err.message, "undeclared prefix 'foo:'");
    assert!(parse_shex_code("foo:P31 . ;").is_empty());
}

#[test]
fn prefix_declarations() {
    let err = parse_shex_code_strict("PREFIX _: <http://example.org/>").unwrap_err();
    assert_eq!(err.message, "the prefix '_' is reserved");

    let err = parse_shex_code_strict("PREFIX ex: <relative/path>").unwrap_err();
    assert!(err.message.starts_with("invalid IRI <relative/path>"), "{err}");

    // graceful mode ignores the declaration and keeps going
    let document = parse_shex_code(indoc! {"
        PREFIX ex: <relative/path>
        ex:human {
          wdt:P31 [ wd:Q5 ] ;
        }
    "});
    assert!(!document.prefixes.contains_key("ex"));
    assert_eq!(document.shape("ex:human").map(|s| s.properties.len()), Some(1));

    let err = parse_shex_code_strict("PREFIX ex:").unwrap_err();
    assert_eq!(err.message, "expected <IRI> after the prefix name, found end of input");
}

#[test]
fn malformed_directives() {
    let err = parse_shex_code_strict("PREFIX ex: wd:Q5").unwrap_err();
    assert_eq!(err.message, "expected <IRI> after the prefix name, found 'wd:Q5'");
    assert_eq!(err.column, 12);

    let err = parse_shex_code_strict("start = <human>").unwrap_err();
    assert_eq!(err.message, "expected @<label> after start =, found '<human>'");

    let err = parse_shex_code_strict("BASE").unwrap_err();
    assert_eq!(err.message, "expected <IRI> after BASE, found end of input");
}

#[test]
fn diagnostics() {
    let err = parse_shex_code_strict("wdt:P31 @<Q5> ;\nwdt:P21 ] ;").unwrap_err();

    assert_eq!(err.code().map(|c| c.to_string()).as_deref(), Some("wdshex::parse"));
    let labels: Vec<_> = err.labels().into_iter().flatten().collect();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].offset(), 24);
    assert_eq!(labels[0].len(), 1);
}
