use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use wdshex::{ShExParser, parse_shex_code, parse_shex_code_strict};

/// Ten shapes of ten declarations each.
fn large_schema() -> String {
    let mut source = String::from("PREFIX ex: <http://example.org/>\n\n");
    for shape in 0..10 {
        source.push_str(&format!("ex:shape{shape} {{\n"));
        for property in 0..10 {
            let id = shape * 10 + property + 1;
            let marker = ["", " ?", " *", " +", " {0,3}"][property % 5];
            source.push_str(&format!(
                "  wdt:P{id} xsd:string OR @<other>{marker} ; # property {id}\n"
            ));
        }
        source.push_str("}\n\n");
    }
    source
}

#[test]
fn hundred_declarations() {
    let source = large_schema();

    let started = Instant::now();
    let document = parse_shex_code_strict(&source).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(document.shapes.len(), 10);
    assert_eq!(document.all_properties().count(), 100);
    assert!(
        elapsed < Duration::from_millis(100),
        "parsing took {elapsed:?}"
    );
}

#[test]
fn deterministic() {
    let source = large_schema();
    assert_eq!(parse_shex_code(&source), parse_shex_code(&source));
}

#[test]
fn shared_between_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShExParser>();

    let parser = ShExParser::new();
    let source = large_schema();
    let expected = parser.parse(&source);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert_eq!(parser.parse(&source), expected));
        }
    });
}
