//! Command dispatch against typed tables

use sikv::network::tokenize;
use sikv::storage::{murmur3, HashMap, ValueType};
use sikv::{process_command, Outcome, Verb};

fn run(map: &mut HashMap, line: &str) -> Outcome {
    process_command(map, &tokenize(line.as_bytes()))
}

#[test]
fn test_fixed_width_types() {
    let cases = [
        (ValueType::Int16, "-1234", 2),
        (ValueType::Int32, "70000", 4),
        (ValueType::Int64, "-9000000000", 8),
        (ValueType::Float, "1.5", 4),
        (ValueType::Double, "-0.25", 8),
    ];

    for (value_type, text, width) in cases {
        let mut map = HashMap::init(4, murmur3, value_type).expect("table");
        assert_eq!(run(&mut map, &format!("SET n {}", text)), Outcome::Success);
        assert_eq!(map.get(b"n").map(<[u8]>::len), Some(width), "{}", value_type);
        assert_eq!(
            run(&mut map, "GET n"),
            Outcome::Value(text.as_bytes().to_vec()),
            "{}",
            value_type
        );
    }
}

#[test]
fn test_string_values_keep_spaces() {
    let mut map = HashMap::init(4, murmur3, ValueType::String).expect("table");
    assert_eq!(run(&mut map, "SET motd hello there\n"), Outcome::Success);
    assert_eq!(map.get(b"motd"), Some(&b"hello there\0"[..]));
    assert_eq!(
        run(&mut map, "GET motd\n").to_reply(),
        b"hello there\n".to_vec()
    );
}

#[test]
fn test_failed_set_leaves_previous_value() {
    let mut map = HashMap::init(4, murmur3, ValueType::Int16).expect("table");
    run(&mut map, "SET n 7");

    // Out of range for 16 bits
    let outcome = run(&mut map, "SET n 70000");
    assert!(matches!(outcome, Outcome::Error(_)));
    assert_eq!(run(&mut map, "GET n"), Outcome::Value(b"7".to_vec()));
}

#[test]
fn test_not_found_replies() {
    let mut map = HashMap::init(4, murmur3, ValueType::String).expect("table");
    assert_eq!(run(&mut map, "GET ghost"), Outcome::NotFound(Verb::Get));
    assert_eq!(run(&mut map, "DEL ghost").to_reply(), b"DEL Not found\n".to_vec());
    assert_eq!(map.stats().misses, 1);
}
