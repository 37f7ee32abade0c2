use proptest::prelude::*;
use reckon::{interp::evaluate, parser::parse, typeck::type_check};

const TOKENS: &[&str] = &[
    "(", ")", "{", "}", ":", "->", "...", "#t", "#f", "0", "1", "-3", "\"s\"",
    "let", "if", "lambda", "list", "cons", "empty", "get-field", "ref",
    "get-ref", "set-ref", "fix", "car", "+", "=", "x", "y", "int", "Listof",
];

fn token_soup() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(TOKENS), 0..32)
        .prop_map(|tokens| tokens.join(" "))
}

proptest! {
    #[test]
    fn parsing_arbitrary_text_never_panics(source in "\\PC{0,64}") {
        let _ = parse(&source);
    }

    #[test]
    fn later_stages_never_panic(source in token_soup()) {
        if let Ok(expr) = parse(&source) {
            if type_check(&expr).is_ok() {
                let _ = evaluate(&expr);
            }
        }
    }

    #[test]
    fn evaluation_without_checking_never_panics(source in token_soup()) {
        if let Ok(expr) = parse(&source) {
            let _ = evaluate(&expr);
        }
    }
}
