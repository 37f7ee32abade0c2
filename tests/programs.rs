use std::path::Path;

use reckon::{
    driver::{self, DriverContext, Error},
    fake_file,
};

fn check(source: &str) -> String {
    DriverContext::default()
        .check(&fake_file!(source))
        .unwrap_or_else(|error| panic!("{source:?} failed to check: {error}"))
}

fn run(source: &str) -> String {
    DriverContext::default()
        .run(&fake_file!(source))
        .unwrap_or_else(|error| panic!("{source:?} failed to run: {error}"))
}

const FACTORIAL: &str = "
; factorial through the fixpoint combinator
(let fact
  (fix (lambda (self)
         (lambda (n)
           (if (< n 1) 1 (* n (self (- n 1)))))))
  (fact 5))
";

const LENGTH: &str = "
(let len
  (lambda (xs) (if (empty? xs) 0 (+ 1 (len (cdr xs)))))
  (len (list 1 2 3)))
";

#[test]
fn factorial() {
    assert_eq!(check(FACTORIAL), "int");
    assert_eq!(run(FACTORIAL), "120");
}

#[test]
fn recursive_let() {
    assert_eq!(check(LENGTH), "int");
    assert_eq!(run(LENGTH), "3");
}

const SUM: &str = "
(let sum
  (lambda (n) (if (= n 0) 0 (+ n (sum (- n 1)))))
  (sum 1000))
";

#[test]
fn deep_recursion() {
    assert_eq!(check(SUM), "int");
    assert_eq!(run(SUM), "500500");
}

#[test]
fn deeply_nested_programs() {
    let nots = |depth: usize| format!("{}#t{}", "(not ".repeat(depth), ")".repeat(depth));

    assert_eq!(check(&nots(1000)), "bool");
    assert_eq!(run(&nots(1000)), "#t");

    let error = DriverContext::default()
        .check(&fake_file!(nots(100_000)))
        .unwrap_err();
    assert!(matches!(error, Error::Parse { .. }));
    assert!(error.to_string().contains("parse error: nesting exceeds"));
}

#[test]
fn records() {
    let source = r#"(let p {x: 1 y: 2} (+ (get-field p "x") (get-field p "y")))"#;
    assert_eq!(check(source), "int");
    assert_eq!(run(source), "3");

    let source = r#"{name: "reckon" tags: (list "a" "b")}"#;
    assert_eq!(check(source), "{name:str tags:(Listof str)}");
    assert_eq!(run(source), r#"{name:"reckon" tags:(list "a" "b")}"#);
}

#[test]
fn references() {
    let source = "(let c (ref 0) (let u (set-ref c 5) (get-ref c)))";
    assert_eq!(check(source), "int");
    assert_eq!(run(source), "5");

    assert_eq!(check("(ref (list))"), "(Refof (Listof 'a))");
}

#[test]
fn principal_types() {
    assert_eq!(check("(lambda (f x) (f x))"), "(-> (-> 'a 'b) 'a 'b)");
    assert_eq!(
        check(r#"(lambda (r) (get-field r "name"))"#),
        "(-> {name:'a ...} 'a)"
    );
    assert_eq!(check("cons"), "(-> 'a (Listof 'a) (Listof 'a))");
}

#[test]
fn functions_print_opaquely() {
    assert_eq!(run("(lambda (x) x)"), "#<procedure>");
    assert_eq!(run("string-length"), "#<builtin string-length>");
}

#[test]
fn formatting_drops_comments_and_layout() {
    let formatted = DriverContext::default()
        .fmt(&fake_file!("; add\n(+ 1\n   2)  ; done\n"))
        .unwrap();
    assert_eq!(formatted, "(+ 1 2)");
}

#[test]
fn type_errors_are_located() {
    let error = DriverContext::default()
        .check(&fake_file!("(+ y 1)"))
        .unwrap_err();

    assert!(matches!(error, Error::Type { .. }));
    let rendered = error.to_string();
    assert!(rendered.contains(":1:4: type error: "), "{rendered}");
    assert!(rendered.contains("`y`"), "{rendered}");
}

#[test]
fn runtime_errors_are_located() {
    let error = DriverContext::default()
        .run(&fake_file!("(+ 1 (/ 4 0))"))
        .unwrap_err();

    assert!(matches!(error, Error::Runtime { .. }));
    assert!(error.to_string().contains("runtime error: division by zero"));
}

#[test]
fn missing_files_are_io_errors() {
    let error = driver::load(Some(Path::new("/nonexistent/program.rkn"))).unwrap_err();
    assert!(matches!(error, Error::Io(_)));
}

#[test]
fn files_are_loaded_from_disk() {
    let path = std::env::temp_dir().join(format!("reckon-{}.rkn", std::process::id()));
    std::fs::write(&path, "(string-concat \"a\" \"b\")").unwrap();

    let file = driver::load(Some(path.as_path())).unwrap();
    let value = DriverContext::default().run(&file);
    std::fs::remove_file(&path).unwrap();

    assert_eq!(value.unwrap(), r#""ab""#);
}
