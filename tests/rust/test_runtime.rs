//! Runtime tests — evaluation, scoping, objects, error taxonomy

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use brio_lang::lexer::Lexer;
use brio_lang::parser::Parser;
use brio_lang::runtime::{AssignPolicy, ErrorKind, Interpreter, RuntimeError, Value};

/// Captures everything the interpreter prints.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn exec(source: &str, input: &str) -> (Result<(), RuntimeError>, Interpreter, SharedBuf) {
    let tokens = Lexer::new(source, "test.brio").tokenize().unwrap();
    let statements = Parser::new(tokens, "test.brio").parse().unwrap();
    let out = SharedBuf::default();
    let mut interp = Interpreter::new().with_io(
        Box::new(out.clone()),
        Box::new(io::Cursor::new(input.as_bytes().to_vec())),
    );
    let result = interp.interpret(&statements);
    (result, interp, out)
}

fn run(source: &str) -> String {
    let (result, _interp, out) = exec(source, "");
    result.unwrap();
    out.text()
}

fn run_with_input(source: &str, input: &str) -> String {
    let (result, _interp, out) = exec(source, input);
    result.unwrap();
    out.text()
}

fn run_global(source: &str, name: &str) -> Value {
    let (result, interp, _out) = exec(source, "");
    result.unwrap();
    interp.get_global(name).unwrap()
}

fn run_err(source: &str) -> RuntimeError {
    let (result, _interp, _out) = exec(source, "");
    result.unwrap_err()
}

// ── Arithmetic and stringification ──────────────────────────

#[test]
fn integer_arithmetic() {
    assert_eq!(run("print 2 + 3 * 4"), "14\n");
}

#[test]
fn division_always_yields_float() {
    assert_eq!(run_global("x = 10 / 4", "x"), Value::Float(2.5));
    // An exact quotient is still a float; whole floats print without decimals
    assert_eq!(run("print 10 / 5"), "2\n");
}

#[test]
fn division_by_zero() {
    assert_eq!(run_err("x = 1 / 0").kind, ErrorKind::DivisionByZero);
    assert_eq!(run_err("x = 1.0 / 0.0").kind, ErrorKind::DivisionByZero);
}

#[test]
fn modulo_is_floored() {
    // Result takes the divisor's sign
    assert_eq!(run_global("x = -7 % 3", "x"), Value::Int(2));
    assert_eq!(run_global("x = 7 % -3", "x"), Value::Int(-2));
    assert_eq!(run_global("x = 7 % 3", "x"), Value::Int(1));
}

#[test]
fn modulo_by_zero() {
    assert_eq!(run_err("x = 1 % 0").kind, ErrorKind::ModuloByZero);
}

#[test]
fn exponent_preserves_integers() {
    assert_eq!(run_global("x = 2 ^ 10", "x"), Value::Int(1024));
    assert_eq!(run("print 2 ^ 3 ^ 2"), "512\n");
}

#[test]
fn exponent_falls_back_to_float() {
    assert_eq!(run_global("x = 4 ^ 0.5", "x"), Value::Float(2.0));
    assert_eq!(run_global("x = 2 ^ -1", "x"), Value::Float(0.5));
}

#[test]
fn integer_overflow_is_an_error() {
    assert_eq!(
        run_err("x = 9223372036854775807 + 1").kind,
        ErrorKind::Overflow
    );
    assert_eq!(run_err("x = 2 ^ 64").kind, ErrorKind::Overflow);
}

#[test]
fn string_coercion_in_addition() {
    // When exactly one operand is a string, the other is stringified
    assert_eq!(run("print \"n = \" + 3"), "n = 3\n");
    assert_eq!(run("print 3 + \" times\""), "3 times\n");
    assert_eq!(run("print \"a\" + \"b\""), "ab\n");
}

#[test]
fn list_concatenation() {
    assert_eq!(run("print [1] + [2, 3]"), "[1, 2, 3]\n");
}

#[test]
fn repetition() {
    assert_eq!(run("print \"ab\" * 3"), "ababab\n");
    assert_eq!(run("print [1, 2] * 2"), "[1, 2, 1, 2]\n");
    // Negative counts yield an empty value
    assert_eq!(run("print \"x\" * -3"), "\n");
}

#[test]
fn add_mismatched_types() {
    assert_eq!(run_err("x = [1] + 1").kind, ErrorKind::TypeMismatch);
}

#[test]
fn whole_floats_print_without_decimals() {
    assert_eq!(run("print 3.0"), "3\n");
    assert_eq!(run("print 3.5"), "3.5\n");
}

#[test]
fn lists_print_recursively() {
    assert_eq!(run("print [1, \"a\", [true]]"), "[1, a, [true]]\n");
}

#[test]
fn unary_minus() {
    assert_eq!(run_global("x = -(2 + 3)", "x"), Value::Int(-5));
    assert_eq!(run_err("x = -\"a\"").kind, ErrorKind::TypeMismatch);
}

// ── Comparisons and equality ────────────────────────────────

#[test]
fn numeric_comparison_mixes_int_and_float() {
    assert_eq!(run("print 1 < 1.5"), "true\n");
}

#[test]
fn string_comparison_is_lexicographic() {
    assert_eq!(run("print \"apple\" < \"banana\""), "true\n");
}

#[test]
fn mixed_comparison_is_an_error() {
    assert_eq!(run_err("x = 1 < \"a\"").kind, ErrorKind::NotComparable);
}

#[test]
fn cross_numeric_equality() {
    assert_eq!(run("print 1 == 1.0"), "true\n");
    // No implicit string/number conversion in equality
    assert_eq!(run("print \"1\" == 1"), "false\n");
}

#[test]
fn list_equality_is_structural() {
    assert_eq!(run("print [1, 2] == [1, 2]"), "true\n");
}

#[test]
fn instance_equality_is_identity() {
    assert_eq!(
        run("class A {}\nprint new A() == new A()"),
        "false\n"
    );
}

// ── Truthiness and logical operators ────────────────────────

#[test]
fn empty_containers_are_falsy() {
    assert_eq!(run("if ([]) print \"t\" else print \"f\""), "f\n");
    assert_eq!(run("if (\"\") print \"t\" else print \"f\""), "f\n");
    assert_eq!(run("print !0"), "true\n");
}

#[test]
fn logical_operators_return_the_deciding_operand() {
    assert_eq!(run("print \"\" or \"fallback\""), "fallback\n");
    assert_eq!(run("print 1 and 2"), "2\n");
    assert_eq!(run("print 0 and 2"), "0\n");
}

#[test]
fn and_short_circuits() {
    let source = "
        calls = 0
        function bump() {
            calls = calls + 1
            return true
        }
        x = false and bump()
        print calls
    ";
    assert_eq!(run(source), "0\n");
}

// ── Variables and scoping ───────────────────────────────────

#[test]
fn assignment_auto_defines_in_current_scope() {
    assert_eq!(run_global("x = 41\nx = x + 1", "x"), Value::Int(42));
}

#[test]
fn block_locals_do_not_leak() {
    let err = run_err("{ inner = 1 }\nprint inner");
    assert_eq!(err.kind, ErrorKind::UndefinedVariable);
}

#[test]
fn block_assignment_to_outer_persists() {
    assert_eq!(run_global("x = 1\n{ x = 2 }", "x"), Value::Int(2));
}

#[test]
fn function_locals_do_not_leak() {
    let err = run_err("function f() { local = 1 }\nf()\nprint local");
    assert_eq!(err.kind, ErrorKind::UndefinedVariable);
}

#[test]
fn strict_assign_rejects_undefined_names() {
    let tokens = Lexer::new("x = 1", "test.brio").tokenize().unwrap();
    let statements = Parser::new(tokens, "test.brio").parse().unwrap();
    let mut interp = Interpreter::new().with_assign_policy(AssignPolicy::Strict);
    let err = interp.interpret(&statements).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndefinedVariable);
}

// ── Control flow ────────────────────────────────────────────

#[test]
fn while_loop() {
    let source = "
        i = 0
        total = 0
        while (i < 5) {
            total = total + i
            i = i + 1
        }
    ";
    assert_eq!(run_global(source, "total"), Value::Int(10));
}

#[test]
fn for_over_list() {
    assert_eq!(run("for (x in [1, 2, 3]) print x"), "1\n2\n3\n");
}

#[test]
fn for_over_string_yields_characters() {
    assert_eq!(run("for (c in \"abc\") print c"), "a\nb\nc\n");
}

#[test]
fn for_over_map_yields_keys_in_insertion_order() {
    assert_eq!(
        run("for (k in {\"x\": 1, \"y\": 2}) print k"),
        "x\ny\n"
    );
}

#[test]
fn loop_variable_is_scoped_to_the_loop() {
    let err = run_err("for (i in [1]) print i\nprint i");
    assert_eq!(err.kind, ErrorKind::UndefinedVariable);
}

#[test]
fn for_over_non_iterable() {
    assert_eq!(run_err("for (x in 5) print x").kind, ErrorKind::TypeMismatch);
}

#[test]
fn top_level_return_stops_execution() {
    assert_eq!(run("print 1; return; print 2"), "1\n");
}

// ── Functions and closures ──────────────────────────────────

#[test]
fn recursion() {
    let source = "
        function fib(n) {
            if (n < 2) return n
            return fib(n - 1) + fib(n - 2)
        }
        print fib(10)
    ";
    assert_eq!(run(source), "55\n");
}

#[test]
fn falling_off_the_end_returns_nil() {
    assert_eq!(run("function f() {}\nprint f()"), "nil\n");
}

#[test]
fn closures_share_their_defining_scope() {
    let source = "
        function make() {
            count = 0
            function inc() {
                count = count + 1
                print count
            }
            return inc
        }
        c = make()
        c()
        c()
    ";
    assert_eq!(run(source), "1\n2\n");
}

#[test]
fn return_unwinds_out_of_nested_loops() {
    let source = "
        function find(items, target) {
            for (x in items) {
                if (x == target) return \"found\"
            }
            return \"missing\"
        }
        print find([1, 2, 3], 2)
    ";
    assert_eq!(run(source), "found\n");
}

#[test]
fn arity_mismatch_before_any_effect() {
    let source = "
        x = 0
        function f(a, b) { x = 99 }
        f(1)
    ";
    let (result, interp, _out) = exec(source, "");
    assert_eq!(result.unwrap_err().kind, ErrorKind::ArityMismatch);
    assert_eq!(interp.get_global("x"), Some(Value::Int(0)));
}

#[test]
fn calling_a_non_callable() {
    assert_eq!(run_err("x = 1\nx()").kind, ErrorKind::NotCallable);
}

// ── Lists ───────────────────────────────────────────────────

#[test]
fn indexing_and_index_assignment() {
    assert_eq!(run("a = [1, 2]\na[0] = 9\nprint a"), "[9, 2]\n");
    assert_eq!(run("print \"abc\"[1]"), "b\n");
}

#[test]
fn index_out_of_range() {
    assert_eq!(run_err("x = [1][5]").kind, ErrorKind::IndexOutOfRange);
    assert_eq!(run_err("x = [1][-1]").kind, ErrorKind::IndexOutOfRange);
}

#[test]
fn non_integer_index() {
    assert_eq!(run_err("x = [1][\"a\"]").kind, ErrorKind::TypeMismatch);
}

#[test]
fn indexing_a_non_indexable() {
    assert_eq!(run_err("x = 5[0]").kind, ErrorKind::NotIndexable);
}

#[test]
fn lists_are_shared_by_reference() {
    let source = "
        a = [1, 2]
        b = a
        append(b, 3)
        print a
    ";
    assert_eq!(run(source), "[1, 2, 3]\n");
}

#[test]
fn append_builtin_returns_the_list() {
    assert_eq!(run("print append([1], 2)"), "[1, 2]\n");
}

#[test]
fn append_method_returns_nil() {
    assert_eq!(run("a = [1]\nprint a.append(2)\nprint a"), "nil\n[1, 2]\n");
}

#[test]
fn pop_method_yields_nil_when_empty() {
    assert_eq!(run("a = [1, 2]\nprint a.pop()\nprint a"), "2\n[1]\n");
    assert_eq!(run("a = []\nprint a.pop()"), "nil\n");
}

#[test]
fn pop_builtin_rejects_an_empty_list() {
    assert_eq!(run_err("pop([])").kind, ErrorKind::IndexOutOfRange);
}

#[test]
fn length_counts_characters_not_bytes() {
    assert_eq!(run("print length(\"héllo\")"), "5\n");
    assert_eq!(run("print [1, 2, 3].length"), "3\n");
    assert_eq!(run("print {\"a\": 1}.length"), "1\n");
}

// ── Maps ────────────────────────────────────────────────────

#[test]
fn map_literal_and_lookup() {
    assert_eq!(run("m = {\"a\": 1, \"b\": 2}\nprint m[\"b\"]"), "2\n");
}

#[test]
fn map_upsert() {
    assert_eq!(run("m = {}\nm[\"k\"] = 1\nm[\"k\"] = 2\nprint m[\"k\"]"), "2\n");
}

#[test]
fn missing_key() {
    assert_eq!(run_err("m = {}\nx = m[\"missing\"]").kind, ErrorKind::KeyNotFound);
}

#[test]
fn whole_float_keys_normalize_to_integers() {
    assert_eq!(run("m = {1: \"one\"}\nprint m[1.0]"), "one\n");
}

#[test]
fn mutable_values_cannot_be_keys() {
    assert_eq!(
        run_err("m = {[1]: 2}").kind,
        ErrorKind::InvalidAssignmentTarget
    );
}

#[test]
fn maps_print_in_insertion_order() {
    assert_eq!(run("print {\"b\": 1, \"a\": 2}"), "{b: 1, a: 2}\n");
}

// ── Classes and instances ───────────────────────────────────

#[test]
fn constructor_initializes_fields() {
    let source = "
        class Point {
            init(x, y) {
                this.x = x
                this.y = y
            }
        }
        p = new Point(1, 2)
        print p.x + p.y
    ";
    assert_eq!(run(source), "3\n");
}

#[test]
fn constructor_arity_comes_from_init() {
    let source = "
        class Point {
            init(x, y) { this.x = x }
        }
        p = new Point(1)
    ";
    assert_eq!(run_err(source).kind, ErrorKind::ArityMismatch);
}

#[test]
fn construction_yields_the_instance_not_init_result() {
    let source = "
        class A {
            init() { return 42 }
        }
        print new A()
    ";
    assert_eq!(run(source), "<A instance>\n");
}

#[test]
fn methods_dispatch_through_the_superclass_chain() {
    let source = "
        class Animal {
            speak() { return \"...\" }
        }
        class Dog < Animal {}
        print new Dog().speak()
    ";
    assert_eq!(run(source), "...\n");
}

#[test]
fn super_dispatch_through_three_levels() {
    let source = "
        class A {
            who() { return \"A\" }
        }
        class B < A {
            who() { return \"B:\" + super.who() }
        }
        class C < B {
            who() { return \"C:\" + super.who() }
        }
        print new C().who()
    ";
    assert_eq!(run(source), "C:B:A\n");
}

#[test]
fn bound_methods_remember_their_instance() {
    let source = "
        class Counter {
            init() { this.n = 0 }
            bump() { this.n = this.n + 1 }
        }
        c = new Counter()
        f = c.bump
        f()
        f()
        print c.n
    ";
    assert_eq!(run(source), "2\n");
}

#[test]
fn fields_shadow_methods() {
    let source = "
        class A {
            x() { return \"method\" }
        }
        a = new A()
        a.x = \"field\"
        print a.x
    ";
    assert_eq!(run(source), "field\n");
}

#[test]
fn undefined_property() {
    let source = "class A {}\na = new A()\nprint a.missing";
    assert_eq!(run_err(source).kind, ErrorKind::UndefinedProperty);
}

#[test]
fn only_instances_have_fields() {
    assert_eq!(run_err("x = 1\nx.field = 2").kind, ErrorKind::UndefinedProperty);
}

#[test]
fn new_requires_a_defined_class() {
    assert_eq!(run_err("p = new Missing()").kind, ErrorKind::UndefinedClass);
    assert_eq!(run_err("x = 1\np = new x()").kind, ErrorKind::UndefinedClass);
}

#[test]
fn superclass_must_be_a_class() {
    assert_eq!(
        run_err("x = 1\nclass A < x {}").kind,
        ErrorKind::TypeMismatch
    );
}

#[test]
fn classes_print_their_name() {
    assert_eq!(run("class A {}\nprint A"), "A\n");
}

// ── Input ───────────────────────────────────────────────────

#[test]
fn input_prompt_is_written_without_newline() {
    let output = run_with_input("input (\"Name? \") name\nprint \"Hello, \" + name", "World\n");
    assert_eq!(output, "Name? Hello, World\n");
}

#[test]
fn numeric_input_is_coerced() {
    let (result, interp, _out) = exec("input x", "42\n");
    result.unwrap();
    assert_eq!(interp.get_global("x"), Some(Value::Int(42)));

    let (result, interp, _out) = exec("input x", "3.5\n");
    result.unwrap();
    assert_eq!(interp.get_global("x"), Some(Value::Float(3.5)));

    let (result, interp, _out) = exec("input x", "abc\n");
    result.unwrap();
    assert_eq!(interp.get_global("x"), Some(Value::Str("abc".into())));
}
