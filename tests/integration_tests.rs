use pyrite::{lex::LexError, parse::ParseError, walker::ExecError, Engine, Error};

fn run(source: &str) -> String {
    Engine::default().run(source).unwrap()
}

fn run_err(source: &str) -> Error {
    Engine::default().run(source).unwrap_err()
}

#[test]
fn empty_program_produces_no_output() {
    assert_eq!(run(""), "");
}

#[test]
fn arithmetic_honors_precedence() {
    assert_eq!(run("x = 2 + 3 * 4\nprint x\n"), "14\n");
    assert_eq!(run("print (1 + 2) * 3\n"), "9\n");
    assert_eq!(run("print 9 / 2 - 1\n"), "3\n");
}

#[test]
fn unary_minus_binds_tighter_than_addition() {
    assert_eq!(run("print -3 + 5\n"), "2\n");
    assert_eq!(run("print -2 * 3\n"), "-6\n");
    assert_eq!(run("print +4 - -4\n"), "8\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run("print 'hello' + ' ' + \"world\"\n"), "hello world\n");
}

#[test]
fn print_lists_arguments_separated_by_spaces() {
    assert_eq!(run("print 1, 'two', True, None\n"), "1 two True None\n");
    assert_eq!(run("print\n"), "\n");
}

#[test]
fn comments_and_blank_lines_are_ignored() {
    let source = "\
# a leading comment

x = 1

# an interior comment
print x  # trailing
";
    assert_eq!(run(source), "1\n");
}

#[test]
fn class_with_str_method() {
    let source = "\
class Greeter:
  def __str__(self):
    return 'hi'

g = Greeter()
print g
";
    assert_eq!(run(source), "hi\n");
}

#[test]
fn classes_print_by_name_and_plain_instances_by_identity() {
    let source = "\
class A:
  def ping(self):
    return 1

print A
";
    assert_eq!(run(source), "Class A\n");

    let source = "\
class A:
  def ping(self):
    return 1

a = A()
print a
";
    let output = run(source);
    assert!(output.starts_with("<A object at "));
    assert!(output.ends_with(">\n"));
}

#[test]
fn init_stores_constructor_arguments() {
    let source = "\
class Point:
  def __init__(self, x, y):
    self.x = x
    self.y = y

p = Point(3, 4)
print p.x, p.y
";
    assert_eq!(run(source), "3 4\n");
}

#[test]
fn absent_fields_read_as_none() {
    let source = "\
class A:
  def __init__(self):
    self.x = 1

a = A()
print a.y
";
    assert_eq!(run(source), "None\n");
}

#[test]
fn methods_mutate_their_instance_through_self() {
    let source = "\
class Counter:
  def __init__(self):
    self.count = 0

  def add(self):
    self.count = self.count + 1
    return self.count

c = Counter()
c.add()
c.add()
print c.count
";
    assert_eq!(run(source), "2\n");
}

#[test]
fn inherited_methods_resolve_through_the_parent() {
    let source = "\
class Base:
  def speak(self):
    return 'base'

class Sub(Base):
  def other(self):
    return 1

s = Sub()
print s.speak()
";
    assert_eq!(run(source), "base\n");
}

#[test]
fn subclass_eq_override_makes_everything_equal() {
    let source = "\
class Base:
  def __eq__(self, other):
    return False

class Sub(Base):
  def __eq__(self, other):
    return True

s = Sub()
print s == 5, s == 'anything'
";
    assert_eq!(run(source), "True True\n");
}

#[test]
fn add_dispatches_through_the_add_method() {
    let source = "\
class Vec:
  def __init__(self, x):
    self.x = x

  def __add__(self, other):
    return self.x + other.x

v = Vec(1)
w = Vec(2)
print v + w
";
    assert_eq!(run(source), "3\n");
}

#[test]
fn lt_dispatch_and_derived_relations() {
    let source = "\
class Pair:
  def __init__(self, n):
    self.n = n

  def __eq__(self, other):
    return self.n == other.n

  def __lt__(self, other):
    return self.n < other.n

a = Pair(1)
b = Pair(2)
print a < b, a <= b, a >= b, a != b, a > b
";
    assert_eq!(run(source), "True True False True False\n");
}

#[test]
fn missing_eq_makes_le_a_comparison_error() {
    let source = "\
class Box:
  def __init__(self, n):
    self.n = n

  def __lt__(self, other):
    return self.n < other.n

a = Box(1)
b = Box(2)
print a <= b
";
    assert!(matches!(
        run_err(source),
        Error::Exec(ExecError::NotComparable("ordering")),
    ));
}

#[test]
fn or_short_circuits() {
    assert_eq!(run("x = 0\nif x or 1:\n  print 'yes'\n"), "yes\n");
}

#[test]
fn and_short_circuits_into_the_else_branch() {
    let source = "\
x = 1
if x and 0:
  print 'no'
else:
  print 'else'
";
    assert_eq!(run(source), "else\n");
}

#[test]
fn boolean_operators_yield_bools_and_not_negates() {
    assert_eq!(run("print 1 or 0, 0 or 0, 1 and 2, not 0, not not 5\n"), "True False True True True\n");
}

#[test]
fn conditional_returns() {
    let source = "\
class C:
  def pick(self, cond):
    if cond:
      return 1
    return 2

c = C()
print c.pick(True), c.pick(False)
";
    assert_eq!(run(source), "1 2\n");
}

#[test]
fn return_without_a_value_yields_none() {
    let source = "\
class C:
  def nothing(self):
    return

c = C()
print c.nothing()
";
    assert_eq!(run(source), "None\n");
}

#[test]
fn deeply_nested_blocks() {
    let source = "\
class C:
  def test(self, n):
    if n > 1:
      if n > 2:
        return 'big'
      return 'two'
    return 'small'

c = C()
print c.test(3), c.test(2), c.test(1)
";
    assert_eq!(run(source), "big two small\n");
}

#[test]
fn str_builtin_stringifies() {
    assert_eq!(run("print str(42) + '!'\n"), "42!\n");
    assert_eq!(run("print str(None)\n"), "None\n");
    let source = "\
class Greeter:
  def __str__(self):
    return 'hi'

g = Greeter()
print str(g) + '!'
";
    assert_eq!(run(source), "hi!\n");
}

#[test]
fn none_comparisons() {
    assert_eq!(run("print None == None, None != None\n"), "True False\n");
    assert!(matches!(
        run_err("print None == 0\n"),
        Error::Exec(ExecError::NotComparable("equality")),
    ));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    assert!(matches!(
        run_err("print 1 / 0\n"),
        Error::Exec(ExecError::DivisionByZero),
    ));
}

#[test]
fn undefined_variables_are_runtime_errors() {
    assert!(matches!(
        run_err("print missing\n"),
        Error::Exec(ExecError::UndefinedVariable(n)) if n == "missing",
    ));
}

#[test]
fn calling_an_unknown_name_is_a_parse_error() {
    assert!(matches!(
        run_err("x = Foo()\n"),
        Error::Parse(ParseError::UnknownClass(n)) if n == "Foo",
    ));
}

#[test]
fn methods_require_a_self_parameter() {
    let source = "\
class A:
  def f():
    return 1
";
    assert!(matches!(
        run_err(source),
        Error::Parse(ParseError::MissingSelf),
    ));
}

#[test]
fn lexer_errors_reach_the_host() {
    assert!(matches!(
        run_err("x = 'unterminated"),
        Error::Lex(LexError::UnterminatedString { .. }),
    ));
}

#[test]
fn method_calls_chain_values_through_variables() {
    let source = "\
class Adder:
  def __init__(self, base):
    self.base = base

  def plus(self, n):
    return self.base + n

a = Adder(10)
x = a.plus(5)
y = a.plus(x)
print x, y
";
    assert_eq!(run(source), "15 25\n");
}
