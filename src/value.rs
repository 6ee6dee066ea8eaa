//! Runtime value types for Cinder

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::environment::Environment;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::stack::ensure_sufficient_stack;

/// Runtime values in Cinder
#[derive(Clone)]
pub enum Value {
    Int(i64),

    Float(f64),

    String(String),

    Bool(bool),

    /// The absence of a value
    Nothing,

    /// Mutable array, shared between every binding that holds it
    Array(Rc<ArrayCell>),

    /// User-defined function with its captured scope chain
    Function(Rc<Function>),

    /// Host-provided function
    Builtin(Builtin),
}

impl Value {
    /// Wrap `items` in a fresh shared array
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Nothing => "Nothing",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
        }
    }

    /// Zero, empty strings, `false` and `Nothing` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nothing => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric value widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Display form, except strings are quoted
    pub fn repr(&self) -> String {
        self.render(true, &mut Vec::new())
    }

    /// `open` holds the arrays currently being rendered; meeting one again
    /// prints `[...]` instead of recursing.
    fn render(&self, quote: bool, open: &mut Vec<*const ArrayCell>) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::String(s) if quote => format!("{:?}", s),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Nothing => "Nothing".to_string(),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items);
                if open.contains(&ptr) {
                    return "[...]".to_string();
                }

                open.push(ptr);
                let parts: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|item| ensure_sufficient_stack(|| item.render(true, open)))
                    .collect();
                open.pop();
                format!("[{}]", parts.join(", "))
            }
            Value::Function(func) => format!("<func {}>", func.name),
            Value::Builtin(builtin) => format!("<builtin {}>", builtin.name),
        }
    }
}

/// Shared storage behind `Value::Array`
pub type ArrayCell = RefCell<Vec<Value>>;

/// Structural equality over possibly cyclic arrays.
///
/// A pair already under comparison is assumed equal, so two cycles of the
/// same shape compare equal instead of recursing forever.
fn same_value(a: &Value, b: &Value, open: &mut Vec<(*const ArrayCell, *const ArrayCell)>) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Nothing, Value::Nothing) => true,
        (Value::Array(a), Value::Array(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
            if open.contains(&pair) {
                return true;
            }

            open.push(pair);
            let (a, b) = (a.borrow(), b.borrow());
            let equal = a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| ensure_sufficient_stack(|| same_value(x, y, open)));
            open.pop();
            equal
        }
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
        _ => false,
    }
}

fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(false, &mut Vec::new()))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        same_value(self, other, &mut Vec::new())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// User-defined function
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// Scope chain active where the function was defined
    pub closure: Environment,
}

impl Function {
    pub fn new(name: String, params: Vec<String>, body: Vec<Stmt>, closure: Environment) -> Self {
        Self {
            name,
            params,
            body,
            closure,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Builtin function signature
pub type BuiltinFnPtr = fn(&mut Interpreter, &[Value]) -> Result<Value>;

/// Host-provided function
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Option<usize>, // None means variadic
    pub func: BuiltinFnPtr,
}

impl Builtin {
    pub fn new(name: &'static str, arity: Option<usize>, func: BuiltinFnPtr) -> Self {
        Self { name, arity, func }
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        for falsy in [
            Value::Int(0),
            Value::Float(0.0),
            Value::from(""),
            Value::Bool(false),
            Value::Nothing,
        ] {
            assert!(!falsy.is_truthy(), "{:?} should be falsy", falsy);
        }
        for truthy in [
            Value::Int(-1),
            Value::Float(0.5),
            Value::from("0"),
            Value::Bool(true),
            Value::array(Vec::new()),
        ] {
            assert!(truthy.is_truthy(), "{:?} should be truthy", truthy);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(Value::Nothing.to_string(), "Nothing");
        let nested = Value::array(vec![
            Value::Int(1),
            Value::from("a"),
            Value::array(vec![Value::Bool(true)]),
        ]);
        assert_eq!(nested.to_string(), r#"[1, "a", [true]]"#);
    }

    #[test]
    fn test_arrays_share_storage() {
        let a = Value::array(vec![Value::Int(1)]);
        let alias = a.clone();
        if let Value::Array(items) = &alias {
            items.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(a, Value::array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_self_referencing_array_renders_placeholder() {
        let a = Value::array(vec![Value::Int(0)]);
        if let Value::Array(items) = &a {
            items.borrow_mut()[0] = a.clone();
        }
        assert_eq!(a.to_string(), "[[...]]");

        let outer = Value::array(vec![Value::Int(1), a.clone(), a.clone()]);
        assert_eq!(outer.to_string(), "[1, [[...]], [[...]]]");
    }

    #[test]
    fn test_cyclic_arrays_compare_without_recursing_forever() {
        let cycle = || {
            let a = Value::array(vec![Value::Int(0)]);
            if let Value::Array(items) = &a {
                items.borrow_mut()[0] = a.clone();
            }
            a
        };
        assert_eq!(cycle(), cycle());
        assert_ne!(cycle(), Value::array(vec![Value::Int(0)]));
    }

    #[test]
    fn test_equality_is_kind_sensitive() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(0), Value::Nothing);
        assert_eq!(Value::from("x"), Value::String("x".to_string()));
    }
}
