//! Imported modules.
//!
//! The checker only needs the exported interface of a module: the names it
//! declares and their types. An [`Importer`] supplies that description for
//! an import path; [`StdImporter`] describes the handful of standard
//! modules the language ships with.

use crate::constant::Value;

/// A type as seen from outside its module.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtType {
    Bool,
    Int,
    Int64,
    Uint8,
    Rune,
    Float64,
    String,
    Error,
    Any,
    Slice(Box<ExtType>),
}

impl ExtType {
    fn slice(elem: ExtType) -> Self {
        ExtType::Slice(Box::new(elem))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtFunc {
    pub params: Vec<ExtType>,
    pub results: Vec<ExtType>,
    /// The last parameter is a slice accepting `...`.
    pub variadic: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MemberKind {
    Func(ExtFunc),
    Const(ExtType, Value),
    Var(ExtType),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub path: String,
    /// Default qualifier, usually the last path element.
    pub name: String,
    pub members: Vec<Member>,
}

impl Module {
    pub fn new(path: &str) -> Self {
        Module {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            members: Vec::new(),
        }
    }

    pub fn func(mut self, name: &str, params: Vec<ExtType>, results: Vec<ExtType>) -> Self {
        self.members.push(Member {
            name: name.to_string(),
            kind: MemberKind::Func(ExtFunc {
                params,
                results,
                variadic: false,
            }),
        });
        self
    }

    /// A function whose last parameter is `...elem`.
    pub fn variadic(mut self, name: &str, mut params: Vec<ExtType>, elem: ExtType, results: Vec<ExtType>) -> Self {
        params.push(ExtType::slice(elem));
        self.members.push(Member {
            name: name.to_string(),
            kind: MemberKind::Func(ExtFunc {
                params,
                results,
                variadic: true,
            }),
        });
        self
    }

    pub fn constant(mut self, name: &str, ty: ExtType, val: Value) -> Self {
        self.members.push(Member {
            name: name.to_string(),
            kind: MemberKind::Const(ty, val),
        });
        self
    }

    pub fn var(mut self, name: &str, ty: ExtType) -> Self {
        self.members.push(Member {
            name: name.to_string(),
            kind: MemberKind::Var(ty),
        });
        self
    }
}

pub trait Importer {
    /// Describe the module at `path`, or `None` if it does not exist.
    fn import(&self, path: &str) -> Option<Module>;
}

/// The standard modules: `fmt`, `strings`, `strconv`, `math`, `errors`, `os`.
#[derive(Copy, Clone, Debug, Default)]
pub struct StdImporter;

impl Importer for StdImporter {
    fn import(&self, path: &str) -> Option<Module> {
        use ExtType::*;
        let module = match path {
            "fmt" => Module::new("fmt")
                .variadic("Println", vec![], Any, vec![Int, Error])
                .variadic("Print", vec![], Any, vec![Int, Error])
                .variadic("Printf", vec![String], Any, vec![Int, Error])
                .variadic("Sprintf", vec![String], Any, vec![String])
                .variadic("Sprint", vec![], Any, vec![String])
                .variadic("Sprintln", vec![], Any, vec![String])
                .variadic("Errorf", vec![String], Any, vec![Error])
                .func("newPrinter", vec![], vec![]),
            "strings" => Module::new("strings")
                .func("Contains", vec![String, String], vec![Bool])
                .func("HasPrefix", vec![String, String], vec![Bool])
                .func("HasSuffix", vec![String, String], vec![Bool])
                .func("Index", vec![String, String], vec![Int])
                .func("Join", vec![ExtType::slice(String), String], vec![String])
                .func("Split", vec![String, String], vec![ExtType::slice(String)])
                .func("Repeat", vec![String, Int], vec![String])
                .func("ToUpper", vec![String], vec![String])
                .func("ToLower", vec![String], vec![String])
                .func("TrimSpace", vec![String], vec![String])
                .func("Fields", vec![String], vec![ExtType::slice(String)]),
            "strconv" => Module::new("strconv")
                .func("Itoa", vec![Int], vec![String])
                .func("Atoi", vec![String], vec![Int, Error])
                .func("FormatFloat", vec![Float64, Uint8, Int, Int], vec![String])
                .func("ParseFloat", vec![String, Int], vec![Float64, Error])
                .func("Quote", vec![String], vec![String]),
            "math" => Module::new("math")
                .constant("Pi", Float64, Value::Float(std::f64::consts::PI))
                .constant("E", Float64, Value::Float(std::f64::consts::E))
                .constant("MaxInt64", Int64, Value::Int(i64::MAX as i128))
                .constant("MinInt64", Int64, Value::Int(i64::MIN as i128))
                .func("Sqrt", vec![Float64], vec![Float64])
                .func("Abs", vec![Float64], vec![Float64])
                .func("Floor", vec![Float64], vec![Float64])
                .func("Ceil", vec![Float64], vec![Float64])
                .func("Pow", vec![Float64, Float64], vec![Float64])
                .func("Inf", vec![Int], vec![Float64])
                .func("IsNaN", vec![Float64], vec![Bool]),
            "errors" => Module::new("errors")
                .func("New", vec![String], vec![Error])
                .func("Is", vec![Error, Error], vec![Bool])
                .func("Unwrap", vec![Error], vec![Error]),
            "os" => Module::new("os")
                .var("Args", ExtType::slice(String))
                .func("Exit", vec![Int], vec![])
                .func("Getenv", vec![String], vec![String])
                .func("ReadFile", vec![String], vec![ExtType::slice(Uint8), Error]),
            "unicode" => Module::new("unicode")
                .func("IsDigit", vec![Rune], vec![Bool])
                .func("IsLetter", vec![Rune], vec![Bool])
                .func("IsSpace", vec![Rune], vec![Bool])
                .func("ToUpper", vec![Rune], vec![Rune]),
            _ => return None,
        };
        Some(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_modules_describe_their_members() {
        let fmt = StdImporter.import("fmt").unwrap();
        assert_eq!(fmt.name, "fmt");
        let println = fmt.members.iter().find(|m| m.name == "Println").unwrap();
        match &println.kind {
            MemberKind::Func(f) => {
                assert!(f.variadic);
                assert_eq!(f.params, vec![ExtType::Slice(Box::new(ExtType::Any))]);
                assert_eq!(f.results, vec![ExtType::Int, ExtType::Error]);
            }
            other => panic!("unexpected member {other:?}"),
        }
        assert!(StdImporter.import("net/http").is_none());
    }

    #[test]
    fn module_name_is_last_path_element() {
        assert_eq!(Module::new("encoding/json").name, "json");
        assert_eq!(Module::new("os").name, "os");
    }
}
