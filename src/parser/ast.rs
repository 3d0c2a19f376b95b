// Abstract Syntax Tree for the pipeline DSL

/// Argument value as written in the source
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Bare identifier: a column name (or a keyword such as a theme name)
    Ident(String),
    /// Quoted string literal
    Str(String),
    Number(f64),
    Bool(bool),
    /// `[a, b, ...]`, used for custom palettes
    List(Vec<ArgValue>),
}

impl ArgValue {
    /// Short description for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ArgValue::Ident(_) => "identifier",
            ArgValue::Str(_) => "string",
            ArgValue::Number(_) => "number",
            ArgValue::Bool(_) => "boolean",
            ArgValue::List(_) => "list",
        }
    }
}

/// One argument, positional when `name` is `None`
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: ArgValue,
}

/// `name(arg, key: arg, ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Arg>,
}
