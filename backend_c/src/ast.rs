mod expr;
mod function;
mod stmt;
mod ty_def;

pub use self::expr::*;
pub use self::function::*;
pub use self::stmt::*;
pub use self::ty_def::*;
use std::fmt;

const GENERATED_NOTICE: &str = "/* Generated by luajni-bindgen. Do not edit. */";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Include {
    System(String),
    Local(String),
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Include::System(path) => write!(f, "#include <{}>", path),
            Include::Local(path) => write!(f, "#include \"{}\"", path),
        }
    }
}

/// One generated `.c` file.
#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    pub includes: Vec<Include>,
    pub structs: Vec<StructDef>,
    pub functions: Vec<FunctionDef>,
}

impl SourceUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, include: Include) {
        self.includes.push(include);
    }

    pub fn add_function(&mut self, func: FunctionDef) {
        self.functions.push(func);
    }

    pub fn find_function(&self, name: &FunctionName) -> Option<&FunctionDef> {
        self.functions.iter().find(|func| func.decl.name == *name)
    }
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", GENERATED_NOTICE)?;
        writeln!(f)?;

        for include in &self.includes {
            writeln!(f, "{}", include)?;
        }
        writeln!(f)?;

        for struct_def in &self.structs {
            writeln!(f, "{}", struct_def)?;
            writeln!(f)?;
        }

        // prototypes first so definitions can appear in any order
        let mut any_internal = false;
        for func in &self.functions {
            if func.decl.linkage == Linkage::Internal {
                let decl = FunctionDecl {
                    comment: None,
                    ..func.decl.clone()
                };
                writeln!(f, "{};", decl)?;
                any_internal = true;
            }
        }
        if any_internal {
            writeln!(f)?;
        }

        for func in &self.functions {
            writeln!(f, "{}", func)?;
            writeln!(f)?;
        }

        Ok(())
    }
}

/// One generated `.h` file: an include guard around external declarations.
#[derive(Debug, Clone)]
pub struct HeaderUnit {
    pub guard: String,
    pub includes: Vec<Include>,
    pub decls: Vec<FunctionDecl>,
}

impl HeaderUnit {
    pub fn new(ident: &str) -> Self {
        Self {
            guard: format!("{}_H", ident.to_ascii_uppercase()),
            includes: vec![Include::System("jni.h".to_string())],
            decls: Vec::new(),
        }
    }
}

impl fmt::Display for HeaderUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", GENERATED_NOTICE)?;
        writeln!(f)?;
        writeln!(f, "#ifndef {}", self.guard)?;
        writeln!(f, "#define {}", self.guard)?;
        writeln!(f)?;

        for include in &self.includes {
            writeln!(f, "{}", include)?;
        }
        writeln!(f)?;

        writeln!(f, "#ifdef __cplusplus")?;
        writeln!(f, "extern \"C\" {{")?;
        writeln!(f, "#endif")?;
        writeln!(f)?;

        for decl in &self.decls {
            writeln!(f, "{};", decl)?;
            writeln!(f)?;
        }

        writeln!(f, "#ifdef __cplusplus")?;
        writeln!(f, "}}")?;
        writeln!(f, "#endif")?;
        writeln!(f)?;
        writeln!(f, "#endif")
    }
}
