pub mod ast;
pub mod dispatch;
pub mod marshal;
pub mod overload;
pub mod register;
pub mod release;
pub mod umbrella;
pub mod unit;

pub use ast as c;


use bind_ir::BindingModule;
use bind_ir::BindingResult;
use common::GenOptions;
use tracing::info;
use tracing::info_span;

/// A generated file, named relative to the output directory.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutputFile {
    pub name: String,
    pub contents: String,
}

impl OutputFile {
    fn new(name: impl Into<String>, contents: impl ToString) -> Self {
        Self {
            name: name.into(),
            contents: contents.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Output {
    pub files: Vec<OutputFile>,
}

impl Output {
    pub fn file(&self, name: &str) -> Option<&OutputFile> {
        self.files.iter().find(|file| file.name == name)
    }
}

/// Validates the module and emits one `.h`/`.c` pair per unit, then the
/// umbrella pair and, if requested, the load hook. Every problem found in
/// any unit is reported, and nothing is emitted if there is one.
pub fn translate(module: &BindingModule, opts: &GenOptions) -> BindingResult<Output> {
    bind_ir::validate(module)?;

    let mut output = Output::default();
    let mut registrations = Vec::new();
    let mut errors = Vec::new();

    for unit in &module.units {
        let _span = info_span!("unit", unit = unit.name(), kind = unit.kind_name()).entered();

        match unit::translate_unit(unit, opts) {
            Ok(unit_output) => {
                info!(
                    functions = unit_output.source.functions.len(),
                    "generated {}",
                    unit_output.source_file_name()
                );

                output.files.push(OutputFile::new(unit_output.header_file_name(), &unit_output.header));
                output.files.push(OutputFile::new(unit_output.source_file_name(), &unit_output.source));
                registrations.push(unit_output.registration);
            }

            Err(unit_errors) => errors.extend(unit_errors),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let umbrella_name = opts.umbrella_name.as_str();
    output.files.push(OutputFile::new(
        format!("{}.h", umbrella_name),
        umbrella::header(umbrella_name),
    ));
    output.files.push(OutputFile::new(
        format!("{}.c", umbrella_name),
        umbrella::source(umbrella_name, &registrations),
    ));

    if opts.load_hook {
        output.files.push(OutputFile::new(
            format!("{}_load_hook.c", umbrella_name),
            umbrella::load_hook(umbrella_name),
        ));
    }

    Ok(output)
}
