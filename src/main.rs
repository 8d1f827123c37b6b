mod args;
mod compile_error;
mod reporting;

use crate::args::*;
use crate::compile_error::*;
use crate::reporting::report_err;
use backend_c::Output;
use bind_ir::BindingModule;
use codespan_reporting::diagnostic::Severity;
use common::read_source_file;
use common::DiagnosticOutput;
use std::fs;
use std::path::PathBuf;
use std::process;
use structopt::StructOpt;
use tracing::debug;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "LUAJNI_BINDGEN_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_descriptors(filename: &PathBuf) -> Result<BindingModule, CompileError> {
    let src = read_source_file(filename).map_err(|err| CompileError::ReadDescriptorFailed {
        path: filename.clone(),
        msg: err.to_string(),
    })?;

    let module: BindingModule =
        serde_json::from_str(&src).map_err(|err| CompileError::parse_failed(filename, err))?;

    debug!(file = %filename.display(), units = module.units.len(), "loaded descriptors");
    Ok(module)
}

/// Every descriptor file, concatenated in command-line order. A broken file
/// doesn't stop the others from being checked.
fn load_module(args: &Args) -> Result<BindingModule, Vec<CompileError>> {
    let mut module = BindingModule::new();
    let mut errors = Vec::new();

    for file in &args.files {
        if args.verbose {
            println!("reading descriptors @ `{}`", file.display());
        }

        match load_descriptors(file) {
            Ok(file_module) => module.append(file_module),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(module)
    } else {
        Err(errors)
    }
}

fn binding_errors(errors: Vec<bind_ir::BindingError>) -> Vec<CompileError> {
    errors.into_iter().map(CompileError::from).collect()
}

fn write_output(output: &Output, args: &Args) -> Result<(), CompileError> {
    fs::create_dir_all(&args.out_dir).map_err(|err| CompileError::output_failed(args.out_dir.clone(), err))?;

    for file in &output.files {
        let path = args.out_dir.join(&file.name);
        fs::write(&path, &file.contents).map_err(|err| CompileError::output_failed(path.clone(), err))?;

        if args.verbose {
            println!("wrote `{}`", path.display());
        }
    }

    info!(files = output.files.len(), out_dir = %args.out_dir.display(), "generation finished");
    Ok(())
}

fn generate(args: &Args) -> Result<(), Vec<CompileError>> {
    let module = load_module(args)?;

    if args.check {
        bind_ir::validate(&module).map_err(binding_errors)?;
        if args.verbose {
            println!("{} binding units ok", module.units.len());
        }
        return Ok(());
    }

    let opts = args.gen_options();
    let output = backend_c::translate(&module, &opts).map_err(binding_errors)?;

    write_output(&output, args).map_err(|err| vec![err])
}

fn main() {
    let args: Args = Args::from_args();
    init_logging();

    if let Err(errors) = generate(&args) {
        for err in &errors {
            if let Err(output_err) = report_err(err, Severity::Error) {
                eprintln!("error: {}", err);
                eprintln!("error reporting output: {}", output_err);
            }

            if args.backtrace {
                if let Some(bt) = err.backtrace() {
                    eprintln!("{:?}", bt);
                }
            }
        }

        process::exit(1)
    }
}
