use bind_ir::BindingError;
use common::span::Location;
use common::span::Span;
use common::Backtrace;
use common::DiagnosticLabel;
use common::DiagnosticMessage;
use common::DiagnosticOutput;
use common::TracedError;
use std::path::PathBuf;
use std::{fmt, io};

#[derive(Debug)]
pub enum CompileError {
    ReadDescriptorFailed {
        path: PathBuf,
        msg: String,
    },
    ParseDescriptorFailed {
        span: Span,
        msg: String,
    },
    BindingError(BindingError),
    OutputFailed {
        path: PathBuf,
        err: TracedError<io::Error>,
    },
}

impl CompileError {
    pub fn parse_failed(path: &PathBuf, err: serde_json::Error) -> Self {
        let loc = Location::from_one_based(err.line(), err.column());
        CompileError::ParseDescriptorFailed {
            span: Span::at(path.clone(), loc),
            msg: err.to_string(),
        }
    }

    pub fn output_failed(path: PathBuf, err: io::Error) -> Self {
        CompileError::OutputFailed {
            path,
            err: TracedError::trace(err),
        }
    }
}

impl From<BindingError> for CompileError {
    fn from(err: BindingError) -> Self {
        CompileError::BindingError(err)
    }
}

impl DiagnosticOutput for CompileError {
    fn main(&self) -> DiagnosticMessage {
        match self {
            CompileError::BindingError(err) => err.main(),
            CompileError::ReadDescriptorFailed { path, msg } => DiagnosticMessage {
                title: format!("failed to read descriptor file {}", path.to_string_lossy()),
                label: None,
                notes: vec![msg.clone()],
            },
            CompileError::ParseDescriptorFailed { span, msg } => DiagnosticMessage {
                title: format!("invalid descriptor file {}", span.file.display()),
                label: Some(DiagnosticLabel {
                    text: Some(msg.clone()),
                    span: span.clone(),
                }),
                notes: Vec::new(),
            },
            CompileError::OutputFailed { path, err } => DiagnosticMessage {
                title: format!("writing output file `{}` failed: {}", path.display(), err.err),
                label: None,
                notes: Vec::new(),
            },
        }
    }

    fn see_also(&self) -> Vec<DiagnosticMessage> {
        match self {
            CompileError::BindingError(err) => err.see_also(),
            _ => Vec::new(),
        }
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            CompileError::OutputFailed { err, .. } => Some(&err.bt),
            _ => None,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::ReadDescriptorFailed { msg, .. } => write!(f, "{}", msg),
            CompileError::ParseDescriptorFailed { span, msg } => write!(f, "{}: {}", span, msg),
            CompileError::BindingError(err) => write!(f, "{}", err),
            CompileError::OutputFailed { path, err } => {
                write!(f, "writing to file {} failed: {}", path.display(), err.err)
            }
        }
    }
}
