pub mod span;

use crate::span::*;
use encoding_rs::{Encoding, UTF_8};
use std::{
    cmp::Ordering,
    env, fmt,
    fs::File,
    io,
    io::Read,
    path::{Path, PathBuf},
};

pub use backtrace::Backtrace;

pub trait DiagnosticOutput: fmt::Display {
    fn title(&self) -> String {
        self.to_string()
    }

    fn label(&self) -> Option<DiagnosticLabel> {
        None
    }

    fn notes(&self) -> Vec<String> {
        Vec::new()
    }

    fn main(&self) -> DiagnosticMessage {
        let title = self.title();
        let label = self.label();
        let notes = self.notes();

        DiagnosticMessage {
            title,
            label,
            notes,
        }
    }

    fn see_also(&self) -> Vec<DiagnosticMessage> {
        Vec::new()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        None
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticLabel {
    pub text: Option<String>,
    pub span: Span,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticMessage {
    pub title: String,
    pub notes: Vec<String>,
    pub label: Option<DiagnosticLabel>,
}

impl Ord for DiagnosticLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.span.file.as_ref().cmp(other.span.file.as_ref()) {
            Ordering::Equal => match self.span.end.cmp(&other.span.end) {
                Ordering::Equal => self.span.start.cmp(&other.span.start),
                end_ord => end_ord,
            },
            file_ord => file_ord,
        }
    }
}

impl PartialOrd for DiagnosticLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.label.cmp(&other.label)
    }
}

impl PartialOrd for DiagnosticMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug)]
pub struct TracedError<T> {
    pub err: T,
    pub bt: Backtrace,
}

impl<T> TracedError<T> {
    pub fn trace(err: T) -> Self {
        Self {
            err,
            bt: Backtrace::new(),
        }
    }
}

pub const DEFAULT_UMBRELLA_NAME: &str = "lua_jni_extension";
pub const DEFAULT_RUNTIME_HEADER: &str = "luajni.h";

/// Settings that shape the emitted glue, shared by every unit of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenOptions {
    /// base name of the umbrella register/unregister pair and its files
    pub umbrella_name: String,

    /// header declaring the handle-cache runtime the glue calls into
    pub runtime_header: String,

    /// also emit a JNI_OnLoad/JNI_OnUnload unit driving the umbrella pair
    pub load_hook: bool,

    /// prefix generated functions with a comment naming the member they bind
    pub annotate: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        GenOptions {
            umbrella_name: DEFAULT_UMBRELLA_NAME.to_string(),
            runtime_header: DEFAULT_RUNTIME_HEADER.to_string(),
            load_hook: false,
            annotate: false,
        }
    }
}

pub fn path_relative_to_cwd(path: &Path) -> &Path {
    env::current_dir()
        .ok()
        .and_then(|cwd| cwd.canonicalize().ok())
        .and_then(|cwd| path.strip_prefix(cwd).ok())
        .unwrap_or(path)
}

pub fn read_source_file(filename: &PathBuf) -> io::Result<String> {
    let mut file = File::open(filename)?;

    let mut file_buf = Vec::new();
    file.read_to_end(&mut file_buf)?;

    let (encoding, _bom_len) = Encoding::for_bom(&file_buf).unwrap_or((UTF_8, 3));

    let (src_str, _replaced) = encoding.decode_with_bom_removal(&file_buf);

    Ok(src_str.to_string())
}
