use codespan_reporting::{
    diagnostic::{Diagnostic, Label, LabelStyle, Severity},
    files::SimpleFiles,
    term::termcolor,
};
use codespan_reporting::files::{Error as FileError, Files};
use common::{path_relative_to_cwd, read_source_file, DiagnosticMessage, DiagnosticOutput};
use std::collections::HashMap;
use std::path::PathBuf;

type CodeMap = SimpleFiles<String, String>;

fn output_to_report_diag(
    diag: DiagnosticMessage,
    code_map: &mut CodeMap,
    file_ids: &mut HashMap<PathBuf, usize>,
    style: LabelStyle,
    severity: Severity,
) -> Result<Diagnostic<usize>, FileError> {
    let mut labels = Vec::new();

    if let Some(label) = diag.label {
        let nice_filename = path_relative_to_cwd(&label.span.file).to_path_buf();
        let file_id = match file_ids.get(&nice_filename) {
            Some(file_id) => *file_id,
            None => {
                let src = read_source_file(&label.span.file)?;

                let file_id = code_map.add(nice_filename.display().to_string(), src);
                file_ids.insert(nice_filename, file_id);
                file_id
            }
        };

        let start_loc = &label.span.start;
        let end_loc = &label.span.end;

        let err_start = code_map.line_range(file_id, start_loc.line)?.start + start_loc.col;
        let err_end = code_map.line_range(file_id, end_loc.line)?.start + end_loc.col + 1;

        let report_label = Label::new(style, file_id, err_start..err_end);

        labels.push(match label.text {
            Some(text) => report_label.with_message(text),
            None => report_label,
        });
    }

    Ok(Diagnostic::new(severity)
        .with_labels(labels)
        .with_notes(diag.notes)
        .with_message(diag.title))
}

pub fn report_err(err: &impl DiagnosticOutput, severity: Severity) -> Result<(), FileError> {
    let out = termcolor::StandardStream::stderr(termcolor::ColorChoice::Auto);
    let config = codespan_reporting::term::Config::default();

    let mut code_map = CodeMap::new();
    let mut file_ids = HashMap::new();

    let main_diag = output_to_report_diag(
        err.main(),
        &mut code_map,
        &mut file_ids,
        LabelStyle::Primary,
        severity,
    )?;

    codespan_reporting::term::emit(&mut out.lock(), &config, &code_map, &main_diag)?;

    let see_also_diags: Vec<_> = err
        .see_also()
        .into_iter()
        .map(|diag| {
            output_to_report_diag(diag, &mut code_map, &mut file_ids, LabelStyle::Secondary, Severity::Note)
        })
        .collect::<Result<_, _>>()?;

    for diag in see_also_diags {
        codespan_reporting::term::emit(&mut out.lock(), &config, &code_map, &diag)?;
    }

    Ok(())
}
