//! Human-readable diagnostic rendering

use std::path::Path;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use flamework_ast::{Diagnostic, Severity};

/// Render one diagnostic, with a source excerpt when `source` is known
/// and the diagnostic points into it
pub fn render(diagnostic: &Diagnostic, source: Option<&str>) -> String {
    let Some(source) = source else {
        return diagnostic.to_string();
    };
    if diagnostic.span.is_dummy() || diagnostic.span.end > source.len() {
        return diagnostic.to_string();
    }

    let name = diagnostic
        .file
        .as_deref()
        .map(|f| f.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string());
    let (kind, color) = match diagnostic.severity {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
        Severity::Info => (ReportKind::Advice, Color::Blue),
    };
    let span = diagnostic.span;

    let mut buffer = Vec::new();
    let written = Report::build(kind, name.clone(), span.start)
        .with_code(diagnostic.code)
        .with_message(&diagnostic.message)
        .with_label(
            Label::new((name.clone(), span.start..span.end))
                .with_message(&diagnostic.message)
                .with_color(color),
        )
        .with_config(Config::default().with_color(false))
        .finish()
        .write((name, Source::from(source)), &mut buffer);

    match written {
        Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
        Err(_) => diagnostic.to_string(),
    }
}

/// Render every diagnostic, looking sources up through `read`
pub fn render_all<'a>(
    diagnostics: impl IntoIterator<Item = &'a Diagnostic>,
    mut read: impl FnMut(&Path) -> Option<String>,
) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        let source = diagnostic.file.as_deref().and_then(&mut read);
        out.push_str(&render(diagnostic, source.as_deref()));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
