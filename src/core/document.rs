use crate::domain::model::{MathMode, Snippet};

pub const DOCUMENT_CLASS: &str = "\\documentclass[10pt,preview,border=1pt,varwidth]{standalone}";

/// Wraps the snippet in a `standalone` document. `varwidth` plus a 1pt
/// border keeps the PDF cropped to the formula.
pub fn build_document(snippet: &Snippet, extra_packages: &[String]) -> String {
    let wrapped = match snippet.mode() {
        MathMode::Inline => format!("${}$", snippet.code()),
        MathMode::Display => format!("$\\displaystyle {}$", snippet.code()),
    };

    let mut doc = String::with_capacity(wrapped.len() + 160);
    doc.push_str(DOCUMENT_CLASS);
    doc.push('\n');
    doc.push_str("\\usepackage{amsmath,amssymb}\n");
    doc.push_str("\\usepackage{lmodern}\n");
    for package in extra_packages {
        doc.push_str(&format!("\\usepackage{{{}}}\n", package));
    }
    doc.push_str("\\begin{document}\n");
    doc.push_str(&wrapped);
    doc.push('\n');
    doc.push_str("\\end{document}\n");
    doc
}
