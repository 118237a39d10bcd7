//! In-process OMML to LaTeX rendering
//!
//! Covers the common structures (scripts, fractions, delimiters, functions,
//! radicals, n-ary operators and runs). Anything else is rendered through its
//! children, so unknown wrappers degrade to their text.

use crate::document::parsing::xml::XmlElement;

/// Render an `m:oMath` (or `m:oMathPara`) element
pub(crate) fn omml_to_latex(math: &XmlElement) -> String {
    render_children(math).trim().to_string()
}

fn render_children(element: &XmlElement) -> String {
    element.elements().map(render).collect()
}

/// Rendered content of the named child, empty when absent
fn argument(element: &XmlElement, name: &str) -> String {
    element
        .child(name)
        .map(render_children)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// `m:val` of a property child, e.g. `m:dPr/m:begChr`
fn property<'a>(element: &'a XmlElement, props: &str, name: &str) -> Option<&'a str> {
    element
        .child(props)
        .and_then(|p| p.child(name))
        .and_then(|p| p.attr("m:val"))
}

fn render(element: &XmlElement) -> String {
    match element.name.as_str() {
        "m:sSup" => format!(
            "{}^{{{}}}",
            argument(element, "m:e"),
            argument(element, "m:sup")
        ),
        "m:sSub" => format!(
            "{}_{{{}}}",
            argument(element, "m:e"),
            argument(element, "m:sub")
        ),
        "m:sSubSup" => format!(
            "{}_{{{}}}^{{{}}}",
            argument(element, "m:e"),
            argument(element, "m:sub"),
            argument(element, "m:sup")
        ),
        "m:d" => render_delimiter(element),
        "m:f" => {
            let command = match property(element, "m:fPr", "m:type") {
                Some("noBar") => "binom",
                _ => "frac",
            };
            format!(
                "\\{command}{{{}}}{{{}}}",
                argument(element, "m:num"),
                argument(element, "m:den")
            )
        }
        "m:func" => {
            let name = element
                .child("m:fName")
                .map(|f| f.text_of("m:t"))
                .unwrap_or_default();
            format!("\\{} {}", name.trim(), argument(element, "m:e"))
        }
        "m:rad" => {
            let degree = argument(element, "m:deg");
            let base = argument(element, "m:e");
            if degree.is_empty() || degree == "2" {
                format!("\\sqrt{{{base}}}")
            } else {
                format!("\\sqrt[{degree}]{{{base}}}")
            }
        }
        "m:nary" => render_nary(element),
        "m:r" => render_run(&element.text_of("m:t")),
        "m:t" => render_run(&element.inner_text()),
        name if name.ends_with("Pr") => String::new(),
        _ => render_children(element),
    }
}

fn render_delimiter(element: &XmlElement) -> String {
    let open = property(element, "m:dPr", "m:begChr").unwrap_or("(");
    let close = property(element, "m:dPr", "m:endChr").unwrap_or(")");
    let separator = property(element, "m:dPr", "m:sepChr").unwrap_or(",");

    let inner: Vec<String> = element
        .elements()
        .filter(|e| e.is("m:e"))
        .map(|e| render_children(e).trim().to_string())
        .collect();

    format!(
        "\\left{}{}\\right{}",
        delimiter(open),
        inner.join(separator),
        delimiter(close)
    )
}

fn delimiter(chr: &str) -> &str {
    match chr {
        "" => ".",
        "{" => "\\{",
        "}" => "\\}",
        "|" | "‖" => "|",
        "⟨" => "\\langle",
        "⟩" => "\\rangle",
        "⌈" => "\\lceil",
        "⌉" => "\\rceil",
        "⌊" => "\\lfloor",
        "⌋" => "\\rfloor",
        other => other,
    }
}

fn render_nary(element: &XmlElement) -> String {
    let operator = match property(element, "m:naryPr", "m:chr") {
        Some("∑") | None => "\\sum",
        Some("∫") => "\\int",
        Some("∬") => "\\iint",
        Some("∭") => "\\iiint",
        Some("∮") => "\\oint",
        Some("∏") => "\\prod",
        Some("⋃") => "\\bigcup",
        Some("⋂") => "\\bigcap",
        Some(_) => "\\sum",
    };

    let mut latex = operator.to_string();
    let sub = argument(element, "m:sub");
    if !sub.is_empty() {
        latex.push_str(&format!("_{{{sub}}}"));
    }
    let sup = argument(element, "m:sup");
    if !sup.is_empty() {
        latex.push_str(&format!("^{{{sup}}}"));
    }
    let base = argument(element, "m:e");
    if !base.is_empty() {
        latex.push(' ');
        latex.push_str(&base);
    }
    latex
}

fn render_run(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match symbol(ch) {
            Some(command) => {
                result.push_str(command);
                result.push(' ');
            }
            None => result.push(ch),
        }
    }
    result
}

fn symbol(ch: char) -> Option<&'static str> {
    let command = match ch {
        'π' => "\\pi",
        'α' => "\\alpha",
        'β' => "\\beta",
        'γ' => "\\gamma",
        'Γ' => "\\Gamma",
        'δ' => "\\delta",
        'Δ' => "\\Delta",
        'ε' => "\\epsilon",
        'θ' => "\\theta",
        'λ' => "\\lambda",
        'μ' => "\\mu",
        'ρ' => "\\rho",
        'σ' => "\\sigma",
        'Σ' => "\\Sigma",
        'τ' => "\\tau",
        'φ' => "\\phi",
        'ω' => "\\omega",
        'Ω' => "\\Omega",
        '∞' => "\\infty",
        '±' => "\\pm",
        '×' => "\\times",
        '÷' => "\\div",
        '⋅' | '·' => "\\cdot",
        '≤' => "\\leq",
        '≥' => "\\geq",
        '≠' => "\\neq",
        '≈' => "\\approx",
        '∈' => "\\in",
        '∉' => "\\notin",
        '⊂' => "\\subset",
        '⊃' => "\\supset",
        '∪' => "\\cup",
        '∩' => "\\cap",
        '∅' => "\\emptyset",
        '→' => "\\rightarrow",
        '⌈' => "\\lceil",
        '⌉' => "\\rceil",
        '⌊' => "\\lfloor",
        '⌋' => "\\rfloor",
        _ => return None,
    };
    Some(command)
}
