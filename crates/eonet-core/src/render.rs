//! Localized, partial rendering of normalized answers.
//!
//! Only non-empty sections are produced, so a document with just a summary
//! renders as just a summary. Unstructured answers render their raw text.

use eonet_types::{AnswerDocument, AnswerSource, Lang, ParsedAnswer};

/// Maximum number of sources shown for one answer.
pub const MAX_DISPLAY_SOURCES: usize = 8;

/// Body of one rendered section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    /// A paragraph.
    Text(String),
    /// A bullet list.
    Bullets(Vec<String>),
    /// Source cards, capped at [`MAX_DISPLAY_SOURCES`].
    Sources(Vec<AnswerSource>),
}

/// One titled section of a rendered answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSection {
    /// Localized heading.
    pub title: &'static str,
    /// Section content.
    pub body: SectionBody,
}

/// Non-empty sections of a document, in display order.
pub fn sections(doc: &AnswerDocument, lang: Lang) -> Vec<AnswerSection> {
    let mut out = Vec::new();
    if !doc.summary.is_empty() {
        out.push(AnswerSection {
            title: heading(lang, "Summary", "Resumen"),
            body: SectionBody::Text(doc.summary.clone()),
        });
    }
    let lists = [
        (&doc.meaning, heading(lang, "Meaning", "Qué significa")),
        (&doc.how_to_read, heading(lang, "How to read this", "Cómo leerlo")),
        (&doc.limitations, heading(lang, "Limitations", "Limitaciones")),
        (&doc.next_steps, heading(lang, "Next steps", "Próximos pasos")),
    ];
    for (items, title) in lists {
        if !items.is_empty() {
            out.push(AnswerSection {
                title,
                body: SectionBody::Bullets(items.clone()),
            });
        }
    }
    if !doc.sources.is_empty() {
        out.push(AnswerSection {
            title: heading(lang, "Sources", "Fuentes"),
            body: SectionBody::Sources(
                doc.sources.iter().take(MAX_DISPLAY_SOURCES).cloned().collect(),
            ),
        });
    }
    out
}

/// Render an answer as plain markdown-flavoured text.
pub fn render_text(answer: &ParsedAnswer, lang: Lang) -> String {
    let doc = match answer {
        ParsedAnswer::Structured(doc) => doc,
        ParsedAnswer::Unstructured(raw) if raw.is_empty() => {
            return heading(lang, "No answer yet.", "Aún no hay respuesta.").to_owned();
        }
        ParsedAnswer::Unstructured(raw) => return raw.clone(),
    };

    let mut blocks = Vec::new();
    for section in sections(doc, lang) {
        let body = match section.body {
            SectionBody::Text(text) => text,
            SectionBody::Bullets(items) => items
                .iter()
                .map(|item| format!("- {item}"))
                .collect::<Vec<_>>()
                .join("\n"),
            SectionBody::Sources(sources) => sources
                .iter()
                .map(|s| match &s.url {
                    Some(url) => format!("- [{}]({url})", s.label),
                    None => format!("- {}", s.label),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        };
        blocks.push(format!("## {}\n{body}", section.title));
    }
    blocks.join("\n\n")
}

const fn heading(lang: Lang, en: &'static str, es: &'static str) -> &'static str {
    match lang {
        Lang::En => en,
        Lang::Es => es,
    }
}
