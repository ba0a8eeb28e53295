//! Renders assessment documents (.docx) in memory.

use std::collections::HashSet;
use std::io::Cursor;

use docx_rs::{Docx, Paragraph, Run};

use crate::assessment::AssessmentItem;
use crate::documents::GeneratedDocument;
use crate::errors::AppError;

pub const ANSWER_KEY_FILE: &str = "Assessment_Answer_Key.docx";
const ASSESSMENT_SUFFIX: &str = "_Assessment.docx";

// docx sizes are in half-points
const TITLE_SIZE: usize = 32;
const HEADING_SIZE: usize = 26;

/// `{candidate name}_Assessment.docx`, with whitespace and characters that are
/// unsafe in an archive path replaced by underscores.
pub fn assessment_file_name(candidate_name: &str) -> String {
    format!("{}{ASSESSMENT_SUFFIX}", file_stem(candidate_name))
}

/// Flattens a display name into one path component.
fn file_stem(candidate_name: &str) -> String {
    let stem: String = candidate_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "Candidate".to_string()
    } else {
        stem
    }
}

/// File names for each candidate in order; repeated names get `_2`, `_3`, …
/// inserted before the suffix so no document overwrites another.
pub fn unique_assessment_file_names(candidate_names: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    candidate_names
        .iter()
        .map(|name| {
            let base = file_stem(name);
            let mut file_name = assessment_file_name(name);
            let mut n = 1;
            while !used.insert(file_name.to_lowercase()) {
                n += 1;
                file_name = format!("{base}_{n}{ASSESSMENT_SUFFIX}");
            }
            file_name
        })
        .collect()
}

fn title(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).bold().size(TITLE_SIZE))
}

fn heading(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).bold().size(HEADING_SIZE))
}

fn body(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

fn labelled(label: &str, text: &str) -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text(label).bold())
        .add_run(Run::new().add_text(text))
}

fn pack(file_name: &str, docx: Docx) -> Result<GeneratedDocument, AppError> {
    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| AppError::Document(format!("{file_name}: {e}")))?;
    Ok(GeneratedDocument {
        file_name: file_name.to_string(),
        bytes: buf.into_inner(),
    })
}

/// Question paper for one candidate. Answers are not included.
pub fn render_candidate_assessment(
    file_name: &str,
    candidate_name: &str,
    items: &[AssessmentItem],
) -> Result<GeneratedDocument, AppError> {
    let mut docx = Docx::new()
        .add_paragraph(title(&format!("Skills Assessment: {candidate_name}")))
        .add_paragraph(body(
            "Answer each question in the space provided. Questions are grouped by the skill they assess.",
        ));

    for (i, item) in items.iter().enumerate() {
        docx = docx
            .add_paragraph(heading(&format!("Question {}: {}", i + 1, item.skill)))
            .add_paragraph(body(&item.question))
            .add_paragraph(labelled("Answer: ", ""))
            .add_paragraph(body(""))
            .add_paragraph(body(""));
    }

    pack(file_name, docx)
}

/// Answer key with every question and its model answer.
pub fn render_answer_key(items: &[AssessmentItem]) -> Result<GeneratedDocument, AppError> {
    let mut docx = Docx::new().add_paragraph(title("Assessment Answer Key"));

    for (i, item) in items.iter().enumerate() {
        docx = docx
            .add_paragraph(heading(&format!("Question {}: {}", i + 1, item.skill)))
            .add_paragraph(labelled("Question: ", &item.question))
            .add_paragraph(labelled("Model answer: ", &item.answer));
    }

    pack(ANSWER_KEY_FILE, docx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::extract::extract_text;

    fn items() -> Vec<AssessmentItem> {
        vec![AssessmentItem {
            skill: "Data Engineering".to_string(),
            question: "Design an idempotent daily load.".to_string(),
            answer: "Use merge keys and watermarking.".to_string(),
        }]
    }

    #[test]
    fn test_file_name_replaces_spaces() {
        assert_eq!(assessment_file_name("Jane Tan Mei"), "Jane_Tan_Mei_Assessment.docx");
    }

    #[test]
    fn test_file_name_never_nests_paths() {
        assert_eq!(assessment_file_name("A/B\\C D"), "A_B_C_D_Assessment.docx");
        assert_eq!(
            assessment_file_name("../../etc/passwd"),
            ".._.._etc_passwd_Assessment.docx"
        );
        assert_eq!(assessment_file_name("Lee:\tKoh?"), "Lee__Koh__Assessment.docx");
        assert_eq!(assessment_file_name("   "), "Candidate_Assessment.docx");
        for name in unique_assessment_file_names(&["x/y".to_string(), "x\\y".to_string()]) {
            assert!(!name.contains('/') && !name.contains('\\'), "{name}");
        }
    }

    #[test]
    fn test_repeated_names_are_disambiguated() {
        let names = vec![
            "Alex Ng".to_string(),
            "Jane Tan".to_string(),
            "alex ng".to_string(),
            "Alex Ng".to_string(),
            "Alex Ng 2".to_string(),
        ];
        assert_eq!(
            unique_assessment_file_names(&names),
            vec![
                "Alex_Ng_Assessment.docx",
                "Jane_Tan_Assessment.docx",
                "alex_ng_2_Assessment.docx",
                "Alex_Ng_3_Assessment.docx",
                "Alex_Ng_2_2_Assessment.docx",
            ]
        );
    }

    #[test]
    fn test_candidate_document_has_questions_not_answers() {
        let doc = render_candidate_assessment("Jane_Tan_Assessment.docx", "Jane Tan", &items()).unwrap();
        assert_eq!(doc.file_name, "Jane_Tan_Assessment.docx");

        let text = extract_text(&doc.file_name, &doc.bytes).unwrap();
        assert!(text.contains("Skills Assessment: Jane Tan"));
        assert!(text.contains("Design an idempotent daily load."));
        assert!(!text.contains("watermarking"));
    }

    #[test]
    fn test_answer_key_has_answers() {
        let doc = render_answer_key(&items()).unwrap();
        assert_eq!(doc.file_name, ANSWER_KEY_FILE);

        let text = extract_text(&doc.file_name, &doc.bytes).unwrap();
        assert!(text.contains("Model answer: Use merge keys and watermarking."));
    }
}
