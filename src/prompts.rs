//! Prompt and demo-report text.
//!
//! Every string the model sees, and the canned demo report, lives here so
//! prompt changes touch exactly one file and tests can assert the exact text.

pub const APP_TITLE: &str = "Arfin Parween • AI in Medical Imaging";
pub const APP_SUBTITLE: &str = "An app for medical image understanding (educational only)";
pub const BRAND_TAGLINE: &str = "Structured radiology-style notes • explainable • demo-friendly";

/// Headings of the sections every report must contain, in order.
pub const SECTION_HEADINGS: [&str; 5] = [
    "## 1) Modality & Anatomy",
    "## 2) Key Visual Observations",
    "## 3) Differential & Next Steps (Educational)",
    "## 4) Patient-friendly summary",
    "## 5) Safety Note",
];

/// Heading of the optional section requested when web context is on.
pub const REFERENCES_HEADING: &str = "## 6) References (web)";

const PROMPT_HEADER: &str = r#"You are an AI assistant for an **educational demo** on **AI in Medical Imaging**.
Be cautious, avoid definitive diagnosis, and use safe language like "may suggest" or "could be consistent with".

Return Markdown with:
"#;

const PROMPT_SECTIONS: &str = r#"
## 1) Modality & Anatomy
- Likely modality and view/region
- Image quality/limitations

## 2) Key Visual Observations
- Bullet observations (describe what you see)

## 3) Differential & Next Steps (Educational)
- 2–4 differentials with low/medium/high confidence
- What additional info/imaging helps
- Mention urgent red flags if relevant (without alarmist tone)

## 4) Patient-friendly summary
Explain simply.

## 5) Safety Note
Short disclaimer: not medical advice.
"#;

const REFERENCES_SECTION: &str = "## 6) References (web)\nIf web is enabled, include 2–3 brief references/titles.\n";

const DEMO_SECTIONS: &str = r#"
## 1) Modality & Anatomy
- Likely modality: X-ray (educational guess)
- Region: Chest (projection uncertain)
- Quality: Mild rotation; exposure acceptable for a basic educational interpretation.

## 2) Key Visual Observations
- No obvious large focal consolidation on this preview.
- Cardiomediastinal silhouette appears within expected range (projection-dependent).
- No clear large pleural effusion; subtle findings may require additional views.

## 3) Differential & Next Steps (Educational)
- Low confidence: mild atelectasis vs under-inflation (shallow inspiration).
- Consider additional view (lateral) or repeat if clinically indicated.
- Correlate with symptoms, exam, oxygen saturation, and clinician assessment.

## 4) Patient-friendly summary
At a quick glance, nothing big stands out, but subtle issues can be missed. A doctor uses symptoms + more views/tests to confirm.

## 5) Safety Note
Educational demo only. Not medical advice. Consult a clinician for diagnosis/treatment.
"#;

/// System instruction added to the request when web context is enabled.
pub const WEB_CONTEXT_INSTRUCTION: &str = "Web context is enabled for this request. \
You may draw on well-known public sources and list 2–3 brief references (titles) \
in the References section. Never invent URLs.";

fn branding_footer() -> String {
    format!("\n---\n**Demo Branding:** {} • {}\n", APP_TITLE, BRAND_TAGLINE)
}

/// Build the instruction sent alongside the image.
///
/// Deterministic: the same flag always yields byte-identical text.
pub fn build_prompt(web_enabled: bool) -> String {
    let references = if web_enabled { REFERENCES_SECTION } else { "" };
    format!(
        "\n{}{}\n{}\n{}",
        PROMPT_HEADER,
        PROMPT_SECTIONS,
        references,
        branding_footer()
    )
}

/// The hand-written report returned in demo mode.
pub fn demo_report() -> String {
    format!("{}{}", DEMO_SECTIONS, branding_footer())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_sections(text: &str) -> usize {
        text.lines()
            .filter(|l| l.starts_with("## ") && l.as_bytes().get(3).is_some_and(u8::is_ascii_digit))
            .count()
    }

    #[test]
    fn five_sections_without_web() {
        let p = build_prompt(false);
        assert_eq!(count_sections(&p), 5);
        assert!(!p.contains(REFERENCES_HEADING));
        for h in SECTION_HEADINGS {
            assert!(p.contains(h), "missing {h}");
        }
    }

    #[test]
    fn six_sections_with_web() {
        let p = build_prompt(true);
        assert_eq!(count_sections(&p), 6);
        assert!(p.contains(REFERENCES_HEADING));
        assert!(p.contains("include 2–3 brief references/titles"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt(true), build_prompt(true));
        assert_eq!(build_prompt(false), build_prompt(false));
        assert_ne!(build_prompt(true), build_prompt(false));
    }

    #[test]
    fn sections_appear_in_order() {
        let p = build_prompt(true);
        let mut last = 0;
        for h in SECTION_HEADINGS.iter().chain(std::iter::once(&REFERENCES_HEADING)) {
            let pos = p.find(h).expect("heading present");
            assert!(pos > last, "{h} out of order");
            last = pos;
        }
    }

    #[test]
    fn prompt_ends_with_branding() {
        let p = build_prompt(false);
        assert!(p.trim_end().ends_with(&format!("**Demo Branding:** {} • {}", APP_TITLE, BRAND_TAGLINE)));
    }

    #[test]
    fn demo_report_has_all_mandatory_sections() {
        let r = demo_report();
        assert_eq!(count_sections(&r), 5);
        for h in SECTION_HEADINGS {
            assert!(r.contains(h), "missing {h}");
        }
        assert!(r.contains("Educational demo only. Not medical advice."));
    }

    #[test]
    fn prompt_text_without_web() {
        let expected = concat!(
            "\n",
            "You are an AI assistant for an **educational demo** on **AI in Medical Imaging**.\n",
            "Be cautious, avoid definitive diagnosis, and use safe language like \"may suggest\" or \"could be consistent with\".\n",
            "\n",
            "Return Markdown with:\n",
            "\n",
            "## 1) Modality & Anatomy\n",
            "- Likely modality and view/region\n",
            "- Image quality/limitations\n",
            "\n",
            "## 2) Key Visual Observations\n",
            "- Bullet observations (describe what you see)\n",
            "\n",
            "## 3) Differential & Next Steps (Educational)\n",
            "- 2–4 differentials with low/medium/high confidence\n",
            "- What additional info/imaging helps\n",
            "- Mention urgent red flags if relevant (without alarmist tone)\n",
            "\n",
            "## 4) Patient-friendly summary\n",
            "Explain simply.\n",
            "\n",
            "## 5) Safety Note\n",
            "Short disclaimer: not medical advice.\n",
            "\n",
            "\n",
            "\n",
            "---\n",
            "**Demo Branding:** Arfin Parween • AI in Medical Imaging • Structured radiology-style notes • explainable • demo-friendly\n",
        );
        assert_eq!(build_prompt(false), expected);
    }

    #[test]
    fn prompt_text_with_web() {
        let expected = concat!(
            "\n",
            "You are an AI assistant for an **educational demo** on **AI in Medical Imaging**.\n",
            "Be cautious, avoid definitive diagnosis, and use safe language like \"may suggest\" or \"could be consistent with\".\n",
            "\n",
            "Return Markdown with:\n",
            "\n",
            "## 1) Modality & Anatomy\n",
            "- Likely modality and view/region\n",
            "- Image quality/limitations\n",
            "\n",
            "## 2) Key Visual Observations\n",
            "- Bullet observations (describe what you see)\n",
            "\n",
            "## 3) Differential & Next Steps (Educational)\n",
            "- 2–4 differentials with low/medium/high confidence\n",
            "- What additional info/imaging helps\n",
            "- Mention urgent red flags if relevant (without alarmist tone)\n",
            "\n",
            "## 4) Patient-friendly summary\n",
            "Explain simply.\n",
            "\n",
            "## 5) Safety Note\n",
            "Short disclaimer: not medical advice.\n",
            "## 6) References (web)\n",
            "If web is enabled, include 2–3 brief references/titles.\n",
            "\n",
            "\n",
            "\n",
            "---\n",
            "**Demo Branding:** Arfin Parween • AI in Medical Imaging • Structured radiology-style notes • explainable • demo-friendly\n",
        );
        assert_eq!(build_prompt(true), expected);
    }

    #[test]
    fn demo_report_text() {
        let expected = concat!(
            "\n",
            "## 1) Modality & Anatomy\n",
            "- Likely modality: X-ray (educational guess)\n",
            "- Region: Chest (projection uncertain)\n",
            "- Quality: Mild rotation; exposure acceptable for a basic educational interpretation.\n",
            "\n",
            "## 2) Key Visual Observations\n",
            "- No obvious large focal consolidation on this preview.\n",
            "- Cardiomediastinal silhouette appears within expected range (projection-dependent).\n",
            "- No clear large pleural effusion; subtle findings may require additional views.\n",
            "\n",
            "## 3) Differential & Next Steps (Educational)\n",
            "- Low confidence: mild atelectasis vs under-inflation (shallow inspiration).\n",
            "- Consider additional view (lateral) or repeat if clinically indicated.\n",
            "- Correlate with symptoms, exam, oxygen saturation, and clinician assessment.\n",
            "\n",
            "## 4) Patient-friendly summary\n",
            "At a quick glance, nothing big stands out, but subtle issues can be missed. A doctor uses symptoms + more views/tests to confirm.\n",
            "\n",
            "## 5) Safety Note\n",
            "Educational demo only. Not medical advice. Consult a clinician for diagnosis/treatment.\n",
            "\n",
            "---\n",
            "**Demo Branding:** Arfin Parween • AI in Medical Imaging • Structured radiology-style notes • explainable • demo-friendly\n",
        );
        assert_eq!(demo_report(), expected);
    }
}
