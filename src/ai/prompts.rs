//! Prompt text sent alongside each document image

use once_cell::sync::Lazy;

use crate::ai::gemini::types::DocumentType;

/// Instruction for the vision model: classify, extract serial number and site
pub static CLASSIFY_DOCUMENT_PROMPT: Lazy<String> = Lazy::new(|| {
    let types = DocumentType::ALL
        .iter()
        .map(|t| format!("'{}'", t.label()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Analyze the provided document image. Classify the document, then extract its serial number and the site it was issued for.

The site is handwritten in a field, space or box meant for it. It is usually a name such as ATR, MRS, WTP, STP, NSTP, KOY, KOD or PY, often followed by a number such as 60, 54, 120, 110 or 48.

The possible document types are: {types}.

The serial number is the most prominent identification number on the form:
- For 'Goods Received Note', use the 'GRN No.'.
- For 'Delivery Challan', use the number after '(MTS)'.
- For 'Diesel Issue' (printed as 'Diesel Receipt & Issue'), use 'S.No.'.
- For 'Receipt Memo', use the main memo number (e.g., 58653).
- If no clear serial number is found, use the value 'N/A'.
If no site is written, use the value 'N/A'.

Return a single raw JSON object with exactly three keys: "documentType", "serialNumber" and "site". Do not add any extra text, formatting or markdown."#
    )
});
