use regex::Regex;

const RULES: [(&str, &str); 6] = [
	(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}", "[REDACTED_EMAIL]"),
	(r"\b(?:\+\d{1,3}[ -]?)?(?:\(?\d{3}\)?[ -]?\d{3}[ -]?\d{4})\b", "[REDACTED_PHONE]"),
	(r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED_SSN]"),
	(r"\b(?:[A-Z]{2}\d{6}|[A-Z]\d{7}|\d{9})\b", "[REDACTED_ID]"),
	(r"\b[1-9]\d{10}\b", "[REDACTED_TCKN]"),
	(r"(?i)\bTR\s?\d{2}(?:\s?\d){22}\b", "[REDACTED_TR_IBAN]"),
];

/// Masks personal data before text is chunked and stored.
///
/// Rules run in a fixed order; earlier replacements are visible to later rules.
#[derive(Debug, Clone)]
pub struct Redactor {
	rules: Vec<(Regex, &'static str)>,
}
impl Redactor {
	pub fn new() -> Result<Self, regex::Error> {
		let rules = RULES
			.iter()
			.map(|(pattern, label)| Regex::new(pattern).map(|re| (re, *label)))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { rules })
	}

	pub fn redact(&self, text: &str) -> String {
		let mut out = text.to_string();

		for (re, label) in &self.rules {
			if re.is_match(&out) {
				out = re.replace_all(&out, *label).into_owned();
			}
		}

		out
	}
}
